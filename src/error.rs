// src/error.rs
//! Errors raised to the caller *before* a turn exists. Everything that can
//! go wrong after a turn is created is recovered where it happens and
//! converted into data (`NormalizedResponse.error`, failed-turn state).

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestrationError {
    /// Malformed/oversized/unsafe prompt or invalid model selection.
    /// Carries the full list of human-readable reasons.
    Validation(Vec<String>),
    /// No provider selected, or another precondition that must hold before
    /// any network call is issued.
    Configuration(String),
}

impl OrchestrationError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn reasons(&self) -> Vec<String> {
        match self {
            Self::Validation(errs) => errs.clone(),
            Self::Configuration(msg) => vec![msg.clone()],
        }
    }
}

impl fmt::Display for OrchestrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(errs) => write!(f, "validation failed: {}", errs.join("; ")),
            Self::Configuration(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for OrchestrationError {}
