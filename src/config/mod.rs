// src/config/mod.rs
pub mod heuristics;
pub mod providers;

pub use heuristics::HeuristicsConfig;
pub use providers::ProviderSettings;
