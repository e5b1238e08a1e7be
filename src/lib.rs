// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod analytics;
pub mod api;
pub mod config;
pub mod error;
pub mod fanout;
pub mod functions;
pub mod fusion;
pub mod metrics;
pub mod orchestrator;
pub mod progress;
pub mod providers;
pub mod store;
pub mod types;
pub mod validator;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::error::OrchestrationError;
pub use crate::fanout::FanoutCoordinator;
pub use crate::orchestrator::Orchestrator;
pub use crate::store::ConversationStore;
pub use crate::types::{
    AnalysisData, Conversation, ConversationTurn, FusionResult, ModelSelection,
    NormalizedResponse, Platform,
};
