//! Prompt-Fusion Service — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use prompt_fusion::api::{self, AppState};
use prompt_fusion::metrics::Metrics;
use prompt_fusion::types::Platform;

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - FUSION_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("FUSION_DEV_LOG").ok().is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("orchestrator=info,providers=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments. This is what
    // makes CLAUDE_API_KEY / GROK_API_KEY / GEMINI_API_KEY visible locally.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let state = AppState::from_env();

    let configured = Platform::ALL
        .iter()
        .filter(|p| state.registry.is_configured(**p))
        .count();
    let metrics = Metrics::init(configured);

    let router = api::create_router(state).merge(metrics.router());
    Ok(router.into())
}
