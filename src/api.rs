// src/api.rs
//! HTTP surface: health, proxy endpoints for the browser client, and the
//! orchestrated query/conversation endpoints. JSON in/out throughout;
//! CORS is restricted to the fixed local development origins.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderValue, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::analytics;
use crate::config::{HeuristicsConfig, ProviderSettings};
use crate::fanout::FanoutCoordinator;
use crate::fusion::{ClaudeSynthesis, DisabledSynthesis, FusionSynthesizer, SynthesisClient};
use crate::functions;
use crate::orchestrator::Orchestrator;
use crate::progress::ProgressEstimator;
use crate::providers::{ClaudeAdapter, ProviderAdapter, ProviderRegistry};
use crate::store::ConversationStore;
use crate::types::{now_millis, ModelSelection, NormalizedResponse, Platform, UsageInfo};

/// Browser origins allowed during local development.
const DEV_ORIGINS: [&str; 3] = [
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1:5173",
];

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub registry: ProviderRegistry,
    pub synthesizer: Arc<FusionSynthesizer>,
    pub claude: Arc<ClaudeAdapter>,
    pub heuristics: Arc<HeuristicsConfig>,
}

impl AppState {
    /// Wire the full pipeline from settings. The synthesis delegate rides
    /// on the Claude transport and is disabled when Claude is not
    /// credentialed or mock mode is forced.
    pub fn build(settings: &ProviderSettings, heuristics: HeuristicsConfig) -> Self {
        let heuristics = Arc::new(heuristics);
        let registry = ProviderRegistry::from_settings(settings, &heuristics);
        let claude = Arc::new(ClaudeAdapter::new(
            settings.claude_key.clone(),
            heuristics.confidence.clone(),
        ));

        let delegate: Arc<dyn SynthesisClient> =
            if settings.claude_key.is_some() && !settings.force_mock {
                Arc::new(ClaudeSynthesis::new(claude.clone()))
            } else {
                Arc::new(DisabledSynthesis)
            };
        let synthesizer = Arc::new(FusionSynthesizer::new(delegate, heuristics.clone()));

        let orchestrator = Arc::new(Orchestrator::new(
            FanoutCoordinator::new(registry.clone()),
            synthesizer.clone(),
            Arc::new(ConversationStore::new()),
            heuristics.clone(),
            ProgressEstimator::default(),
        ));

        Self {
            orchestrator,
            registry,
            synthesizer,
            claude,
            heuristics,
        }
    }

    pub fn from_env() -> Self {
        let settings = ProviderSettings::from_env();
        Self::build(&settings, HeuristicsConfig::load_or_default())
    }
}

pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = DEV_ORIGINS
        .iter()
        .map(|o| o.parse().expect("static origin"))
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/llm/answer", post(answer))
        .route("/api/llm/complete-analysis", post(complete_analysis))
        .route("/api/llm/analyze", post(analyze_legacy))
        .route("/api/llm/synthesize", post(synthesize))
        .route("/api/query", post(query))
        .route("/api/conversation", get(conversation))
        .route("/api/conversation/new", post(new_conversation))
        .route("/api/history/queries", get(query_history))
        .layer(cors)
        .merge(functions::router())
        .with_state(state)
}

fn error_body(status: StatusCode, msg: impl Into<String>) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "success": false, "error": msg.into() })))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": now_millis(),
        "claudeConfigured": state.registry.is_configured(Platform::Claude),
        "grokConfigured": state.registry.is_configured(Platform::Grok),
        "geminiConfigured": state.registry.is_configured(Platform::Gemini),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnswerReq {
    prompt: String,
    #[serde(default)]
    max_tokens: Option<u32>,
}

async fn answer(
    State(state): State<AppState>,
    Json(body): Json<AnswerReq>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if body.prompt.trim().is_empty() {
        return Err(error_body(StatusCode::BAD_REQUEST, "prompt must not be empty"));
    }
    if !state.claude.is_configured() {
        return Err(error_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            "claude: not configured",
        ));
    }
    match state.claude.complete(&body.prompt, body.max_tokens).await {
        Ok(c) => Ok(Json(json!({
            "success": true,
            "content": c.text,
            "usage": c.usage,
            "model": c.model,
        }))),
        Err(e) => Err(error_body(StatusCode::BAD_GATEWAY, e)),
    }
}

/// Peer responses arriving over the wire, minus the server-generated
/// bookkeeping fields.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IncomingResponse {
    pub platform: Platform,
    pub content: String,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub response_time: f64,
    #[serde(default)]
    pub word_count: Option<usize>,
}

impl IncomingResponse {
    pub(crate) fn into_normalized(self) -> NormalizedResponse {
        let mut r = NormalizedResponse::settled(
            self.platform,
            self.content,
            self.confidence,
            self.response_time,
            false,
        );
        if let Some(wc) = self.word_count {
            r.word_count = wc;
        }
        if r.content.is_empty() {
            r.error = Some(format!("{}: empty response supplied", r.platform));
        }
        r
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompleteAnalysisReq {
    original_prompt: String,
    #[serde(default)]
    other_responses: Vec<IncomingResponse>,
}

/// Produce this server's own answer, then analyze it together with the
/// peer responses supplied by the client.
async fn complete_analysis(
    State(state): State<AppState>,
    Json(body): Json<CompleteAnalysisReq>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if body.original_prompt.trim().is_empty() {
        return Err(error_body(
            StatusCode::BAD_REQUEST,
            "originalPrompt must not be empty",
        ));
    }

    let handle = state
        .registry
        .handle(Platform::Claude)
        .ok_or_else(|| error_body(StatusCode::INTERNAL_SERVER_ERROR, "claude: not registered"))?;
    let own = handle.query(&body.original_prompt).await;

    let mut all: Vec<NormalizedResponse> = body
        .other_responses
        .into_iter()
        .map(IncomingResponse::into_normalized)
        .collect();
    all.push(own.clone());
    all.sort_by_key(|r| r.platform.order_index());

    let analysis = analytics::extract(&all, &state.heuristics);
    let total = all.len();
    Ok(Json(json!({
        "success": true,
        "ownResponse": own,
        "analysis": analysis,
        "allResponses": all,
        "originalPrompt": body.original_prompt,
        "totalResponsesAnalyzed": total,
        "usage": UsageInfo::default(),
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeReq {
    original_prompt: String,
    #[serde(default)]
    responses: Vec<IncomingResponse>,
}

/// Legacy shape kept for older clients; same extractor underneath.
async fn analyze_legacy(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeReq>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if body.responses.is_empty() {
        return Err(error_body(
            StatusCode::BAD_REQUEST,
            "responses must not be empty",
        ));
    }
    let all: Vec<NormalizedResponse> = body
        .responses
        .into_iter()
        .map(IncomingResponse::into_normalized)
        .collect();
    let analysis = analytics::extract(&all, &state.heuristics);
    Ok(Json(json!({
        "success": true,
        "analysis": analysis,
        "originalPrompt": body.original_prompt,
        "responseCount": all.len(),
        "usage": UsageInfo::default(),
        "model": "local-analytics",
    })))
}

async fn synthesize(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeReq>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if body.responses.is_empty() {
        return Err(error_body(
            StatusCode::BAD_REQUEST,
            "responses must not be empty",
        ));
    }
    let all: Vec<NormalizedResponse> = body
        .responses
        .into_iter()
        .map(IncomingResponse::into_normalized)
        .collect();
    let source_count = all.iter().filter(|r| r.is_usable()).count();
    let fusion = state.synthesizer.fuse(&body.original_prompt, &all).await;
    let model = fusion_model_label(&fusion.strategy);
    Ok(Json(json!({
        "success": true,
        "synthesis": fusion,
        "originalPrompt": body.original_prompt,
        "sourceCount": source_count,
        "usage": UsageInfo::default(),
        "model": model,
    })))
}

fn fusion_model_label(strategy: &str) -> &'static str {
    if strategy == "delegated" {
        "claude-delegated"
    } else {
        "local-synthesis"
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryReq {
    prompt: String,
    #[serde(default)]
    models: Option<ModelSelection>,
}

/// Full orchestrated turn: validate, fan out, analytics + fusion, store.
async fn query(
    State(state): State<AppState>,
    Json(body): Json<QueryReq>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let selection = body.models.unwrap_or_else(ModelSelection::all);
    match state.orchestrator.submit(&body.prompt, &selection).await {
        Ok(turn) => Ok(Json(json!({ "success": true, "turn": turn }))),
        Err(e) => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": e.to_string(),
                "details": e.reasons(),
            })),
        )),
    }
}

async fn conversation(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "conversation": state.orchestrator.store().current_conversation() }))
}

async fn new_conversation(State(state): State<AppState>) -> Json<Value> {
    state.orchestrator.store().start_new_conversation();
    Json(json!({ "success": true }))
}

async fn query_history(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "queries": state.orchestrator.store().query_history() }))
}
