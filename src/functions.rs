// src/functions.rs
//! Single-purpose per-provider handlers, mirroring the serverless function
//! deployment mode: POST only, one provider each, and a wildcard
//! `Access-Control-Allow-Origin` header on every response including errors.

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::AppState;
use crate::types::Platform;

pub fn router() -> Router<AppState> {
    Router::new().route("/fn/{platform}", post(invoke))
}

#[derive(Deserialize)]
struct FnReq {
    prompt: String,
}

async fn invoke(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    Json(body): Json<FnReq>,
) -> Response {
    let Some(platform) = Platform::parse(&platform) else {
        return with_wildcard_cors(
            StatusCode::NOT_FOUND,
            json!({ "success": false, "error": format!("unknown platform '{platform}'") }),
        );
    };
    if body.prompt.trim().is_empty() {
        return with_wildcard_cors(
            StatusCode::BAD_REQUEST,
            json!({ "success": false, "error": "prompt must not be empty" }),
        );
    }

    let Some(handle) = state.registry.handle(platform) else {
        return with_wildcard_cors(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "success": false, "error": format!("{platform}: not registered") }),
        );
    };

    let response = handle.query(&body.prompt).await;
    match &response.error {
        None => with_wildcard_cors(StatusCode::OK, json!({ "success": true, "data": response })),
        Some(err) => with_wildcard_cors(
            StatusCode::BAD_GATEWAY,
            json!({
                "success": false,
                "error": err,
                "details": { "platform": platform, "responseTime": response.response_time },
            }),
        ),
    }
}

fn with_wildcard_cors(status: StatusCode, body: serde_json::Value) -> Response {
    let mut resp = (status, Json(body)).into_response();
    resp.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    resp
}
