// src/providers/claude.rs
//! Claude adapter (Anthropic Messages API). Auth via `x-api-key` header;
//! answer text lives at `content[0].text`.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::heuristics::ConfidenceTuning;
use crate::providers::{
    build_http_client, describe_status, describe_transport, estimate_confidence, ProviderAdapter,
};
use crate::types::{NormalizedResponse, Platform, UsageInfo};

const ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const PRIMARY_MODEL: &str = "claude-sonnet-4-20250514";
/// Same-vendor fallback, tried at most once when the primary model fails.
const FALLBACK_MODEL: &str = "claude-3-5-haiku-20241022";
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// A successful vendor completion before normalization.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: UsageInfo,
    pub model: String,
}

pub struct ClaudeAdapter {
    http: reqwest::Client,
    api_key: Option<String>,
    tuning: ConfidenceTuning,
}

impl ClaudeAdapter {
    pub fn new(api_key: Option<String>, tuning: ConfidenceTuning) -> Self {
        Self {
            http: build_http_client(),
            api_key,
            tuning,
        }
    }

    /// Raw completion call, also used by the answer endpoint and the
    /// delegated synthesis client. Tries the primary model, then the
    /// same-vendor fallback exactly once.
    pub async fn complete(&self, prompt: &str, max_tokens: Option<u32>) -> Result<Completion, String> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(format!("{}: not configured", Platform::Claude));
        };
        let max_tokens = max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);

        match self.call_model(key, PRIMARY_MODEL, prompt, max_tokens).await {
            Ok(c) => Ok(c),
            Err(_) => self.call_model(key, FALLBACK_MODEL, prompt, max_tokens).await,
        }
    }

    async fn call_model(
        &self,
        key: &str,
        model: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<Completion, String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            max_tokens: u32,
            messages: Vec<Msg<'a>>,
        }
        #[derive(Deserialize)]
        struct Resp {
            content: Vec<Block>,
            #[serde(default)]
            usage: Usage,
            model: String,
        }
        #[derive(Deserialize)]
        struct Block {
            #[serde(default)]
            text: String,
        }
        #[derive(Deserialize, Default)]
        struct Usage {
            #[serde(default)]
            input_tokens: u64,
            #[serde(default)]
            output_tokens: u64,
        }

        let req = Req {
            model,
            max_tokens,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
        };

        let resp = self
            .http
            .post(ENDPOINT)
            .header("x-api-key", key)
            .header("anthropic-version", API_VERSION)
            .json(&req)
            .send()
            .await
            .map_err(|e| describe_transport(Platform::Claude, &e))?;

        if !resp.status().is_success() {
            return Err(describe_status(Platform::Claude, resp.status()));
        }

        let body: Resp = resp
            .json()
            .await
            .map_err(|_| format!("{}: unexpected response shape", Platform::Claude))?;

        let text = body
            .content
            .first()
            .map(|b| b.text.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(format!("{}: empty completion", Platform::Claude));
        }

        Ok(Completion {
            text,
            usage: UsageInfo {
                input_tokens: body.usage.input_tokens,
                output_tokens: body.usage.output_tokens,
            },
            model: body.model,
        })
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for ClaudeAdapter {
    fn platform(&self) -> Platform {
        Platform::Claude
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn query(&self, prompt: &str) -> NormalizedResponse {
        let started = Instant::now();
        match self.complete(prompt, None).await {
            Ok(c) => {
                let confidence = estimate_confidence(&c.text, &self.tuning);
                NormalizedResponse::settled(
                    Platform::Claude,
                    c.text,
                    confidence,
                    started.elapsed().as_secs_f64(),
                    false,
                )
            }
            Err(e) => NormalizedResponse::errored(
                Platform::Claude,
                e,
                started.elapsed().as_secs_f64(),
            ),
        }
    }
}
