// src/providers/gemini.rs
//! Gemini adapter (Google generateContent). Auth via `x-goog-api-key`
//! header; answer text lives at `candidates[0].content.parts[0].text`.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::heuristics::ConfidenceTuning;
use crate::providers::{
    build_http_client, describe_status, describe_transport, estimate_confidence, ProviderAdapter,
};
use crate::types::{NormalizedResponse, Platform};

const MODEL: &str = "gemini-2.0-flash";

fn endpoint() -> String {
    format!("https://generativelanguage.googleapis.com/v1beta/models/{MODEL}:generateContent")
}

pub struct GeminiAdapter {
    http: reqwest::Client,
    api_key: Option<String>,
    tuning: ConfidenceTuning,
}

impl GeminiAdapter {
    pub fn new(api_key: Option<String>, tuning: ConfidenceTuning) -> Self {
        Self {
            http: build_http_client(),
            api_key,
            tuning,
        }
    }

    async fn fetch(&self, key: &str, prompt: &str) -> Result<String, String> {
        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            contents: Vec<Content<'a>>,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: RespContent,
        }
        #[derive(Deserialize)]
        struct RespContent {
            #[serde(default)]
            parts: Vec<RespPart>,
        }
        #[derive(Deserialize)]
        struct RespPart {
            #[serde(default)]
            text: String,
        }

        let req = Req {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let resp = self
            .http
            .post(endpoint())
            .header("x-goog-api-key", key)
            .json(&req)
            .send()
            .await
            .map_err(|e| describe_transport(Platform::Gemini, &e))?;

        if !resp.status().is_success() {
            return Err(describe_status(Platform::Gemini, resp.status()));
        }

        let body: Resp = resp
            .json()
            .await
            .map_err(|_| format!("{}: unexpected response shape", Platform::Gemini))?;

        let text = body
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(format!("{}: empty completion", Platform::Gemini));
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn platform(&self) -> Platform {
        Platform::Gemini
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn query(&self, prompt: &str) -> NormalizedResponse {
        let started = Instant::now();
        let Some(key) = self.api_key.clone() else {
            return NormalizedResponse::errored(Platform::Gemini, "gemini: not configured", 0.0);
        };
        match self.fetch(&key, prompt).await {
            Ok(text) => {
                let confidence = estimate_confidence(&text, &self.tuning);
                NormalizedResponse::settled(
                    Platform::Gemini,
                    text,
                    confidence,
                    started.elapsed().as_secs_f64(),
                    false,
                )
            }
            Err(e) => {
                NormalizedResponse::errored(Platform::Gemini, e, started.elapsed().as_secs_f64())
            }
        }
    }
}
