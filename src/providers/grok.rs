// src/providers/grok.rs
//! Grok adapter (xAI chat completions). Bearer auth; answer text lives at
//! `choices[0].message.content`.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::heuristics::ConfidenceTuning;
use crate::providers::{
    build_http_client, describe_status, describe_transport, estimate_confidence, ProviderAdapter,
};
use crate::types::{NormalizedResponse, Platform};

const ENDPOINT: &str = "https://api.x.ai/v1/chat/completions";
const MODEL: &str = "grok-3";

pub struct GrokAdapter {
    http: reqwest::Client,
    api_key: Option<String>,
    tuning: ConfidenceTuning,
}

impl GrokAdapter {
    pub fn new(api_key: Option<String>, tuning: ConfidenceTuning) -> Self {
        Self {
            http: build_http_client(),
            api_key,
            tuning,
        }
    }

    async fn fetch(&self, key: &str, prompt: &str) -> Result<String, String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            #[serde(default)]
            content: String,
        }

        let req = Req {
            model: MODEL,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
            temperature: 0.7,
        };

        let resp = self
            .http
            .post(ENDPOINT)
            .bearer_auth(key)
            .json(&req)
            .send()
            .await
            .map_err(|e| describe_transport(Platform::Grok, &e))?;

        if !resp.status().is_success() {
            return Err(describe_status(Platform::Grok, resp.status()));
        }

        let body: Resp = resp
            .json()
            .await
            .map_err(|_| format!("{}: unexpected response shape", Platform::Grok))?;

        let text = body
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(format!("{}: empty completion", Platform::Grok));
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for GrokAdapter {
    fn platform(&self) -> Platform {
        Platform::Grok
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn query(&self, prompt: &str) -> NormalizedResponse {
        let started = Instant::now();
        let Some(key) = self.api_key.clone() else {
            return NormalizedResponse::errored(Platform::Grok, "grok: not configured", 0.0);
        };
        match self.fetch(&key, prompt).await {
            Ok(text) => {
                let confidence = estimate_confidence(&text, &self.tuning);
                NormalizedResponse::settled(
                    Platform::Grok,
                    text,
                    confidence,
                    started.elapsed().as_secs_f64(),
                    false,
                )
            }
            Err(e) => {
                NormalizedResponse::errored(Platform::Grok, e, started.elapsed().as_secs_f64())
            }
        }
    }
}
