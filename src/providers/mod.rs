// src/providers/mod.rs
//! Provider adapters: one per LLM vendor, each hiding its vendor-specific
//! request shape, auth scheme, and response parsing behind a common trait.
//! The fan-out coordinator only ever sees `ProviderHandle`.

pub mod claude;
pub mod gemini;
pub mod grok;
pub mod mock;

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use reqwest::StatusCode;
use tracing::warn;

use crate::analytics::{count_vocab_hits, CERTAINTY_WORDS, HEDGING_WORDS};
use crate::config::heuristics::ConfidenceTuning;
use crate::config::{HeuristicsConfig, ProviderSettings};
use crate::types::{ModelSelection, NormalizedResponse, Platform};

pub use claude::ClaudeAdapter;
pub use gemini::GeminiAdapter;
pub use grok::GrokAdapter;
pub use mock::MockGenerator;

/// One LLM vendor. `query` never fails: every failure is captured into the
/// `error` field of the returned record.
#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn platform(&self) -> Platform;
    /// True when a plausible credential is present.
    fn is_configured(&self) -> bool;
    async fn query(&self, prompt: &str) -> NormalizedResponse;
}

/// Shared HTTP client: bounded timeouts so a stalled vendor fails its own
/// call, never the whole turn.
pub(crate) fn build_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent("prompt-fusion/0.1")
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(45))
        .build()
        .expect("reqwest client")
}

/// Map a non-2xx status to a small set of human-readable categories.
pub(crate) fn describe_status(platform: Platform, status: StatusCode) -> String {
    match status.as_u16() {
        401 => format!("{platform}: unauthorized - API key was rejected"),
        403 => format!("{platform}: forbidden - key lacks access to this model"),
        429 => format!("{platform}: rate limited - too many requests"),
        code => format!("{platform}: request failed with HTTP {code}"),
    }
}

/// Map a transport-level failure (no response at all) to a generic
/// connectivity message.
pub(crate) fn describe_transport(platform: Platform, err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("{platform}: request timed out")
    } else if err.is_connect() {
        format!("{platform}: could not connect (network or cross-origin policy)")
    } else {
        format!("{platform}: network error")
    }
}

/// Shared confidence heuristic, applied uniformly across vendors:
/// base + word-count bonuses + certainty/hedging adjustments, clamped [0,1].
pub fn estimate_confidence(text: &str, tuning: &ConfidenceTuning) -> f32 {
    let words = crate::types::count_words(text);
    let mut score = tuning.base;
    if words > tuning.mid_words {
        score += tuning.mid_bonus;
    }
    if words > tuning.long_words {
        score += tuning.long_bonus;
    }
    let lower = text.to_lowercase();
    score += tuning.certainty_step * count_vocab_hits(&lower, CERTAINTY_WORDS) as f32;
    score -= tuning.hedging_step * count_vocab_hits(&lower, HEDGING_WORDS) as f32;
    score.clamp(0.0, 1.0)
}

/// The single decision point between real and simulated data
/// (ResponseSource): uncredentialed or force-mocked providers answer from
/// the offline generator with `is_mock` set; a configured provider whose
/// live call fails keeps its error visible.
#[derive(Clone)]
pub struct ProviderHandle {
    adapter: Arc<dyn ProviderAdapter>,
    mock: MockGenerator,
    force_mock: bool,
}

impl ProviderHandle {
    pub fn new(adapter: Arc<dyn ProviderAdapter>, mock: MockGenerator, force_mock: bool) -> Self {
        Self {
            adapter,
            mock,
            force_mock,
        }
    }

    pub fn platform(&self) -> Platform {
        self.adapter.platform()
    }

    pub fn is_configured(&self) -> bool {
        self.adapter.is_configured()
    }

    pub async fn query(&self, prompt: &str) -> NormalizedResponse {
        let platform = self.platform();
        if self.force_mock || !self.adapter.is_configured() {
            counter!("provider_mock_fallbacks_total", "platform" => platform.as_str())
                .increment(1);
            return self.mock.generate(platform, prompt);
        }

        counter!("provider_calls_total", "platform" => platform.as_str()).increment(1);
        let response = self.adapter.query(prompt).await;
        if let Some(err) = &response.error {
            counter!("provider_errors_total", "platform" => platform.as_str()).increment(1);
            warn!(target: "providers", platform = %platform, error = %err, "provider call failed");
        }
        response
    }
}

/// All three vendor handles, built once at boot and shared.
#[derive(Clone)]
pub struct ProviderRegistry {
    handles: Vec<ProviderHandle>,
}

impl ProviderRegistry {
    pub fn from_settings(settings: &ProviderSettings, heuristics: &HeuristicsConfig) -> Self {
        let tuning = heuristics.confidence.clone();
        let adapters: Vec<Arc<dyn ProviderAdapter>> = vec![
            Arc::new(GrokAdapter::new(settings.grok_key.clone(), tuning.clone())),
            Arc::new(ClaudeAdapter::new(settings.claude_key.clone(), tuning.clone())),
            Arc::new(GeminiAdapter::new(settings.gemini_key.clone(), tuning)),
        ];
        let handles = adapters
            .into_iter()
            .map(|a| ProviderHandle::new(a, MockGenerator::default(), settings.force_mock))
            .collect();
        Self { handles }
    }

    /// Build a registry from arbitrary adapters; used by tests to inject
    /// stub vendors.
    pub fn from_handles(handles: Vec<ProviderHandle>) -> Self {
        Self { handles }
    }

    pub fn handle(&self, platform: Platform) -> Option<&ProviderHandle> {
        self.handles.iter().find(|h| h.platform() == platform)
    }

    /// Handles for the selected platforms, in canonical order.
    pub fn select(&self, selection: &ModelSelection) -> Vec<ProviderHandle> {
        let mut out: Vec<ProviderHandle> = self
            .handles
            .iter()
            .filter(|h| selection.enabled(h.platform()))
            .cloned()
            .collect();
        out.sort_by_key(|h| h.platform().order_index());
        out
    }

    pub fn is_configured(&self, platform: Platform) -> bool {
        self.handle(platform).map(|h| h.is_configured()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HeuristicsConfig;

    #[test]
    fn confidence_rewards_length_and_certainty() {
        let tuning = HeuristicsConfig::default().confidence;
        let short = estimate_confidence("maybe", &tuning);
        let long = estimate_confidence(
            &"this is definitely a clearly proven statement. ".repeat(20),
            &tuning,
        );
        assert!(long > short);
        assert!((0.0..=1.0).contains(&short));
        assert!((0.0..=1.0).contains(&long));
    }

    #[test]
    fn hedging_lowers_confidence() {
        let tuning = HeuristicsConfig::default().confidence;
        let plain = estimate_confidence("the answer is four", &tuning);
        let hedged = estimate_confidence(
            "perhaps the answer might possibly be four, it could be",
            &tuning,
        );
        assert!(hedged < plain);
    }

    #[test]
    fn status_mapping_covers_the_known_categories() {
        let s = describe_status(Platform::Claude, StatusCode::UNAUTHORIZED);
        assert!(s.contains("unauthorized"));
        let s = describe_status(Platform::Grok, StatusCode::TOO_MANY_REQUESTS);
        assert!(s.contains("rate limited"));
        let s = describe_status(Platform::Gemini, StatusCode::BAD_GATEWAY);
        assert!(s.contains("502"));
    }
}
