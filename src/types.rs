// src/types.rs
//! Core data model: platforms, normalized provider responses, derived
//! analytics, fusion output, and conversation turns.
//!
//! All wire-facing structs serialize camelCase to match the browser client.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// One external LLM vendor integrated as a data source.
///
/// The variant order is the canonical display/emit order: fan-out results
/// are always returned in this order regardless of arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Grok,
    Claude,
    Gemini,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Grok, Platform::Claude, Platform::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Grok => "grok",
            Platform::Claude => "claude",
            Platform::Gemini => "gemini",
        }
    }

    /// Index into the canonical order; used to sort fan-out results.
    pub fn order_index(&self) -> usize {
        Self::ALL.iter().position(|p| p == self).unwrap_or(usize::MAX)
    }

    pub fn parse(s: &str) -> Option<Platform> {
        match s.to_ascii_lowercase().as_str() {
            "grok" => Some(Platform::Grok),
            "claude" => Some(Platform::Claude),
            "gemini" => Some(Platform::Gemini),
            _ => None,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which platforms a turn should query. Unknown keys are rejected at the
/// deserialization boundary so typos never silently drop a provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "lowercase")]
pub struct ModelSelection {
    #[serde(default)]
    pub grok: bool,
    #[serde(default)]
    pub claude: bool,
    #[serde(default)]
    pub gemini: bool,
}

impl ModelSelection {
    pub fn all() -> Self {
        Self {
            grok: true,
            claude: true,
            gemini: true,
        }
    }

    pub fn enabled(&self, platform: Platform) -> bool {
        match platform {
            Platform::Grok => self.grok,
            Platform::Claude => self.claude,
            Platform::Gemini => self.gemini,
        }
    }

    pub fn any(&self) -> bool {
        self.grok || self.claude || self.gemini
    }

    /// Selected platforms in canonical order.
    pub fn platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .iter()
            .copied()
            .filter(|p| self.enabled(*p))
            .collect()
    }
}

/// One provider's answer to one prompt, normalized across vendors.
///
/// Invariant after settlement: exactly one of {non-empty `content`,
/// `error` present} holds; `loading` is only true while in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResponse {
    pub id: String,
    pub platform: Platform,
    pub content: String,
    /// Heuristic score in [0,1] derived from text features.
    pub confidence: f32,
    /// Elapsed wall-clock seconds for the call.
    pub response_time: f64,
    pub word_count: usize,
    pub loading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when the content came from the offline generator rather than
    /// a live vendor call.
    #[serde(default)]
    pub is_mock: bool,
    /// Creation time, epoch milliseconds.
    pub timestamp: i64,
}

impl NormalizedResponse {
    /// In-flight placeholder created when a turn starts.
    pub fn pending(platform: Platform) -> Self {
        Self {
            id: next_id(platform),
            platform,
            content: String::new(),
            confidence: 0.0,
            response_time: 0.0,
            word_count: 0,
            loading: true,
            error: None,
            is_mock: false,
            timestamp: now_millis(),
        }
    }

    /// Successful settlement with extracted text.
    pub fn settled(
        platform: Platform,
        content: String,
        confidence: f32,
        response_time: f64,
        is_mock: bool,
    ) -> Self {
        let word_count = count_words(&content);
        Self {
            id: next_id(platform),
            platform,
            content,
            confidence: confidence.clamp(0.0, 1.0),
            response_time,
            word_count,
            loading: false,
            error: None,
            is_mock,
            timestamp: now_millis(),
        }
    }

    /// Failed settlement: empty content, human-readable error.
    pub fn errored(platform: Platform, error: impl Into<String>, response_time: f64) -> Self {
        Self {
            id: next_id(platform),
            platform,
            content: String::new(),
            confidence: 0.0,
            response_time,
            word_count: 0,
            loading: false,
            error: Some(error.into()),
            is_mock: false,
            timestamp: now_millis(),
        }
    }

    pub fn is_usable(&self) -> bool {
        self.error.is_none() && !self.content.is_empty() && !self.loading
    }
}

/// Whitespace-split token count, the definition used everywhere a
/// `wordCount` is reported.
pub fn count_words(s: &str) -> usize {
    s.split_whitespace().count()
}

/// Current epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Monotonic per-process response ids: `<platform>-<counter>-<ms>`.
/// Unique within a session, readable in logs; no uuid dependency needed.
fn next_id(platform: Platform) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}-{}", platform.as_str(), n, now_millis())
}

// ---------------------------------------------------------------
// Analytics projection
// ---------------------------------------------------------------

/// Sentiment triplet per platform. Components are ≥0 and sum to 100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSentiment {
    pub platform: Platform,
    pub positive: u32,
    pub neutral: u32,
    pub negative: u32,
}

/// One ranked keyword with per-platform occurrence counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordEntry {
    pub word: String,
    pub grok: u32,
    pub claude: u32,
    pub gemini: u32,
    pub total: u32,
}

/// Quality metrics mirrored from the normalized response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    pub platform: Platform,
    pub confidence: f32,
    pub response_time: f64,
    pub word_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EfficiencyMetrics {
    pub platform: Platform,
    /// Distance of average sentence length from the optimum, in [10,100].
    pub conciseness: u32,
    /// Repeated-vocabulary share, in [0,50].
    pub redundancy: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskMetrics {
    pub platform: Platform,
    /// Inverse hedging-frequency score, in [50,100].
    pub hedging: u32,
    /// Contrast-word score, in [0,50].
    pub contradictions: u32,
    /// Inverse structural-marker score, in [5,40].
    pub hallucination: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifferentiationMetrics {
    pub platform: Platform,
    pub originality: u32,
    pub divergence: u32,
    pub contribution: u32,
}

/// Derived, read-only aggregate over one turn's responses.
///
/// Purely a deterministic projection of the input text; identical input
/// yields identical output (see analytics tests).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisData {
    pub sentiment: Vec<PlatformSentiment>,
    /// Top-N keywords ranked by total occurrence (N ≤ 5).
    pub keywords: Vec<KeywordEntry>,
    pub quality: Vec<QualityMetrics>,
    pub efficiency: Vec<EfficiencyMetrics>,
    pub risk: Vec<RiskMetrics>,
    pub differentiation: Vec<DifferentiationMetrics>,
}

// ---------------------------------------------------------------
// Fusion
// ---------------------------------------------------------------

/// Attribution percentages per platform. Invariant: the three values sum
/// to exactly 100 (rounding drift is absorbed by the largest contributor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub struct SourceAttribution {
    pub grok: u32,
    pub claude: u32,
    pub gemini: u32,
}

impl SourceAttribution {
    pub fn total(&self) -> u32 {
        self.grok + self.claude + self.gemini
    }

    pub fn get(&self, platform: Platform) -> u32 {
        match platform {
            Platform::Grok => self.grok,
            Platform::Claude => self.claude,
            Platform::Gemini => self.gemini,
        }
    }

    pub fn set(&mut self, platform: Platform, value: u32) {
        match platform {
            Platform::Grok => self.grok = value,
            Platform::Claude => self.claude = value,
            Platform::Gemini => self.gemini = value,
        }
    }
}

/// The synthesized answer for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionResult {
    pub content: String,
    /// In [0,1], always capped below 1.0.
    pub confidence: f32,
    pub sources: SourceAttribution,
    /// Ordered list of ≤4 short extracted highlights.
    pub key_insights: Vec<String>,
    /// "delegated" when a secondary LLM produced the text, "local" otherwise.
    pub strategy: String,
}

/// Token accounting reported by vendor APIs; zeroed for local paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UsageInfo {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

// ---------------------------------------------------------------
// Conversation state
// ---------------------------------------------------------------

/// One prompt/response cycle. Mutated only by whole-record replacement
/// in the store (copy-on-write), never field-by-field in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    pub id: String,
    /// Sanitized prompt (validator output), never the raw input.
    pub prompt: String,
    pub timestamp: i64,
    /// One entry per selected platform, in canonical order.
    pub responses: Vec<NormalizedResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_data: Option<AnalysisData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fusion_result: Option<FusionResult>,
    pub loading: bool,
    pub completed: bool,
    /// 0–100 UI-feedback indicator; not a measurement of real I/O progress.
    pub progress: u8,
}

impl ConversationTurn {
    pub fn new(prompt: &str, selection: &ModelSelection) -> Self {
        static TURN_COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = TURN_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!("turn-{}-{}", n, now_millis()),
            prompt: prompt.to_string(),
            timestamp: now_millis(),
            responses: selection
                .platforms()
                .into_iter()
                .map(NormalizedResponse::pending)
                .collect(),
            analysis_data: None,
            fusion_result: None,
            loading: true,
            completed: false,
            progress: 0,
        }
    }
}

/// Ordered turns sharing a title derived from the first prompt.
/// Session-scoped; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub turns: Vec<ConversationTurn>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Conversation {
    const TITLE_MAX: usize = 48;

    pub fn new(first_prompt: &str) -> Self {
        static CONV_COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = CONV_COUNTER.fetch_add(1, Ordering::Relaxed);
        let now = now_millis();
        Self {
            id: format!("conv-{}-{}", n, now),
            title: derive_title(first_prompt),
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Title = first prompt truncated on a char boundary with an ellipsis.
fn derive_title(prompt: &str) -> String {
    let trimmed = prompt.trim();
    if trimmed.chars().count() <= Conversation::TITLE_MAX {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(Conversation::TITLE_MAX - 1).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_order_is_stable() {
        assert_eq!(Platform::Grok.order_index(), 0);
        assert_eq!(Platform::Claude.order_index(), 1);
        assert_eq!(Platform::Gemini.order_index(), 2);
    }

    #[test]
    fn selection_platforms_follow_canonical_order() {
        let sel = ModelSelection {
            grok: false,
            claude: true,
            gemini: true,
        };
        assert_eq!(sel.platforms(), vec![Platform::Claude, Platform::Gemini]);
    }

    #[test]
    fn settled_response_computes_word_count_and_clamps_confidence() {
        let r = NormalizedResponse::settled(
            Platform::Claude,
            "one two  three".to_string(),
            1.7,
            0.4,
            false,
        );
        assert_eq!(r.word_count, 3);
        assert_eq!(r.confidence, 1.0);
        assert!(!r.loading);
        assert!(r.is_usable());
    }

    #[test]
    fn errored_response_has_empty_content_and_error() {
        let r = NormalizedResponse::errored(Platform::Grok, "rate limited", 1.2);
        assert!(r.content.is_empty());
        assert!(r.error.is_some());
        assert!(!r.is_usable());
    }

    #[test]
    fn long_titles_are_truncated() {
        let t = derive_title(&"word ".repeat(40));
        assert!(t.chars().count() <= Conversation::TITLE_MAX);
        assert!(t.ends_with('…'));
    }
}
