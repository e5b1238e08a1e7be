// src/fusion.rs
//! Fusion synthesizer: merges one turn's normalized responses into a single
//! attributed answer. Two strategies: delegated (one secondary LLM call)
//! with a local deterministic fallback that can never fail the turn.

use std::sync::Arc;

use strsim::normalized_levenshtein;
use tracing::debug;

use crate::analytics::{count_vocab_hits, ACTIONABLE_WORDS, CONTRAST_WORDS};
use crate::config::HeuristicsConfig;
use crate::providers::claude::{ClaudeAdapter, Completion};
use crate::types::{FusionResult, NormalizedResponse, Platform, SourceAttribution};

/// Markers that qualify a sentence as a key insight.
const IMPORTANCE_MARKERS: &[&str] = &[
    "key", "critical", "essential", "important", "must", "vital", "significant", "fundamental",
];

/// Generic insights used to pad the list when extraction finds fewer than
/// the configured count.
const FALLBACK_INSIGHTS: &[&str] = &[
    "Multiple models converge on the main recommendation.",
    "Responses differ in depth; compare the source answers for nuance.",
    "Verify time-sensitive claims against a primary source.",
    "Confidence scores are text heuristics, not ground truth.",
];

/// Optional delegated-synthesis collaborator. `None` means the delegate is
/// unavailable or failed; the caller then falls back to local synthesis.
#[async_trait::async_trait]
pub trait SynthesisClient: Send + Sync {
    async fn synthesize(&self, prompt: &str) -> Option<Completion>;
    fn name(&self) -> &'static str;
}

/// Used when no delegate is configured; every fusion goes local.
pub struct DisabledSynthesis;

#[async_trait::async_trait]
impl SynthesisClient for DisabledSynthesis {
    async fn synthesize(&self, _prompt: &str) -> Option<Completion> {
        None
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Delegated synthesis over the Claude adapter's transport.
pub struct ClaudeSynthesis {
    adapter: Arc<ClaudeAdapter>,
}

impl ClaudeSynthesis {
    pub fn new(adapter: Arc<ClaudeAdapter>) -> Self {
        Self { adapter }
    }
}

#[async_trait::async_trait]
impl SynthesisClient for ClaudeSynthesis {
    async fn synthesize(&self, prompt: &str) -> Option<Completion> {
        self.adapter.complete(prompt, Some(2048)).await.ok()
    }
    fn name(&self) -> &'static str {
        "claude"
    }
}

pub struct FusionSynthesizer {
    client: Arc<dyn SynthesisClient>,
    cfg: Arc<HeuristicsConfig>,
}

impl FusionSynthesizer {
    pub fn new(client: Arc<dyn SynthesisClient>, cfg: Arc<HeuristicsConfig>) -> Self {
        Self { client, cfg }
    }

    /// Produce one `FusionResult`. A delegate failure is recovered here,
    /// never surfaced to the turn.
    pub async fn fuse(&self, prompt: &str, responses: &[NormalizedResponse]) -> FusionResult {
        let usable: Vec<&NormalizedResponse> =
            responses.iter().filter(|r| r.is_usable()).collect();
        let sources = attribution(responses);
        let key_insights = extract_insights(&usable, &self.cfg);

        if !usable.is_empty() {
            let delegate_prompt = build_delegate_prompt(prompt, &usable);
            if let Some(completion) = self.client.synthesize(&delegate_prompt).await {
                let confidence = self.delegated_confidence(&completion.text, usable.len());
                return FusionResult {
                    content: completion.text,
                    confidence,
                    sources,
                    key_insights,
                    strategy: "delegated".to_string(),
                };
            }
            debug!(target: "fusion", client = self.client.name(), "delegate unavailable, going local");
        }

        self.local_synthesis(prompt, &usable, sources, key_insights)
    }

    /// Fixed base + content-length bonuses + structure bonus + small
    /// per-source bonus + balance/actionable bonuses, capped below 1.0.
    /// All increments come from `FusionTuning`.
    fn delegated_confidence(&self, content: &str, source_count: usize) -> f32 {
        let t = &self.cfg.fusion;
        let lower = content.to_lowercase();
        let mut score = t.delegated_base;
        if content.len() > 500 {
            score += t.length_bonus;
        }
        if content.len() > 1500 {
            score += t.length_bonus;
        }
        if content.lines().any(|l| {
            let l = l.trim_start();
            l.starts_with('-') || l.starts_with('#') || l.starts_with("1.")
        }) {
            score += t.structure_bonus;
        }
        score += t.per_source_bonus * source_count.min(3) as f32;
        if count_vocab_hits(&lower, CONTRAST_WORDS) > 0 {
            score += t.contrast_bonus;
        }
        if count_vocab_hits(&lower, ACTIONABLE_WORDS) > 0 {
            score += t.actionable_bonus;
        }
        score.min(t.delegated_cap)
    }

    /// Deterministic fallback: first paragraph of each usable response plus
    /// a fixed recommendation block. Confidence = average source confidence
    /// nudged upward, clamped to the configured band.
    fn local_synthesis(
        &self,
        prompt: &str,
        usable: &[&NormalizedResponse],
        sources: SourceAttribution,
        key_insights: Vec<String>,
    ) -> FusionResult {
        let t = &self.cfg.fusion;

        let content = if usable.is_empty() {
            format!(
                "## Synthesis\n\nNo provider produced an answer for \"{prompt}\". \
                 Check provider credentials and try again."
            )
        } else {
            let mut parts = vec![format!(
                "## Synthesis of {} model response{}\n",
                usable.len(),
                if usable.len() == 1 { "" } else { "s" }
            )];
            for r in usable {
                parts.push(format!("**{}**: {}\n", r.platform, first_paragraph(&r.content)));
            }
            parts.push(
                "**Recommendation**: the answers above broadly agree on the core; \
                 where they diverge, weigh the higher-confidence source first and \
                 verify specifics before acting."
                    .to_string(),
            );
            parts.join("\n")
        };

        let confidence = if usable.is_empty() {
            t.local_floor
        } else {
            let avg: f32 =
                usable.iter().map(|r| r.confidence).sum::<f32>() / usable.len() as f32;
            (avg + t.local_nudge).clamp(t.local_floor, t.local_ceiling)
        };

        FusionResult {
            content,
            confidence,
            sources,
            key_insights,
            strategy: "local".to_string(),
        }
    }
}

/// One prompt embedding the original question and every usable response
/// labeled by platform, asking the delegate for a unified answer.
fn build_delegate_prompt(prompt: &str, usable: &[&NormalizedResponse]) -> String {
    let mut out = format!(
        "You are merging answers from several AI assistants into one.\n\n\
         Original question: {prompt}\n\n"
    );
    for r in usable {
        out.push_str(&format!("--- Answer from {} ---\n{}\n\n", r.platform, r.content));
    }
    out.push_str(
        "Write a single unified answer that combines the strongest points, \
         notes real disagreements, and ends with a short recommendation.",
    );
    out
}

/// Attribution: weight each platform by `word_count × confidence`,
/// normalize to integer percentages, then force the sum to exactly 100 by
/// adjusting the largest contributor. Errored platforms weigh zero; when
/// nothing is usable the split is even with the drift on the first slot.
pub fn attribution(responses: &[NormalizedResponse]) -> SourceAttribution {
    let weight_of = |p: Platform| -> f64 {
        responses
            .iter()
            .find(|r| r.platform == p && r.is_usable())
            .map(|r| r.word_count as f64 * r.confidence as f64)
            .unwrap_or(0.0)
    };

    let weights: Vec<(Platform, f64)> =
        Platform::ALL.iter().map(|&p| (p, weight_of(p))).collect();
    let total: f64 = weights.iter().map(|(_, w)| w).sum();

    let mut attr = SourceAttribution::default();
    if total <= 0.0 {
        let even = 100 / Platform::ALL.len() as u32;
        for (p, _) in &weights {
            attr.set(*p, even);
        }
        let first = weights[0].0;
        attr.set(first, attr.get(first) + (100 - even * Platform::ALL.len() as u32));
        return attr;
    }

    for (p, w) in &weights {
        attr.set(*p, ((w / total) * 100.0).round() as u32);
    }

    // Rounding drift goes to the largest contributor.
    let largest = weights
        .iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(p, _)| *p)
        .unwrap_or(Platform::Grok);
    let sum = attr.total() as i64;
    let corrected = attr.get(largest) as i64 + (100 - sum);
    attr.set(largest, corrected.max(0) as u32);
    attr
}

/// First non-empty paragraph, for the local synthesis digest.
fn first_paragraph(text: &str) -> String {
    text.split("\n\n")
        .map(str::trim)
        .find(|p| !p.is_empty())
        .unwrap_or("")
        .to_string()
}

/// Sentences of 50–150 chars containing an importance marker, leading
/// bullet/heading markup stripped, near-duplicates filtered, first N kept,
/// padded from the fixed fallbacks.
fn extract_insights(usable: &[&NormalizedResponse], cfg: &HeuristicsConfig) -> Vec<String> {
    let t = &cfg.insights;
    let mut out: Vec<String> = Vec::new();

    'outer: for r in usable {
        for raw in r.content.split(['.', '!', '?', '\n']) {
            let sentence = strip_markup(raw.trim());
            let len = sentence.chars().count();
            if len < t.min_chars || len > t.max_chars {
                continue;
            }
            let lower = sentence.to_lowercase();
            if !IMPORTANCE_MARKERS.iter().any(|m| lower.contains(m)) {
                continue;
            }
            let duplicate = out.iter().any(|seen| {
                let seen_lower = seen.to_lowercase();
                seen_lower == lower
                    || normalized_levenshtein(&seen_lower, &lower) > t.dedup_similarity
            });
            if duplicate {
                continue;
            }
            out.push(sentence);
            if out.len() >= t.max_count {
                break 'outer;
            }
        }
    }

    for fallback in FALLBACK_INSIGHTS {
        if out.len() >= t.max_count {
            break;
        }
        if !out.iter().any(|s| s == fallback) {
            out.push((*fallback).to_string());
        }
    }
    out.truncate(t.max_count);
    out
}

/// Strip leading bullet/heading markup and bold markers.
fn strip_markup(s: &str) -> String {
    let mut t = s.trim_start_matches(['-', '*', '#', '•', ' ']).trim();
    // numbered items: "3. foo"
    if let Some(rest) = t
        .split_once(". ")
        .filter(|(n, _)| n.chars().all(|c| c.is_ascii_digit()) && !n.is_empty())
        .map(|(_, rest)| rest)
    {
        t = rest;
    }
    t.replace("**", "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NormalizedResponse, UsageInfo};

    fn resp(platform: Platform, content: &str, confidence: f32) -> NormalizedResponse {
        NormalizedResponse::settled(platform, content.to_string(), confidence, 1.0, false)
    }

    /// Delegate that always answers with a fixed completion.
    struct FixedSynthesis(String);

    #[async_trait::async_trait]
    impl SynthesisClient for FixedSynthesis {
        async fn synthesize(&self, _prompt: &str) -> Option<Completion> {
            Some(Completion {
                text: self.0.clone(),
                usage: UsageInfo::default(),
                model: "fixed".to_string(),
            })
        }
        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn synthesizer() -> FusionSynthesizer {
        FusionSynthesizer::new(
            Arc::new(DisabledSynthesis),
            Arc::new(HeuristicsConfig::default()),
        )
    }

    #[test]
    fn attribution_sums_to_exactly_100() {
        let cases = vec![
            vec![
                resp(Platform::Grok, &"w ".repeat(120), 0.9),
                resp(Platform::Claude, &"w ".repeat(45), 0.7),
                resp(Platform::Gemini, &"w ".repeat(77), 0.61),
            ],
            vec![
                resp(Platform::Grok, "short answer here", 0.5),
                NormalizedResponse::errored(Platform::Claude, "down", 0.1),
                resp(Platform::Gemini, &"w ".repeat(300), 0.99),
            ],
            vec![
                NormalizedResponse::errored(Platform::Grok, "down", 0.1),
                NormalizedResponse::errored(Platform::Claude, "down", 0.1),
                NormalizedResponse::errored(Platform::Gemini, "down", 0.1),
            ],
        ];
        for rs in cases {
            let attr = attribution(&rs);
            assert_eq!(attr.grok + attr.claude + attr.gemini, 100, "{attr:?}");
        }
    }

    #[test]
    fn errored_platform_gets_zero_attribution() {
        let rs = vec![
            resp(Platform::Grok, &"w ".repeat(100), 0.9),
            NormalizedResponse::errored(Platform::Claude, "down", 0.1),
            resp(Platform::Gemini, &"w ".repeat(100), 0.9),
        ];
        let attr = attribution(&rs);
        assert_eq!(attr.claude, 0);
        assert_eq!(attr.total(), 100);
    }

    #[tokio::test]
    async fn delegated_confidence_follows_the_configured_bonuses() {
        // Long, structured text so every bonus fires.
        let completion = "- a structured point about the question\n".repeat(20);
        let rs = vec![
            resp(Platform::Grok, &"answer ".repeat(30), 0.8),
            resp(Platform::Claude, &"answer ".repeat(30), 0.8),
        ];

        let fuse_with = |cfg: HeuristicsConfig| {
            let s = FusionSynthesizer::new(
                Arc::new(FixedSynthesis(completion.clone())),
                Arc::new(cfg),
            );
            let rs = rs.clone();
            async move { s.fuse("question", &rs).await }
        };

        let default = fuse_with(HeuristicsConfig::default()).await;
        assert_eq!(default.strategy, "delegated");

        let mut zeroed_cfg = HeuristicsConfig::default();
        zeroed_cfg.fusion.length_bonus = 0.0;
        zeroed_cfg.fusion.structure_bonus = 0.0;
        zeroed_cfg.fusion.per_source_bonus = 0.0;
        let zeroed = fuse_with(zeroed_cfg).await;
        assert_eq!(zeroed.strategy, "delegated");

        assert!(default.confidence > zeroed.confidence);
        assert!(default.confidence <= HeuristicsConfig::default().fusion.delegated_cap);
    }

    #[tokio::test]
    async fn local_fusion_confidence_stays_in_band() {
        let s = synthesizer();
        let rs = vec![
            resp(Platform::Grok, &"answer ".repeat(40), 0.2),
            resp(Platform::Claude, &"answer ".repeat(40), 0.3),
        ];
        let f = s.fuse("question", &rs).await;
        assert_eq!(f.strategy, "local");
        assert!((0.75..=0.95).contains(&f.confidence), "{}", f.confidence);
        assert!(f.content.contains("Synthesis of 2"));
    }

    #[tokio::test]
    async fn fusion_with_no_usable_sources_still_produces_a_result() {
        let s = synthesizer();
        let rs = vec![
            NormalizedResponse::errored(Platform::Grok, "down", 0.1),
            NormalizedResponse::errored(Platform::Claude, "down", 0.1),
            NormalizedResponse::errored(Platform::Gemini, "down", 0.1),
        ];
        let f = s.fuse("question", &rs).await;
        assert!(!f.content.is_empty());
        assert_eq!(f.sources.total(), 100);
        assert_eq!(f.key_insights.len(), 4);
    }

    #[tokio::test]
    async fn insights_are_capped_extracted_and_padded() {
        let s = synthesizer();
        let content = "\
- The key point is that qubits are fragile and need error correction to scale up.\n\
- It is critical to distinguish logical qubits from physical qubits in any roadmap.\n\
Some filler text without markers.\n";
        let rs = vec![resp(Platform::Claude, content, 0.8)];
        let f = s.fuse("question", &rs).await;
        assert_eq!(f.key_insights.len(), 4);
        assert!(f.key_insights[0].contains("key point"));
        assert!(!f.key_insights[0].starts_with('-'));
        // padded from fallbacks
        assert!(f
            .key_insights
            .iter()
            .any(|i| FALLBACK_INSIGHTS.contains(&i.as_str())));
    }

    #[test]
    fn near_duplicate_insights_are_filtered() {
        let cfg = HeuristicsConfig::default();
        let a = resp(
            Platform::Grok,
            "The key takeaway is that error correction dominates the cost of scaling.",
            0.8,
        );
        let b = resp(
            Platform::Claude,
            "The key takeaway is that error correction dominates the cost of scaling!",
            0.8,
        );
        let out = extract_insights(&[&a, &b], &cfg);
        let extracted: Vec<&String> = out
            .iter()
            .filter(|s| s.contains("error correction"))
            .collect();
        assert_eq!(extracted.len(), 1);
    }

    #[test]
    fn strip_markup_handles_bullets_and_numbers() {
        assert_eq!(strip_markup("- **Bold** point"), "Bold point");
        assert_eq!(strip_markup("3. numbered item"), "numbered item");
        assert_eq!(strip_markup("## heading text"), "heading text");
    }
}
