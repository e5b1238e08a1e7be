// src/analytics.rs
//! Analytics extractor: descriptive text statistics over one turn's
//! normalized responses. Pure and deterministic — identical input yields
//! byte-identical output — so everything here is unit-testable without I/O.
//!
//! These are heuristic word counts, not semantic analysis.

use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashSet};

use crate::config::HeuristicsConfig;
use crate::types::{
    AnalysisData, DifferentiationMetrics, EfficiencyMetrics, KeywordEntry, NormalizedResponse,
    PlatformSentiment, QualityMetrics, RiskMetrics,
};

// ---------------------------------------------------------------
// Fixed vocabularies (substring-matched, lowercase)
// ---------------------------------------------------------------

pub(crate) const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "effective", "benefit", "improve", "advantage", "success",
    "strong", "reliable", "robust", "efficient", "valuable", "promising", "clear",
];

pub(crate) const NEGATIVE_WORDS: &[&str] = &[
    "bad", "poor", "fail", "risk", "problem", "difficult", "weak", "limitation", "drawback",
    "concern", "danger", "flaw", "costly", "uncertain", "error",
];

pub(crate) const HEDGING_WORDS: &[&str] = &[
    "maybe", "perhaps", "might", "possibly", "probably", "could be", "it seems", "likely",
    "unclear", "uncertain", "arguably", "roughly",
];

pub(crate) const CERTAINTY_WORDS: &[&str] = &[
    "definitely", "certainly", "clearly", "precisely", "exactly", "proven", "established",
    "always", "undoubtedly",
];

pub(crate) const CONTRAST_WORDS: &[&str] = &[
    "however", "but", "although", "on the other hand", "conversely", "nevertheless",
    "in contrast", "whereas",
];

pub(crate) const ORIGINALITY_WORDS: &[&str] = &[
    "novel", "unique", "unconventional", "surprisingly", "rarely", "alternative",
    "counterintuitive",
];

pub(crate) const ACTIONABLE_WORDS: &[&str] = &[
    "recommend", "should", "consider", "step", "start by", "in practice", "concretely",
    "actionable",
];

/// Citation-style markers used by the hallucination heuristic.
const CITATION_WORDS: &[&str] = &["according to", "source:", "cited", "study", "reference"];

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "this", "that", "with", "from", "have", "will", "your", "they", "them", "then", "than",
        "what", "when", "where", "which", "while", "would", "could", "should", "there", "their",
        "about", "into", "over", "more", "most", "some", "such", "very", "also", "been", "being",
        "because", "between", "through", "each", "other", "these", "those", "does", "done",
        "here", "just", "like", "make", "many", "much", "only", "same", "using", "used",
    ]
    .into_iter()
    .collect()
});

// ---------------------------------------------------------------
// Shared text helpers
// ---------------------------------------------------------------

/// Alphanumeric tokens, lowercase.
pub(crate) fn tokenize(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
        .collect()
}

/// Total occurrences of any vocabulary entry in `lower` (substring match).
pub(crate) fn count_vocab_hits(lower: &str, vocab: &[&str]) -> usize {
    vocab.iter().map(|w| lower.matches(w).count()).sum()
}

// ---------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------

/// Derive `AnalysisData` from one turn's responses. Rows are emitted in the
/// input (canonical platform) order; errored responses contribute empty
/// text, which degrades to neutral/base scores rather than being skipped.
pub fn extract(responses: &[NormalizedResponse], cfg: &HeuristicsConfig) -> AnalysisData {
    AnalysisData {
        sentiment: responses.iter().map(|r| sentiment_of(r, cfg)).collect(),
        keywords: keywords_of(responses, cfg),
        quality: responses
            .iter()
            .map(|r| QualityMetrics {
                platform: r.platform,
                confidence: r.confidence,
                response_time: r.response_time,
                word_count: r.word_count,
            })
            .collect(),
        efficiency: responses.iter().map(efficiency_of).collect(),
        risk: responses.iter().map(risk_of).collect(),
        differentiation: responses.iter().map(differentiation_of).collect(),
    }
}

/// Positive/negative from vocabulary hits normalized by a length-scaled
/// denominator; each component capped so the pair never exceeds 100;
/// neutral takes the remainder (floored at 0 by construction).
fn sentiment_of(r: &NormalizedResponse, cfg: &HeuristicsConfig) -> PlatformSentiment {
    let lower = r.content.to_lowercase();
    let words = crate::types::count_words(&r.content).max(cfg.sentiment.min_words);

    let component = |hits: usize| -> u32 {
        let raw = (hits as f32 * cfg.sentiment.hit_scale / words as f32).round();
        (raw.max(0.0) as u32).min(cfg.sentiment.component_cap)
    };

    let positive = component(count_vocab_hits(&lower, POSITIVE_WORDS));
    let negative = component(count_vocab_hits(&lower, NEGATIVE_WORDS));
    let neutral = 100u32.saturating_sub(positive + negative);

    PlatformSentiment {
        platform: r.platform,
        positive,
        neutral,
        negative,
    }
}

/// Top-N keywords: tokens longer than `min_len`, not stop words,
/// deduplicated per response, tallied per platform, ranked by total with
/// an alphabetical tie-break for determinism.
fn keywords_of(responses: &[NormalizedResponse], cfg: &HeuristicsConfig) -> Vec<KeywordEntry> {
    let mut tally: BTreeMap<String, [u32; 3]> = BTreeMap::new();

    for r in responses {
        let unique: HashSet<String> = tokenize(&r.content)
            .into_iter()
            .filter(|t| t.len() > cfg.keywords.min_len && !STOP_WORDS.contains(t.as_str()))
            .collect();
        let idx = r.platform.order_index();
        for word in unique {
            tally.entry(word).or_default()[idx] += 1;
        }
    }

    let mut entries: Vec<KeywordEntry> = tally
        .into_iter()
        .map(|(word, counts)| KeywordEntry {
            word,
            grok: counts[0],
            claude: counts[1],
            gemini: counts[2],
            total: counts.iter().sum(),
        })
        .collect();

    entries.sort_by(|a, b| b.total.cmp(&a.total).then(a.word.cmp(&b.word)));
    entries.truncate(cfg.keywords.top_n);
    entries
}

/// Conciseness: distance of the average sentence length from an ~15-word
/// optimum, clamped [10,100]. Redundancy: repeated-vocabulary share,
/// clamped [0,50].
fn efficiency_of(r: &NormalizedResponse) -> EfficiencyMetrics {
    const OPTIMAL_SENTENCE_WORDS: f32 = 15.0;

    let tokens = tokenize(&r.content);
    let sentences = r
        .content
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count()
        .max(1);
    let avg_len = tokens.len() as f32 / sentences as f32;
    let conciseness = (100.0 - (avg_len - OPTIMAL_SENTENCE_WORDS).abs() * 4.0).clamp(10.0, 100.0);

    let unique: HashSet<&String> = tokens.iter().collect();
    let ratio = if tokens.is_empty() {
        1.0
    } else {
        unique.len() as f32 / tokens.len() as f32
    };
    let redundancy = ((1.0 - ratio) * 100.0).clamp(0.0, 50.0);

    EfficiencyMetrics {
        platform: r.platform,
        conciseness: conciseness.round() as u32,
        redundancy: redundancy.round() as u32,
    }
}

/// Hedging score falls with hedge-word frequency (clamped [50,100]);
/// contradictions rise with contrast words ([0,50]); hallucination falls
/// with structural/citation markers ([5,40]).
fn risk_of(r: &NormalizedResponse) -> RiskMetrics {
    let lower = r.content.to_lowercase();

    let hedge_hits = count_vocab_hits(&lower, HEDGING_WORDS) as f32;
    let hedging = (100.0 - hedge_hits * 8.0).clamp(50.0, 100.0);

    let contrast_hits = count_vocab_hits(&lower, CONTRAST_WORDS) as f32;
    let contradictions = (contrast_hits * 10.0).clamp(0.0, 50.0);

    let markers = structure_markers(&r.content) + count_vocab_hits(&lower, CITATION_WORDS);
    let hallucination = (40.0 - markers as f32 * 5.0).clamp(5.0, 40.0);

    RiskMetrics {
        platform: r.platform,
        hedging: hedging.round() as u32,
        contradictions: contradictions.round() as u32,
        hallucination: hallucination.round() as u32,
    }
}

/// Lines that look like bullets, numbered items, or headings.
fn structure_markers(text: &str) -> usize {
    text.lines()
        .filter(|l| {
            let t = l.trim_start();
            t.starts_with('-')
                || t.starts_with('*')
                || t.starts_with('#')
                || t.chars().next().is_some_and(|c| c.is_ascii_digit()) && t.contains(". ")
        })
        .count()
}

/// Base scores bumped by small fixed increments per vocabulary hit,
/// each clamped to [0,100].
fn differentiation_of(r: &NormalizedResponse) -> DifferentiationMetrics {
    let lower = r.content.to_lowercase();

    let bump = |base: f32, hits: usize, step: f32| -> u32 {
        (base + hits as f32 * step).clamp(0.0, 100.0).round() as u32
    };

    DifferentiationMetrics {
        platform: r.platform,
        originality: bump(50.0, count_vocab_hits(&lower, ORIGINALITY_WORDS), 6.0),
        divergence: bump(55.0, count_vocab_hits(&lower, CONTRAST_WORDS), 5.0),
        contribution: bump(60.0, count_vocab_hits(&lower, ACTIONABLE_WORDS), 4.0),
    }
}
