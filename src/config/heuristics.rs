// src/config/heuristics.rs
//! Tunable scoring constants for the text heuristics.
//!
//! The scores produced from these values are presentation-layer
//! approximations (bounded additive adjustments with clamping), not
//! semantic analysis. Keeping them in a TOML file makes the shape the
//! contract and the exact numbers operator-tunable.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

pub const DEFAULT_HEURISTICS_PATH: &str = "config/heuristics.toml";
pub const ENV_HEURISTICS_PATH: &str = "FUSION_HEURISTICS_PATH";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct HeuristicsConfig {
    pub confidence: ConfidenceTuning,
    pub sentiment: SentimentTuning,
    pub keywords: KeywordTuning,
    pub fusion: FusionTuning,
    pub insights: InsightTuning,
}

/// Shared per-response confidence heuristic (applied uniformly across
/// vendors): base + word-count bonuses + vocabulary adjustments, clamped
/// to [0,1].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfidenceTuning {
    pub base: f32,
    /// First word-count threshold and its bonus.
    pub mid_words: usize,
    pub mid_bonus: f32,
    /// Second, higher threshold and its bonus.
    pub long_words: usize,
    pub long_bonus: f32,
    /// Added per certainty-word occurrence.
    pub certainty_step: f32,
    /// Subtracted per hedging-word occurrence.
    pub hedging_step: f32,
}

impl Default for ConfidenceTuning {
    fn default() -> Self {
        Self {
            base: 0.55,
            mid_words: 50,
            mid_bonus: 0.10,
            long_words: 150,
            long_bonus: 0.10,
            certainty_step: 0.02,
            hedging_step: 0.02,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SentimentTuning {
    /// Scale applied to vocabulary hits before length normalization.
    pub hit_scale: f32,
    /// Per-component ceiling; keeps positive+negative ≤ 2×cap < 100.
    pub component_cap: u32,
    /// Word-count floor used in the length-scaled denominator.
    pub min_words: usize,
}

impl Default for SentimentTuning {
    fn default() -> Self {
        Self {
            hit_scale: 400.0,
            component_cap: 45,
            min_words: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeywordTuning {
    pub top_n: usize,
    /// Tokens with length ≤ this are dropped.
    pub min_len: usize,
}

impl Default for KeywordTuning {
    fn default() -> Self {
        Self { top_n: 5, min_len: 3 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FusionTuning {
    /// Delegated-synthesis confidence: fixed base plus bonuses, capped.
    pub delegated_base: f32,
    pub delegated_cap: f32,
    /// Awarded at each of the two content-length thresholds.
    pub length_bonus: f32,
    /// Awarded when the content carries list/heading structure.
    pub structure_bonus: f32,
    /// Awarded per usable source, counted up to three.
    pub per_source_bonus: f32,
    /// Awarded when the content weighs contrasting views.
    pub contrast_bonus: f32,
    /// Awarded when the content ends in something actionable.
    pub actionable_bonus: f32,
    /// Local-synthesis confidence: avg source confidence + nudge, clamped.
    pub local_nudge: f32,
    pub local_floor: f32,
    pub local_ceiling: f32,
}

impl Default for FusionTuning {
    fn default() -> Self {
        Self {
            delegated_base: 0.70,
            delegated_cap: 0.95,
            length_bonus: 0.05,
            structure_bonus: 0.03,
            per_source_bonus: 0.02,
            contrast_bonus: 0.02,
            actionable_bonus: 0.03,
            local_nudge: 0.05,
            local_floor: 0.75,
            local_ceiling: 0.95,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InsightTuning {
    pub min_chars: usize,
    pub max_chars: usize,
    pub max_count: usize,
    /// Near-duplicate threshold for normalized Levenshtein similarity.
    pub dedup_similarity: f64,
}

impl Default for InsightTuning {
    fn default() -> Self {
        Self {
            min_chars: 50,
            max_chars: 150,
            max_count: 4,
            dedup_similarity: 0.85,
        }
    }
}

impl HeuristicsConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)?;
        let cfg: HeuristicsConfig = toml::from_str(&raw)?;
        Ok(cfg)
    }

    /// Resolve the path from `FUSION_HEURISTICS_PATH` (falling back to
    /// `config/heuristics.toml`) and load it; a missing or unparsable file
    /// yields the built-in defaults.
    pub fn load_or_default() -> Self {
        let path = std::env::var(ENV_HEURISTICS_PATH)
            .unwrap_or_else(|_| DEFAULT_HEURISTICS_PATH.to_string());
        match Self::load_from_file(&path) {
            Ok(cfg) => {
                info!(target: "config", %path, "heuristics config loaded");
                cfg
            }
            Err(_) => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_sentiment_components_bounded() {
        let cfg = HeuristicsConfig::default();
        assert!(cfg.sentiment.component_cap * 2 < 100);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg: HeuristicsConfig = toml::from_str(
            r#"
            [confidence]
            base = 0.6

            [keywords]
            top_n = 3

            [fusion]
            structure_bonus = 0.1
            "#,
        )
        .expect("parse partial heuristics");
        assert_eq!(cfg.confidence.base, 0.6);
        assert_eq!(cfg.confidence.mid_words, 50);
        assert_eq!(cfg.keywords.top_n, 3);
        assert_eq!(cfg.fusion.structure_bonus, 0.1);
        assert_eq!(cfg.fusion.local_floor, 0.75);
    }
}
