// src/providers/mock.rs
//! Offline response generator for degraded mode. Deterministic: the output
//! is seeded from (platform, prompt) with a plain `DefaultHasher`, so the
//! same input always fabricates the same text, confidence, and timing.
//! Every generated record carries `is_mock = true`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::types::{NormalizedResponse, Platform};

/// Bounded fabricated values: confidence in [0.70, 0.90], response time
/// in [0.8, 2.8] seconds.
const CONF_FLOOR: f32 = 0.70;
const CONF_SPAN: f32 = 0.20;
const TIME_FLOOR: f64 = 0.8;
const TIME_SPAN: f64 = 2.0;

#[derive(Debug, Clone, Default)]
pub struct MockGenerator;

impl MockGenerator {
    pub fn generate(&self, platform: Platform, prompt: &str) -> NormalizedResponse {
        let seed = seed_for(platform, prompt);
        let topic = topic_of(prompt);

        let angle = match platform {
            Platform::Grok => "a direct, first-principles take",
            Platform::Claude => "a structured, carefully reasoned walkthrough",
            Platform::Gemini => "a comparison of the main approaches",
        };

        let content = format!(
            "## {topic}\n\n\
             Here is {angle} on \"{topic}\" (offline mode).\n\n\
             - The key factor is how {topic} is framed: start from the core \
               definition before touching edge cases.\n\
             - It is essential to separate what is established from what is \
               still debated; treat secondary sources with care.\n\
             - A critical next step is validating assumptions against a \
               concrete example before generalizing.\n\n\
             **Summary**: this is a fabricated {platform} response generated \
             without network access; enable an API key for live answers."
        );

        let confidence = CONF_FLOOR + CONF_SPAN * unit_f32(seed);
        let response_time = TIME_FLOOR + TIME_SPAN * unit_f32(seed.rotate_left(17)) as f64;

        NormalizedResponse::settled(platform, content, confidence, response_time, true)
    }
}

fn seed_for(platform: Platform, prompt: &str) -> u64 {
    let mut h = DefaultHasher::new();
    platform.as_str().hash(&mut h);
    prompt.hash(&mut h);
    h.finish()
}

/// Map a seed to [0,1).
fn unit_f32(seed: u64) -> f32 {
    (seed % 10_000) as f32 / 10_000.0
}

/// First few words of the prompt, used as a fabricated headline.
fn topic_of(prompt: &str) -> String {
    let words: Vec<&str> = prompt.split_whitespace().take(6).collect();
    if words.is_empty() {
        "the question".to_string()
    } else {
        words.join(" ")
    }
}
