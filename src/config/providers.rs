// src/config/providers.rs
//! Provider credentials and degraded-mode switches, resolved from the
//! environment once at boot. Keys never leave the server process and are
//! never logged beyond their length.

use serde::Serialize;
use std::env;

use crate::types::Platform;

pub const ENV_CLAUDE_API_KEY: &str = "CLAUDE_API_KEY";
pub const ENV_GROK_API_KEY: &str = "GROK_API_KEY";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";

/// Forces every provider through the offline generator, regardless of
/// credentials. `AI_TEST_MODE=mock` is honored as an alias.
pub const ENV_FORCE_MOCK: &str = "FUSION_FORCE_MOCK";

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProviderSettings {
    #[serde(skip_serializing)]
    pub claude_key: Option<String>,
    #[serde(skip_serializing)]
    pub grok_key: Option<String>,
    #[serde(skip_serializing)]
    pub gemini_key: Option<String>,
    pub force_mock: bool,
}

impl ProviderSettings {
    pub fn from_env() -> Self {
        Self {
            claude_key: plausible_key(env::var(ENV_CLAUDE_API_KEY).ok(), "sk-ant-"),
            grok_key: plausible_key(env::var(ENV_GROK_API_KEY).ok(), "xai-"),
            gemini_key: plausible_key(env::var(ENV_GEMINI_API_KEY).ok(), "AIza"),
            force_mock: mock_forced(),
        }
    }

    pub fn key_for(&self, platform: Platform) -> Option<&str> {
        match platform {
            Platform::Claude => self.claude_key.as_deref(),
            Platform::Grok => self.grok_key.as_deref(),
            Platform::Gemini => self.gemini_key.as_deref(),
        }
    }

    pub fn is_configured(&self, platform: Platform) -> bool {
        self.key_for(platform).is_some()
    }
}

fn mock_forced() -> bool {
    let flag = env::var(ENV_FORCE_MOCK).ok().as_deref() == Some("1");
    let legacy = env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false);
    flag || legacy
}

/// Treat malformed-looking keys as absent: empty strings, placeholder text
/// left in a `.env` template, or keys with the wrong vendor prefix.
fn plausible_key(raw: Option<String>, expected_prefix: &str) -> Option<String> {
    let key = raw?.trim().to_string();
    if key.is_empty() || key.len() < 12 {
        return None;
    }
    let lower = key.to_ascii_lowercase();
    const PLACEHOLDERS: [&str; 5] = ["your-", "your_", "changeme", "xxx", "<"];
    if PLACEHOLDERS.iter().any(|p| lower.starts_with(p)) {
        return None;
    }
    if !key.starts_with(expected_prefix) {
        return None;
    }
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_keys_are_treated_as_absent() {
        assert!(plausible_key(Some("your-api-key-here".into()), "sk-ant-").is_none());
        assert!(plausible_key(Some("<paste key>".into()), "sk-ant-").is_none());
        assert!(plausible_key(Some("".into()), "sk-ant-").is_none());
    }

    #[test]
    fn wrong_prefix_is_treated_as_absent() {
        assert!(plausible_key(Some("sk-openai-abcdef123456".into()), "sk-ant-").is_none());
    }

    #[test]
    fn real_looking_key_passes() {
        let k = plausible_key(Some("sk-ant-abc123def456".into()), "sk-ant-");
        assert_eq!(k.as_deref(), Some("sk-ant-abc123def456"));
    }
}
