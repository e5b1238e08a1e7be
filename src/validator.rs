// src/validator.rs
//! Request validator: every rule is checked and every violation collected
//! before the caller sees the result; sanitization runs only on valid
//! input. Nothing here touches the network.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::ModelSelection;

pub const MAX_PROMPT_CHARS: usize = 2000;

/// Patterns we reject outright instead of stripping: stripping an injection
/// attempt and continuing would hide the signal from the caller.
static BLOCKED_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"(?is)<\s*script\b").expect("script-tag pattern"),
            "prompt contains a script tag",
        ),
        (
            Regex::new(r"(?i)javascript\s*:").expect("javascript-uri pattern"),
            "prompt contains a javascript: URI",
        ),
        (
            Regex::new(r"(?i)vbscript\s*:").expect("vbscript-uri pattern"),
            "prompt contains a vbscript: URI",
        ),
        (
            Regex::new(r#"(?i)\bon\w+\s*="#).expect("event-handler pattern"),
            "prompt contains an inline event handler",
        ),
    ]
});

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("tag pattern"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub errors: Vec<String>,
    /// Present only when `is_valid`.
    pub sanitized_prompt: Option<String>,
}

/// Validate a raw prompt and a model selection. All violations are
/// collected (no short-circuit); sanitization only runs on valid input.
pub fn validate(prompt: &str, selection: &ModelSelection) -> ValidationOutcome {
    let mut errors = Vec::new();

    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        errors.push("prompt must not be empty".to_string());
    } else if trimmed.chars().count() > MAX_PROMPT_CHARS {
        errors.push(format!(
            "prompt exceeds the {MAX_PROMPT_CHARS}-character limit"
        ));
    }

    for (pattern, reason) in BLOCKED_PATTERNS.iter() {
        if pattern.is_match(prompt) {
            errors.push((*reason).to_string());
        }
    }

    if !selection.any() {
        errors.push("at least one model must be selected".to_string());
    }

    if !errors.is_empty() {
        return ValidationOutcome {
            is_valid: false,
            errors,
            sanitized_prompt: None,
        };
    }

    ValidationOutcome {
        is_valid: true,
        errors,
        sanitized_prompt: Some(sanitize(trimmed)),
    }
}

/// Normalize valid input: decode HTML entities, strip tags, drop the
/// characters `<>"'`, collapse whitespace runs, trim.
pub fn sanitize(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();
    out = RE_TAGS.replace_all(&out, "").to_string();
    out.retain(|c| !matches!(c, '<' | '>' | '"' | '\''));
    out = RE_WS.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_models() -> ModelSelection {
        ModelSelection::all()
    }

    #[test]
    fn valid_prompt_is_sanitized() {
        let out = validate("  Explain <b>quantum</b>   computing  ", &all_models());
        assert!(out.is_valid, "errors: {:?}", out.errors);
        assert_eq!(
            out.sanitized_prompt.as_deref(),
            Some("Explain quantum computing")
        );
    }

    #[test]
    fn sanitize_strips_angle_brackets_and_quotes() {
        assert_eq!(sanitize(r#"a "b" 'c' <d>"#), "a b c");
    }

    #[test]
    fn empty_and_whitespace_prompts_are_rejected() {
        for p in ["", "   ", "\n\t"] {
            let out = validate(p, &all_models());
            assert!(!out.is_valid);
            assert!(out.errors.iter().any(|e| e.contains("empty")), "{p:?}");
            assert!(out.sanitized_prompt.is_none());
        }
    }

    #[test]
    fn oversized_prompt_is_rejected() {
        let long = "a".repeat(MAX_PROMPT_CHARS + 1);
        let out = validate(&long, &all_models());
        assert!(!out.is_valid);
        assert!(out.errors.iter().any(|e| e.contains("2000")));
    }

    #[test]
    fn boundary_length_is_accepted() {
        let exact = "a".repeat(MAX_PROMPT_CHARS);
        assert!(validate(&exact, &all_models()).is_valid);
    }

    #[test]
    fn dangerous_patterns_are_rejected_not_stripped() {
        let cases = [
            "<script>alert(1)</script>",
            "click javascript:alert(1)",
            "VBSCRIPT: nope",
            r#"<img onerror="x">"#,
        ];
        for p in cases {
            let out = validate(p, &all_models());
            assert!(!out.is_valid, "should reject {p:?}");
            assert!(out.sanitized_prompt.is_none());
        }
    }

    #[test]
    fn zero_selected_models_is_rejected() {
        let out = validate("hello world", &ModelSelection::default());
        assert!(!out.is_valid);
        assert!(out
            .errors
            .iter()
            .any(|e| e.contains("at least one model")));
    }

    #[test]
    fn violations_are_collected_not_short_circuited() {
        let out = validate("<script>x</script>", &ModelSelection::default());
        assert!(out.errors.len() >= 2, "got {:?}", out.errors);
    }
}
