// tests/orchestrator_e2e.rs
//
// Full-pipeline turns through the orchestrator with providers forced into
// the offline generator: validate -> fan out -> analytics -> fusion ->
// store. Settings are passed explicitly, so nothing here reads or mutates
// process env.

use prompt_fusion::api::AppState;
use prompt_fusion::config::{HeuristicsConfig, ProviderSettings};
use prompt_fusion::error::OrchestrationError;
use prompt_fusion::types::{ModelSelection, Platform};

fn mock_state() -> AppState {
    let settings = ProviderSettings {
        force_mock: true,
        ..Default::default()
    };
    AppState::build(&settings, HeuristicsConfig::default())
}

#[tokio::test]
async fn full_mock_turn_completes_with_analysis_and_fusion() {
    let state = mock_state();
    let turn = state
        .orchestrator
        .submit("Explain quantum computing", &ModelSelection::all())
        .await
        .expect("turn should run");

    assert!(turn.completed);
    assert!(!turn.loading);
    assert_eq!(turn.progress, 100);
    assert_eq!(turn.responses.len(), 3);

    let platforms: Vec<Platform> = turn.responses.iter().map(|r| r.platform).collect();
    assert_eq!(
        platforms,
        vec![Platform::Grok, Platform::Claude, Platform::Gemini]
    );
    for r in &turn.responses {
        assert!(r.is_mock);
        assert!(r.error.is_none());
        assert!(!r.content.is_empty());
        assert!((0.0..=1.0).contains(&r.confidence));
    }

    let analysis = turn.analysis_data.as_ref().expect("analysis present");
    assert_eq!(analysis.sentiment.len(), 3);
    assert!(analysis.keywords.len() <= 5);

    let fusion = turn.fusion_result.as_ref().expect("fusion present");
    assert!(!fusion.content.is_empty());
    assert!(fusion.confidence < 1.0);
    assert_eq!(fusion.sources.total(), 100);
    assert!(!fusion.key_insights.is_empty() && fusion.key_insights.len() <= 4);
}

#[tokio::test]
async fn empty_prompt_is_rejected_before_any_turn_is_created() {
    let state = mock_state();
    let err = state
        .orchestrator
        .submit("   \t  ", &ModelSelection::all())
        .await
        .expect_err("blank prompt must be rejected");

    match err {
        OrchestrationError::Validation(reasons) => {
            assert!(reasons.iter().any(|r| r.contains("empty")));
        }
        other => panic!("expected validation error, got {other}"),
    }
    assert!(state.orchestrator.store().current_conversation().is_none());
}

#[tokio::test]
async fn zero_selected_models_is_rejected_with_a_clear_reason() {
    let state = mock_state();
    let none = ModelSelection::default();
    let err = state
        .orchestrator
        .submit("hello", &none)
        .await
        .expect_err("empty selection must be rejected");
    assert!(err
        .reasons()
        .iter()
        .any(|r| r.contains("at least one model")));
}

#[tokio::test]
async fn oversized_prompt_is_rejected() {
    let state = mock_state();
    let prompt = "x".repeat(2001);
    let err = state
        .orchestrator
        .submit(&prompt, &ModelSelection::all())
        .await
        .expect_err("oversized prompt must be rejected");
    assert!(err.reasons().iter().any(|r| r.contains("2000")));
}

#[tokio::test]
async fn injection_patterns_are_rejected_not_sanitized_away() {
    let state = mock_state();
    let err = state
        .orchestrator
        .submit("hello <script>alert(1)</script>", &ModelSelection::all())
        .await
        .expect_err("script tags must be rejected");
    assert!(matches!(err, OrchestrationError::Validation(_)));
}

#[tokio::test]
async fn missing_credentials_degrade_every_provider_to_mock() {
    // No keys and mock mode NOT forced: the fallback decision alone must
    // keep the turn usable.
    let state = AppState::build(&ProviderSettings::default(), HeuristicsConfig::default());
    let turn = state
        .orchestrator
        .submit("What is Rust?", &ModelSelection::all())
        .await
        .expect("turn should run");

    assert!(turn.completed);
    assert_eq!(turn.responses.len(), 3);
    for r in &turn.responses {
        assert!(r.is_mock, "{} should be mocked", r.platform);
        assert!(!r.content.is_empty());
    }
}

#[tokio::test]
async fn subset_selection_produces_one_response_per_selected_model() {
    let state = mock_state();
    let selection = ModelSelection {
        grok: true,
        claude: false,
        gemini: true,
    };
    let turn = state
        .orchestrator
        .submit("Compare two things", &selection)
        .await
        .expect("turn should run");

    assert_eq!(turn.responses.len(), 2);
    assert_eq!(turn.responses[0].platform, Platform::Grok);
    assert_eq!(turn.responses[1].platform, Platform::Gemini);
}

#[tokio::test]
async fn turns_accumulate_in_one_conversation_and_history_records_prompts() {
    let state = mock_state();
    for prompt in ["first question", "second question", "first question"] {
        state
            .orchestrator
            .submit(prompt, &ModelSelection::all())
            .await
            .expect("turn should run");
    }

    let conversation = state
        .orchestrator
        .store()
        .current_conversation()
        .expect("conversation exists");
    assert_eq!(conversation.turns.len(), 3);
    assert!(conversation.title.starts_with("first question"));

    // Deduplicated, newest first.
    let history = state.orchestrator.store().query_history();
    assert_eq!(history, vec!["first question", "second question"]);
}

#[tokio::test]
async fn new_conversation_archives_the_current_one() {
    let state = mock_state();
    state
        .orchestrator
        .submit("before the reset", &ModelSelection::all())
        .await
        .expect("turn should run");

    state.orchestrator.store().start_new_conversation();
    assert!(state.orchestrator.store().current_conversation().is_none());
    assert_eq!(state.orchestrator.store().conversation_history().len(), 1);

    state
        .orchestrator
        .submit("after the reset", &ModelSelection::all())
        .await
        .expect("turn should run");
    let current = state
        .orchestrator
        .store()
        .current_conversation()
        .expect("fresh conversation");
    assert_eq!(current.turns.len(), 1);
}

#[tokio::test]
async fn identical_prompts_produce_identical_mock_turns() {
    let state = mock_state();
    let a = state
        .orchestrator
        .submit("determinism check", &ModelSelection::all())
        .await
        .expect("turn a");
    let b = state
        .orchestrator
        .submit("determinism check", &ModelSelection::all())
        .await
        .expect("turn b");

    for (ra, rb) in a.responses.iter().zip(&b.responses) {
        assert_eq!(ra.content, rb.content);
        assert_eq!(ra.confidence, rb.confidence);
    }
}
