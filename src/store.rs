// src/store.rs
//! In-memory conversation state. An explicit, injectable container rather
//! than a module-level singleton, so every test can own an isolated store.
//!
//! All turn mutations replace the whole turn record under the lock
//! (copy-on-write); interleaved completions of sibling async work can
//! never partially overwrite each other's fields.

use std::sync::Mutex;

use crate::error::OrchestrationError;
use crate::types::{
    AnalysisData, Conversation, ConversationTurn, FusionResult, ModelSelection,
    NormalizedResponse, now_millis,
};

const QUERY_HISTORY_CAP: usize = 10;

#[derive(Debug, Default)]
struct StoreInner {
    current: Option<Conversation>,
    history: Vec<Conversation>,
    /// Most recent prompts, newest first, deduplicated.
    query_history: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ConversationStore {
    inner: Mutex<StoreInner>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a turn on the current conversation (starting one if needed).
    /// Rejected while a previous turn is still loading: overlapping turns
    /// on one conversation would race on the shared turn list.
    pub fn begin_turn(
        &self,
        prompt: &str,
        selection: &ModelSelection,
    ) -> Result<ConversationTurn, OrchestrationError> {
        let mut g = self.inner.lock().expect("store mutex poisoned");

        if let Some(conv) = &g.current {
            if conv.turns.iter().any(|t| t.loading) {
                return Err(OrchestrationError::configuration(
                    "a turn is already in flight on this conversation",
                ));
            }
        }

        record_query(&mut g.query_history, prompt);

        let conv = g.current.get_or_insert_with(|| Conversation::new(prompt));
        let turn = ConversationTurn::new(prompt, selection);
        conv.turns.push(turn.clone());
        conv.updated_at = now_millis();
        Ok(turn)
    }

    /// Archive the current conversation and start fresh on the next turn.
    pub fn start_new_conversation(&self) {
        let mut g = self.inner.lock().expect("store mutex poisoned");
        if let Some(conv) = g.current.take() {
            if !conv.turns.is_empty() {
                g.history.push(conv);
            }
        }
    }

    /// Copy-on-write turn update: `f` receives a clone and returns the
    /// replacement record. Returns false when the turn no longer exists.
    /// Archived conversations stay reachable: a conversation can be
    /// archived while its last turn is still in flight, and that turn
    /// must still reach its final state.
    pub fn update_turn<F>(&self, turn_id: &str, f: F) -> bool
    where
        F: FnOnce(ConversationTurn) -> ConversationTurn,
    {
        let mut g = self.inner.lock().expect("store mutex poisoned");
        let inner = &mut *g;
        for conv in inner.current.iter_mut().chain(inner.history.iter_mut()) {
            if let Some(slot) = conv.turns.iter_mut().find(|t| t.id == turn_id) {
                *slot = f(slot.clone());
                conv.updated_at = now_millis();
                return true;
            }
        }
        false
    }

    /// Raise simulated progress toward `ceiling`. Returns false once the
    /// turn is completed or gone, signaling the estimator task to stop.
    pub fn advance_progress(&self, turn_id: &str, step: u8, ceiling: u8) -> bool {
        let mut still_loading = false;
        let found = self.update_turn(turn_id, |mut t| {
            if !t.completed {
                t.progress = t.progress.saturating_add(step).min(ceiling);
                still_loading = true;
            }
            t
        });
        found && still_loading
    }

    /// Final transition for a successful turn: responses + analytics +
    /// fusion land together, progress snaps to 100, loading clears.
    pub fn complete_turn(
        &self,
        turn_id: &str,
        responses: Vec<NormalizedResponse>,
        analysis: AnalysisData,
        fusion: FusionResult,
    ) -> Option<ConversationTurn> {
        self.update_turn(turn_id, move |mut t| {
            t.responses = responses;
            t.analysis_data = Some(analysis);
            t.fusion_result = Some(fusion);
            t.loading = false;
            t.completed = true;
            t.progress = 100;
            t
        });
        self.turn(turn_id)
    }

    /// Final transition for an unrecoverable error: every response is
    /// flagged, the turn still completes. A turn never stays loading.
    pub fn fail_turn(&self, turn_id: &str, error: &str) -> Option<ConversationTurn> {
        let error = error.to_string();
        self.update_turn(turn_id, move |mut t| {
            t.responses = t
                .responses
                .iter()
                .map(|r| NormalizedResponse::errored(r.platform, error.clone(), r.response_time))
                .collect();
            t.loading = false;
            t.completed = true;
            t.progress = 0;
            t
        });
        self.turn(turn_id)
    }

    pub fn turn(&self, turn_id: &str) -> Option<ConversationTurn> {
        let g = self.inner.lock().expect("store mutex poisoned");
        g.current
            .iter()
            .chain(g.history.iter())
            .find_map(|c| c.turns.iter().find(|t| t.id == turn_id).cloned())
    }

    pub fn current_conversation(&self) -> Option<Conversation> {
        let g = self.inner.lock().expect("store mutex poisoned");
        g.current.clone()
    }

    pub fn conversation_history(&self) -> Vec<Conversation> {
        let g = self.inner.lock().expect("store mutex poisoned");
        g.history.clone()
    }

    /// Most recent prompts, newest first, bounded and deduplicated.
    pub fn query_history(&self) -> Vec<String> {
        let g = self.inner.lock().expect("store mutex poisoned");
        g.query_history.clone()
    }
}

fn record_query(history: &mut Vec<String>, prompt: &str) {
    history.retain(|p| p != prompt);
    history.insert(0, prompt.to_string());
    history.truncate(QUERY_HISTORY_CAP);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ModelSelection, Platform};

    fn selection() -> ModelSelection {
        ModelSelection::all()
    }

    #[test]
    fn begin_turn_creates_conversation_and_pending_responses() {
        let store = ConversationStore::new();
        let turn = store.begin_turn("Explain quantum computing", &selection()).unwrap();
        assert!(turn.loading);
        assert_eq!(turn.progress, 0);
        assert_eq!(turn.responses.len(), 3);
        assert!(turn.responses.iter().all(|r| r.loading));
        let conv = store.current_conversation().unwrap();
        assert_eq!(conv.title, "Explain quantum computing");
    }

    #[test]
    fn overlapping_turns_are_rejected() {
        let store = ConversationStore::new();
        store.begin_turn("first", &selection()).unwrap();
        let err = store.begin_turn("second", &selection()).unwrap_err();
        assert!(matches!(err, OrchestrationError::Configuration(_)));
    }

    #[test]
    fn completed_turn_allows_a_followup() {
        let store = ConversationStore::new();
        let turn = store.begin_turn("first", &selection()).unwrap();
        store.fail_turn(&turn.id, "boom");
        assert!(store.begin_turn("second", &selection()).is_ok());
        assert_eq!(store.current_conversation().unwrap().turns.len(), 2);
    }

    #[test]
    fn fail_turn_completes_and_flags_every_response() {
        let store = ConversationStore::new();
        let turn = store.begin_turn("first", &selection()).unwrap();
        let failed = store.fail_turn(&turn.id, "provider meltdown").unwrap();
        assert!(failed.completed);
        assert!(!failed.loading);
        assert_eq!(failed.progress, 0);
        assert!(failed
            .responses
            .iter()
            .all(|r| r.error.as_deref() == Some("provider meltdown")));
    }

    #[test]
    fn progress_respects_ceiling_and_stops_after_completion() {
        let store = ConversationStore::new();
        let turn = store.begin_turn("first", &selection()).unwrap();
        for _ in 0..50 {
            store.advance_progress(&turn.id, 10, 90);
        }
        assert_eq!(store.turn(&turn.id).unwrap().progress, 90);
        store.fail_turn(&turn.id, "boom");
        assert!(!store.advance_progress(&turn.id, 10, 90));
    }

    #[test]
    fn query_history_is_bounded_and_deduplicated() {
        let store = ConversationStore::new();
        for i in 0..12 {
            let turn = store
                .begin_turn(&format!("prompt {i}"), &selection())
                .unwrap();
            store.fail_turn(&turn.id, "x");
        }
        let turn = store.begin_turn("prompt 5", &selection()).unwrap();
        store.fail_turn(&turn.id, "x");

        let h = store.query_history();
        assert_eq!(h.len(), QUERY_HISTORY_CAP);
        assert_eq!(h[0], "prompt 5");
        assert_eq!(h.iter().filter(|p| *p == "prompt 5").count(), 1);
    }

    #[test]
    fn turn_archived_mid_flight_still_reaches_completion() {
        let store = ConversationStore::new();
        let turn = store.begin_turn("first", &selection()).unwrap();
        store.start_new_conversation();

        let failed = store
            .fail_turn(&turn.id, "provider meltdown")
            .expect("archived turn stays reachable");
        assert!(failed.completed);
        assert!(!failed.loading);
        assert_eq!(failed.progress, 0);

        let archived = &store.conversation_history()[0].turns[0];
        assert!(archived.completed);
        assert!(!archived.loading);
    }

    #[test]
    fn start_new_conversation_archives_the_current_one() {
        let store = ConversationStore::new();
        let turn = store.begin_turn("first", &selection()).unwrap();
        store.fail_turn(&turn.id, "x");
        store.start_new_conversation();
        assert!(store.current_conversation().is_none());
        assert_eq!(store.conversation_history().len(), 1);
        store.begin_turn("fresh start", &selection()).unwrap();
        assert_eq!(
            store.current_conversation().unwrap().title,
            "fresh start"
        );
    }

    #[test]
    fn update_turn_is_whole_record_replacement() {
        let store = ConversationStore::new();
        let turn = store.begin_turn("first", &selection()).unwrap();
        store.update_turn(&turn.id, |mut t| {
            t.responses = vec![NormalizedResponse::settled(
                Platform::Grok,
                "done".into(),
                0.9,
                0.2,
                false,
            )];
            t
        });
        assert_eq!(store.turn(&turn.id).unwrap().responses.len(), 1);
    }
}
