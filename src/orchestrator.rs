// src/orchestrator.rs
//! Turn pipeline: validate → fan out → analytics + fusion → store.
//! Validation/configuration errors are raised before a turn exists;
//! everything after turn creation is recovered into turn state, so a turn
//! always reaches `completed` exactly once.

use std::sync::Arc;

use metrics::counter;
use tracing::info;

use crate::config::HeuristicsConfig;
use crate::error::OrchestrationError;
use crate::fanout::FanoutCoordinator;
use crate::fusion::FusionSynthesizer;
use crate::progress::ProgressEstimator;
use crate::store::ConversationStore;
use crate::types::{ConversationTurn, ModelSelection};
use crate::validator;

pub struct Orchestrator {
    fanout: FanoutCoordinator,
    synthesizer: Arc<FusionSynthesizer>,
    store: Arc<ConversationStore>,
    heuristics: Arc<HeuristicsConfig>,
    progress: ProgressEstimator,
}

impl Orchestrator {
    pub fn new(
        fanout: FanoutCoordinator,
        synthesizer: Arc<FusionSynthesizer>,
        store: Arc<ConversationStore>,
        heuristics: Arc<HeuristicsConfig>,
        progress: ProgressEstimator,
    ) -> Self {
        Self {
            fanout,
            synthesizer,
            store,
            heuristics,
            progress,
        }
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn fanout(&self) -> &FanoutCoordinator {
        &self.fanout
    }

    /// Run one full turn. The returned turn is always `completed`; errors
    /// after turn creation are encoded in its responses, never thrown.
    pub async fn submit(
        &self,
        prompt: &str,
        selection: &ModelSelection,
    ) -> Result<ConversationTurn, OrchestrationError> {
        let outcome = validator::validate(prompt, selection);
        if !outcome.is_valid {
            counter!("turns_rejected_total").increment(1);
            return Err(OrchestrationError::Validation(outcome.errors));
        }
        let sanitized = outcome
            .sanitized_prompt
            .expect("valid outcome carries a sanitized prompt");

        let turn = self.store.begin_turn(&sanitized, selection)?;
        info!(
            target: "orchestrator",
            turn = %turn.id,
            prompt_id = %anon_hash(&sanitized),
            models = selection.platforms().len(),
            "turn started"
        );
        let _estimator = self.progress.spawn(self.store.clone(), turn.id.clone());

        match self.run_turn(&turn.id, &sanitized, selection).await {
            Ok(done) => {
                counter!("turns_completed_total").increment(1);
                Ok(done)
            }
            Err(e) => {
                // UnknownError boundary: the turn completes with every
                // response flagged instead of staying loading forever.
                counter!("turns_failed_total").increment(1);
                let failed = self
                    .store
                    .fail_turn(&turn.id, &e.to_string())
                    .unwrap_or(turn);
                Ok(failed)
            }
        }
    }

    async fn run_turn(
        &self,
        turn_id: &str,
        prompt: &str,
        selection: &ModelSelection,
    ) -> Result<ConversationTurn, OrchestrationError> {
        let responses = self.fanout.dispatch(prompt, selection).await?;

        let analysis = crate::analytics::extract(&responses, &self.heuristics);
        let fusion = self.synthesizer.fuse(prompt, &responses).await;

        let completed = self
            .store
            .complete_turn(turn_id, responses, analysis, fusion)
            .ok_or_else(|| OrchestrationError::configuration("turn vanished from the store"))?;

        info!(
            target: "orchestrator",
            turn = %turn_id,
            errors = completed.responses.iter().filter(|r| r.error.is_some()).count(),
            mocked = completed.responses.iter().filter(|r| r.is_mock).count(),
            "turn completed"
        );
        Ok(completed)
    }
}

/// Short anonymized id for log lines; raw prompts are never logged.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}
