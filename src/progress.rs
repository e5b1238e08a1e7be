// src/progress.rs
//! Simulated progress: a fixed-cadence timer advancing a turn's progress
//! indicator, deliberately decoupled from real I/O. The estimator never
//! reaches 100 by itself; real completion snaps progress to 100 (or 0 on
//! failure), so displayed progress is effectively max(simulated, real).

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::store::ConversationStore;

#[derive(Debug, Clone, Copy)]
pub struct ProgressEstimator {
    pub cadence: Duration,
    pub step: u8,
    /// Simulated progress stalls here until the real work settles.
    pub ceiling: u8,
}

impl Default for ProgressEstimator {
    fn default() -> Self {
        Self {
            cadence: Duration::from_millis(400),
            step: 8,
            ceiling: 90,
        }
    }
}

impl ProgressEstimator {
    /// Tick until the turn completes or disappears. The task is detached;
    /// completion of the turn is what stops it, not cancellation.
    pub fn spawn(&self, store: Arc<ConversationStore>, turn_id: String) -> JoinHandle<()> {
        let cfg = *self;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cfg.cadence);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                ticker.tick().await;
                if !store.advance_progress(&turn_id, cfg.step, cfg.ceiling) {
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModelSelection;

    #[tokio::test(start_paused = true)]
    async fn estimator_advances_then_stops_at_completion() {
        let store = Arc::new(ConversationStore::new());
        let turn = store
            .begin_turn("prompt", &ModelSelection::all())
            .unwrap();

        let est = ProgressEstimator {
            cadence: Duration::from_millis(10),
            step: 20,
            ceiling: 90,
        };
        let handle = est.spawn(store.clone(), turn.id.clone());
        // Let the task run up to its first await so the interval exists
        // before the clock moves.
        tokio::task::yield_now().await;

        for _ in 0..3 {
            tokio::time::advance(Duration::from_millis(10)).await;
            tokio::task::yield_now().await;
        }
        let p = store.turn(&turn.id).unwrap().progress;
        assert!(p > 0 && p <= 90, "progress was {p}");

        store.fail_turn(&turn.id, "done");
        tokio::time::advance(Duration::from_millis(20)).await;
        handle.await.expect("estimator task exits");
        assert_eq!(store.turn(&turn.id).unwrap().progress, 0);
    }
}
