// src/fanout.rs
//! Fan-out coordinator: issue all selected provider calls concurrently,
//! settle them all (a failed sibling never aborts the rest), and emit the
//! results in canonical platform order regardless of arrival order.

use metrics::histogram;
use tokio::task::JoinSet;

use crate::error::OrchestrationError;
use crate::providers::ProviderRegistry;
use crate::types::{ModelSelection, NormalizedResponse};

pub struct FanoutCoordinator {
    registry: ProviderRegistry,
}

impl FanoutCoordinator {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// One attempt per selected provider, all in flight before any is
    /// awaited. Zero selected providers is a configuration error raised
    /// before any network call.
    pub async fn dispatch(
        &self,
        prompt: &str,
        selection: &ModelSelection,
    ) -> Result<Vec<NormalizedResponse>, OrchestrationError> {
        let handles = self.registry.select(selection);
        if handles.is_empty() {
            return Err(OrchestrationError::configuration(
                "at least one model must be selected",
            ));
        }

        let expected: Vec<_> = handles.iter().map(|h| h.platform()).collect();

        let mut set = JoinSet::new();
        for handle in handles {
            let prompt = prompt.to_string();
            set.spawn(async move { handle.query(&prompt).await });
        }

        let mut out: Vec<NormalizedResponse> = Vec::with_capacity(expected.len());
        while let Some(joined) = set.join_next().await {
            // A panicked task drops its slot; the missing-platform sweep
            // below restores it as an errored response.
            if let Ok(response) = joined {
                histogram!("provider_response_seconds", "platform" => response.platform.as_str())
                    .record(response.response_time);
                out.push(response);
            }
        }

        for platform in expected {
            if !out.iter().any(|r| r.platform == platform) {
                out.push(NormalizedResponse::errored(
                    platform,
                    format!("{platform}: provider task failed"),
                    0.0,
                ));
            }
        }

        out.sort_by_key(|r| r.platform.order_index());
        Ok(out)
    }
}
