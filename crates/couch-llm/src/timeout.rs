use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use couch_core::errors::GatewayError;
use couch_core::turns::Turn;

use crate::gateway::ModelGateway;

/// Wraps a gateway with a fixed per-call upper bound.
///
/// Elapsed calls fail as `GatewayError::Timeout`; the orchestrator treats
/// that exactly like any other generation failure (nothing persisted).
/// No retry happens here: retry, if wanted, is an external policy.
pub struct TimeoutGateway<G: ModelGateway> {
    inner: G,
    timeout: Duration,
}

impl<G: ModelGateway> TimeoutGateway<G> {
    pub fn new(inner: G, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<G: ModelGateway> ModelGateway for TimeoutGateway<G> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn generate(
        &self,
        system_instruction: &str,
        prior_turns: &[Turn],
        final_user_text: &str,
    ) -> Result<String, GatewayError> {
        match tokio::time::timeout(
            self.timeout,
            self.inner
                .generate(system_instruction, prior_turns, final_user_text),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    timeout_secs = self.timeout.as_secs(),
                    gateway = self.inner.name(),
                    "generation call timed out"
                );
                Err(GatewayError::Timeout(self.timeout))
            }
        }
    }
}
