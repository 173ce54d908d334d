use async_trait::async_trait;

use couch_core::errors::GatewayError;
use couch_core::turns::Turn;

/// The opaque generation call the orchestrator depends on.
///
/// A stateful-continuation request: `prior_turns` is the established
/// conversation context in exact commit order, `final_user_text` the one
/// utterance the model is asked to answer. Implementations either return the
/// generated text or a classified [`GatewayError`]; they never persist
/// anything.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self) -> &str;

    async fn generate(
        &self,
        system_instruction: &str,
        prior_turns: &[Turn],
        final_user_text: &str,
    ) -> Result<String, GatewayError>;
}
