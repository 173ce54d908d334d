//! Scripted gateway for deterministic tests without API calls.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use couch_core::errors::GatewayError;
use couch_core::turns::Turn;

use crate::gateway::ModelGateway;

/// Pre-programmed reply for one `generate` call.
pub enum MockReply {
    /// Return this text.
    Text(String),
    /// Fail with this error.
    Error(GatewayError),
    /// Wait a duration, then resolve the inner reply.
    Delayed(Duration, Box<MockReply>),
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn delayed(delay: Duration, inner: MockReply) -> Self {
        Self::Delayed(delay, Box::new(inner))
    }
}

/// Everything the mock saw for one call, for assertions on context assembly.
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub system_instruction: String,
    pub prior_turns: Vec<Turn>,
    pub final_user_text: String,
}

/// Gateway that replays scripted responses in order and records each request.
pub struct MockGateway {
    replies: Mutex<VecDeque<MockReply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockGateway {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn last_call(&self) -> Option<RecordedCall> {
        self.calls.lock().last().cloned()
    }
}

#[async_trait]
impl ModelGateway for MockGateway {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(
        &self,
        system_instruction: &str,
        prior_turns: &[Turn],
        final_user_text: &str,
    ) -> Result<String, GatewayError> {
        self.calls.lock().push(RecordedCall {
            system_instruction: system_instruction.to_string(),
            prior_turns: prior_turns.to_vec(),
            final_user_text: final_user_text.to_string(),
        });

        let reply = self.replies.lock().pop_front().ok_or_else(|| {
            GatewayError::InvalidRequest("MockGateway: no reply configured for this call".into())
        })?;

        let mut current = reply;
        loop {
            match current {
                MockReply::Text(text) => return Ok(text),
                MockReply::Error(e) => return Err(e),
                MockReply::Delayed(duration, inner) => {
                    tokio::time::sleep(duration).await;
                    current = *inner;
                }
            }
        }
    }
}

/// Unscripted variant that never runs out of replies. Used by the `--mock`
/// CLI flag to run the server offline.
pub struct AlwaysGateway {
    text: String,
}

impl AlwaysGateway {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl ModelGateway for AlwaysGateway {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(
        &self,
        _system_instruction: &str,
        _prior_turns: &[Turn],
        _final_user_text: &str,
    ) -> Result<String, GatewayError> {
        Ok(self.text.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_in_sequence() {
        let mock = MockGateway::new(vec![MockReply::text("first"), MockReply::text("second")]);
        assert_eq!(mock.generate("sys", &[], "hi").await.unwrap(), "first");
        assert_eq!(mock.generate("sys", &[], "hi").await.unwrap(), "second");
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn exhausted_replies_error() {
        let mock = MockGateway::new(vec![MockReply::text("only")]);
        let _ = mock.generate("sys", &[], "hi").await;
        assert!(mock.generate("sys", &[], "hi").await.is_err());
    }

    #[tokio::test]
    async fn error_reply() {
        let mock = MockGateway::new(vec![MockReply::Error(GatewayError::ProviderOverloaded)]);
        let result = mock.generate("sys", &[], "hi").await;
        assert!(matches!(result, Err(GatewayError::ProviderOverloaded)));
    }

    #[tokio::test]
    async fn records_requests() {
        let mock = MockGateway::new(vec![MockReply::text("ok")]);
        let turns = vec![Turn::therapist("q"), Turn::client("a")];
        mock.generate("INSTRUCTION", &turns, "next question").await.unwrap();

        let call = mock.last_call().unwrap();
        assert_eq!(call.system_instruction, "INSTRUCTION");
        assert_eq!(call.prior_turns, turns);
        assert_eq!(call.final_user_text, "next question");
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_reply_waits() {
        let mock = MockGateway::new(vec![MockReply::delayed(
            Duration::from_millis(50),
            MockReply::text("after delay"),
        )]);
        let start = tokio::time::Instant::now();
        let text = mock.generate("sys", &[], "hi").await.unwrap();
        assert_eq!(text, "after delay");
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn always_gateway_never_exhausts() {
        let mock = AlwaysGateway::new("same answer");
        for _ in 0..10 {
            assert_eq!(mock.generate("sys", &[], "hi").await.unwrap(), "same answer");
        }
    }
}
