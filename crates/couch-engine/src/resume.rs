//! Smart resume: the login-time decision between continuing the newest
//! session and deferring session creation until the user actually speaks.
//!
//! Depends only on the orchestrator's read operations. Never calls
//! `start_session`: a session is materialized by the first real message, so
//! at most one empty session can ever exist transiently and it is never
//! surfaced as resumable.

use tracing::{info, instrument};

use couch_core::ids::{SessionId, UserId};

use crate::error::ChatError;
use crate::orchestrator::{Conversation, SessionOrchestrator};

/// What the calling application should do after login.
#[derive(Clone, Debug)]
pub enum ResumeDecision {
    /// The newest session has content: set it active and show its transcript.
    Resume {
        session_id: SessionId,
        conversation: Conversation,
    },
    /// No sessions, or the newest is empty: leave the active session unset.
    StartFresh,
}

pub struct ResumeController<'a> {
    orchestrator: &'a SessionOrchestrator,
}

impl<'a> ResumeController<'a> {
    pub fn new(orchestrator: &'a SessionOrchestrator) -> Self {
        Self { orchestrator }
    }

    /// Run once per login.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub fn on_login(&self, user_id: &UserId) -> Result<ResumeDecision, ChatError> {
        let sessions = self.orchestrator.list_sessions(user_id)?;

        let Some(latest) = sessions.first() else {
            info!("no sessions; starting fresh");
            return Ok(ResumeDecision::StartFresh);
        };

        if latest.message_count == 0 {
            info!(session_id = %latest.id, "newest session is empty; starting fresh");
            return Ok(ResumeDecision::StartFresh);
        }

        let conversation = self.orchestrator.get_conversation(&latest.id, user_id)?;
        info!(
            session_id = %latest.id,
            messages = conversation.messages.len(),
            "resuming newest session"
        );
        Ok(ResumeDecision::Resume {
            session_id: latest.id.clone(),
            conversation,
        })
    }
}
