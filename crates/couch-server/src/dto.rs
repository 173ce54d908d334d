//! Request/response shapes of the HTTP surface.
//!
//! Roles leave the API in the display vocabulary ("therapist"/"client"),
//! never the storage one.

use serde::{Deserialize, Serialize};

use couch_core::ids::{SessionId, UserId};
use couch_core::roles::DisplayRole;
use couch_engine::Conversation;
use couch_store::messages::MessageRow;
use couch_store::sessions::SessionSummary;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: UserId,
    pub resumed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<ConversationResponse>,
}

#[derive(Debug, Deserialize)]
pub struct NewSessionRequest {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct NewSessionResponse {
    pub session_id: SessionId,
    pub session_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub email: String,
    pub session_id: SessionId,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: SessionId,
    pub response_text: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub session_name: String,
    pub created_at: String,
    pub message_count: u32,
}

impl From<SessionSummary> for SessionInfo {
    fn from(summary: SessionSummary) -> Self {
        Self {
            session_id: summary.id,
            session_name: summary.name,
            created_at: summary.created_at,
            message_count: summary.message_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageView {
    pub role: DisplayRole,
    pub content: String,
    pub timestamp: String,
}

impl From<MessageRow> for MessageView {
    fn from(row: MessageRow) -> Self {
        Self {
            role: row.role.display_role(),
            content: row.content,
            timestamp: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub session_id: SessionId,
    pub session_name: String,
    pub messages: Vec<MessageView>,
}

impl ConversationResponse {
    pub fn from_conversation(session_id: SessionId, conversation: Conversation) -> Self {
        Self {
            session_id,
            session_name: conversation.session_name,
            messages: conversation
                .messages
                .into_iter()
                .map(MessageView::from)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use couch_core::ids::MessageId;
    use couch_core::roles::StoredRole;

    #[test]
    fn message_view_uses_display_vocabulary() {
        let row = MessageRow {
            id: MessageId::new(),
            session_id: SessionId::from_raw("sess_1"),
            seq: 0,
            role: StoredRole::Persona,
            content: "(He nods) hey".into(),
            created_at: "2026-01-01T00:00:00Z".into(),
        };
        let view = MessageView::from(row);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["role"], "client");
        assert_eq!(json["content"], "(He nods) hey");
    }

    #[test]
    fn login_response_omits_absent_session() {
        let response = LoginResponse {
            user_id: UserId::from_raw("user_1"),
            resumed: false,
            session: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("session").is_none());
    }
}
