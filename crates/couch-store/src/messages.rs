use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use couch_core::ids::{MessageId, SessionId};
use couch_core::roles::StoredRole;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

/// A stored message row. Messages are strictly append-only and totally
/// ordered within a session by `seq`; nothing is ever edited or reordered.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageRow {
    pub id: MessageId,
    pub session_id: SessionId,
    pub seq: i64,
    pub role: StoredRole,
    pub content: String,
    pub created_at: String,
}

pub struct MessageRepo {
    db: Database,
}

impl MessageRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Append a therapist message and the persona's reply as one unit.
    ///
    /// Both rows land in a single transaction with consecutive `seq` values
    /// and the same response-time timestamp. Either both commit or neither
    /// does; a session can never hold an unanswered therapist message or a
    /// reply without its prompt.
    #[instrument(skip(self, user_text, persona_text), fields(session_id = %session_id))]
    pub fn append_exchange(
        &self,
        session_id: &SessionId,
        user_text: &str,
        persona_text: &str,
    ) -> Result<(MessageRow, MessageRow), StoreError> {
        self.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            // No row means the session does not exist; any other failure is a
            // real database error and propagates as one.
            let next_seq: i64 = {
                let mut stmt = tx.prepare(
                    "SELECT COALESCE((SELECT MAX(seq) FROM messages WHERE session_id = ?1), -1) + 1
                     FROM sessions WHERE id = ?1",
                )?;
                let mut rows = stmt.query([session_id.as_str()])?;
                match rows.next()? {
                    Some(row) => row.get(0)?,
                    None => return Err(StoreError::NotFound(format!("session {session_id}"))),
                }
            };

            let now = Utc::now().to_rfc3339();
            let user_row = insert_message(&tx, session_id, next_seq, StoredRole::User, user_text, &now)?;
            let persona_row =
                insert_message(&tx, session_id, next_seq + 1, StoredRole::Persona, persona_text, &now)?;

            tx.commit()?;
            Ok((user_row, persona_row))
        })
    }

    /// Full ordered history for a session, in commit order.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub fn list(&self, session_id: &SessionId) -> Result<Vec<MessageRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, seq, role, content, created_at
                 FROM messages WHERE session_id = ?1 ORDER BY seq ASC",
            )?;
            let mut rows = stmt.query([session_id.as_str()])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_message(row)?);
            }
            Ok(results)
        })
    }

    /// Live message count for a session.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub fn count(&self, session_id: &SessionId) -> Result<u32, StoreError> {
        self.db.with_conn(|conn| {
            let count: u32 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE session_id = ?1",
                [session_id.as_str()],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}

fn insert_message(
    tx: &rusqlite::Transaction<'_>,
    session_id: &SessionId,
    seq: i64,
    role: StoredRole,
    content: &str,
    now: &str,
) -> Result<MessageRow, StoreError> {
    let id = MessageId::new();
    tx.execute(
        "INSERT INTO messages (id, session_id, seq, role, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            id.as_str(),
            session_id.as_str(),
            seq,
            role.to_string(),
            content,
            now,
        ],
    )?;

    Ok(MessageRow {
        id,
        session_id: session_id.clone(),
        seq,
        role,
        content: content.to_string(),
        created_at: now.to_string(),
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<MessageRow, StoreError> {
    let role_str: String = row_helpers::get(row, 3, "messages", "role")?;

    Ok(MessageRow {
        id: MessageId::from_raw(row_helpers::get::<String>(row, 0, "messages", "id")?),
        session_id: SessionId::from_raw(row_helpers::get::<String>(row, 1, "messages", "session_id")?),
        seq: row_helpers::get(row, 2, "messages", "seq")?,
        role: row_helpers::parse_enum(&role_str, "messages", "role")?,
        content: row_helpers::get(row, 4, "messages", "content")?,
        created_at: row_helpers::get(row, 5, "messages", "created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::SessionRepo;
    use crate::users::UserRepo;

    fn setup() -> (Database, SessionId) {
        let db = Database::in_memory().unwrap();
        let users = UserRepo::new(db.clone());
        let user = users.get_or_create("ann@example.com", "Ann").unwrap();
        let sessions = SessionRepo::new(db.clone());
        let session = sessions.create(&user.id, "Pritam").unwrap();
        (db, session.id)
    }

    #[test]
    fn append_exchange_writes_both_rows() {
        let (db, session_id) = setup();
        let repo = MessageRepo::new(db);
        let (user_msg, persona_msg) = repo.append_exchange(&session_id, "hi", "(He nods) hey").unwrap();

        assert_eq!(user_msg.role, StoredRole::User);
        assert_eq!(persona_msg.role, StoredRole::Persona);
        assert_eq!(user_msg.seq + 1, persona_msg.seq);
        assert_eq!(user_msg.created_at, persona_msg.created_at);
        assert_eq!(repo.count(&session_id).unwrap(), 2);
    }

    #[test]
    fn append_to_unknown_session_fails() {
        let (db, _) = setup();
        let repo = MessageRepo::new(db.clone());
        let result = repo.append_exchange(&SessionId::from_raw("sess_nope"), "hi", "hey");
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        // Nothing persisted anywhere.
        let total: u32 = db
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
                    .map_err(Into::into)
            })
            .unwrap();
        assert_eq!(total, 0);
    }

    #[test]
    fn append_propagates_database_errors() {
        let (db, session_id) = setup();
        db.with_conn(|conn| {
            conn.execute_batch("DROP TABLE messages")?;
            Ok(())
        })
        .unwrap();
        let repo = MessageRepo::new(db);
        // A broken store must not be mistaken for a missing session.
        let result = repo.append_exchange(&session_id, "hi", "hey");
        assert!(matches!(result, Err(StoreError::Database(_))));
    }

    #[test]
    fn list_preserves_append_order() {
        let (db, session_id) = setup();
        let repo = MessageRepo::new(db);
        for i in 0..5 {
            repo.append_exchange(&session_id, &format!("q{i}"), &format!("a{i}"))
                .unwrap();
        }
        let history = repo.list(&session_id).unwrap();
        assert_eq!(history.len(), 10);
        for (i, msg) in history.iter().enumerate() {
            assert_eq!(msg.seq, i as i64);
        }
        assert_eq!(history[0].content, "q0");
        assert_eq!(history[9].content, "a4");
    }

    #[test]
    fn interleaved_sessions_keep_independent_order() {
        let (db, session_a) = setup();
        let users = UserRepo::new(db.clone());
        let user = users.get_or_create("bo@example.com", "Bo").unwrap();
        let sessions = SessionRepo::new(db.clone());
        let session_b = sessions.create(&user.id, "Pritam").unwrap().id;

        let repo = MessageRepo::new(db);
        repo.append_exchange(&session_a, "a1", "r1").unwrap();
        repo.append_exchange(&session_b, "b1", "r1").unwrap();
        repo.append_exchange(&session_a, "a2", "r2").unwrap();

        let history_a = repo.list(&session_a).unwrap();
        let history_b = repo.list(&session_b).unwrap();
        assert_eq!(history_a.len(), 4);
        assert_eq!(history_b.len(), 2);
        assert_eq!(history_a[2].content, "a2");
        assert_eq!(history_b[0].content, "b1");
    }

    #[test]
    fn empty_session_lists_empty() {
        let (db, session_id) = setup();
        let repo = MessageRepo::new(db);
        assert!(repo.list(&session_id).unwrap().is_empty());
        assert_eq!(repo.count(&session_id).unwrap(), 0);
    }

    #[test]
    fn corrupt_role_surfaces_as_corrupt_row() {
        let (db, session_id) = setup();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, session_id, seq, role, content, created_at)
                 VALUES ('msg_bad', ?1, 0, 'assistant', 'x', '2026-01-01T00:00:00Z')",
                [session_id.as_str()],
            )?;
            Ok(())
        })
        .unwrap();

        let repo = MessageRepo::new(db);
        let result = repo.list(&session_id);
        assert!(matches!(result, Err(StoreError::CorruptRow { .. })));
    }
}
