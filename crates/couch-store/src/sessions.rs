use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use couch_core::ids::{SessionId, UserId};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionRow {
    pub id: SessionId,
    pub user_id: UserId,
    pub name: String,
    pub created_at: String,
}

/// Listing entry: the message count is computed live at read time,
/// never cached on the session row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub name: String,
    pub created_at: String,
    pub message_count: u32,
}

pub struct SessionRepo {
    db: Database,
}

impl SessionRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a new session for a user. Always a fresh row, never reused.
    ///
    /// The session name is the persona label plus a per-user counter
    /// ("Pritam-3"), distinguishable within that user's session list.
    #[instrument(skip(self), fields(user_id = %user_id, persona_label))]
    pub fn create(&self, user_id: &UserId, persona_label: &str) -> Result<SessionRow, StoreError> {
        self.db.with_conn(|conn| {
            let existing: u32 = conn.query_row(
                "SELECT COUNT(*) FROM sessions WHERE user_id = ?1",
                [user_id.as_str()],
                |row| row.get(0),
            )?;

            let id = SessionId::new();
            let name = format!("{}-{}", persona_label, existing + 1);
            let now = Utc::now().to_rfc3339();

            conn.execute(
                "INSERT INTO sessions (id, user_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id.as_str(), user_id.as_str(), name, now],
            )?;

            Ok(SessionRow {
                id,
                user_id: user_id.clone(),
                name,
                created_at: now,
            })
        })
    }

    /// Get a session by ID. Only a missing row is `NotFound`; real database
    /// errors propagate as such.
    #[instrument(skip(self), fields(session_id = %id))]
    pub fn get(&self, id: &SessionId) -> Result<SessionRow, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, user_id, name, created_at FROM sessions WHERE id = ?1")?;
            let mut rows = stmt.query([id.as_str()])?;
            match rows.next()? {
                Some(row) => Ok(SessionRow {
                    id: SessionId::from_raw(row.get::<_, String>(0)?),
                    user_id: UserId::from_raw(row.get::<_, String>(1)?),
                    name: row.get(2)?,
                    created_at: row.get(3)?,
                }),
                None => Err(StoreError::NotFound(format!("session {id}"))),
            }
        })
    }

    /// List a user's sessions, newest first, with live message counts.
    /// A user with no sessions gets an empty list, not an error.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub fn list_for_user(&self, user_id: &UserId) -> Result<Vec<SessionSummary>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT s.id, s.name, s.created_at,
                        (SELECT COUNT(*) FROM messages m WHERE m.session_id = s.id)
                 FROM sessions s
                 WHERE s.user_id = ?1
                 ORDER BY s.created_at DESC, s.id DESC",
            )?;
            let mut rows = stmt.query([user_id.as_str()])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(SessionSummary {
                    id: SessionId::from_raw(row_helpers::get::<String>(row, 0, "sessions", "id")?),
                    name: row_helpers::get(row, 1, "sessions", "name")?,
                    created_at: row_helpers::get(row, 2, "sessions", "created_at")?,
                    message_count: row_helpers::get(row, 3, "sessions", "message_count")?,
                });
            }
            Ok(results)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::UserRepo;

    fn setup() -> (Database, UserId) {
        let db = Database::in_memory().unwrap();
        let users = UserRepo::new(db.clone());
        let user = users.get_or_create("ann@example.com", "Ann").unwrap();
        (db, user.id)
    }

    #[test]
    fn create_session_names_sequentially() {
        let (db, user_id) = setup();
        let repo = SessionRepo::new(db);
        let s1 = repo.create(&user_id, "Pritam").unwrap();
        let s2 = repo.create(&user_id, "Pritam").unwrap();
        assert!(s1.id.as_str().starts_with("sess_"));
        assert_eq!(s1.name, "Pritam-1");
        assert_eq!(s2.name, "Pritam-2");
    }

    #[test]
    fn counter_is_per_user() {
        let (db, user_a) = setup();
        let users = UserRepo::new(db.clone());
        let user_b = users.get_or_create("bo@example.com", "Bo").unwrap().id;

        let repo = SessionRepo::new(db);
        repo.create(&user_a, "Pritam").unwrap();
        let first_for_b = repo.create(&user_b, "Pritam").unwrap();
        assert_eq!(first_for_b.name, "Pritam-1");
    }

    #[test]
    fn get_session() {
        let (db, user_id) = setup();
        let repo = SessionRepo::new(db);
        let session = repo.create(&user_id, "Pritam").unwrap();
        let fetched = repo.get(&session.id).unwrap();
        assert_eq!(fetched.id, session.id);
        assert_eq!(fetched.user_id, user_id);
    }

    #[test]
    fn get_nonexistent_fails() {
        let (db, _) = setup();
        let repo = SessionRepo::new(db);
        let result = repo.get(&SessionId::from_raw("sess_nonexistent"));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn get_propagates_database_errors() {
        let (db, user_id) = setup();
        let repo = SessionRepo::new(db.clone());
        let session = repo.create(&user_id, "Pritam").unwrap();
        db.with_conn(|conn| {
            conn.execute_batch("DROP TABLE sessions")?;
            Ok(())
        })
        .unwrap();
        // A broken store is a database error, never a missing row.
        let result = repo.get(&session.id);
        assert!(matches!(result, Err(StoreError::Database(_))));
    }

    #[test]
    fn list_is_empty_for_fresh_user() {
        let (db, user_id) = setup();
        let repo = SessionRepo::new(db);
        let all = repo.list_for_user(&user_id).unwrap();
        assert!(all.is_empty());
    }

    #[test]
    fn list_newest_first() {
        let (db, user_id) = setup();
        let repo = SessionRepo::new(db);
        let s1 = repo.create(&user_id, "Pritam").unwrap();
        let s2 = repo.create(&user_id, "Pritam").unwrap();
        let all = repo.list_for_user(&user_id).unwrap();
        assert_eq!(all.len(), 2);
        // Same-timestamp rows break ties on the time-ordered id.
        assert_eq!(all[0].id, s2.id);
        assert_eq!(all[1].id, s1.id);
    }

    #[test]
    fn list_does_not_leak_other_users() {
        let (db, user_a) = setup();
        let users = UserRepo::new(db.clone());
        let user_b = users.get_or_create("bo@example.com", "Bo").unwrap().id;

        let repo = SessionRepo::new(db);
        repo.create(&user_a, "Pritam").unwrap();
        assert!(repo.list_for_user(&user_b).unwrap().is_empty());
    }

    #[test]
    fn fresh_session_has_zero_messages() {
        let (db, user_id) = setup();
        let repo = SessionRepo::new(db);
        repo.create(&user_id, "Pritam").unwrap();
        let all = repo.list_for_user(&user_id).unwrap();
        assert_eq!(all[0].message_count, 0);
    }
}
