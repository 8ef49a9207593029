use crate::Database;
use crate::models::{MessageRow, NewUser, UserRow};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode};

const USER_COLUMNS: &str = "id, username, email, password, is_verified, verify_code, \
                            verify_code_expiry, is_accepting_messages, created_at";

impl Database {
    // -- Users --

    /// Insert an unverified account. Returns `false` when the username or
    /// email is already taken.
    pub fn create_user(&self, user: &NewUser<'_>) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, username, email, password, verify_code, verify_code_expiry)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    user.id,
                    user.username,
                    user.email,
                    user.password_hash,
                    user.verify_code,
                    user.verify_code_expiry.to_rfc3339(),
                ],
            );
            match inserted {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email = ?1", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", id))
    }

    /// Sign-in lookup: the identifier may be either a username or an email.
    pub fn get_user_by_identifier(&self, identifier: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1 OR email = ?1", identifier))
    }

    /// Store a freshly issued verification code on an account.
    pub fn set_verify_code(&self, id: &str, code: &str, expiry: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET verify_code = ?2, verify_code_expiry = ?3 WHERE id = ?1",
                rusqlite::params![id, code, expiry.to_rfc3339()],
            )?;
            Ok(())
        })
    }

    /// Re-registration of an unverified account: new password and new code.
    /// Returns `false` if the account is gone or already verified.
    pub fn refresh_unverified_user(
        &self,
        id: &str,
        password_hash: &str,
        code: &str,
        expiry: DateTime<Utc>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET password = ?2, verify_code = ?3, verify_code_expiry = ?4
                 WHERE id = ?1 AND is_verified = 0",
                rusqlite::params![id, password_hash, code, expiry.to_rfc3339()],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn mark_verified(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE users SET is_verified = 1 WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Returns `false` if no such user exists.
    pub fn set_accepting_messages(&self, id: &str, accepting: bool) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET is_accepting_messages = ?2 WHERE id = ?1",
                rusqlite::params![id, accepting],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        id: &str,
        user_id: &str,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, user_id, content, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, user_id, content, created_at.to_rfc3339()],
            )?;
            Ok(())
        })
    }

    /// All messages for a user, newest first.
    pub fn get_messages(&self, user_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, content, created_at FROM messages
                 WHERE user_id = ?1
                 ORDER BY rowid DESC",
            )?;

            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        content: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Delete one message, scoped to its owner. Returns `false` if nothing
    /// matched.
    pub fn delete_message(&self, user_id: &str, message_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM messages WHERE id = ?1 AND user_id = ?2",
                [message_id, user_id],
            )?;
            Ok(deleted > 0)
        })
    }
}

fn query_user(conn: &Connection, predicate: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {predicate}");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                is_verified: row.get(4)?,
                verify_code: row.get(5)?,
                verify_code_expiry: row.get(6)?,
                is_accepting_messages: row.get(7)?,
                created_at: row.get(8)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn seed_user(db: &Database, username: &str, email: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let created = db
            .create_user(&NewUser {
                id: &id,
                username,
                email,
                password_hash: "hash",
                verify_code: "123456",
                verify_code_expiry: Utc::now() + Duration::hours(1),
            })
            .unwrap();
        assert!(created);
        id
    }

    #[test]
    fn new_user_defaults() {
        let db = Database::open_in_memory().unwrap();
        let id = seed_user(&db, "alice", "alice@example.com");

        let account = db.get_user_by_id(&id).unwrap().unwrap().into_account().unwrap();
        assert_eq!(account.username, "alice");
        assert!(!account.is_verified);
        assert!(account.is_accepting_messages);
        assert_eq!(account.verify_code, "123456");
    }

    #[test]
    fn duplicate_username_or_email_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "alice", "alice@example.com");

        let expiry = Utc::now();
        let dup_name = NewUser {
            id: "a",
            username: "alice",
            email: "other@example.com",
            password_hash: "hash",
            verify_code: "111111",
            verify_code_expiry: expiry,
        };
        let dup_email = NewUser {
            id: "b",
            username: "bob",
            email: "alice@example.com",
            password_hash: "hash",
            verify_code: "111111",
            verify_code_expiry: expiry,
        };
        assert!(!db.create_user(&dup_name).unwrap());
        assert!(!db.create_user(&dup_email).unwrap());
    }

    #[test]
    fn usernames_are_case_sensitive() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "alice", "alice@example.com");

        assert!(db.get_user_by_username("Alice").unwrap().is_none());
        seed_user(&db, "Alice", "alice2@example.com");
    }

    #[test]
    fn identifier_matches_username_or_email() {
        let db = Database::open_in_memory().unwrap();
        let id = seed_user(&db, "alice", "alice@example.com");

        assert_eq!(db.get_user_by_identifier("alice").unwrap().unwrap().id, id);
        assert_eq!(db.get_user_by_identifier("alice@example.com").unwrap().unwrap().id, id);
        assert!(db.get_user_by_identifier("nobody").unwrap().is_none());
    }

    #[test]
    fn messages_list_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let id = seed_user(&db, "alice", "alice@example.com");
        let now = Utc::now();

        db.insert_message("m1", &id, "first", now).unwrap();
        db.insert_message("m2", &id, "second", now).unwrap();
        db.insert_message("m3", &id, "third", now).unwrap();

        let contents: Vec<String> =
            db.get_messages(&id).unwrap().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["third", "second", "first"]);
    }

    #[test]
    fn delete_removes_exactly_one_message() {
        let db = Database::open_in_memory().unwrap();
        let id = seed_user(&db, "alice", "alice@example.com");
        let now = Utc::now();

        db.insert_message("m1", &id, "first", now).unwrap();
        db.insert_message("m2", &id, "second", now).unwrap();
        db.insert_message("m3", &id, "third", now).unwrap();

        assert!(db.delete_message(&id, "m2").unwrap());
        assert!(!db.delete_message(&id, "m2").unwrap());

        let ids: Vec<String> = db.get_messages(&id).unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["m3", "m1"]);
    }

    #[test]
    fn delete_is_scoped_to_owner() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice", "alice@example.com");
        let bob = seed_user(&db, "bob", "bob@example.com");

        db.insert_message("m1", &alice, "for alice", Utc::now()).unwrap();

        assert!(!db.delete_message(&bob, "m1").unwrap());
        assert_eq!(db.get_messages(&alice).unwrap().len(), 1);
    }

    #[test]
    fn refresh_only_touches_unverified_accounts() {
        let db = Database::open_in_memory().unwrap();
        let id = seed_user(&db, "alice", "alice@example.com");
        let expiry = Utc::now() + Duration::hours(1);

        assert!(db.refresh_unverified_user(&id, "hash2", "222222", expiry).unwrap());
        let row = db.get_user_by_id(&id).unwrap().unwrap();
        assert_eq!(row.password, "hash2");
        assert_eq!(row.verify_code, "222222");

        db.mark_verified(&id).unwrap();
        assert!(!db.refresh_unverified_user(&id, "hash3", "333333", expiry).unwrap());
        let row = db.get_user_by_id(&id).unwrap().unwrap();
        assert_eq!(row.password, "hash2");
        assert!(row.is_verified);
        assert!(!db.refresh_unverified_user("missing", "hash4", "444444", expiry).unwrap());
    }

    #[test]
    fn toggle_accepting_messages() {
        let db = Database::open_in_memory().unwrap();
        let id = seed_user(&db, "alice", "alice@example.com");

        assert!(db.set_accepting_messages(&id, false).unwrap());
        assert!(!db.get_user_by_id(&id).unwrap().unwrap().is_accepting_messages);
        assert!(!db.set_accepting_messages("missing", true).unwrap());
    }
}
