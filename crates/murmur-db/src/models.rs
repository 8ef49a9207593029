//! Row types mapping directly to SQLite rows, kept apart from the
//! murmur-types domain models so the storage layout can change on its own.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use murmur_types::models::{Account, Message};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub is_verified: bool,
    pub verify_code: String,
    pub verify_code_expiry: String,
    pub is_accepting_messages: bool,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: String,
}

/// Everything needed to insert a fresh, unverified account.
pub struct NewUser<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub verify_code: &'a str,
    pub verify_code_expiry: DateTime<Utc>,
}

impl UserRow {
    pub fn into_account(self) -> Result<Account> {
        Ok(Account {
            id: self
                .id
                .parse()
                .with_context(|| format!("corrupt user id '{}'", self.id))?,
            verify_code_expiry: parse_timestamp(&self.verify_code_expiry)
                .with_context(|| format!("corrupt verify_code_expiry on user '{}'", self.id))?,
            created_at: parse_timestamp(&self.created_at)
                .with_context(|| format!("corrupt created_at on user '{}'", self.id))?,
            username: self.username,
            email: self.email,
            password_hash: self.password,
            is_verified: self.is_verified,
            verify_code: self.verify_code,
            is_accepting_messages: self.is_accepting_messages,
        })
    }
}

impl MessageRow {
    pub fn into_message(self) -> Result<Message> {
        Ok(Message {
            id: self
                .id
                .parse()
                .with_context(|| format!("corrupt message id '{}'", self.id))?,
            created_at: parse_timestamp(&self.created_at)
                .with_context(|| format!("corrupt created_at on message '{}'", self.id))?,
            content: self.content,
        })
    }
}

/// Timestamps written by this crate are RFC 3339. Column defaults filled in
/// by SQLite come back as "YYYY-MM-DD HH:MM:SS" without a zone and are UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")?;
    Ok(naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rfc3339_and_sqlite_defaults() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();

        assert_eq!(parse_timestamp("2025-03-14T09:26:53+00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-03-14T11:26:53+02:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-03-14 09:26:53").unwrap(), expected);
    }

    #[test]
    fn rejects_garbage_timestamp() {
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn corrupt_row_is_an_error() {
        let row = MessageRow {
            id: "not-a-uuid".into(),
            user_id: "u".into(),
            content: "hi".into(),
            created_at: "2025-03-14 09:26:53".into(),
        };
        assert!(row.into_message().is_err());
    }
}
