use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user who can receive anonymous messages.
///
/// `verify_code` and `verify_code_expiry` only carry meaning while
/// `is_verified` is false. Once the account is verified they are left in
/// place but never consulted again.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub verify_code: String,
    #[serde(skip_serializing)]
    pub verify_code_expiry: DateTime<Utc>,
    pub is_accepting_messages: bool,
    pub created_at: DateTime<Utc>,
}

/// An anonymous message left on an account. Never mutated after insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
