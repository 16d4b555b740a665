//! Database models for accounts.

use crate::types::{Role, UserId};
use chrono::{DateTime, Utc};

/// Database request for creating a new account
#[derive(Debug, Clone)]
pub struct AccountCreateDBRequest {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Database response for an account
#[derive(Debug, Clone, PartialEq)]
pub struct AccountDBResponse {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}
