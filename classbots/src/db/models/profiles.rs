//! Database models for student profiles.

use crate::types::UserId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for creating a student profile. The profile shares its id with the account.
#[derive(Debug, Clone)]
pub struct StudentProfileCreateDBRequest {
    pub username: String,
    pub display_name: String,
    pub pin_hash: String,
}

/// Database response for a student profile
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct StudentProfileDBResponse {
    pub user_id: UserId,
    pub username: String,
    pub display_name: String,
    pub pin_hash: String,
    pub created_at: DateTime<Utc>,
}
