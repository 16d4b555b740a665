//! Database models for room memberships.

use crate::types::{RoomId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// A (room, student) link
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct MembershipDBResponse {
    pub room_id: RoomId,
    pub student_id: UserId,
    pub joined_at: DateTime<Utc>,
}

/// A membership joined with the student's profile, for teacher listings
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct RoomMemberDBResponse {
    pub student_id: UserId,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub joined_at: DateTime<Utc>,
}
