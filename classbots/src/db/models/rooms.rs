//! Database models for rooms.

use crate::types::{RoomId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database request for creating a new room
#[derive(Debug, Clone)]
pub struct RoomCreateDBRequest {
    pub room_code: String,
    pub room_name: String,
    pub teacher_id: UserId,
}

/// Database request for updating a room
#[derive(Debug, Clone, Default)]
pub struct RoomUpdateDBRequest {
    pub room_name: Option<String>,
    pub is_active: Option<bool>,
}

/// Database response for a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RoomDBResponse {
    pub id: RoomId,
    pub room_code: String,
    pub room_name: String,
    pub is_active: bool,
    pub teacher_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
