//! API request/response models for teacher-managed student accounts.

use crate::types::{RoomId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for creating a student account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentCreate {
    /// Login name, unique case-insensitively
    #[schema(example = "student1")]
    pub username: String,
    /// Defaults to the username
    pub display_name: Option<String>,
    #[schema(example = "1234")]
    pub pin: String,
    /// Room to enrol the student into. Must belong to the caller.
    #[schema(value_type = Option<String>, format = "uuid")]
    pub room_id: Option<RoomId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    /// Login email derived from the username
    pub email: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub room_id: Option<RoomId>,
}

/// Request body for resetting a student's PIN
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PinReset {
    pub pin: String,
}
