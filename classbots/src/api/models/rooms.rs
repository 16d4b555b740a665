//! API request/response models for rooms and room access.

use crate::db::models::{memberships::RoomMemberDBResponse, rooms::RoomDBResponse};
use crate::types::{ChatbotId, RoomId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query for `GET /api/student/verify-room-code`
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct VerifyRoomCodeQuery {
    /// Room code, case-insensitive
    #[param(example = "AB12CD")]
    pub code: Option<String>,
}

/// The parts of a room a student may see
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoomSummary {
    #[schema(value_type = String, format = "uuid")]
    pub room_id: RoomId,
    pub room_name: String,
    pub room_code: String,
    pub is_active: bool,
}

impl From<&RoomDBResponse> for RoomSummary {
    fn from(room: &RoomDBResponse) -> Self {
        Self {
            room_id: room.id,
            room_name: room.room_name.clone(),
            room_code: room.room_code.clone(),
            is_active: room.is_active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyRoomCodeResponse {
    pub room: RoomSummary,
    /// Number of chatbots attached to the room
    pub chatbot_count: i64,
}

/// Query for `GET /api/student/verify-membership`. Ids are parsed by the handler so malformed
/// values get the standard error body.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyMembershipQuery {
    #[param(value_type = Option<String>, format = "uuid")]
    pub room_id: Option<String>,
    #[param(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyMembershipResponse {
    /// Always true on success
    pub is_member: bool,
    /// Whether this request created the membership
    pub newly_joined: bool,
}

/// Request body for a student joining a room
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct JoinRoomRequest {
    #[schema(example = "AB12CD")]
    pub room_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JoinRoomResponse {
    pub room: RoomSummary,
    pub newly_joined: bool,
}

/// Request body for creating a room. The code is generated.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoomCreate {
    #[schema(example = "Year 9 Science")]
    pub room_name: String,
    /// Chatbots to attach immediately. Each must belong to the caller.
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub chatbot_ids: Vec<ChatbotId>,
}

/// Request body for updating a room. Only provided fields change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RoomUpdate {
    pub room_name: Option<String>,
    pub is_active: Option<bool>,
}

/// Full room details for its teacher
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoomResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: RoomId,
    pub room_code: String,
    pub room_name: String,
    pub is_active: bool,
    #[schema(value_type = String, format = "uuid")]
    pub teacher_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RoomDBResponse> for RoomResponse {
    fn from(db: RoomDBResponse) -> Self {
        Self {
            id: db.id,
            room_code: db.room_code,
            room_name: db.room_name,
            is_active: db.is_active,
            teacher_id: db.teacher_id,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoomMemberResponse {
    #[schema(value_type = String, format = "uuid")]
    pub student_id: UserId,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub joined_at: DateTime<Utc>,
}

impl From<RoomMemberDBResponse> for RoomMemberResponse {
    fn from(db: RoomMemberDBResponse) -> Self {
        Self {
            student_id: db.student_id,
            username: db.username,
            display_name: db.display_name,
            joined_at: db.joined_at,
        }
    }
}
