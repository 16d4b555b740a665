//! API request/response models for chatbots.

use crate::db::models::chatbots::ChatbotDBResponse;
use crate::types::{ChatbotId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatbotCreate {
    #[schema(example = "Photosynthesis helper")]
    pub name: String,
    #[schema(example = "gpt-4o-mini")]
    pub model: String,
    #[serde(default)]
    pub system_prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatbotResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ChatbotId,
    #[schema(value_type = String, format = "uuid")]
    pub teacher_id: UserId,
    pub name: String,
    pub model: String,
    pub system_prompt: String,
    pub created_at: DateTime<Utc>,
}

impl From<ChatbotDBResponse> for ChatbotResponse {
    fn from(db: ChatbotDBResponse) -> Self {
        Self {
            id: db.id,
            teacher_id: db.teacher_id,
            name: db.name,
            model: db.model,
            system_prompt: db.system_prompt,
            created_at: db.created_at,
        }
    }
}
