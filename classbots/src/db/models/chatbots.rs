//! Database models for chatbots.

use crate::types::{ChatbotId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for creating a chatbot
#[derive(Debug, Clone)]
pub struct ChatbotCreateDBRequest {
    pub teacher_id: UserId,
    pub name: String,
    pub model: String,
    pub system_prompt: String,
}

/// Database response for a chatbot
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ChatbotDBResponse {
    pub id: ChatbotId,
    pub teacher_id: UserId,
    pub name: String,
    pub model: String,
    pub system_prompt: String,
    pub created_at: DateTime<Utc>,
}
