//! Database repository for chatbots.

use crate::db::{
    errors::Result,
    models::chatbots::{ChatbotCreateDBRequest, ChatbotDBResponse},
};
use crate::types::{ChatbotId, UserId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

pub struct Chatbots<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Chatbots<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(name = %request.name, teacher_id = %abbrev_uuid(&request.teacher_id)), err)]
    pub async fn create(&mut self, request: &ChatbotCreateDBRequest) -> Result<ChatbotDBResponse> {
        let chatbot = sqlx::query_as::<_, ChatbotDBResponse>(
            r#"
            INSERT INTO chatbots (id, teacher_id, name, model, system_prompt)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.teacher_id)
        .bind(&request.name)
        .bind(&request.model)
        .bind(&request.system_prompt)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(chatbot)
    }

    #[instrument(skip(self), fields(chatbot_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: ChatbotId) -> Result<Option<ChatbotDBResponse>> {
        let chatbot = sqlx::query_as::<_, ChatbotDBResponse>("SELECT * FROM chatbots WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(chatbot)
    }

    #[instrument(skip(self), fields(teacher_id = %abbrev_uuid(&teacher_id)), err)]
    pub async fn list_for_teacher(&mut self, teacher_id: UserId) -> Result<Vec<ChatbotDBResponse>> {
        let chatbots = sqlx::query_as::<_, ChatbotDBResponse>("SELECT * FROM chatbots WHERE teacher_id = $1 ORDER BY created_at DESC")
            .bind(teacher_id)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(chatbots)
    }
}
