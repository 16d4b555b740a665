//! Database repository for rooms and their chatbot associations.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::rooms::{RoomCreateDBRequest, RoomDBResponse, RoomUpdateDBRequest},
};
use crate::types::{ChatbotId, RoomId, UserId, abbrev_uuid};
use sqlx::PgConnection;
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing rooms
#[derive(Debug, Clone)]
pub struct RoomFilter {
    pub teacher_id: Option<UserId>,
    pub skip: i64,
    pub limit: i64,
}

impl RoomFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            teacher_id: None,
            skip,
            limit,
        }
    }

    pub fn for_teacher(mut self, teacher_id: UserId) -> Self {
        self.teacher_id = Some(teacher_id);
        self
    }
}

pub struct Rooms<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Rooms<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Look up a room by its (already normalized) code
    #[instrument(skip(self), err)]
    pub async fn get_by_code(&mut self, room_code: &str) -> Result<Option<RoomDBResponse>> {
        let room = sqlx::query_as::<_, RoomDBResponse>("SELECT * FROM rooms WHERE room_code = $1")
            .bind(room_code)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(room)
    }

    #[instrument(skip(self), fields(room_id = %abbrev_uuid(&room_id)), err)]
    pub async fn count_chatbots(&mut self, room_id: RoomId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM room_chatbots WHERE room_id = $1")
            .bind(room_id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }

    /// Attach a chatbot to a room. Attaching twice is a no-op.
    #[instrument(skip(self), fields(room_id = %abbrev_uuid(&room_id), chatbot_id = %abbrev_uuid(&chatbot_id)), err)]
    pub async fn attach_chatbot(&mut self, room_id: RoomId, chatbot_id: ChatbotId) -> Result<()> {
        sqlx::query("INSERT INTO room_chatbots (room_id, chatbot_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(room_id)
            .bind(chatbot_id)
            .execute(&mut *self.db)
            .await?;

        Ok(())
    }

    #[instrument(skip(self), fields(room_id = %abbrev_uuid(&room_id), chatbot_id = %abbrev_uuid(&chatbot_id)), err)]
    pub async fn detach_chatbot(&mut self, room_id: RoomId, chatbot_id: ChatbotId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM room_chatbots WHERE room_id = $1 AND chatbot_id = $2")
            .bind(room_id)
            .bind(chatbot_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Rooms<'c> {
    type CreateRequest = RoomCreateDBRequest;
    type UpdateRequest = RoomUpdateDBRequest;
    type Response = RoomDBResponse;
    type Id = RoomId;
    type Filter = RoomFilter;

    #[instrument(skip(self, request), fields(room_code = %request.room_code, teacher_id = %abbrev_uuid(&request.teacher_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let room = sqlx::query_as::<_, RoomDBResponse>(
            r#"
            INSERT INTO rooms (id, room_code, room_name, teacher_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.room_code)
        .bind(&request.room_name)
        .bind(request.teacher_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(room)
    }

    #[instrument(skip(self), fields(room_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let room = sqlx::query_as::<_, RoomDBResponse>("SELECT * FROM rooms WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(room)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<RoomId>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rooms = sqlx::query_as::<_, RoomDBResponse>("SELECT * FROM rooms WHERE id = ANY($1)")
            .bind(ids.as_slice())
            .fetch_all(&mut *self.db)
            .await?;

        Ok(rooms.into_iter().map(|room| (room.id, room)).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let rooms = sqlx::query_as::<_, RoomDBResponse>(
            r#"
            SELECT * FROM rooms
            WHERE ($1::uuid IS NULL OR teacher_id = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(filter.teacher_id)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(rooms)
    }

    /// Hard delete. Memberships and chatbot associations cascade.
    #[instrument(skip(self), fields(room_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(room_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let room = sqlx::query_as::<_, RoomDBResponse>(
            r#"
            UPDATE rooms SET
                room_name = COALESCE($2, room_name),
                is_active = COALESCE($3, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.room_name.as_deref())
        .bind(request.is_active)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(room)
    }
}
