//! PostgreSQL datastore built on the table repositories.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{AccountStore, ChatbotStore, MembershipStore, RoomStore};
use crate::access::RoomCode;
use crate::db::{
    errors::{DbError, Result},
    handlers::{Accounts, Chatbots, Memberships, Repository, Rooms, StudentProfiles, rooms::RoomFilter},
    models::{
        accounts::{AccountCreateDBRequest, AccountDBResponse},
        chatbots::{ChatbotCreateDBRequest, ChatbotDBResponse},
        memberships::{MembershipDBResponse, RoomMemberDBResponse},
        profiles::{StudentProfileCreateDBRequest, StudentProfileDBResponse},
        rooms::{RoomCreateDBRequest, RoomDBResponse, RoomUpdateDBRequest},
    },
};
use crate::types::{ChatbotId, RoomId, UserId};

/// Upper bound on rooms returned for a single teacher
const MAX_ROOMS_PER_TEACHER: i64 = 1000;

#[derive(Clone)]
pub struct PgDatastore {
    pool: PgPool,
}

impl PgDatastore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RoomStore for PgDatastore {
    async fn find_room_by_code(&self, code: &RoomCode) -> Result<Option<RoomDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Rooms::new(&mut conn).get_by_code(code.as_str()).await
    }

    async fn find_room(&self, id: RoomId) -> Result<Option<RoomDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Rooms::new(&mut conn).get_by_id(id).await
    }

    async fn list_rooms(&self, teacher_id: UserId) -> Result<Vec<RoomDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Rooms::new(&mut conn)
            .list(&RoomFilter::new(0, MAX_ROOMS_PER_TEACHER).for_teacher(teacher_id))
            .await
    }

    async fn create_room(&self, request: &RoomCreateDBRequest) -> Result<RoomDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Rooms::new(&mut conn).create(request).await
    }

    async fn update_room(&self, id: RoomId, request: &RoomUpdateDBRequest) -> Result<RoomDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Rooms::new(&mut conn).update(id, request).await
    }

    async fn delete_room(&self, id: RoomId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Rooms::new(&mut conn).delete(id).await
    }

    async fn count_room_chatbots(&self, room_id: RoomId) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        Rooms::new(&mut conn).count_chatbots(room_id).await
    }

    async fn attach_chatbot(&self, room_id: RoomId, chatbot_id: ChatbotId) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Rooms::new(&mut conn).attach_chatbot(room_id, chatbot_id).await
    }

    async fn detach_chatbot(&self, room_id: RoomId, chatbot_id: ChatbotId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Rooms::new(&mut conn).detach_chatbot(room_id, chatbot_id).await
    }
}

#[async_trait]
impl ChatbotStore for PgDatastore {
    async fn create_chatbot(&self, request: &ChatbotCreateDBRequest) -> Result<ChatbotDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Chatbots::new(&mut conn).create(request).await
    }

    async fn find_chatbot(&self, id: ChatbotId) -> Result<Option<ChatbotDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Chatbots::new(&mut conn).get_by_id(id).await
    }

    async fn list_chatbots(&self, teacher_id: UserId) -> Result<Vec<ChatbotDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Chatbots::new(&mut conn).list_for_teacher(teacher_id).await
    }
}

#[async_trait]
impl MembershipStore for PgDatastore {
    async fn find_membership(&self, room_id: RoomId, student_id: UserId) -> Result<Option<MembershipDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Memberships::new(&mut conn).get(room_id, student_id).await
    }

    async fn insert_membership(&self, room_id: RoomId, student_id: UserId) -> Result<MembershipDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Memberships::new(&mut conn).insert(room_id, student_id).await
    }

    async fn list_room_members(&self, room_id: RoomId) -> Result<Vec<RoomMemberDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Memberships::new(&mut conn).list_for_room(room_id).await
    }
}

#[async_trait]
impl AccountStore for PgDatastore {
    async fn find_account(&self, id: UserId) -> Result<Option<AccountDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Accounts::new(&mut conn).get_by_id(id).await
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<AccountDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Accounts::new(&mut conn).get_by_email(email).await
    }

    async fn create_account(&self, request: &AccountCreateDBRequest) -> Result<AccountDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Accounts::new(&mut conn).create(request).await
    }

    async fn find_profile(&self, user_id: UserId) -> Result<Option<StudentProfileDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        StudentProfiles::new(&mut conn).get_by_user_id(user_id).await
    }

    async fn find_profile_by_username(&self, username: &str) -> Result<Option<StudentProfileDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        StudentProfiles::new(&mut conn).get_by_username(username).await
    }

    async fn create_student(
        &self,
        account: &AccountCreateDBRequest,
        profile: &StudentProfileCreateDBRequest,
    ) -> Result<(AccountDBResponse, StudentProfileDBResponse)> {
        let mut tx = self.pool.begin().await?;
        let account = Accounts::new(&mut tx).create_with_id(Uuid::new_v4(), account).await?;
        let profile = StudentProfiles::new(&mut tx).create(account.id, profile).await?;
        tx.commit().await?;

        Ok((account, profile))
    }

    async fn update_student_pin(&self, user_id: UserId, pin_hash: &str, password_hash: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        StudentProfiles::new(&mut tx).update_pin_hash(user_id, pin_hash).await?;
        Accounts::new(&mut tx).update_password_hash(user_id, password_hash).await?;
        tx.commit().await.map_err(DbError::from)
    }
}
