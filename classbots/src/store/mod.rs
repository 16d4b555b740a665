//! Datastore capability used by the access-control flow and the HTTP handlers.
//!
//! Handlers never touch a connection pool directly: they go through an injected
//! `Arc<dyn Datastore>`. Two implementations exist:
//!
//! - [`PgDatastore`]: PostgreSQL, built on the repositories in [`crate::db::handlers`]
//! - [`InMemoryDatastore`]: process-local maps, used by tests and by local runs without a
//!   database URL. It enforces the same uniqueness and reference rules as the schema.
//!
//! The capability is split by concern ([`RoomStore`], [`ChatbotStore`], [`MembershipStore`],
//! [`AccountStore`]) so components can depend on only the part they use. [`Datastore`] is the
//! union and is implemented for every type implementing all four.
//!
//! Uniqueness failures surface as [`DbError::UniqueViolation`](crate::db::errors::DbError)
//! with the constraint names from the migrations, regardless of implementation.

use async_trait::async_trait;

use crate::access::RoomCode;
use crate::db::errors::Result;
use crate::db::models::{
    accounts::{AccountCreateDBRequest, AccountDBResponse},
    chatbots::{ChatbotCreateDBRequest, ChatbotDBResponse},
    memberships::{MembershipDBResponse, RoomMemberDBResponse},
    profiles::{StudentProfileCreateDBRequest, StudentProfileDBResponse},
    rooms::{RoomCreateDBRequest, RoomDBResponse, RoomUpdateDBRequest},
};
use crate::types::{ChatbotId, RoomId, UserId};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryDatastore;
pub use postgres::PgDatastore;

/// Constraint names shared by both implementations.
pub mod constraints {
    pub const ROOM_CODE_UNIQUE: &str = "rooms_room_code_key";
    pub const MEMBERSHIP_PKEY: &str = "room_memberships_pkey";
    pub const ACCOUNT_EMAIL_UNIQUE: &str = "accounts_email_lower_idx";
    pub const USERNAME_UNIQUE: &str = "student_profiles_username_lower_idx";
}

#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Look up a room by its normalized code
    async fn find_room_by_code(&self, code: &RoomCode) -> Result<Option<RoomDBResponse>>;

    async fn find_room(&self, id: RoomId) -> Result<Option<RoomDBResponse>>;

    /// Rooms owned by a teacher, newest first
    async fn list_rooms(&self, teacher_id: UserId) -> Result<Vec<RoomDBResponse>>;

    /// Insert a room. A taken code fails with a unique violation on `rooms_room_code_key`.
    async fn create_room(&self, request: &RoomCreateDBRequest) -> Result<RoomDBResponse>;

    /// Partial update. Missing rooms yield `DbError::NotFound`.
    async fn update_room(&self, id: RoomId, request: &RoomUpdateDBRequest) -> Result<RoomDBResponse>;

    /// Hard delete, cascading to memberships and chatbot associations
    async fn delete_room(&self, id: RoomId) -> Result<bool>;

    async fn count_room_chatbots(&self, room_id: RoomId) -> Result<i64>;

    /// Idempotent
    async fn attach_chatbot(&self, room_id: RoomId, chatbot_id: ChatbotId) -> Result<()>;

    async fn detach_chatbot(&self, room_id: RoomId, chatbot_id: ChatbotId) -> Result<bool>;
}

#[async_trait]
pub trait ChatbotStore: Send + Sync {
    async fn create_chatbot(&self, request: &ChatbotCreateDBRequest) -> Result<ChatbotDBResponse>;

    async fn find_chatbot(&self, id: ChatbotId) -> Result<Option<ChatbotDBResponse>>;

    async fn list_chatbots(&self, teacher_id: UserId) -> Result<Vec<ChatbotDBResponse>>;
}

#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn find_membership(&self, room_id: RoomId, student_id: UserId) -> Result<Option<MembershipDBResponse>>;

    /// Plain insert. An existing row fails with a unique violation on `room_memberships_pkey`.
    async fn insert_membership(&self, room_id: RoomId, student_id: UserId) -> Result<MembershipDBResponse>;

    async fn list_room_members(&self, room_id: RoomId) -> Result<Vec<RoomMemberDBResponse>>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_account(&self, id: UserId) -> Result<Option<AccountDBResponse>>;

    /// Case-insensitive
    async fn find_account_by_email(&self, email: &str) -> Result<Option<AccountDBResponse>>;

    async fn create_account(&self, request: &AccountCreateDBRequest) -> Result<AccountDBResponse>;

    async fn find_profile(&self, user_id: UserId) -> Result<Option<StudentProfileDBResponse>>;

    /// Case-insensitive
    async fn find_profile_by_username(&self, username: &str) -> Result<Option<StudentProfileDBResponse>>;

    /// Create a student account and its profile atomically. Both share one id.
    async fn create_student(
        &self,
        account: &AccountCreateDBRequest,
        profile: &StudentProfileCreateDBRequest,
    ) -> Result<(AccountDBResponse, StudentProfileDBResponse)>;

    /// Replace the profile PIN hash and the account password hash together
    async fn update_student_pin(&self, user_id: UserId, pin_hash: &str, password_hash: &str) -> Result<()>;
}

/// Everything the application needs from persistence.
pub trait Datastore: RoomStore + ChatbotStore + MembershipStore + AccountStore {}

impl<T> Datastore for T where T: RoomStore + ChatbotStore + MembershipStore + AccountStore {}
