//! In-memory datastore.
//!
//! Stores everything in process-local maps behind a single lock. It is used by the test
//! suite and by local runs without a database URL. Data is lost on restart.
//!
//! Uniqueness (room codes, case-insensitive emails and usernames, membership pairs),
//! references and cascades mirror the PostgreSQL schema so that callers see the same
//! errors from either implementation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{AccountStore, ChatbotStore, MembershipStore, RoomStore, constraints};
use crate::access::RoomCode;
use crate::db::{
    errors::{DbError, Result},
    models::{
        accounts::{AccountCreateDBRequest, AccountDBResponse},
        chatbots::{ChatbotCreateDBRequest, ChatbotDBResponse},
        memberships::{MembershipDBResponse, RoomMemberDBResponse},
        profiles::{StudentProfileCreateDBRequest, StudentProfileDBResponse},
        rooms::{RoomCreateDBRequest, RoomDBResponse, RoomUpdateDBRequest},
    },
};
use crate::types::{ChatbotId, RoomId, UserId};

#[derive(Default)]
struct Tables {
    accounts: HashMap<UserId, AccountDBResponse>,
    profiles: HashMap<UserId, StudentProfileDBResponse>,
    rooms: HashMap<RoomId, RoomDBResponse>,
    chatbots: HashMap<ChatbotId, ChatbotDBResponse>,
    room_chatbots: HashSet<(RoomId, ChatbotId)>,
    memberships: HashMap<(RoomId, UserId), MembershipDBResponse>,
}

impl Tables {
    fn email_taken(&self, email: &str) -> bool {
        self.accounts.values().any(|a| a.email.eq_ignore_ascii_case(email))
    }

    fn username_taken(&self, username: &str) -> bool {
        self.profiles.values().any(|p| p.username.eq_ignore_ascii_case(username))
    }
}

fn unique_violation(table: &str, constraint: &str, value: &str) -> DbError {
    DbError::UniqueViolation {
        constraint: Some(constraint.to_string()),
        table: Some(table.to_string()),
        message: format!("duplicate key value violates unique constraint \"{constraint}\""),
        conflicting_value: Some(value.to_string()),
    }
}

fn foreign_key_violation(table: &str, constraint: &str) -> DbError {
    DbError::ForeignKeyViolation {
        constraint: Some(constraint.to_string()),
        table: Some(table.to_string()),
        message: format!("insert or update on table \"{table}\" violates foreign key constraint \"{constraint}\""),
    }
}

/// In-memory implementation of [`Datastore`](super::Datastore).
#[derive(Clone, Default)]
pub struct InMemoryDatastore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomStore for InMemoryDatastore {
    async fn find_room_by_code(&self, code: &RoomCode) -> Result<Option<RoomDBResponse>> {
        let tables = self.tables.read();
        Ok(tables.rooms.values().find(|r| r.room_code == code.as_str()).cloned())
    }

    async fn find_room(&self, id: RoomId) -> Result<Option<RoomDBResponse>> {
        Ok(self.tables.read().rooms.get(&id).cloned())
    }

    async fn list_rooms(&self, teacher_id: UserId) -> Result<Vec<RoomDBResponse>> {
        let tables = self.tables.read();
        let mut rooms: Vec<_> = tables.rooms.values().filter(|r| r.teacher_id == teacher_id).cloned().collect();
        rooms.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rooms)
    }

    async fn create_room(&self, request: &RoomCreateDBRequest) -> Result<RoomDBResponse> {
        let mut tables = self.tables.write();

        if tables.rooms.values().any(|r| r.room_code == request.room_code) {
            return Err(unique_violation("rooms", constraints::ROOM_CODE_UNIQUE, &request.room_code));
        }
        if !tables.accounts.contains_key(&request.teacher_id) {
            return Err(foreign_key_violation("rooms", "rooms_teacher_id_fkey"));
        }

        let now = Utc::now();
        let room = RoomDBResponse {
            id: Uuid::new_v4(),
            room_code: request.room_code.clone(),
            room_name: request.room_name.clone(),
            is_active: true,
            teacher_id: request.teacher_id,
            created_at: now,
            updated_at: now,
        };
        tables.rooms.insert(room.id, room.clone());
        Ok(room)
    }

    async fn update_room(&self, id: RoomId, request: &RoomUpdateDBRequest) -> Result<RoomDBResponse> {
        let mut tables = self.tables.write();
        let room = tables.rooms.get_mut(&id).ok_or(DbError::NotFound)?;

        if let Some(name) = &request.room_name {
            room.room_name = name.clone();
        }
        if let Some(is_active) = request.is_active {
            room.is_active = is_active;
        }
        room.updated_at = Utc::now();
        Ok(room.clone())
    }

    async fn delete_room(&self, id: RoomId) -> Result<bool> {
        let mut tables = self.tables.write();
        if tables.rooms.remove(&id).is_none() {
            return Ok(false);
        }
        tables.memberships.retain(|(room_id, _), _| *room_id != id);
        tables.room_chatbots.retain(|(room_id, _)| *room_id != id);
        Ok(true)
    }

    async fn count_room_chatbots(&self, room_id: RoomId) -> Result<i64> {
        let tables = self.tables.read();
        Ok(tables.room_chatbots.iter().filter(|(r, _)| *r == room_id).count() as i64)
    }

    async fn attach_chatbot(&self, room_id: RoomId, chatbot_id: ChatbotId) -> Result<()> {
        let mut tables = self.tables.write();
        if !tables.rooms.contains_key(&room_id) {
            return Err(foreign_key_violation("room_chatbots", "room_chatbots_room_id_fkey"));
        }
        if !tables.chatbots.contains_key(&chatbot_id) {
            return Err(foreign_key_violation("room_chatbots", "room_chatbots_chatbot_id_fkey"));
        }
        tables.room_chatbots.insert((room_id, chatbot_id));
        Ok(())
    }

    async fn detach_chatbot(&self, room_id: RoomId, chatbot_id: ChatbotId) -> Result<bool> {
        Ok(self.tables.write().room_chatbots.remove(&(room_id, chatbot_id)))
    }
}

#[async_trait]
impl ChatbotStore for InMemoryDatastore {
    async fn create_chatbot(&self, request: &ChatbotCreateDBRequest) -> Result<ChatbotDBResponse> {
        let mut tables = self.tables.write();
        if !tables.accounts.contains_key(&request.teacher_id) {
            return Err(foreign_key_violation("chatbots", "chatbots_teacher_id_fkey"));
        }

        let chatbot = ChatbotDBResponse {
            id: Uuid::new_v4(),
            teacher_id: request.teacher_id,
            name: request.name.clone(),
            model: request.model.clone(),
            system_prompt: request.system_prompt.clone(),
            created_at: Utc::now(),
        };
        tables.chatbots.insert(chatbot.id, chatbot.clone());
        Ok(chatbot)
    }

    async fn find_chatbot(&self, id: ChatbotId) -> Result<Option<ChatbotDBResponse>> {
        Ok(self.tables.read().chatbots.get(&id).cloned())
    }

    async fn list_chatbots(&self, teacher_id: UserId) -> Result<Vec<ChatbotDBResponse>> {
        let tables = self.tables.read();
        let mut chatbots: Vec<_> = tables.chatbots.values().filter(|c| c.teacher_id == teacher_id).cloned().collect();
        chatbots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(chatbots)
    }
}

#[async_trait]
impl MembershipStore for InMemoryDatastore {
    async fn find_membership(&self, room_id: RoomId, student_id: UserId) -> Result<Option<MembershipDBResponse>> {
        Ok(self.tables.read().memberships.get(&(room_id, student_id)).cloned())
    }

    async fn insert_membership(&self, room_id: RoomId, student_id: UserId) -> Result<MembershipDBResponse> {
        let mut tables = self.tables.write();

        if tables.memberships.contains_key(&(room_id, student_id)) {
            return Err(unique_violation(
                "room_memberships",
                constraints::MEMBERSHIP_PKEY,
                &format!("{room_id}, {student_id}"),
            ));
        }
        if !tables.rooms.contains_key(&room_id) {
            return Err(foreign_key_violation("room_memberships", "room_memberships_room_id_fkey"));
        }
        if !tables.profiles.contains_key(&student_id) {
            return Err(foreign_key_violation("room_memberships", "room_memberships_student_id_fkey"));
        }

        let membership = MembershipDBResponse {
            room_id,
            student_id,
            joined_at: Utc::now(),
        };
        tables.memberships.insert((room_id, student_id), membership.clone());
        Ok(membership)
    }

    async fn list_room_members(&self, room_id: RoomId) -> Result<Vec<RoomMemberDBResponse>> {
        let tables = self.tables.read();
        let mut members: Vec<_> = tables
            .memberships
            .values()
            .filter(|m| m.room_id == room_id)
            .map(|m| {
                let profile = tables.profiles.get(&m.student_id);
                RoomMemberDBResponse {
                    student_id: m.student_id,
                    username: profile.map(|p| p.username.clone()),
                    display_name: profile.map(|p| p.display_name.clone()),
                    joined_at: m.joined_at,
                }
            })
            .collect();
        members.sort_by(|a, b| a.joined_at.cmp(&b.joined_at));
        Ok(members)
    }
}

#[async_trait]
impl AccountStore for InMemoryDatastore {
    async fn find_account(&self, id: UserId) -> Result<Option<AccountDBResponse>> {
        Ok(self.tables.read().accounts.get(&id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<AccountDBResponse>> {
        let tables = self.tables.read();
        Ok(tables.accounts.values().find(|a| a.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn create_account(&self, request: &AccountCreateDBRequest) -> Result<AccountDBResponse> {
        let mut tables = self.tables.write();
        if tables.email_taken(&request.email) {
            return Err(unique_violation("accounts", constraints::ACCOUNT_EMAIL_UNIQUE, &request.email));
        }

        let account = AccountDBResponse {
            id: Uuid::new_v4(),
            email: request.email.clone(),
            password_hash: request.password_hash.clone(),
            role: request.role,
            created_at: Utc::now(),
        };
        tables.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_profile(&self, user_id: UserId) -> Result<Option<StudentProfileDBResponse>> {
        Ok(self.tables.read().profiles.get(&user_id).cloned())
    }

    async fn find_profile_by_username(&self, username: &str) -> Result<Option<StudentProfileDBResponse>> {
        let tables = self.tables.read();
        Ok(tables.profiles.values().find(|p| p.username.eq_ignore_ascii_case(username)).cloned())
    }

    async fn create_student(
        &self,
        account: &AccountCreateDBRequest,
        profile: &StudentProfileCreateDBRequest,
    ) -> Result<(AccountDBResponse, StudentProfileDBResponse)> {
        let mut tables = self.tables.write();

        // Both checks run before either insert so a failure leaves nothing behind
        if tables.email_taken(&account.email) {
            return Err(unique_violation("accounts", constraints::ACCOUNT_EMAIL_UNIQUE, &account.email));
        }
        if tables.username_taken(&profile.username) {
            return Err(unique_violation("student_profiles", constraints::USERNAME_UNIQUE, &profile.username));
        }

        let now = Utc::now();
        let account = AccountDBResponse {
            id: Uuid::new_v4(),
            email: account.email.clone(),
            password_hash: account.password_hash.clone(),
            role: account.role,
            created_at: now,
        };
        let profile = StudentProfileDBResponse {
            user_id: account.id,
            username: profile.username.clone(),
            display_name: profile.display_name.clone(),
            pin_hash: profile.pin_hash.clone(),
            created_at: now,
        };
        tables.accounts.insert(account.id, account.clone());
        tables.profiles.insert(profile.user_id, profile.clone());
        Ok((account, profile))
    }

    async fn update_student_pin(&self, user_id: UserId, pin_hash: &str, password_hash: &str) -> Result<()> {
        let mut tables = self.tables.write();
        if !tables.profiles.contains_key(&user_id) || !tables.accounts.contains_key(&user_id) {
            return Err(DbError::NotFound);
        }
        if let Some(profile) = tables.profiles.get_mut(&user_id) {
            profile.pin_hash = pin_hash.to_string();
        }
        if let Some(account) = tables.accounts.get_mut(&user_id) {
            account.password_hash = password_hash.to_string();
        }
        Ok(())
    }
}
