//! Test utilities: configuration, seeded records, sessions, and test servers.

use std::sync::Arc;

use axum_test::TestServer;
use uuid::Uuid;

use crate::{
    AppState, Application,
    access::{RoomCode, pin::derived_email},
    api::models::users::CurrentUser,
    auth::{
        password::{Argon2Params, hash_string_with_params},
        session::create_session_token,
    },
    config::{Config, PasswordConfig},
    db::models::{
        accounts::{AccountCreateDBRequest, AccountDBResponse},
        chatbots::{ChatbotCreateDBRequest, ChatbotDBResponse},
        profiles::{StudentProfileCreateDBRequest, StudentProfileDBResponse},
        rooms::{RoomCreateDBRequest, RoomDBResponse, RoomUpdateDBRequest},
    },
    store::{Datastore, InMemoryDatastore},
    types::{Role, UserId},
};

/// Cheap Argon2 parameters so tests don't spend seconds hashing
pub fn fast_argon2_params() -> Argon2Params {
    Argon2Params {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    }
}

pub fn create_test_config() -> Config {
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        ..Default::default()
    };

    let fast = fast_argon2_params();
    config.auth.native.password = PasswordConfig {
        argon2_memory_kib: fast.memory_kib,
        argon2_iterations: fast.iterations,
        argon2_parallelism: fast.parallelism,
        ..Default::default()
    };
    config.auth.native.session.cookie_secure = false;
    config.limits.pin_login.max_requests = 5;

    config
}

pub fn create_test_state(store: InMemoryDatastore) -> AppState {
    AppState::from_config(create_test_config(), Arc::new(store))
}

pub fn create_test_app(store: InMemoryDatastore) -> TestServer {
    Application::with_store(create_test_config(), Arc::new(store))
        .expect("Failed to create application")
        .into_test_server()
}

fn hash(secret: &str, config: &Config) -> String {
    hash_string_with_params(secret, Some(Argon2Params::from(&config.auth.native.password))).expect("Failed to hash secret")
}

pub async fn seed_teacher<S: Datastore + ?Sized>(store: &S, config: &Config, email: &str, password: &str) -> AccountDBResponse {
    store
        .create_account(&AccountCreateDBRequest {
            email: email.to_string(),
            password_hash: hash(password, config),
            role: Role::Teacher,
        })
        .await
        .expect("Failed to seed teacher")
}

/// A student whose account email is the derived identifier and whose password is the PIN
pub async fn seed_student<S: Datastore + ?Sized>(store: &S, config: &Config, username: &str, pin: &str) -> StudentProfileDBResponse {
    let account = AccountCreateDBRequest {
        email: derived_email(username, &config.auth.pin.derived_email_domain),
        password_hash: hash(pin, config),
        role: Role::Student,
    };
    let profile = StudentProfileCreateDBRequest {
        username: username.to_string(),
        display_name: username.to_string(),
        pin_hash: hash(pin, config),
    };

    store.create_student(&account, &profile).await.expect("Failed to seed student").1
}

pub async fn seed_room<S: Datastore + ?Sized>(store: &S, teacher_id: UserId, code: &str, is_active: bool) -> RoomDBResponse {
    let code = RoomCode::parse(code).expect("Seeded room code must be valid");
    let room = store
        .create_room(&RoomCreateDBRequest {
            room_code: code.into_inner(),
            room_name: "Test Room".to_string(),
            teacher_id,
        })
        .await
        .expect("Failed to seed room");

    if is_active {
        return room;
    }
    store
        .update_room(
            room.id,
            &RoomUpdateDBRequest {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to deactivate seeded room")
}

pub async fn seed_chatbot<S: Datastore + ?Sized>(store: &S, teacher_id: UserId, name: &str) -> ChatbotDBResponse {
    store
        .create_chatbot(&ChatbotCreateDBRequest {
            teacher_id,
            name: name.to_string(),
            model: "gpt-4o-mini".to_string(),
            system_prompt: "You are a helpful tutor.".to_string(),
        })
        .await
        .expect("Failed to seed chatbot")
}

/// A teacher session for an account that doesn't exist in any store
pub fn teacher_user() -> CurrentUser {
    let id = Uuid::new_v4();
    CurrentUser {
        id,
        username: format!("teacher-{}", &id.simple().to_string()[..8]),
        email: format!("teacher-{}@school.test", &id.simple().to_string()[..8]),
        role: Role::Teacher,
        display_name: None,
    }
}

pub fn teacher_user_for(account: &AccountDBResponse) -> CurrentUser {
    CurrentUser {
        id: account.id,
        username: account.email.clone(),
        email: account.email.clone(),
        role: Role::Teacher,
        display_name: None,
    }
}

pub fn student_user(profile: &StudentProfileDBResponse) -> CurrentUser {
    CurrentUser {
        id: profile.user_id,
        username: profile.username.clone(),
        email: format!("{}@student.classbots.local", profile.username.to_lowercase()),
        role: Role::Student,
        display_name: Some(profile.display_name.clone()),
    }
}

/// `Authorization` header carrying a fresh session for `user`
pub fn auth_header(user: &CurrentUser, config: &Config) -> (String, String) {
    let session = create_session_token(user, config).expect("Failed to create session token");
    ("authorization".to_string(), format!("Bearer {}", session.access_token))
}
