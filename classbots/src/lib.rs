//! # classbots: classroom access to AI chatbots
//!
//! Teachers create rooms identified by a 6-character code and attach chatbots to them. Students
//! sign in with a username and PIN, enter a room code, and are linked to the room on first access.
//!
//! ## Request Flow
//!
//! A student reaches a room's chatbots through the checks in [`access`]:
//!
//! 1. **Room code** ([`access::room_code`]): uppercased, then exactly six characters from `[A-Z0-9]`
//! 2. **Lookup and gate** ([`access::rooms`]): the code names a room (404) that is active (400)
//! 3. **Membership** ([`access::membership`]): the student/room link is created on first access;
//!    a concurrent insert of the same link is treated as success
//! 4. **PIN login** ([`access::pin`]): username and PIN are checked against the student profile,
//!    then exchanged for a session using the account's credential. The account is first looked
//!    up under the derived identifier `{username}@{derived_email_domain}`, then under the stored
//!    email for older accounts. Every failure returns the same 401 body.
//!
//! Teachers log in with email and password and manage rooms, chatbots and student accounts under
//! `/api/teacher/*`.
//!
//! ## Architecture
//!
//! The HTTP layer is [Axum](https://github.com/tokio-rs/axum). Handlers reach persistence through
//! an injected [`Datastore`](store::Datastore): [`PgDatastore`](store::PgDatastore) over
//! PostgreSQL, or [`InMemoryDatastore`](store::InMemoryDatastore) when no database URL is
//! configured. The room cache ([`cache`]) and rate limiters ([`limits`]) are built once in
//! [`Application::new`] and shared through [`AppState`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use classbots::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = classbots::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     classbots::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod access;
pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod errors;
pub mod limits;
mod openapi;
pub mod store;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    access::RoomCache,
    auth::password::{Argon2Params, DecoyHash, hash_secret},
    config::CorsOrigin,
    db::models::accounts::AccountCreateDBRequest,
    limits::Limiters,
    openapi::ApiDoc,
    store::{Datastore, InMemoryDatastore, PgDatastore},
    types::Role,
};
use axum::{
    Json, Router,
    http::{self, HeaderValue},
    routing::{delete, get, patch, post, put},
};
use bon::Builder;
pub use config::Config;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument, warn};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{ChatbotId, RoomId, UserId};

/// Application state shared across all request handlers.
///
/// # Fields
///
/// - `store`: Persistence capability, PostgreSQL or in-memory
/// - `config`: Application configuration loaded from environment/files
/// - `limiters`: Rate limiters for PIN login and room code checks
/// - `room_cache`: Room lookups by code, invalidated when a room changes
/// - `decoy_hash`: Verified when a login names an unknown account
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .store(Arc::new(InMemoryDatastore::new()))
///     .limiters(Limiters::new(&config.limits))
///     .room_cache(RoomCache::from_config(&config.cache))
///     .decoy_hash(DecoyHash::from(&config.auth.native.password))
///     .config(config)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub store: Arc<dyn Datastore>,
    pub config: Config,
    pub limiters: Limiters,
    pub room_cache: RoomCache,
    pub decoy_hash: DecoyHash,
}

impl AppState {
    /// State with the cache and limiters built from `config`
    pub fn from_config(config: Config, store: Arc<dyn Datastore>) -> Self {
        AppState::builder()
            .store(store)
            .limiters(Limiters::new(&config.limits))
            .room_cache(RoomCache::from_config(&config.cache))
            .decoy_hash(DecoyHash::from(&config.auth.native.password))
            .config(config)
            .build()
    }
}

/// Get the classbots database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the configured teacher account if it doesn't exist.
///
/// Does nothing unless both `teacher_email` and `teacher_password` are set. An existing account
/// is left untouched; an existing account with the student role is an error.
///
/// Returns the teacher's account id, if one is configured.
#[instrument(skip_all)]
pub async fn create_initial_teacher(store: &dyn Datastore, config: &Config) -> anyhow::Result<Option<UserId>> {
    let (Some(email), Some(password)) = (config.teacher_email.as_deref(), config.teacher_password.as_deref()) else {
        return Ok(None);
    };
    let email = email.trim();

    if let Some(existing) = store.find_account_by_email(email).await? {
        if existing.role != Role::Teacher {
            anyhow::bail!("Configured teacher_email {email} belongs to a student account");
        }
        debug!(account_id = %existing.id, "Initial teacher already exists");
        return Ok(Some(existing.id));
    }

    let password_hash = hash_secret(password.to_string(), Argon2Params::from(&config.auth.native.password)).await?;
    let account = store
        .create_account(&AccountCreateDBRequest {
            email: email.to_string(),
            password_hash,
            role: Role::Teacher,
        })
        .await?;

    info!(account_id = %account.id, "Created initial teacher account");
    Ok(Some(account.id))
}

/// Connect to PostgreSQL and run migrations, or fall back to the in-memory store
async fn setup_store(config: &Config) -> anyhow::Result<(Arc<dyn Datastore>, Option<PgPool>)> {
    let Some(url) = config.database.url.as_deref() else {
        warn!("No database URL configured, using the in-memory datastore. Data will be lost on shutdown");
        return Ok((Arc::new(InMemoryDatastore::new()), None));
    };

    info!("Using external database");
    let settings = &config.database.pool;
    // 0 means never
    let optional_secs = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout(optional_secs(settings.idle_timeout_secs))
        .max_lifetime(optional_secs(settings.max_lifetime_secs))
        .connect(url)
        .await?;

    if config.run_migrations() {
        migrator().run(&pool).await?;
    }

    Ok((Arc::new(PgDatastore::new(pool.clone())), Some(pool)))
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.auth.security.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::PATCH,
            http::Method::DELETE,
        ])
        .allow_headers(vec![http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
        .allow_credentials(config.auth.security.cors.allow_credentials)
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = config.auth.security.cors.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the main application router with all endpoints and middleware.
///
/// - Authentication routes (`/api/auth/*`)
/// - Student routes (`/api/student/*`)
/// - Teacher routes (`/api/teacher/*`)
/// - Health check, OpenAPI document and viewer
/// - CORS and tracing layers
///
/// # Errors
///
/// Returns an error if the CORS configuration is invalid.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors_layer = create_cors_layer(&state.config)?;

    let auth_routes = Router::new()
        .route("/student-pin-login", post(api::handlers::auth::student_pin_login))
        .route("/login", post(api::handlers::auth::login))
        .route("/logout", post(api::handlers::auth::logout))
        .route("/me", get(api::handlers::auth::me));

    let student_routes = Router::new()
        .route("/verify-room-code", get(api::handlers::student::verify_room_code))
        .route("/verify-membership", get(api::handlers::student::verify_membership))
        .route("/join-room", post(api::handlers::student::join_room));

    let teacher_routes = Router::new()
        // Rooms
        .route("/rooms", get(api::handlers::rooms::list_rooms))
        .route("/rooms", post(api::handlers::rooms::create_room))
        .route("/rooms/{room_id}", patch(api::handlers::rooms::update_room))
        .route("/rooms/{room_id}", delete(api::handlers::rooms::delete_room))
        .route("/rooms/{room_id}/members", get(api::handlers::rooms::list_room_members))
        .route("/rooms/{room_id}/chatbots/{chatbot_id}", post(api::handlers::rooms::attach_chatbot))
        .route("/rooms/{room_id}/chatbots/{chatbot_id}", delete(api::handlers::rooms::detach_chatbot))
        // Chatbots
        .route("/chatbots", get(api::handlers::chatbots::list_chatbots))
        .route("/chatbots", post(api::handlers::chatbots::create_chatbot))
        // Students
        .route("/students", post(api::handlers::students::create_student))
        .route("/students/{student_id}/pin", put(api::handlers::students::reset_student_pin));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/student", student_routes)
        .nest("/teacher", teacher_routes);

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api", api_routes)
        .with_state(state)
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(cors_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// The HTTP server and the resources it owns.
///
/// 1. **Create**: [`Application::new`] connects the datastore, runs migrations, creates the
///    initial teacher, and builds the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown signal is received, stops accepting requests and closes
///    the database pool
pub struct Application {
    router: Router,
    config: Config,
    pool: Option<PgPool>,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting classbots with configuration: {:#?}", config);

        let (store, pool) = setup_store(&config).await?;
        create_initial_teacher(store.as_ref(), &config).await?;

        let mut app = Self::with_store(config, store)?;
        app.pool = pool;
        Ok(app)
    }

    /// Create an application over an existing datastore
    pub fn with_store(config: Config, store: Arc<dyn Datastore>) -> anyhow::Result<Self> {
        let app_state = AppState::from_config(config.clone(), store);
        let router = build_router(app_state)?;

        Ok(Self { router, config, pool: None })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "classbots listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{Application, create_cors_layer, create_initial_teacher};
    use crate::{
        config::CorsOrigin,
        store::{AccountStore, InMemoryDatastore},
        test_utils::{create_test_app, create_test_config, seed_student},
        types::Role,
    };
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_healthz() {
        let server = create_test_app(InMemoryDatastore::new());
        let response = server.get("/healthz").await;
        response.assert_status_ok();
        response.assert_text("OK");
    }

    #[tokio::test]
    async fn test_openapi_document_served() {
        let server = create_test_app(InMemoryDatastore::new());
        let response = server.get("/api-docs/openapi.json").await;
        response.assert_status_ok();
        let doc: Value = response.json();
        assert!(doc["paths"]["/api/auth/student-pin-login"].is_object());

        server.get("/docs").await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let server = create_test_app(InMemoryDatastore::new());
        server.get("/api/nope").await.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_initial_teacher_created_once() {
        let store = InMemoryDatastore::new();
        let mut config = create_test_config();
        config.teacher_email = Some("head@school.test".to_string());
        config.teacher_password = Some("password123".to_string());

        let first = create_initial_teacher(&store, &config).await.unwrap();
        let second = create_initial_teacher(&store, &config).await.unwrap();
        assert!(first.is_some());
        assert_eq!(first, second);

        let account = store.find_account_by_email("HEAD@school.test").await.unwrap().unwrap();
        assert_eq!(account.role, Role::Teacher);

        // The configured teacher can log in
        let server = Application::with_store(config, Arc::new(store)).unwrap().into_test_server();
        server
            .post("/api/auth/login")
            .json(&json!({"email": "head@school.test", "password": "password123"}))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_initial_teacher_skipped_without_config() {
        let store = InMemoryDatastore::new();
        let config = create_test_config();
        assert_eq!(create_initial_teacher(&store, &config).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_initial_teacher_refuses_student_account() {
        let store = InMemoryDatastore::new();
        let mut config = create_test_config();
        seed_student(&store, &config, "student1", "1234").await;
        config.teacher_email = Some("student1@student.classbots.local".to_string());
        config.teacher_password = Some("password123".to_string());

        assert!(create_initial_teacher(&store, &config).await.is_err());
    }

    #[test]
    fn test_cors_layer_accepts_configured_origins() {
        let mut config = create_test_config();
        config.auth.security.cors.allowed_origins = vec![
            CorsOrigin::Url("https://classbots.example.com".parse().unwrap()),
            CorsOrigin::Url("http://localhost:3000".parse().unwrap()),
        ];
        assert!(create_cors_layer(&config).is_ok());
    }

    #[tokio::test]
    async fn test_end_to_end_student_flow() {
        use crate::test_utils::{seed_room, seed_teacher};

        let store = InMemoryDatastore::new();
        let config = create_test_config();
        let teacher = seed_teacher(&store, &config, "t@school.test", "password123").await;
        let room = seed_room(&store, teacher.id, "AB12CD", true).await;
        let student = seed_student(&store, &config, "student1", "1234").await;
        let server = create_test_app(store);

        let login: Value = server
            .post("/api/auth/student-pin-login")
            .json(&json!({"username": "student1", "pin": "1234"}))
            .await
            .json();
        assert_eq!(login["user_id"], student.user_id.to_string());
        let token = login["session"]["access_token"].as_str().unwrap().to_string();

        let verified: Value = server
            .get("/api/student/verify-room-code")
            .add_query_param("code", "ab12cd")
            .await
            .json();
        assert_eq!(verified["room"]["room_id"], room.id.to_string());

        let joined = server
            .post("/api/student/join-room")
            .add_header("authorization", format!("Bearer {token}"))
            .json(&json!({"room_code": "ab12cd"}))
            .await;
        joined.assert_status_ok();
        let joined: Value = joined.json();
        assert_eq!(joined["newly_joined"], true);
    }
}
