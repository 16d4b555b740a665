//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Authentication** (`/api/auth/*`): PIN login, teacher login, logout, current user
//! - **Student** (`/api/student/*`): Room code verification, membership, joining rooms
//! - **Teacher** (`/api/teacher/*`): Rooms, chatbots, and student accounts
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with `utoipa`. The document is served at
//! `/api-docs/openapi.json` and rendered at `/docs`.

pub mod handlers;
pub mod models;
