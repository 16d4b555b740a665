//! API request and response data models.
//!
//! These types define the public API contract. They are kept separate from the database models
//! in [`crate::db::models`] so the wire format and the storage representation can change
//! independently. All of them are annotated with `utoipa` for the OpenAPI document.
//!
//! - [`auth`]: Login payloads, session bodies, and the cookie-carrying response wrapper
//! - [`users`]: The authenticated caller and its role checks
//! - [`rooms`]: Room code verification, membership, joining, and teacher room management
//! - [`chatbots`]: Chatbot creation and listing
//! - [`students`]: Teacher-managed student accounts

pub mod auth;
pub mod chatbots;
pub mod rooms;
pub mod students;
pub mod users;
