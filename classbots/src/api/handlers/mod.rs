//! HTTP request handlers for all API endpoints.
//!
//! Each handler validates its input, checks the caller's role and ownership where needed, runs
//! the operation against the injected [`Datastore`](crate::store::Datastore), and serializes the
//! response. Errors are returned as [`crate::errors::Error`], which renders the status code and
//! the `{"error", "code"}` body.
//!
//! # Handler Modules
//!
//! - [`auth`]: Student PIN login, teacher password login, logout, and the current session
//! - [`student`]: Room code verification, membership verification, and joining rooms
//! - [`rooms`]: Teacher room management, members, and chatbot attachment
//! - [`chatbots`]: Teacher chatbot creation and listing
//! - [`students`]: Teacher-managed student accounts and PIN resets
//!
//! # Authentication
//!
//! Handlers that need a session take a [`CurrentUser`](crate::api::models::users::CurrentUser)
//! argument. The extractor accepts the session cookie or an `Authorization: Bearer` header.

pub mod auth;
pub mod chatbots;
pub mod rooms;
pub mod student;
pub mod students;
