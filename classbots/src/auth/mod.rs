//! Authentication and authorization.
//!
//! Every session is a signed JWT issued by [`credentials::CredentialExchange`] after an
//! email + password check. Teachers reach it directly through `/api/auth/login`; students go
//! through the PIN flow in [`crate::access::pin`], which resolves their username to an email
//! before exchanging.
//!
//! The token is handed back in the response body and as an HTTP-only cookie. Handlers take a
//! [`CurrentUser`](crate::api::models::users::CurrentUser) argument to require a session; the
//! extractor accepts either the cookie or an `Authorization: Bearer` header.
//!
//! # Modules
//!
//! - [`credentials`]: Email + password exchange distinguishing missing from rejected credentials
//! - [`current_user`]: Extractor for the authenticated user in handlers
//! - [`password`]: Argon2 hashing for passwords and PINs
//! - [`session`]: JWT creation and verification
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use classbots::api::models::users::CurrentUser;
//!
//! async fn protected_handler(current_user: CurrentUser) -> Result<String, Error> {
//!     current_user.require_teacher(Operation::Read, Resource::Rooms)?;
//!     Ok(format!("Hello, {}!", current_user.username))
//! }
//! ```

pub mod credentials;
pub mod current_user;
pub mod password;
pub mod session;
