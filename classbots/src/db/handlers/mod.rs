//! Repository implementations for database access.
//!
//! Each repository:
//! - Wraps a SQLx connection or transaction
//! - Provides strongly-typed operations for one table
//! - Returns models from [`crate::db::models`]
//!
//! # Available Repositories
//!
//! - [`Accounts`]: Credentials and roles
//! - [`StudentProfiles`]: Student usernames and PIN hashes
//! - [`Rooms`]: Rooms and room/chatbot associations (implements [`Repository`])
//! - [`Memberships`]: Room memberships
//! - [`Chatbots`]: Teacher-owned chatbots
//!
//! # Common Pattern
//!
//! ```ignore
//! use classbots::db::handlers::{Rooms, Repository};
//!
//! async fn example(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tx = pool.begin().await?;
//!     let mut repo = Rooms::new(&mut tx);
//!     let room = repo.get_by_code("AB12CD").await?;
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```

pub mod accounts;
pub mod chatbots;
pub mod memberships;
pub mod profiles;
pub mod repository;
pub mod rooms;

pub use accounts::Accounts;
pub use chatbots::Chatbots;
pub use memberships::Memberships;
pub use profiles::StudentProfiles;
pub use repository::Repository;
pub use rooms::Rooms;
