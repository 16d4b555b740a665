//! Database record models matching table schemas.
//!
//! These models are used by repositories to return query results and accept
//! insertion/update data. They are distinct from the API models in
//! [`crate::api::models`] so storage and wire representations can evolve separately.
//!
//! # Model Categories
//!
//! - [`accounts`]: Credentials that sessions are issued for (teachers and students)
//! - [`profiles`]: Student usernames, display names and PIN hashes
//! - [`rooms`]: Classrooms identified by a 6-character code
//! - [`memberships`]: Student to room links
//! - [`chatbots`]: Teacher-owned chatbots and their room associations

pub mod accounts;
pub mod chatbots;
pub mod memberships;
pub mod profiles;
pub mod rooms;
