//! Database layer for data persistence and access.
//!
//! This module implements the PostgreSQL data access layer using SQLx. It follows the
//! Repository pattern: each table gets a small repository struct wrapping a connection.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │  Datastore   │  (crate::store - the capability the access flow depends on)
//! └──────┬───────┘
//!        │
//!        ↓
//! ┌──────────────┐
//! │ Repositories │  (db::handlers - queries)
//! └──────┬───────┘
//!        │
//!        ↓
//! ┌──────────────┐
//! │    Models    │  (db::models - database records)
//! └──────┬───────┘
//!        │
//!        ↓
//! ┌──────────────┐
//! │  PostgreSQL  │
//! └──────────────┘
//! ```
//!
//! # Transactions
//!
//! Repositories accept any `&mut PgConnection`, so they work with both pooled
//! connections and transactions:
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! let account = Accounts::new(&mut tx).create_with_id(id, &account_request).await?;
//! StudentProfiles::new(&mut tx).create(account.id, &profile_request).await?;
//! tx.commit().await?;
//! ```
//!
//! # Migrations
//!
//! Migrations live in the crate's `migrations/` directory and are embedded with
//! [`crate::migrator`]:
//!
//! ```ignore
//! classbots::migrator().run(&pool).await?;
//! ```

pub mod errors;
pub mod handlers;
pub mod models;
