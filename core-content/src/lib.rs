//! # Core Content
//!
//! Blog content storage for the student portal.
//!
//! ## Overview
//!
//! This crate owns both representations of a blog post:
//! - **Canonical** posts (`canonical_blogs`), shown on the public site
//! - **Admin** entries (`admin_blogs`), edited in the admin console with a
//!   `draft` / `published` / `archived` workflow
//!
//! Both tables are served through [`SqliteRecordStore`], a schema-driven
//! implementation of `bridge_traits::RecordStore`. Slugs are unique per table.
//!
//! ## Usage
//!
//! ```ignore
//! use core_content::{create_pool, DatabaseConfig, SqliteRecordStore};
//!
//! let pool = create_pool(DatabaseConfig::new("portal.db")).await?;
//! let canonical = SqliteRecordStore::canonical(pool.clone());
//! let admin = SqliteRecordStore::admin(pool);
//! ```

pub mod db;
pub mod error;
pub mod models;
pub mod schema;
pub mod store;

pub use db::{create_pool, create_test_pool, health_check, DatabaseConfig};
pub use error::{ContentError, Result};
pub use models::{AdminEntity, AdminStatus, CanonicalEntity};
pub use schema::{admin, canonical, TableSchema};
pub use store::SqliteRecordStore;
