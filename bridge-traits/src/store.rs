//! Record Store Abstraction
//!
//! The reconciliation engine reads and writes entities exclusively through the
//! [`RecordStore`] capability. Each entity type (canonical blogs, admin blogs)
//! is exposed as its own store instance; the engine never reaches into a
//! storage engine directly.
//!
//! ## Contract
//!
//! - `find_by_key` performs an exact match on a single field
//! - `insert` creates a record and returns it as persisted (store-assigned
//!   fields such as ids and creation timestamps filled in)
//! - `update` applies only the patch fields to an existing record and returns
//!   the persisted result; unmapped fields stay untouched
//! - `list_all` returns a finite snapshot and may be called repeatedly
//!
//! Writes are all-or-nothing per record. Stores make no atomicity promises
//! across records.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_traits::store::RecordStore;
//! use bridge_traits::record::FieldValue;
//!
//! async fn find_post(store: &dyn RecordStore) -> bridge_traits::error::Result<()> {
//!     if let Some(record) = store.find_by_key("slug", &FieldValue::text("future-of-ai")).await? {
//!         println!("found {:?}", record.get_str("title"));
//!     }
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::record::{FieldValue, Record};

/// Equality filter for [`RecordStore::list_all`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub field: String,
    pub value: FieldValue,
}

impl RecordFilter {
    pub fn equals(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Check whether a record satisfies this filter
    pub fn matches(&self, record: &Record) -> bool {
        match record.get(&self.field) {
            Some(value) => *value == self.value,
            None => self.value.is_null(),
        }
    }
}

/// Generic record store for one entity type
///
/// Implementations must be thread-safe; the engine shares stores across async
/// tasks behind `Arc<dyn RecordStore>`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Human-readable store name used in logs and reports
    fn name(&self) -> &'static str;

    /// Find a record by exact match on `key`
    ///
    /// # Returns
    /// - `Ok(Some(record))` if found
    /// - `Ok(None)` if no record matches
    /// - `Err` if the store is unreachable or the key is unknown
    async fn find_by_key(&self, key: &str, value: &FieldValue) -> Result<Option<Record>>;

    /// Insert a new record
    ///
    /// # Errors
    /// Returns error if:
    /// - A unique constraint is violated (`BridgeError::UniqueViolation`)
    /// - Required fields are missing (`BridgeError::InvalidInput`)
    /// - The store is unavailable
    async fn insert(&self, fields: Record) -> Result<Record>;

    /// Apply `patch` to `existing` and persist it
    ///
    /// # Errors
    /// Returns error if:
    /// - The record no longer exists (`BridgeError::NotFound`)
    /// - A unique constraint is violated
    /// - The store is unavailable
    async fn update(&self, existing: &Record, patch: Record) -> Result<Record>;

    /// List every record, optionally restricted by an equality filter
    async fn list_all(&self, filter: Option<RecordFilter>) -> Result<Vec<Record>>;
}
