use bridge_traits::error::BridgeError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a single item, or a whole run, could not be reconciled.
///
/// Every variant is captured at the reconciler boundary and reported as data;
/// none of them aborts a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SyncError {
    #[error("Record {id} not found in {store}")]
    SourceNotFound { store: String, id: String },

    #[error("Slug '{slug}' is already owned by another record in {store}")]
    SlugConflict { store: String, slug: String },

    #[error("{store} did not answer {operation} within {timeout_ms} ms")]
    StoreTimeout {
        store: String,
        operation: String,
        timeout_ms: u64,
    },

    #[error("{store} unavailable: {message}")]
    StoreUnavailable { store: String, message: String },

    #[error("Invalid value for {field}: {message}")]
    ValidationFailure { field: String, message: String },

    #[error("Invalid sync direction: {value}")]
    InvalidDirection { value: String },
}

impl SyncError {
    /// Translate a store error raised by `store`
    pub fn from_bridge(store: &str, err: BridgeError) -> Self {
        match err {
            BridgeError::UniqueViolation(detail) => SyncError::SlugConflict {
                store: store.to_string(),
                slug: detail,
            },
            BridgeError::InvalidInput { field, message } => {
                SyncError::ValidationFailure { field, message }
            }
            other => SyncError::StoreUnavailable {
                store: store.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// Stable machine-readable name of the variant
    pub fn code(&self) -> &'static str {
        match self {
            SyncError::SourceNotFound { .. } => "SourceNotFound",
            SyncError::SlugConflict { .. } => "SlugConflict",
            SyncError::StoreTimeout { .. } => "StoreTimeout",
            SyncError::StoreUnavailable { .. } => "StoreUnavailable",
            SyncError::ValidationFailure { .. } => "ValidationFailure",
            SyncError::InvalidDirection { .. } => "InvalidDirection",
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
