use thiserror::Error;

/// Errors returned to callers of the service façade.
///
/// Reconciliation failures are not errors at this level; they are part of
/// the response body.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid sync direction '{0}' (expected canonical-to-admin or admin-to-canonical)")]
    InvalidDirection(String),

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Storage error: {0}")]
    Content(#[from] core_content::ContentError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
