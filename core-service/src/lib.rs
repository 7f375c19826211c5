//! Core service façade and bootstrap helpers.
//!
//! This crate is what callers (the admin HTTP endpoint, scheduled jobs, CLI
//! tools) talk to. It checks the caller's authorization decision, parses the
//! requested direction, runs the reconciliation engine and shapes the result
//! into the JSON responses the admin console expects:
//!
//! - `POST /sync?direction=...` → [`SyncAllResponse`]
//! - `POST /sync/{id}?direction=...` → [`SyncOneResponse`]
//!
//! Authentication itself happens upstream; the service only honours the
//! resulting [`AuthDecision`].

pub mod error;

pub use error::{Result, ServiceError};

use std::sync::Arc;

use bridge_traits::RecordStore;
use core_content::{create_pool, DatabaseConfig, SqliteRecordStore};
use core_runtime::config::{CoreConfig, CoreConfigBuilder};
use core_sync::{BatchReport, Direction, Outcome, SyncCoordinator};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use core_sync::SyncError;

/// Outcome of the upstream authorization check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Allowed { principal: String },
    Denied { reason: String },
}

impl AuthDecision {
    pub fn allowed(principal: impl Into<String>) -> Self {
        AuthDecision::Allowed {
            principal: principal.into(),
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        AuthDecision::Denied {
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// A record the batch could not reconcile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedEntry {
    pub id: String,
    /// Failure kind, e.g. `SlugConflict`
    pub reason: String,
    pub message: String,
}

/// Body returned by `POST /sync`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAllResponse {
    pub run_id: String,
    pub direction: Direction,
    /// Records created or updated
    pub total_synced: usize,
    pub created: usize,
    pub updated: usize,
    pub failed: Vec<FailedEntry>,
    pub skipped: usize,
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_error: Option<String>,
}

impl From<BatchReport> for SyncAllResponse {
    fn from(report: BatchReport) -> Self {
        Self {
            total_synced: report.succeeded(),
            run_id: report.run_id,
            direction: report.direction,
            created: report.created,
            updated: report.updated,
            failed: report
                .failed
                .into_iter()
                .map(|item| FailedEntry {
                    id: item.id,
                    reason: item.reason.code().to_string(),
                    message: item.reason.to_string(),
                })
                .collect(),
            skipped: report.skipped,
            cancelled: report.cancelled,
            source_error: report.source_error.map(|err| err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Created,
    Updated,
    Failed,
}

/// Body returned by `POST /sync/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOneResponse {
    pub status: SyncStatus,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    /// Failure kind, e.g. `SourceNotFound`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<Outcome> for SyncOneResponse {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Created {
                source_id,
                target_id,
            } => Self {
                status: SyncStatus::Created,
                id: source_id,
                target_id: Some(target_id),
                reason: None,
                message: None,
            },
            Outcome::Updated {
                source_id,
                target_id,
            } => Self {
                status: SyncStatus::Updated,
                id: source_id,
                target_id: Some(target_id),
                reason: None,
                message: None,
            },
            Outcome::Failed { source_id, reason } => Self {
                status: SyncStatus::Failed,
                id: source_id,
                target_id: None,
                message: Some(reason.to_string()),
                reason: Some(reason.code().to_string()),
            },
        }
    }
}

// ============================================================================
// Service
// ============================================================================

/// Primary façade exposed to callers.
#[derive(Clone)]
pub struct SyncService {
    coordinator: Arc<SyncCoordinator>,
}

impl SyncService {
    pub fn new(config: CoreConfig) -> Self {
        Self {
            coordinator: Arc::new(SyncCoordinator::new(config)),
        }
    }

    pub fn coordinator(&self) -> &SyncCoordinator {
        &self.coordinator
    }

    /// Reconcile every record in `direction`
    pub async fn sync_all(&self, direction: &str, auth: &AuthDecision) -> Result<SyncAllResponse> {
        self.sync_all_until(direction, auth, &CancellationToken::new())
            .await
    }

    /// Like [`SyncService::sync_all`], stopping between items once `cancel`
    /// fires
    pub async fn sync_all_until(
        &self,
        direction: &str,
        auth: &AuthDecision,
        cancel: &CancellationToken,
    ) -> Result<SyncAllResponse> {
        let principal = authorize(auth)?;
        let direction = parse_direction(direction)?;
        info!(principal, %direction, "Batch sync requested");

        let report = self.coordinator.sync_all(direction, cancel).await;
        Ok(report.into())
    }

    /// Reconcile the single source record `id`
    pub async fn sync_one(
        &self,
        id: &str,
        direction: &str,
        auth: &AuthDecision,
    ) -> Result<SyncOneResponse> {
        let principal = authorize(auth)?;
        let direction = parse_direction(direction)?;
        info!(principal, id, %direction, "Single-record sync requested");

        let outcome = self.coordinator.sync_one(id, direction).await;
        Ok(outcome.into())
    }
}

fn authorize(auth: &AuthDecision) -> Result<&str> {
    match auth {
        AuthDecision::Allowed { principal } => Ok(principal),
        AuthDecision::Denied { reason } => {
            warn!(reason = %reason, "Sync request rejected");
            Err(ServiceError::Unauthorized(reason.clone()))
        }
    }
}

fn parse_direction(raw: &str) -> Result<Direction> {
    raw.parse()
        .map_err(|_| ServiceError::InvalidDirection(raw.to_string()))
}

/// Open the SQLite database described by `database` and build a service over
/// its two blog tables.
///
/// `builder` carries any optional settings (clock, event bus, timeouts); its
/// stores are replaced by the SQLite-backed ones.
///
/// ```no_run
/// # async fn example() -> core_service::Result<()> {
/// use core_content::DatabaseConfig;
/// use core_runtime::config::CoreConfig;
///
/// let service = core_service::bootstrap(
///     DatabaseConfig::new("portal.db"),
///     CoreConfig::builder(),
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn bootstrap(database: DatabaseConfig, builder: CoreConfigBuilder) -> Result<SyncService> {
    let pool = create_pool(database).await?;

    let config = builder
        .canonical_store(Arc::new(SqliteRecordStore::canonical(pool.clone())))
        .admin_store(Arc::new(SqliteRecordStore::admin(pool)))
        .build()?;

    info!(
        canonical = config.canonical_store.name(),
        admin = config.admin_store.name(),
        "Sync service ready"
    );
    Ok(SyncService::new(config))
}
