//! Outcomes of single reconciliations and of whole runs.

use serde::Serialize;
use std::fmt;

use crate::direction::Direction;
use crate::error::SyncError;

/// Result of reconciling one source record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Created { source_id: String, target_id: String },
    Updated { source_id: String, target_id: String },
    Failed { source_id: String, reason: SyncError },
}

impl Outcome {
    pub fn source_id(&self) -> &str {
        match self {
            Outcome::Created { source_id, .. }
            | Outcome::Updated { source_id, .. }
            | Outcome::Failed { source_id, .. } => source_id,
        }
    }

    pub fn target_id(&self) -> Option<&str> {
        match self {
            Outcome::Created { target_id, .. } | Outcome::Updated { target_id, .. } => {
                Some(target_id)
            }
            Outcome::Failed { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failed { .. })
    }

    pub fn error(&self) -> Option<&SyncError> {
        match self {
            Outcome::Failed { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// A record that could not be reconciled in a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedItem {
    pub id: String,
    pub reason: SyncError,
}

/// Aggregate result of `sync_all`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub run_id: String,
    pub direction: Direction,
    /// Records fetched from the source
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    /// Records left unprocessed because the run was cancelled
    pub skipped: usize,
    pub failed: Vec<FailedItem>,
    pub cancelled: bool,
    /// Set when the source listing itself failed
    pub source_error: Option<SyncError>,
}

impl BatchReport {
    pub fn new(run_id: impl Into<String>, direction: Direction) -> Self {
        Self {
            run_id: run_id.into(),
            direction,
            total: 0,
            created: 0,
            updated: 0,
            skipped: 0,
            failed: Vec::new(),
            cancelled: false,
            source_error: None,
        }
    }

    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Created { .. } => self.created += 1,
            Outcome::Updated { .. } => self.updated += 1,
            Outcome::Failed { source_id, reason } => self.failed.push(FailedItem {
                id: source_id,
                reason,
            }),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.created + self.updated
    }

    pub fn processed(&self) -> usize {
        self.succeeded() + self.failed.len()
    }

    /// True when every fetched record was reconciled
    pub fn is_clean(&self) -> bool {
        self.source_error.is_none() && self.failed.is_empty() && !self.cancelled
    }
}

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    #[default]
    Idle,
    Fetching,
    Locating,
    Mapping,
    Writing,
    Reported,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Fetching => "fetching",
            SyncPhase::Locating => "locating",
            SyncPhase::Mapping => "mapping",
            SyncPhase::Writing => "writing",
            SyncPhase::Reported => "reported",
        };
        f.write_str(s)
    }
}
