//! # Sync Coordinator
//!
//! Runs reconciliation for every record of a store, or for a single record,
//! in either direction.
//!
//! ## Overview
//!
//! The `SyncCoordinator` is built from a [`CoreConfig`] and owns nothing but
//! that configuration and the current [`SyncPhase`]. For each run it:
//! - Fetches all source records (`Fetching`)
//! - Reconciles them one at a time (`Locating` → `Mapping` → `Writing`)
//! - Aggregates outcomes into a [`BatchReport`] (`Reported`)
//! - Emits progress events via `EventBus` when one is configured
//!
//! Item failures are recorded and the batch continues. Cancellation is
//! honoured between items; items not yet started are counted as skipped.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{Direction, SyncCoordinator};
//! use tokio_util::sync::CancellationToken;
//!
//! let coordinator = SyncCoordinator::new(config);
//! let report = coordinator
//!     .sync_all(Direction::AdminToCanonical, &CancellationToken::new())
//!     .await;
//! println!("{} created, {} failed", report.created, report.failed.len());
//!
//! let outcome = coordinator.sync_one("BLOG17172432000001234", Direction::AdminToCanonical).await;
//! ```

use std::sync::Arc;
use std::time::Instant;

use bridge_traits::{FieldValue, RecordStore};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, SyncEvent};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::direction::Direction;
use crate::error::SyncError;
use crate::guard::guarded;
use crate::mapping::{MappingOptions, MappingTable};
use crate::reconciler::Reconciler;
use crate::report::{BatchReport, Outcome, SyncPhase};

/// Orchestrates reconciliation runs between the canonical and admin stores
pub struct SyncCoordinator {
    config: CoreConfig,
    options: MappingOptions,
    phase: Arc<watch::Sender<SyncPhase>>,
}

impl SyncCoordinator {
    pub fn new(config: CoreConfig) -> Self {
        let options = MappingOptions {
            summary_length: config.summary_length,
            unknown_author_sentinel: config.unknown_author_sentinel.clone(),
        };
        let (phase, _) = watch::channel(SyncPhase::Idle);

        Self {
            config,
            options,
            phase: Arc::new(phase),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Phase of the most recent run
    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    /// Observe phase transitions
    pub fn watch_phase(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    /// Reconciler wired for `direction`
    pub fn reconciler(&self, direction: Direction) -> Reconciler {
        let (source, target) = self.stores(direction);
        Reconciler::new(
            source,
            target,
            MappingTable::for_direction(direction, &self.options),
            self.config.clock.clone(),
            self.config.store_timeout,
        )
        .with_phase(self.phase.clone())
    }

    fn stores(&self, direction: Direction) -> (Arc<dyn RecordStore>, Arc<dyn RecordStore>) {
        match direction {
            Direction::CanonicalToAdmin => (
                self.config.canonical_store.clone(),
                self.config.admin_store.clone(),
            ),
            Direction::AdminToCanonical => (
                self.config.admin_store.clone(),
                self.config.canonical_store.clone(),
            ),
        }
    }

    /// Reconcile every source record in `direction`.
    ///
    /// Never fails: item failures land in `report.failed` and a failed source
    /// listing lands in `report.source_error`.
    #[instrument(skip(self, cancel), fields(run_id = tracing::field::Empty, direction = %direction))]
    pub async fn sync_all(&self, direction: Direction, cancel: &CancellationToken) -> BatchReport {
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());

        let started = Instant::now();
        let mut report = BatchReport::new(run_id.clone(), direction);
        let reconciler = self.reconciler(direction);
        let source = reconciler.source_store().clone();

        self.phase.send_replace(SyncPhase::Fetching);
        let records = match guarded(
            source.name(),
            "list_all",
            reconciler.timeout(),
            source.list_all(None),
        )
        .await
        {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, "Failed to list source records");
                self.emit(SyncEvent::Failed {
                    run_id,
                    message: err.to_string(),
                });
                report.source_error = Some(err);
                self.phase.send_replace(SyncPhase::Reported);
                return report;
            }
        };

        report.total = records.len();
        info!(total = report.total, "Starting reconciliation run");
        self.emit(SyncEvent::Started {
            run_id: run_id.clone(),
            direction: direction.to_string(),
            total_items: report.total as u64,
        });

        for (index, record) in records.iter().enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                report.skipped = report.total - index;
                break;
            }

            let outcome = reconciler.reconcile_one(record).await;
            self.emit_outcome(&run_id, &outcome);
            report.record(outcome);
        }

        self.phase.send_replace(SyncPhase::Reported);

        if report.cancelled {
            info!(
                processed = report.processed(),
                skipped = report.skipped,
                "Reconciliation run cancelled"
            );
            self.emit(SyncEvent::Cancelled {
                run_id,
                processed: report.processed() as u64,
                skipped: report.skipped as u64,
            });
        } else {
            info!(
                created = report.created,
                updated = report.updated,
                failed = report.failed.len(),
                "Reconciliation run completed"
            );
            self.emit(SyncEvent::Completed {
                run_id,
                created: report.created as u64,
                updated: report.updated as u64,
                failed: report.failed.len() as u64,
                duration_ms: started.elapsed().as_millis() as u64,
            });
        }

        report
    }

    /// Reconcile the source record identified by `id`
    #[instrument(skip(self), fields(direction = %direction))]
    pub async fn sync_one(&self, id: &str, direction: Direction) -> Outcome {
        let run_id = Uuid::new_v4().to_string();
        let reconciler = self.reconciler(direction);
        let source = reconciler.source_store().clone();
        let key = reconciler.table().source_identity.clone();

        self.phase.send_replace(SyncPhase::Fetching);
        let found = guarded(
            source.name(),
            "find_by_identity",
            reconciler.timeout(),
            source.find_by_key(&key, &FieldValue::text(id)),
        )
        .await;

        let outcome = match found {
            Ok(Some(record)) => reconciler.reconcile_one(&record).await,
            Ok(None) => Outcome::Failed {
                source_id: id.to_string(),
                reason: SyncError::SourceNotFound {
                    store: source.name().to_string(),
                    id: id.to_string(),
                },
            },
            Err(reason) => Outcome::Failed {
                source_id: id.to_string(),
                reason,
            },
        };

        if let Some(reason) = outcome.error() {
            warn!(id, code = reason.code(), "Single-record sync failed");
        }
        self.emit_outcome(&run_id, &outcome);
        self.phase.send_replace(SyncPhase::Reported);
        outcome
    }

    fn emit_outcome(&self, run_id: &str, outcome: &Outcome) {
        let event = match outcome {
            Outcome::Created {
                source_id,
                target_id,
            }
            | Outcome::Updated {
                source_id,
                target_id,
            } => SyncEvent::ItemReconciled {
                run_id: run_id.to_string(),
                source_id: source_id.clone(),
                target_id: target_id.clone(),
                created: matches!(outcome, Outcome::Created { .. }),
            },
            Outcome::Failed { source_id, reason } => SyncEvent::ItemFailed {
                run_id: run_id.to_string(),
                source_id: source_id.clone(),
                reason: reason.code().to_string(),
                message: reason.to_string(),
            },
        };
        self.emit(event);
    }

    fn emit(&self, event: SyncEvent) {
        if let Some(bus) = &self.config.event_bus {
            bus.emit(CoreEvent::Sync(event)).ok();
        }
    }
}
