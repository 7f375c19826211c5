//! # Reconciler
//!
//! One-directional sync of a single record.
//!
//! ## Workflow
//!
//! 1. Locate the existing target (identity link, then an unclaimed slug match)
//! 2. Map the source into a patch of reconciliation-owned fields
//! 3. Reject the item if its slug belongs to a different target record
//! 4. Validate required target fields and the slug format
//! 5. Insert a new record, or update the located one with the patch only
//!
//! A successful call performs exactly one write; a failed call performs none.
//! Every failure is returned as [`Outcome::Failed`], never as an error.

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{Clock, FieldValue, Record, RecordStore};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::guard::guarded;
use crate::locator::RecordLocator;
use crate::mapping::{IdentityAssignment, MappingTable};
use crate::report::{Outcome, SyncPhase};

/// Source id reported for records without an identity value
const UNIDENTIFIED: &str = "<unidentified>";

pub struct Reconciler {
    source: Arc<dyn RecordStore>,
    target: Arc<dyn RecordStore>,
    table: MappingTable,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    phase: Option<Arc<watch::Sender<SyncPhase>>>,
}

enum Write {
    Created(String),
    Updated(String),
}

impl Reconciler {
    pub fn new(
        source: Arc<dyn RecordStore>,
        target: Arc<dyn RecordStore>,
        table: MappingTable,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> Self {
        Self {
            source,
            target,
            table,
            clock,
            timeout,
            phase: None,
        }
    }

    /// Publish phase transitions to `sender`
    pub fn with_phase(mut self, sender: Arc<watch::Sender<SyncPhase>>) -> Self {
        self.phase = Some(sender);
        self
    }

    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    pub fn source_store(&self) -> &Arc<dyn RecordStore> {
        &self.source
    }

    pub fn target_store(&self) -> &Arc<dyn RecordStore> {
        &self.target
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Id used to report on `source`
    pub fn source_id(&self, source: &Record) -> String {
        self.table
            .source_id(source)
            .unwrap_or_else(|| UNIDENTIFIED.to_string())
    }

    /// Reconcile one source record into the target store
    #[instrument(skip(self, source), fields(table = %self.table.name, source_id = tracing::field::Empty))]
    pub async fn reconcile_one(&self, source: &Record) -> Outcome {
        let source_id = self.source_id(source);
        tracing::Span::current().record("source_id", source_id.as_str());

        match self.try_reconcile(source).await {
            Ok(Write::Created(target_id)) => {
                info!(%target_id, "Created target record");
                Outcome::Created {
                    source_id,
                    target_id,
                }
            }
            Ok(Write::Updated(target_id)) => {
                debug!(%target_id, "Updated target record");
                Outcome::Updated {
                    source_id,
                    target_id,
                }
            }
            Err(reason) => {
                warn!(code = reason.code(), error = %reason, "Reconciliation failed");
                Outcome::Failed { source_id, reason }
            }
        }
    }

    async fn try_reconcile(&self, source: &Record) -> Result<Write> {
        let target_name = self.target.name();

        self.enter(SyncPhase::Locating);
        let target_slug = self.table.target_slug_for(source);
        let existing = RecordLocator::new(self.target.as_ref(), self.source.as_ref(), self.timeout)
            .locate(source, &self.table, target_slug.as_deref())
            .await?;

        self.enter(SyncPhase::Mapping);
        let now = self.clock.now();
        let mut patch = self.table.map_fields(source, existing.as_ref(), now);

        self.check_slug(&patch, existing.as_ref()).await?;
        self.table.validate(&patch, existing.as_ref())?;

        if let Some(touch) = &self.table.touch_field {
            patch.set(touch.as_str(), FieldValue::Timestamp(now));
        }

        self.enter(SyncPhase::Writing);
        let slug = patch
            .get_str(&self.table.target_slug)
            .unwrap_or_default()
            .to_string();

        match existing {
            Some(existing) => {
                let saved = guarded(
                    target_name,
                    "update",
                    self.timeout,
                    self.target.update(&existing, patch),
                )
                .await
                .map_err(|e| self.write_error(e, &slug))?;

                let target_id = self
                    .table
                    .target_id(&saved)
                    .or_else(|| self.table.target_id(&existing))
                    .unwrap_or_default();
                Ok(Write::Updated(target_id))
            }
            None => {
                let mut fields: Record = patch
                    .iter()
                    .filter(|(_, value)| !value.is_null())
                    .map(|(name, value)| (name.to_string(), value.clone()))
                    .collect();

                if self.table.identity_assignment == IdentityAssignment::CopySource {
                    if let Some(id) = self.table.source_id(source) {
                        fields.set(self.table.target_identity.as_str(), id);
                    }
                }

                let saved = guarded(target_name, "insert", self.timeout, self.target.insert(fields))
                    .await
                    .map_err(|e| self.write_error(e, &slug))?;

                Ok(Write::Created(self.table.target_id(&saved).unwrap_or_default()))
            }
        }
    }

    /// Fail when the patch's slug is owned by a record other than `existing`
    async fn check_slug(&self, patch: &Record, existing: Option<&Record>) -> Result<()> {
        let Some(slug) = patch.get_str(&self.table.target_slug) else {
            return Ok(());
        };

        let unchanged = existing
            .and_then(|record| record.get_str(&self.table.target_slug))
            .is_some_and(|current| current == slug);
        if unchanged {
            return Ok(());
        }

        let owner = guarded(
            self.target.name(),
            "find_by_slug",
            self.timeout,
            self.target
                .find_by_key(&self.table.target_slug, &FieldValue::text(slug)),
        )
        .await?;

        let Some(owner) = owner else {
            return Ok(());
        };

        let same_record = existing.is_some_and(|record| {
            self.table.target_id(record).is_some()
                && self.table.target_id(record) == self.table.target_id(&owner)
        });

        if same_record {
            Ok(())
        } else {
            Err(SyncError::SlugConflict {
                store: self.target.name().to_string(),
                slug: slug.to_string(),
            })
        }
    }

    /// Unique violations on write can only come from the slug index
    fn write_error(&self, err: SyncError, slug: &str) -> SyncError {
        match err {
            SyncError::SlugConflict { store, .. } => SyncError::SlugConflict {
                store,
                slug: slug.to_string(),
            },
            other => other,
        }
    }

    fn enter(&self, phase: SyncPhase) {
        if let Some(sender) = &self.phase {
            sender.send_replace(phase);
        }
    }
}

