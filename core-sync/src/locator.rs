//! Record Locator
//!
//! Finds the target record corresponding to a source record. The explicit
//! identity link wins; the slug is only consulted when no linked record
//! exists, so renaming a linked record never re-targets it. A slug match
//! that is linked to another live source record is not a match.

use std::time::Duration;

use bridge_traits::{FieldValue, Record, RecordStore};
use tracing::debug;

use crate::error::Result;
use crate::guard::guarded;
use crate::mapping::MappingTable;

pub struct RecordLocator<'a> {
    store: &'a dyn RecordStore,
    source_store: &'a dyn RecordStore,
    timeout: Duration,
}

impl<'a> RecordLocator<'a> {
    /// `store` is searched; `source_store` is consulted to tell whether a
    /// slug match already belongs to another source record.
    pub fn new(
        store: &'a dyn RecordStore,
        source_store: &'a dyn RecordStore,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            source_store,
            timeout,
        }
    }

    /// Locate the target for `source`.
    ///
    /// `target_slug` is the slug the target will carry after mapping.
    /// `Ok(None)` means the caller should create a record.
    pub async fn locate(
        &self,
        source: &Record,
        table: &MappingTable,
        target_slug: Option<&str>,
    ) -> Result<Option<Record>> {
        let source_id = table.source_id(source);

        if let Some(id) = &source_id {
            let found = guarded(
                self.store.name(),
                "find_by_identity",
                self.timeout,
                self.store
                    .find_by_key(&table.target_identity, &FieldValue::text(id.as_str())),
            )
            .await?;

            if found.is_some() {
                debug!(source_id = %id, "Located target by identity");
                return Ok(found);
            }
        }

        let Some(slug) = target_slug.filter(|s| !s.is_empty()) else {
            return Ok(None);
        };

        let found = guarded(
            self.store.name(),
            "find_by_slug",
            self.timeout,
            self.store
                .find_by_key(&table.target_slug, &FieldValue::text(slug)),
        )
        .await?;

        let Some(found) = found else {
            return Ok(None);
        };

        if let Some(linked) = table.target_id(&found) {
            if source_id.as_deref() != Some(linked.as_str())
                && self.is_live_source(table, &linked).await?
            {
                debug!(slug, %linked, "Slug match is linked to another source record");
                return Ok(None);
            }
        }

        debug!(slug, "Located target by slug");
        Ok(Some(found))
    }

    async fn is_live_source(&self, table: &MappingTable, id: &str) -> Result<bool> {
        let found = guarded(
            self.source_store.name(),
            "find_by_identity",
            self.timeout,
            self.source_store
                .find_by_key(&table.source_identity, &FieldValue::text(id)),
        )
        .await?;
        Ok(found.is_some())
    }
}
