//! # Core Configuration Module
//!
//! Provides configuration for the reconciliation core.
//!
//! ## Overview
//!
//! The configuration system uses a builder to construct a `CoreConfig` that
//! holds the injected capabilities and tunables the sync engine needs. The
//! builder fails fast: a missing store is reported with an actionable error
//! before any sync can run.
//!
//! ## Required Dependencies
//!
//! - `canonical_store` - `RecordStore` for the public-facing content records
//! - `admin_store` - `RecordStore` for the admin console's workflow records
//!
//! ## Optional Dependencies (with defaults)
//!
//! - `clock` - time source for "last updated" stamps (default: `SystemClock`)
//! - `event_bus` - receives `SyncEvent`s (default: none)
//!
//! No configuration file or environment variable is read here; store
//! connection details belong to the host.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .canonical_store(canonical)
//!     .admin_store(admin)
//!     .store_timeout(Duration::from_secs(5))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::EventBus;
use bridge_traits::{Clock, RecordStore, SystemClock};
use std::sync::Arc;
use std::time::Duration;

/// Default per-call timeout for store operations
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound accepted for the per-call store timeout
pub const MAX_STORE_TIMEOUT: Duration = Duration::from_secs(600);

/// Default number of body characters kept in the derived summary
pub const DEFAULT_SUMMARY_LENGTH: usize = 200;

/// Author value treated as "no author"
pub const DEFAULT_UNKNOWN_AUTHOR: &str = "unknown";

/// Core configuration for the reconciliation engine.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Store holding canonical (public-facing) records
    pub canonical_store: Arc<dyn RecordStore>,

    /// Store holding admin (workflow-facing) records
    pub admin_store: Arc<dyn RecordStore>,

    /// Wall clock used for every reconciliation timestamp
    pub clock: Arc<dyn Clock>,

    /// Optional event bus receiving sync progress
    pub event_bus: Option<EventBus>,

    /// Timeout applied to every individual store call
    pub store_timeout: Duration,

    /// Number of body characters copied into the derived summary
    pub summary_length: usize,

    /// Author sentinel meaning "no author"
    pub unknown_author_sentinel: String,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("canonical_store", &self.canonical_store.name())
            .field("admin_store", &self.admin_store.name())
            .field("clock", &"Clock { ... }")
            .field("event_bus", &self.event_bus)
            .field("store_timeout", &self.store_timeout)
            .field("summary_length", &self.summary_length)
            .field("unknown_author_sentinel", &self.unknown_author_sentinel)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// This checks:
    /// - Store timeout is non-zero and at most 10 minutes
    /// - Summary length is non-zero
    /// - The unknown-author sentinel is not blank
    pub fn validate(&self) -> Result<()> {
        if self.store_timeout.is_zero() {
            return Err(Error::Config(
                "Store timeout must be greater than zero".to_string(),
            ));
        }

        if self.store_timeout > MAX_STORE_TIMEOUT {
            return Err(Error::Config(format!(
                "Store timeout exceeds maximum of {} seconds",
                MAX_STORE_TIMEOUT.as_secs()
            )));
        }

        if self.summary_length == 0 {
            return Err(Error::Config(
                "Summary length must be greater than 0".to_string(),
            ));
        }

        if self.unknown_author_sentinel.trim().is_empty() {
            return Err(Error::Config(
                "Unknown-author sentinel cannot be blank".to_string(),
            ));
        }

        Ok(())
    }
}

fn store_missing_error(capability: &str, role: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "A RecordStore for the {} records is required before reconciliation can run. \
             Inject a store via CoreConfig::builder().{}(...).",
            role, capability
        ),
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    canonical_store: Option<Arc<dyn RecordStore>>,
    admin_store: Option<Arc<dyn RecordStore>>,
    clock: Option<Arc<dyn Clock>>,
    event_bus: Option<EventBus>,
    store_timeout: Option<Duration>,
    summary_length: Option<usize>,
    unknown_author_sentinel: Option<String>,
}

impl CoreConfigBuilder {
    /// Sets the canonical store (required).
    pub fn canonical_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.canonical_store = Some(store);
        self
    }

    /// Sets the admin store (required).
    pub fn admin_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.admin_store = Some(store);
        self
    }

    /// Overrides the wall clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Attaches an event bus for sync progress events.
    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Sets the per-call store timeout (default 10 seconds).
    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = Some(timeout);
        self
    }

    /// Sets the summary length in characters (default 200).
    pub fn summary_length(mut self, length: usize) -> Self {
        self.summary_length = Some(length);
        self
    }

    /// Sets the "no author" sentinel (default `"unknown"`).
    pub fn unknown_author_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.unknown_author_sentinel = Some(sentinel.into());
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Either store is missing (`Error::CapabilityMissing`)
    /// - A tunable is out of range (`Error::Config`)
    pub fn build(self) -> Result<CoreConfig> {
        let canonical_store = self
            .canonical_store
            .ok_or_else(|| store_missing_error("canonical_store", "canonical"))?;

        let admin_store = self
            .admin_store
            .ok_or_else(|| store_missing_error("admin_store", "admin"))?;

        let config = CoreConfig {
            canonical_store,
            admin_store,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            event_bus: self.event_bus,
            store_timeout: self.store_timeout.unwrap_or(DEFAULT_STORE_TIMEOUT),
            summary_length: self.summary_length.unwrap_or(DEFAULT_SUMMARY_LENGTH),
            unknown_author_sentinel: self
                .unknown_author_sentinel
                .unwrap_or_else(|| DEFAULT_UNKNOWN_AUTHOR.to_string()),
        };

        config.validate()?;

        Ok(config)
    }
}
