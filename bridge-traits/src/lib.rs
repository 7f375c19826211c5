//! # Host Bridge Traits
//!
//! Capability contracts between the reconciliation core and the environment
//! hosting it.
//!
//! ## Overview
//!
//! The core never talks to a concrete database, clock or logging backend.
//! Each capability it needs is expressed as a trait here and injected by the
//! host (the admin HTTP endpoint, a scheduled job, or a CLI).
//!
//! ## Traits
//!
//! ### Storage
//! - [`RecordStore`](store::RecordStore) - Find/insert/update/list records of one entity type
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Record Model
//!
//! Stores exchange [`Record`](record::Record) values, maps of field names to
//! [`FieldValue`](record::FieldValue)s. Keeping the model dynamic lets the same
//! engine reconcile any pair of entity schemas.
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should:
//!
//! - Report unique-index violations as `UniqueViolation`
//! - Report schema violations as `InvalidInput`
//! - Convert driver errors into `DatabaseError` with actionable messages
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! across async tasks behind `Arc`.

pub mod error;
pub mod record;
pub mod store;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use record::{FieldValue, Record};
pub use store::{RecordFilter, RecordStore};
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
