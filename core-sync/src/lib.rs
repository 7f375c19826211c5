//! # Content Reconciliation Engine
//!
//! Keeps canonical blog posts and admin blog entries consistent.
//!
//! ## Overview
//!
//! Reconciliation is one-directional per call: one store is the source, the
//! other the target. The same engine serves both directions with the stores
//! and the mapping table swapped.
//!
//! ## Components
//!
//! - **Slug Deriver** (`slug`): title to URL-safe identifier
//! - **Field Mapper** (`mapping`): declarative per-direction field rules
//! - **Record Locator** (`locator`): identity link first, slug second
//! - **Reconciler** (`reconciler`): locate, map, check, write one record
//! - **Sync Coordinator** (`coordinator`): batch and single-record runs,
//!   cancellation, events
//!
//! Store calls are individually bounded by `CoreConfig::store_timeout`.

pub mod coordinator;
pub mod direction;
pub mod error;
mod guard;
pub mod locator;
pub mod mapping;
pub mod reconciler;
pub mod report;
pub mod slug;

pub use coordinator::SyncCoordinator;
pub use direction::Direction;
pub use error::{Result, SyncError};
pub use locator::RecordLocator;
pub use mapping::{FieldRule, IdentityAssignment, MappingOptions, MappingTable, Transform};
pub use reconciler::Reconciler;
pub use report::{BatchReport, FailedItem, Outcome, SyncPhase};
