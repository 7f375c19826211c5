//! Workspace umbrella crate.
//!
//! Re-exports the `core-service` façade so hosts (admin HTTP endpoint,
//! scheduled job, CLI) can depend on a single crate instead of wiring each
//! workspace member individually.

pub use core_service::*;
