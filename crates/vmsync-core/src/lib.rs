//! # vmsync-core
//!
//! Shared vocabulary of the vmsync pipeline:
//!
//! - [`AttributeValue`] / [`AttributeMap`]: the typed, omit-if-empty attribute model
//!   every stage reads and produces.
//! - [`SyncError`]: the error taxonomy (connectivity, partial data, object absent,
//!   rule evaluation, write failure).
//! - [`ObjectOutcome`], [`RunSummary`], [`ErrorPolicy`]: per-object results and the
//!   `debug` override that turns swallowed errors into aborts.

pub mod attribute;
pub mod error;
pub mod outcome;

pub use attribute::{AttributeMap, AttributeValue};
pub use error::{ErrorCategory, SyncError};
pub use outcome::{ErrorPolicy, ObjectOutcome, RunSummary, SkipReason};

/// Result type alias for pipeline operations.
pub type SyncResult<T> = Result<T, SyncError>;
