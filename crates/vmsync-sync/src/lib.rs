//! # vmsync-sync
//!
//! Reconciliation stages built on top of the collector, the rule engine and the
//! host store:
//!
//! - [`Delta`]: additive, type-sensitive change detection.
//! - [`WriteBack`]: applies a delta one key at a time through an [`AttributeWriter`].
//! - [`ExportPipeline`]: collect, evaluate rules, diff, write.
//! - [`Ingestor`]: inventory submission in [`IngestMode::Bulk`] or
//!   [`IngestMode::Individual`] mode.
//! - [`Importer`]: host records from source objects.

pub mod delta;
pub mod import;
pub mod ingest;
pub mod pipeline;
pub mod writer;

pub use delta::{Change, Delta};
pub use import::Importer;
pub use ingest::{DEFAULT_PROGRESS_EVERY, IngestMode, IngestSession, Ingestor};
pub use pipeline::ExportPipeline;
pub use writer::{AttributeWriter, DynAttributeWriter, SourceWriter, WriteBack, WriteReport};
