//! # vmsync-vsphere
//!
//! Access to the virtualization management system and attribute collection.
//!
//! - [`SourceApi`]: the source boundary, implemented over the vCenter REST API
//!   ([`RestClient`]) and over an object-model snapshot ([`SnapshotSource`]).
//! - [`Collector`]: builds one normalized attribute map per VM.
//! - [`labels`]: host labels for the REST import and inventory flows.

pub mod collector;
mod error;
pub mod labels;
pub mod model;
pub mod rest;
pub mod snapshot;
mod source;

pub use collector::{
    AttributeCollector, CollectFilter, CollectedObject, Collection, CollectionRun, Collector,
    CollectorSettings, DynAttributeCollector,
};
pub use error::SourceError;
pub use model::{
    ConfigInfo, CustomFieldDef, CustomValue, GuestInfo, ManagedRef, ParentEntity, RuntimeInfo,
    TagInfo, VmDetails, VmSummary,
};
pub use rest::{RestClient, RestConfig};
pub use snapshot::{SnapshotDocument, SnapshotSource};
pub use source::{DynSourceApi, SourceApi};
