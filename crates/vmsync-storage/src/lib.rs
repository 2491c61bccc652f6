//! # vmsync-storage
//!
//! The remote record store boundary of vmsync.
//!
//! - [`HostStore`]: look up, create and save host records, select them by filter.
//! - [`InventorySink`]: attach inventory namespaces to hosts, either in one bulk
//!   submission or one host at a time.
//!
//! [`MemoryHostStore`] implements both over an in-memory map that can be persisted
//! to a JSON file.

mod error;
pub mod memory;
mod traits;
mod types;

pub use error::StoreError;
pub use memory::MemoryHostStore;
pub use traits::{DynHostStore, DynInventorySink, HostStore, InventorySink};
pub use types::{AccountRef, HostFilter, HostRecord, InventoryConfig, InventoryReport};

/// Type alias for a store result.
pub type StoreResult<T> = Result<T, StoreError>;
