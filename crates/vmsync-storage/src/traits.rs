//! Host store and inventory sink traits.

use std::sync::Arc;

use async_trait::async_trait;
use vmsync_core::AttributeMap;

use crate::error::StoreError;
use crate::types::{HostFilter, HostRecord, InventoryConfig, InventoryReport};

/// The remote record store hosts are created in and read from.
///
/// Records returned by this trait are detached copies; changes only reach the store
/// through [`save`](HostStore::save).
#[async_trait]
pub trait HostStore: Send + Sync {
    async fn get_host(&self, hostname: &str) -> Result<Option<HostRecord>, StoreError>;

    /// Returns the stored record, or a fresh unsaved one. The flag is `true` when the
    /// record is new.
    async fn get_or_create(&self, hostname: &str) -> Result<(HostRecord, bool), StoreError>;

    async fn save(&self, record: &HostRecord) -> Result<(), StoreError>;

    async fn objects_by_filter(&self, filter: &HostFilter) -> Result<Vec<HostRecord>, StoreError>;

    /// Returns the backend name for logging.
    fn backend_name(&self) -> &'static str;
}

/// Receives inventory data for hosts.
#[async_trait]
pub trait InventorySink: Send + Sync {
    /// Submits every pair in one call. Unknown hosts and per-host failures are
    /// reported, not raised.
    async fn bulk_submit(
        &self,
        config: &InventoryConfig,
        pairs: Vec<(String, AttributeMap)>,
    ) -> Result<InventoryReport, StoreError>;

    /// Stores `data` under `key` on one host. Returns `true` if the host changed.
    async fn submit_one(
        &self,
        record: &mut HostRecord,
        data: AttributeMap,
        key: &str,
        config: &InventoryConfig,
    ) -> Result<bool, StoreError>;
}

pub type DynHostStore = Arc<dyn HostStore>;

pub type DynInventorySink = Arc<dyn InventorySink>;
