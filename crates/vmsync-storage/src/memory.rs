//! In-memory host store with optional JSON file persistence.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use vmsync_core::AttributeMap;

use crate::error::StoreError;
use crate::traits::{HostStore, InventorySink};
use crate::types::{HostFilter, HostRecord, InventoryConfig, InventoryReport};

/// Host store backed by a map, optionally loaded from and flushed to a JSON file.
///
/// The file holds a JSON array of host records.
#[derive(Debug, Default)]
pub struct MemoryHostStore {
    hosts: RwLock<BTreeMap<String, HostRecord>>,
    path: Option<PathBuf>,
}

impl MemoryHostStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the store at `path`. A missing file starts an empty store.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let hosts = match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let records: Vec<HostRecord> =
                    serde_json::from_str(&content).map_err(StoreError::serialization)?;
                records
                    .into_iter()
                    .map(|record| (record.hostname.clone(), record))
                    .collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StoreError::io(path.display().to_string(), e)),
        };

        tracing::debug!(path = %path.display(), hosts = hosts.len(), "opened host store");
        Ok(Self {
            hosts: RwLock::new(hosts),
            path: Some(path),
        })
    }

    /// Seeds the store with records, replacing hosts with the same name.
    pub async fn insert_all(&self, records: impl IntoIterator<Item = HostRecord>) {
        let mut hosts = self.hosts.write().await;
        for record in records {
            hosts.insert(record.hostname.clone(), record);
        }
    }

    /// Writes the store to its file. A store without a file is left as is.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let hosts = self.hosts.read().await;
        let records: Vec<&HostRecord> = hosts.values().collect();
        let content = serde_json::to_string_pretty(&records).map_err(StoreError::serialization)?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent.display().to_string(), e))?;
        }
        tokio::fs::write(path, content)
            .await
            .map_err(|e| StoreError::io(path.display().to_string(), e))?;

        tracing::debug!(path = %path.display(), hosts = records.len(), "flushed host store");
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.hosts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.hosts.read().await.is_empty()
    }
}

#[async_trait]
impl HostStore for MemoryHostStore {
    async fn get_host(&self, hostname: &str) -> Result<Option<HostRecord>, StoreError> {
        Ok(self.hosts.read().await.get(hostname).cloned())
    }

    async fn get_or_create(&self, hostname: &str) -> Result<(HostRecord, bool), StoreError> {
        if hostname.trim().is_empty() {
            return Err(StoreError::invalid_host("hostname must not be blank"));
        }
        match self.hosts.read().await.get(hostname) {
            Some(record) => Ok((record.clone(), false)),
            None => Ok((HostRecord::new(hostname), true)),
        }
    }

    async fn save(&self, record: &HostRecord) -> Result<(), StoreError> {
        if record.hostname.trim().is_empty() {
            return Err(StoreError::invalid_host("hostname must not be blank"));
        }
        self.hosts
            .write()
            .await
            .insert(record.hostname.clone(), record.clone());
        Ok(())
    }

    async fn objects_by_filter(&self, filter: &HostFilter) -> Result<Vec<HostRecord>, StoreError> {
        Ok(self
            .hosts
            .read()
            .await
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl InventorySink for MemoryHostStore {
    async fn bulk_submit(
        &self,
        config: &InventoryConfig,
        pairs: Vec<(String, AttributeMap)>,
    ) -> Result<InventoryReport, StoreError> {
        let mut report = InventoryReport::default();
        let mut hosts = self.hosts.write().await;

        for (hostname, data) in pairs {
            match hosts.get_mut(&hostname) {
                Some(record) => {
                    if record.update_inventory(&config.inventory_key, data) {
                        report.updated += 1;
                    } else {
                        report.unchanged += 1;
                    }
                }
                None => report.not_found.push(hostname),
            }
        }

        tracing::info!(
            account = %config.account,
            key = %config.inventory_key,
            updated = report.updated,
            unchanged = report.unchanged,
            not_found = report.not_found.len(),
            "bulk inventory submitted"
        );
        Ok(report)
    }

    async fn submit_one(
        &self,
        record: &mut HostRecord,
        data: AttributeMap,
        key: &str,
        config: &InventoryConfig,
    ) -> Result<bool, StoreError> {
        if !record.update_inventory(key, data) {
            return Ok(false);
        }
        self.save(record).await?;
        tracing::debug!(account = %config.account, host = %record.hostname, key, "inventory updated");
        Ok(true)
    }
}
