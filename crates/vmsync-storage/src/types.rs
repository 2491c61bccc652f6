//! Host records and the values passed across the store boundary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vmsync_core::AttributeMap;

/// The account a host belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRef {
    pub name: String,
}

impl AccountRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A host as kept in the remote store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostRecord {
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default)]
    pub labels: AttributeMap,
    /// Inventory namespaces, keyed by inventory key.
    #[serde(default)]
    pub inventory: BTreeMap<String, AttributeMap>,
}

impl HostRecord {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            ..Self::default()
        }
    }

    /// Replaces the labels. Returns `true` if they changed.
    pub fn update_labels(&mut self, labels: AttributeMap) -> bool {
        if self.labels == labels {
            return false;
        }
        self.labels = labels;
        true
    }

    /// Claims the host for `account`.
    ///
    /// Returns `true` when the record needs saving: it was unowned or already belongs
    /// to `account`. Returns `false`, leaving the record untouched, when another
    /// account owns it.
    pub fn set_account(&mut self, account: &AccountRef) -> bool {
        match &self.account {
            Some(owner) if owner != &account.name => false,
            _ => {
                self.account = Some(account.name.clone());
                true
            }
        }
    }

    /// Replaces one inventory namespace. Returns `true` if it changed.
    pub fn update_inventory(&mut self, key: &str, data: AttributeMap) -> bool {
        if self.inventory.get(key) == Some(&data) {
            return false;
        }
        self.inventory.insert(key.to_string(), data);
        true
    }

    /// Labels overlaid with every inventory namespace flattened as `<key>__<name>`.
    pub fn all_attributes(&self) -> AttributeMap {
        let mut attributes = self.labels.clone();
        for (key, data) in &self.inventory {
            attributes.overlay(data.prefixed(key));
        }
        attributes
    }
}

/// Selects hosts by owning account and exact label values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFilter {
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl HostFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_account(account: impl Into<String>) -> Self {
        Self {
            account: Some(account.into()),
            labels: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn matches(&self, record: &HostRecord) -> bool {
        if let Some(account) = &self.account
            && record.account.as_deref() != Some(account.as_str())
        {
            return false;
        }
        self.labels
            .iter()
            .all(|(key, expected)| record.labels.get_text(key).as_deref() == Some(expected.as_str()))
    }
}

/// Where inventory data goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryConfig {
    pub account: String,
    /// Namespace the data is stored under on each host.
    pub inventory_key: String,
}

impl InventoryConfig {
    pub fn new(account: impl Into<String>, inventory_key: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            inventory_key: inventory_key.into(),
        }
    }
}

/// Aggregate result of a bulk inventory submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InventoryReport {
    pub updated: usize,
    pub unchanged: usize,
    pub not_found: Vec<String>,
    /// `(hostname, message)` for every host that failed.
    pub errors: Vec<(String, String)>,
}

impl InventoryReport {
    pub fn total(&self) -> usize {
        self.updated + self.unchanged + self.not_found.len() + self.errors.len()
    }
}
