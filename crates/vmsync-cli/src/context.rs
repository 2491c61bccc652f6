//! Everything a command needs for one account.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use vmsync_core::ErrorPolicy;
use vmsync_rules::{DynRuleEvaluator, RuleSet};
use vmsync_storage::{AccountRef, MemoryHostStore};
use vmsync_vsphere::labels::{SOURCE_REST, SOURCE_SNAPSHOT};
use vmsync_vsphere::{Collector, DynSourceApi, RestClient, SnapshotSource};

use crate::config::{AccountConfig, AccountKind, AppConfig};

pub struct AccountContext {
    pub name: String,
    pub account: AccountConfig,
    pub source: DynSourceApi,
    pub store: Arc<MemoryHostStore>,
    pub policy: ErrorPolicy,
    snapshot: Option<(Arc<SnapshotSource>, PathBuf)>,
    rules_path: Option<PathBuf>,
    rewrite_path: Option<PathBuf>,
}

impl AccountContext {
    pub async fn open(config: &AppConfig, name: &str, debug: bool) -> Result<Self> {
        let account = config.account(name).map_err(anyhow::Error::msg)?.clone();

        let (source, snapshot) = match account.kind {
            AccountKind::Rest => {
                let client = RestClient::new(account.rest_config())
                    .with_context(|| format!("Failed to create REST client for {name}"))?;
                let source: DynSourceApi = Arc::new(client);
                (source, None)
            }
            AccountKind::Snapshot => {
                let path = account
                    .snapshot_path
                    .clone()
                    .context("snapshot_path is not set")?;
                let snapshot = Arc::new(
                    SnapshotSource::open(&path)
                        .await
                        .with_context(|| format!("Failed to open snapshot {}", path.display()))?,
                );
                let source: DynSourceApi = snapshot.clone();
                (source, Some((snapshot, path)))
            }
        };

        let store = MemoryHostStore::open(&config.store.path)
            .await
            .with_context(|| format!("Failed to open host store {}", config.store.path.display()))?;

        tracing::debug!(
            account = %name,
            kind = ?account.kind,
            endpoint = %source.endpoint(),
            "account opened"
        );

        Ok(Self {
            name: name.to_string(),
            account,
            source,
            store: Arc::new(store),
            policy: ErrorPolicy::new(debug),
            snapshot,
            rules_path: config.rules.path.clone(),
            rewrite_path: config.rules.rewrite_path.clone(),
        })
    }

    pub fn collector(&self) -> Collector {
        Collector::new(
            self.source.clone(),
            self.account.settings.collector_settings(),
            self.policy,
        )
    }

    pub fn account_ref(&self) -> AccountRef {
        AccountRef::new(&self.name)
    }

    /// Provenance source label for this account's transport.
    pub fn source_label(&self) -> &'static str {
        match self.account.kind {
            AccountKind::Rest => SOURCE_REST,
            AccountKind::Snapshot => SOURCE_SNAPSHOT,
        }
    }

    pub fn rules(&self) -> Result<DynRuleEvaluator> {
        let path = self
            .rules_path
            .as_ref()
            .context("rules.path is not configured")?;
        let rules = RuleSet::from_file(path)
            .with_context(|| format!("Failed to load rules from {}", path.display()))?;
        Ok(Arc::new(rules))
    }

    pub fn rewrite_rules(&self) -> Result<Option<DynRuleEvaluator>> {
        let Some(path) = &self.rewrite_path else {
            return Ok(None);
        };
        let rules = RuleSet::from_file(path)
            .with_context(|| format!("Failed to load rewrite rules from {}", path.display()))?;
        Ok(Some(Arc::new(rules)))
    }

    /// Flushes the host store and, for snapshot accounts, the inventory document.
    pub async fn persist(&self) -> Result<()> {
        self.store.flush().await.context("Failed to write host store")?;
        if let Some((snapshot, path)) = &self.snapshot {
            snapshot
                .save(path)
                .await
                .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        }
        Ok(())
    }
}
