use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vmsync_storage::{HostFilter, InventoryConfig};
use vmsync_vsphere::{CollectorSettings, RestConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub accounts: BTreeMap<String, AccountConfig>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        for (name, account) in &self.accounts {
            account
                .validate()
                .map_err(|e| format!("accounts.{name}: {e}"))?;
        }
        Ok(())
    }

    pub fn account(&self, name: &str) -> Result<&AccountConfig, String> {
        self.accounts.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.accounts.keys().map(String::as_str).collect();
            format!("unknown account '{name}', configured accounts: {known:?}")
        })
    }

    /// Resolves relative file paths against `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        self.store.path = resolve(base, &self.store.path);
        if let Some(path) = &self.rules.path {
            self.rules.path = Some(resolve(base, path));
        }
        if let Some(path) = &self.rules.rewrite_path {
            self.rules.rewrite_path = Some(resolve(base, path));
        }
        for account in self.accounts.values_mut() {
            if let Some(path) = &account.snapshot_path {
                account.snapshot_path = Some(resolve(base, path));
            }
        }
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON file backing the host store
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}
fn default_store_path() -> PathBuf {
    PathBuf::from("hosts.json")
}
impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Custom attribute rules
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Attribute rewrite rules, applied before the custom attribute rules
    #[serde(default)]
    pub rewrite_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    #[default]
    Rest,
    Snapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(default)]
    pub kind: AccountKind,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub verify_ssl: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Inventory document for `kind = "snapshot"`
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
    #[serde(default)]
    pub settings: AccountSettings,
}
fn default_timeout_secs() -> u64 {
    30
}

impl AccountConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be > 0".into());
        }
        if self.settings.progress_every == 0 {
            return Err("settings.progress_every must be > 0".into());
        }
        if self.settings.max_folder_depth == 0 {
            return Err("settings.max_folder_depth must be > 0".into());
        }
        if self.settings.inventory_key.trim().is_empty() {
            return Err("settings.inventory_key must not be empty".into());
        }
        match self.kind {
            AccountKind::Rest if self.address.as_deref().unwrap_or("").trim().is_empty() => {
                Err("kind = \"rest\" requires address".into())
            }
            AccountKind::Snapshot if self.snapshot_path.is_none() => {
                Err("kind = \"snapshot\" requires snapshot_path".into())
            }
            _ => Ok(()),
        }
    }

    pub fn rest_config(&self) -> RestConfig {
        RestConfig::new(
            self.address.clone().unwrap_or_default(),
            self.username.clone(),
            self.password.clone(),
        )
        .with_verify_ssl(self.verify_ssl)
        .with_timeout(Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSettings {
    #[serde(default)]
    pub include_templates: bool,
    #[serde(default)]
    pub collect_tags: bool,
    #[serde(default = "default_max_folder_depth")]
    pub max_folder_depth: usize,
    /// Namespace inventory data is stored under
    #[serde(default = "default_inventory_key")]
    pub inventory_key: String,
    /// Progress cadence of individual ingestion
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
    /// Add source, host and timestamp labels on import and inventorize
    #[serde(default = "default_true")]
    pub stamp_provenance: bool,
    /// Hosts selected for custom attribute export
    #[serde(default)]
    pub filter: HostFilter,
}
fn default_max_folder_depth() -> usize {
    9
}
fn default_inventory_key() -> String {
    "vmware_vcenter".into()
}
fn default_progress_every() -> usize {
    100
}
fn default_true() -> bool {
    true
}
impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            include_templates: false,
            collect_tags: false,
            max_folder_depth: default_max_folder_depth(),
            inventory_key: default_inventory_key(),
            progress_every: default_progress_every(),
            stamp_provenance: true,
            filter: HostFilter::default(),
        }
    }
}

impl AccountSettings {
    pub fn collector_settings(&self) -> CollectorSettings {
        CollectorSettings {
            include_templates: self.include_templates,
            collect_tags: self.collect_tags,
            max_folder_depth: self.max_folder_depth,
        }
    }

    pub fn inventory_config(&self, account: &str) -> InventoryConfig {
        InventoryConfig::new(account, &self.inventory_key)
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File, FileFormat};
    use std::path::{Path, PathBuf};

    pub const DEFAULT_FILE: &str = "vmsync.toml";

    /// Picks the configuration file.
    ///
    /// Priority order:
    /// 1. `--config <path>` / `VMSYNC_CONFIG`
    /// 2. `./vmsync.toml`
    /// 3. `~/.vmsync/vmsync.toml`
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        let local = PathBuf::from(DEFAULT_FILE);
        if local.exists() {
            return Some(local);
        }
        dirs::home_dir()
            .map(|home| home.join(".vmsync").join(DEFAULT_FILE))
            .filter(|path| path.exists())
    }

    pub fn load_config(path: Option<&Path>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        if let Some(p) = path {
            if !p.exists() {
                return Err(format!("config file not found: {}", p.display()));
            }
            builder = builder.add_source(File::from(p.to_path_buf()).format(FileFormat::Toml));
        }
        // Environment variable overrides, e.g., VMSYNC__ACCOUNTS__LAB__PASSWORD=secret
        builder = builder.add_source(
            Environment::with_prefix("VMSYNC")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let mut merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;

        if let Some(base) = path.and_then(Path::parent) {
            merged.resolve_paths(base);
        }
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rest_account() -> AccountConfig {
        AccountConfig {
            kind: AccountKind::Rest,
            address: Some("vc.lab".into()),
            username: "admin".into(),
            password: "secret".into(),
            verify_ssl: false,
            timeout_secs: 30,
            snapshot_path: None,
            settings: AccountSettings::default(),
        }
    }

    #[test]
    fn test_account_validation() {
        assert!(rest_account().validate().is_ok());

        let mut account = rest_account();
        account.address = None;
        assert!(account.validate().unwrap_err().contains("requires address"));

        let mut account = rest_account();
        account.kind = AccountKind::Snapshot;
        assert!(account.validate().unwrap_err().contains("snapshot_path"));

        let mut account = rest_account();
        account.timeout_secs = 0;
        assert!(account.validate().is_err());

        let mut account = rest_account();
        account.settings.progress_every = 0;
        assert!(account.validate().is_err());

        let mut account = rest_account();
        account.settings.max_folder_depth = 0;
        assert!(account.validate().is_err());
    }

    #[test]
    fn test_unknown_account() {
        let mut cfg = AppConfig::default();
        cfg.accounts.insert("lab".into(), rest_account());
        assert!(cfg.account("lab").is_ok());
        let err = cfg.account("prod").unwrap_err();
        assert!(err.contains("\"lab\""));
    }

    #[test]
    fn test_relative_paths_follow_the_config_file() {
        let mut cfg = AppConfig::default();
        cfg.rules.path = Some(PathBuf::from("rules.toml"));
        cfg.rules.rewrite_path = Some(PathBuf::from("/etc/vmsync/rewrite.toml"));
        cfg.resolve_paths(Path::new("/opt/vmsync"));

        assert_eq!(cfg.store.path, PathBuf::from("/opt/vmsync/hosts.json"));
        assert_eq!(cfg.rules.path, Some(PathBuf::from("/opt/vmsync/rules.toml")));
        assert_eq!(
            cfg.rules.rewrite_path,
            Some(PathBuf::from("/etc/vmsync/rewrite.toml"))
        );
    }

    #[test]
    fn test_settings_defaults() {
        let settings = AccountSettings::default();
        assert_eq!(settings.collector_settings(), CollectorSettings::default());
        assert_eq!(
            settings.inventory_config("lab"),
            InventoryConfig::new("lab", "vmware_vcenter")
        );
        assert!(settings.stamp_provenance);
    }
}
