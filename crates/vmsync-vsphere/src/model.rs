//! Source system data model.
//!
//! Field names follow the vCenter REST representation where one exists, so the same
//! types deserialize REST responses and snapshot documents.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const VIRTUAL_MACHINE: &str = "VirtualMachine";
pub const FOLDER: &str = "Folder";
pub const HOST_SYSTEM: &str = "HostSystem";

/// Reference to a managed entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ManagedRef {
    #[serde(rename = "type", alias = "kind")]
    pub kind: String,
    pub id: String,
}

impl ManagedRef {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn vm(id: impl Into<String>) -> Self {
        Self::new(VIRTUAL_MACHINE, id)
    }

    pub fn is_vm(&self) -> bool {
        self.kind == VIRTUAL_MACHINE
    }
}

impl fmt::Display for ManagedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vim.{}:{}", self.kind, self.id)
    }
}

/// One row of the VM listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VmSummary {
    pub vm: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_count: Option<i64>,
    #[serde(
        default,
        rename = "memory_size_MiB",
        skip_serializing_if = "Option::is_none"
    )]
    pub memory_size_mib: Option<i64>,
}

impl VmSummary {
    pub fn reference(&self) -> ManagedRef {
        ManagedRef::vm(&self.vm)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuestInfo {
    #[serde(alias = "hostname")]
    pub host_name: Option<String>,
    pub ip_address: Option<String>,
    pub full_name: Option<String>,
    pub tools_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigInfo {
    pub num_cpu: Option<i64>,
    pub memory_mb: Option<i64>,
    pub guest_full_name: Option<String>,
    pub uuid: Option<String>,
    pub guest_id: Option<String>,
    pub annotation: Option<String>,
    pub template: Option<bool>,
    pub vm_path_name: Option<String>,
    pub instance_uuid: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeInfo {
    pub power_state: Option<String>,
    pub host: Option<ManagedRef>,
    /// Name of the ESXi host the VM runs on.
    pub host_name: Option<String>,
    /// RFC 3339 boot timestamp.
    pub boot_time: Option<String>,
}

/// A custom field value attached to a VM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomValue {
    pub key: i32,
    #[serde(default)]
    pub value: String,
}

/// The detail sections of one VM. Each section may be missing independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest: Option<GuestInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<RuntimeInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub datastores: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_values: Vec<CustomValue>,
}

impl VmDetails {
    pub fn is_template(&self) -> bool {
        self.config
            .as_ref()
            .and_then(|config| config.template)
            .unwrap_or(false)
    }
}

/// Entry of the custom field catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldDef {
    pub key: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// The container an entity sits in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentEntity {
    pub reference: ManagedRef,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_managed_ref_display() {
        assert_eq!(ManagedRef::vm("vm-42").to_string(), "vim.VirtualMachine:vm-42");
        assert_eq!(
            ManagedRef::new(HOST_SYSTEM, "host-7").to_string(),
            "vim.HostSystem:host-7"
        );
    }

    #[test]
    fn test_summary_deserializes_rest_row() {
        let row: VmSummary = serde_json::from_str(
            r#"{"vm":"vm-1","name":"web01","power_state":"POWERED_ON","cpu_count":2,"memory_size_MiB":4096}"#,
        )
        .unwrap();
        assert_eq!(row.memory_size_mib, Some(4096));
        assert_eq!(row.reference(), ManagedRef::vm("vm-1"));
    }

    #[test]
    fn test_details_accept_rest_guest_shape() {
        let details: VmDetails = serde_json::from_str(
            r#"{"guest":{"hostname":"web01.lab","ip_address":"10.0.0.5"},"config":{"template":true},"cpu":{"count":2}}"#,
        )
        .unwrap();
        assert_eq!(
            details.guest.as_ref().and_then(|g| g.host_name.as_deref()),
            Some("web01.lab")
        );
        assert!(details.is_template());
        assert!(details.runtime.is_none());
    }
}
