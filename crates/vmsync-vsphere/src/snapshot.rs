//! Stateful object-model source backed by a JSON inventory document.
//!
//! ```json
//! {
//!   "endpoint": "vcenter.lab",
//!   "folders": [
//!     { "id": "group-d1", "name": "Datacenters" },
//!     { "id": "datacenter-1", "kind": "Datacenter", "name": "DC1", "parent": "group-d1" }
//!   ],
//!   "vms": [
//!     { "vm": "vm-1", "name": "web01", "parent": "datacenter-1",
//!       "config": { "num_cpu": 2, "template": false },
//!       "custom_values": [ { "key": 101, "value": "ops" } ] }
//!   ],
//!   "custom_fields": [ { "key": 101, "name": "owner" } ],
//!   "tags": [ { "id": "tag-1", "name": "prod", "attached": ["vm-1"] } ]
//! }
//! ```

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::SourceError;
use crate::model::{
    CustomFieldDef, CustomValue, FOLDER, ManagedRef, ParentEntity, TagInfo, VmDetails, VmSummary,
};
use crate::source::SourceApi;

fn default_folder_kind() -> String {
    FOLDER.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFolder {
    pub id: String,
    #[serde(default = "default_folder_kind")]
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotVm {
    #[serde(flatten)]
    pub summary: VmSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(flatten)]
    pub details: VmDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotTag {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Ids of the VMs the tag is attached to.
    #[serde(default)]
    pub attached: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub folders: Vec<SnapshotFolder>,
    #[serde(default)]
    pub vms: Vec<SnapshotVm>,
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldDef>,
    #[serde(default)]
    pub tags: Vec<SnapshotTag>,
}

/// [`SourceApi`] over an in-memory inventory document.
///
/// Custom value writes update the document; a field missing from the catalog is
/// created on first use. [`save`](Self::save) persists the document.
#[derive(Debug)]
pub struct SnapshotSource {
    endpoint: String,
    document: RwLock<SnapshotDocument>,
}

impl SnapshotSource {
    pub fn new(document: SnapshotDocument) -> Self {
        let endpoint = if document.endpoint.is_empty() {
            "snapshot".to_string()
        } else {
            document.endpoint.clone()
        };
        Self {
            endpoint,
            document: RwLock::new(document),
        }
    }

    pub fn from_json(content: &str) -> Result<Self, SourceError> {
        let document: SnapshotDocument =
            serde_json::from_str(content).map_err(SourceError::decode)?;
        Ok(Self::new(document))
    }

    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SourceError::io(path.display().to_string(), e))?;
        let source = Self::from_json(&content)?;
        tracing::debug!(path = %path.display(), endpoint = %source.endpoint, "opened snapshot");
        Ok(source)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), SourceError> {
        let path = path.as_ref();
        let content = {
            let document = self.document.read().await;
            serde_json::to_string_pretty(&*document).map_err(SourceError::decode)?
        };
        tokio::fs::write(path, content)
            .await
            .map_err(|e| SourceError::io(path.display().to_string(), e))
    }

    pub async fn document(&self) -> SnapshotDocument {
        self.document.read().await.clone()
    }
}

#[async_trait]
impl SourceApi for SnapshotSource {
    async fn list_objects(&self) -> Result<Vec<VmSummary>, SourceError> {
        let document = self.document.read().await;
        Ok(document.vms.iter().map(|vm| vm.summary.clone()).collect())
    }

    async fn object_details(&self, vm: &ManagedRef) -> Result<VmDetails, SourceError> {
        let document = self.document.read().await;
        document
            .vms
            .iter()
            .find(|candidate| candidate.summary.vm == vm.id)
            .map(|found| found.details.clone())
            .ok_or_else(|| SourceError::not_found(vm.to_string()))
    }

    async fn parent_of(&self, entity: &ManagedRef) -> Result<Option<ParentEntity>, SourceError> {
        let document = self.document.read().await;
        let parent_id = if entity.is_vm() {
            document
                .vms
                .iter()
                .find(|vm| vm.summary.vm == entity.id)
                .and_then(|vm| vm.parent.clone())
        } else {
            document
                .folders
                .iter()
                .find(|folder| folder.id == entity.id)
                .and_then(|folder| folder.parent.clone())
        };

        Ok(parent_id.and_then(|id| {
            document
                .folders
                .iter()
                .find(|folder| folder.id == id)
                .map(|folder| ParentEntity {
                    reference: ManagedRef::new(&folder.kind, &folder.id),
                    name: folder.name.clone(),
                })
        }))
    }

    async fn custom_field_catalog(&self) -> Result<Vec<CustomFieldDef>, SourceError> {
        Ok(self.document.read().await.custom_fields.clone())
    }

    async fn list_tags(&self) -> Result<Vec<String>, SourceError> {
        let document = self.document.read().await;
        Ok(document.tags.iter().map(|tag| tag.id.clone()).collect())
    }

    async fn tag_attachments(&self, tag_id: &str) -> Result<Vec<ManagedRef>, SourceError> {
        let document = self.document.read().await;
        let tag = document
            .tags
            .iter()
            .find(|tag| tag.id == tag_id)
            .ok_or_else(|| SourceError::not_found(tag_id))?;
        Ok(tag.attached.iter().map(ManagedRef::vm).collect())
    }

    async fn tag_info(&self, tag_id: &str) -> Result<TagInfo, SourceError> {
        let document = self.document.read().await;
        document
            .tags
            .iter()
            .find(|tag| tag.id == tag_id)
            .map(|tag| TagInfo {
                id: tag.id.clone(),
                name: tag.name.clone(),
                description: tag.description.clone(),
            })
            .ok_or_else(|| SourceError::not_found(tag_id))
    }

    async fn set_custom_value(
        &self,
        vm: &ManagedRef,
        name: &str,
        value: &str,
    ) -> Result<(), SourceError> {
        let mut document = self.document.write().await;

        let index = document
            .vms
            .iter()
            .position(|candidate| candidate.summary.vm == vm.id)
            .ok_or_else(|| SourceError::not_found(vm.to_string()))?;

        let existing = document
            .custom_fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.key);
        let key = match existing {
            Some(key) => key,
            None => {
                let key = document
                    .custom_fields
                    .iter()
                    .map(|field| field.key)
                    .max()
                    .unwrap_or(100)
                    + 1;
                document.custom_fields.push(CustomFieldDef {
                    key,
                    name: name.to_string(),
                });
                tracing::debug!(field = %name, key, "created custom field");
                key
            }
        };

        let target = &mut document.vms[index];

        match target
            .details
            .custom_values
            .iter_mut()
            .find(|custom| custom.key == key)
        {
            Some(existing) => existing.value = value.to_string(),
            None => target.details.custom_values.push(CustomValue {
                key,
                value: value.to_string(),
            }),
        }
        Ok(())
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn check_connection(&self) -> Result<(), SourceError> {
        Ok(())
    }
}
