use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::model::{CustomFieldDef, ManagedRef, ParentEntity, TagInfo, VmDetails, VmSummary};

/// Query and write access to the virtualization management system.
///
/// Implemented by [`RestClient`](crate::RestClient) and
/// [`SnapshotSource`](crate::SnapshotSource).
#[async_trait]
pub trait SourceApi: Send + Sync {
    /// Lists every VM, templates included.
    async fn list_objects(&self) -> Result<Vec<VmSummary>, SourceError>;

    async fn object_details(&self, vm: &ManagedRef) -> Result<VmDetails, SourceError>;

    /// Returns the direct container of `entity`, or `None` at the top of the tree.
    async fn parent_of(&self, entity: &ManagedRef) -> Result<Option<ParentEntity>, SourceError>;

    async fn custom_field_catalog(&self) -> Result<Vec<CustomFieldDef>, SourceError>;

    /// Lists tag identifiers.
    async fn list_tags(&self) -> Result<Vec<String>, SourceError>;

    async fn tag_attachments(&self, tag_id: &str) -> Result<Vec<ManagedRef>, SourceError>;

    async fn tag_info(&self, tag_id: &str) -> Result<TagInfo, SourceError>;

    /// Assigns one custom value on one VM.
    async fn set_custom_value(
        &self,
        vm: &ManagedRef,
        name: &str,
        value: &str,
    ) -> Result<(), SourceError>;

    /// Host name or address of the source, for logs and provenance labels.
    fn endpoint(&self) -> &str;

    async fn check_connection(&self) -> Result<(), SourceError>;
}

pub type DynSourceApi = Arc<dyn SourceApi>;
