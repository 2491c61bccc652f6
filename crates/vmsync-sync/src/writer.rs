//! Attribute writers and the write-back engine.

use std::sync::Arc;

use async_trait::async_trait;
use vmsync_core::{AttributeMap, AttributeValue, ErrorPolicy, ObjectOutcome, SyncError};
use vmsync_vsphere::{DynSourceApi, ManagedRef};

use crate::delta::Delta;

/// Writes one attribute of one object to the remote side.
#[async_trait]
pub trait AttributeWriter: Send + Sync {
    async fn write(
        &self,
        object: &ManagedRef,
        key: &str,
        value: &AttributeValue,
    ) -> Result<(), SyncError>;

    /// Maps a target value into the form the remote side stores, so it can be diffed
    /// against what was collected.
    fn encode(&self, value: AttributeValue) -> AttributeValue {
        value
    }
}

pub type DynAttributeWriter = Arc<dyn AttributeWriter>;

/// Writes custom values through a [`SourceApi`](vmsync_vsphere::SourceApi).
///
/// Custom values are text on the source side; every value is written and encoded in
/// its text form.
pub struct SourceWriter {
    source: DynSourceApi,
}

impl SourceWriter {
    pub fn new(source: DynSourceApi) -> Self {
        Self { source }
    }
}

#[async_trait]
impl AttributeWriter for SourceWriter {
    async fn write(
        &self,
        object: &ManagedRef,
        key: &str,
        value: &AttributeValue,
    ) -> Result<(), SyncError> {
        self.source
            .set_custom_value(object, key, &value.to_text())
            .await
            .map_err(|e| SyncError::write_failure(object.to_string(), key, e))
    }

    fn encode(&self, value: AttributeValue) -> AttributeValue {
        AttributeValue::String(value.to_text())
    }
}

/// Per-key result of applying one delta.
#[derive(Debug, Default)]
pub struct WriteReport {
    pub written: Vec<String>,
    pub failed: Vec<(String, SyncError)>,
}

impl WriteReport {
    /// Folds the report into the object's outcome.
    ///
    /// Failed keys are reported together with the keys that were written.
    pub fn into_outcome(
        self,
        object: &str,
        policy: &ErrorPolicy,
    ) -> Result<ObjectOutcome, SyncError> {
        if self.failed.is_empty() {
            if self.written.is_empty() {
                return Ok(ObjectOutcome::Unchanged);
            }
            return Ok(ObjectOutcome::Updated { keys: self.written });
        }

        let error = if self.failed.len() == 1 {
            let mut failed = self.failed;
            failed.remove(0).1
        } else {
            let keys: Vec<&str> = self.failed.iter().map(|(key, _)| key.as_str()).collect();
            let messages: Vec<String> = self.failed.iter().map(|(_, e)| e.to_string()).collect();
            SyncError::write_failure(object, keys.join(", "), messages.join("; "))
        };
        policy.handle_partial(object, error, self.written)
    }
}

/// Applies deltas one key at a time.
#[derive(Clone)]
pub struct WriteBack {
    writer: DynAttributeWriter,
}

impl WriteBack {
    pub fn new(writer: DynAttributeWriter) -> Self {
        Self { writer }
    }

    /// Encodes every value of a target map for diffing.
    pub fn encode(&self, target: AttributeMap) -> AttributeMap {
        target
            .into_iter()
            .map(|(key, value)| (key, self.writer.encode(value)))
            .collect()
    }

    /// Writes every change of `delta`. An empty delta makes no call.
    ///
    /// A failing key does not stop the remaining keys.
    pub async fn apply(&self, identity: &ManagedRef, delta: &Delta) -> WriteReport {
        let mut report = WriteReport::default();
        if delta.is_empty() {
            return report;
        }

        for (key, change) in delta.iter() {
            match self.writer.write(identity, key, &change.new).await {
                Ok(()) => {
                    tracing::debug!(object = %delta.object(), key = %key, "attribute written");
                    report.written.push(key.clone());
                }
                Err(e) => {
                    tracing::warn!(object = %delta.object(), key = %key, error = %e, "attribute write failed");
                    report.failed.push((key.clone(), e));
                }
            }
        }
        report
    }
}
