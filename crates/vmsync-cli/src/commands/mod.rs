pub mod export;
pub mod import;
pub mod inventorize;
pub mod list;
pub mod test_connection;

use anyhow::Result;
use vmsync_vsphere::SourceApi;

/// Current time as a Unix timestamp, for provenance labels.
pub(crate) fn epoch_now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

/// Lists the VMs of the account's source.
pub(crate) async fn list_vms(source: &dyn SourceApi) -> Result<Vec<vmsync_vsphere::VmSummary>> {
    let vms = source.list_objects().await?;
    tracing::debug!(endpoint = %source.endpoint(), count = vms.len(), "listed VMs");
    Ok(vms)
}
