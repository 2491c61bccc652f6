//! Host labels derived from REST VM rows and detail sections.
//!
//! Every value is text. Missing fields are omitted.

use vmsync_core::{AttributeMap, AttributeValue};

use crate::model::{VmDetails, VmSummary};

pub const SOURCE_REST: &str = "vcenter_rest_api";
pub const SOURCE_SNAPSHOT: &str = "vcenter_snapshot";
pub const STAMP_IMPORT: &str = "last_import";
pub const STAMP_INVENTORY: &str = "last_inventory";

/// Labels from one row of the VM listing.
pub fn summary_labels(summary: &VmSummary) -> AttributeMap {
    let mut labels = AttributeMap::new();
    labels.set("vm_id", summary.vm.as_str());
    labels.set_opt("power_state", summary.power_state.as_deref());
    labels.set_opt("cpu_count", summary.cpu_count.map(|count| count.to_string()));
    if let Some(mib) = summary.memory_size_mib {
        labels.set("memory_size_gb", memory_gb_text(mib));
        labels.set("memory_size_mib", mib.to_string());
    }
    labels
}

/// Labels from the guest and config detail sections.
pub fn detail_labels(details: &VmDetails) -> AttributeMap {
    let mut labels = AttributeMap::new();
    if let Some(guest) = &details.guest {
        labels.set_opt("guest_hostname", guest.host_name.as_deref());
        labels.set_opt("guest_ip", guest.ip_address.as_deref());
        labels.set_opt("guest_os", guest.full_name.as_deref());
        labels.set_opt("tools_status", guest.tools_status.as_deref());
    }
    if let Some(config) = &details.config {
        labels.set_opt("vm_uuid", config.uuid.as_deref());
        labels.set_opt("guest_id", config.guest_id.as_deref());
        labels.set_opt("annotation", config.annotation.as_deref());
    }
    labels
}

/// Where and when the data was taken from. `stamp_key` names the timestamp label.
pub fn provenance_labels(source: &str, host: &str, stamp_key: &str, epoch: i64) -> AttributeMap {
    let mut labels = AttributeMap::new();
    labels.set("vmware_source", source);
    labels.set("vcenter_host", host);
    labels.set(stamp_key, epoch.to_string());
    labels
}

/// MiB as GiB rounded to two decimals, always with a decimal point.
fn memory_gb_text(mib: i64) -> String {
    let gb = (mib as f64 / 1024.0 * 100.0).round() / 100.0;
    AttributeValue::Float(gb).to_text()
}
