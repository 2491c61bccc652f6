use anyhow::{Context, Result};
use tabled::builder::Builder;
use tabled::settings::Style;

use super::list_vms;
use crate::config::AccountKind;
use crate::context::AccountContext;
use crate::output::{print_success, print_warning};

/// Connects, lists, collects one sample VM and reports what the account supports.
pub async fn run(ctx: &AccountContext) -> Result<()> {
    let endpoint = ctx.source.endpoint().to_string();
    ctx.source
        .check_connection()
        .await
        .with_context(|| format!("Cannot connect to {endpoint}"))?;
    print_success(&format!("Connected to {endpoint}"));

    let vms = list_vms(ctx.source.as_ref()).await?;
    print_success(&format!("{} VMs listed", vms.len()));

    let collector = ctx.collector();
    let sample = match vms.iter().find(|vm| !vm.name.trim().is_empty()) {
        Some(vm) => match collector.collect_one(vm).await {
            Ok(attrs) => {
                print_success(&format!("Collected {} attributes from {}", attrs.len(), vm.name));
                format!("ok ({} attributes)", attrs.len())
            }
            Err(e) => {
                print_warning(&format!("Sample collection from {} failed: {e}", vm.name));
                "failed".to_string()
            }
        },
        None => "no VMs".to_string(),
    };

    let catalog = match ctx.source.custom_field_catalog().await {
        Ok(fields) => format!("ok ({} fields)", fields.len()),
        Err(e) => {
            tracing::debug!(error = %e, "custom field catalog unavailable");
            "unavailable".to_string()
        }
    };

    let tags = if ctx.account.settings.collect_tags {
        match collector.tag_index().await {
            Ok(index) => {
                print_success(&format!("{} tagged VMs", index.len()));
                format!("ok ({} tagged VMs)", index.len())
            }
            Err(e) => {
                print_warning(&format!("Tag lookup failed: {e}"));
                "failed".to_string()
            }
        }
    } else {
        "disabled".to_string()
    };

    let write_back = match ctx.account.kind {
        AccountKind::Rest => "unsupported",
        AccountKind::Snapshot => "supported",
    };

    let mut builder = Builder::default();
    builder.push_record(["Capability", "Status"]);
    builder.push_record(["connection".to_string(), "ok".to_string()]);
    builder.push_record(["listing".to_string(), format!("ok ({} VMs)", vms.len())]);
    builder.push_record(["details".to_string(), sample]);
    builder.push_record(["custom field catalog".to_string(), catalog]);
    builder.push_record(["tags".to_string(), tags]);
    builder.push_record(["custom attribute write-back".to_string(), write_back.to_string()]);
    println!("{}", builder.build().with(Style::rounded()));
    Ok(())
}
