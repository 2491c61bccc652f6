use anyhow::Result;
use vmsync_sync::Importer;
use vmsync_vsphere::labels::{STAMP_IMPORT, provenance_labels, summary_labels};

use super::{epoch_now, list_vms};
use crate::context::AccountContext;
use crate::output::print_summary;

/// Creates or updates one host record per listed VM.
pub async fn run(ctx: &AccountContext) -> Result<()> {
    let vms = list_vms(ctx.source.as_ref()).await?;
    let provenance = ctx.account.settings.stamp_provenance.then(|| {
        provenance_labels(
            ctx.source_label(),
            ctx.source.endpoint(),
            STAMP_IMPORT,
            epoch_now(),
        )
    });

    let objects = vms
        .iter()
        .map(|vm| {
            let mut labels = summary_labels(vm);
            if let Some(stamp) = &provenance {
                labels.overlay(stamp.clone());
            }
            (vm.name.clone(), labels)
        })
        .collect();

    let summary = Importer::new(ctx.store.clone(), ctx.account_ref())
        .with_policy(ctx.policy)
        .run(objects)
        .await?;
    ctx.persist().await?;

    tracing::info!(account = %ctx.name, %summary, "import finished");
    print_summary(&format!("Import from {}", ctx.name), &summary);
    Ok(())
}
