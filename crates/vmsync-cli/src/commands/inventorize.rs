use anyhow::Result;
use vmsync_core::{ObjectOutcome, SkipReason};
use vmsync_sync::{IngestMode, Ingestor};
use vmsync_vsphere::labels::{STAMP_INVENTORY, detail_labels, provenance_labels, summary_labels};
use vmsync_vsphere::CollectFilter;

use super::{epoch_now, list_vms};
use crate::context::AccountContext;
use crate::output::print_summary;

pub fn ingest_mode(individual: bool) -> IngestMode {
    if individual {
        IngestMode::Individual
    } else {
        IngestMode::Bulk
    }
}

fn ingestor(ctx: &AccountContext) -> Ingestor {
    Ingestor::new(ctx.store.clone(), ctx.store.clone())
        .with_progress_every(ctx.account.settings.progress_every)
        .with_policy(ctx.policy)
}

/// Stores summary and detail labels of every VM in the host inventory.
///
/// Each VM is handed to the ingestion session as soon as its labels are known.
pub async fn labels(ctx: &AccountContext, mode: IngestMode) -> Result<()> {
    let settings = &ctx.account.settings;
    let vms = list_vms(ctx.source.as_ref()).await?;
    let provenance = settings.stamp_provenance.then(|| {
        provenance_labels(
            ctx.source_label(),
            ctx.source.endpoint(),
            STAMP_INVENTORY,
            epoch_now(),
        )
    });

    let ingestor = ingestor(ctx);
    let inventory = settings.inventory_config(&ctx.name);
    let mut session = ingestor.session(&inventory, mode, vms.len());
    for vm in &vms {
        let name = vm.name.trim();
        if name.is_empty() {
            tracing::warn!(vm = %vm.vm, "VM without name ignored");
            session.record(&vm.vm, &ObjectOutcome::Skipped(SkipReason::BlankName));
            continue;
        }

        let mut labels = summary_labels(vm);
        match ctx.source.object_details(&vm.reference()).await {
            Ok(details) => {
                if details.is_template() && !settings.include_templates {
                    session.record(name, &ObjectOutcome::Skipped(SkipReason::Template));
                    continue;
                }
                labels.overlay(detail_labels(&details));
            }
            Err(e) if e.is_connectivity() => {
                let outcome = ctx.policy.handle(name, e.into())?;
                session.record(name, &outcome);
                continue;
            }
            Err(e) => {
                tracing::debug!(object = %name, error = %e, "details unavailable, using summary labels");
            }
        }
        if let Some(stamp) = &provenance {
            labels.overlay(stamp.clone());
        }
        session.push(name.to_string(), labels).await?;
    }

    let summary = session.finish().await?;
    ctx.persist().await?;

    tracing::info!(account = %ctx.name, %mode, %summary, "inventorize finished");
    print_summary(&format!("Inventory of {} ({mode})", ctx.name), &summary);
    Ok(())
}

/// Stores the collected attribute map of every VM in the host inventory.
///
/// Objects are ingested while the collection runs.
pub async fn custom_attributes(ctx: &AccountContext, mode: IngestMode) -> Result<()> {
    let collector = ctx.collector();
    let filter = CollectFilter::all();
    let mut collection = collector.start(&filter).await?;

    let ingestor = ingestor(ctx);
    let inventory = ctx.account.settings.inventory_config(&ctx.name);
    let mut session = ingestor.session(&inventory, mode, collection.listed());
    while let Some(object) = collection.next().await? {
        session.push(object.name, object.attributes).await?;
    }

    let mut summary = collection.into_summary();
    summary.merge(session.finish().await?);
    ctx.persist().await?;

    tracing::info!(account = %ctx.name, %mode, %summary, "custom attribute inventory finished");
    print_summary(
        &format!("Custom attribute inventory of {} ({mode})", ctx.name),
        &summary,
    );
    Ok(())
}
