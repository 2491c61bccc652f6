use std::sync::Arc;

use anyhow::Result;
use vmsync_sync::{DynAttributeWriter, ExportPipeline, SourceWriter};
use vmsync_vsphere::DynAttributeCollector;

use crate::context::AccountContext;
use crate::output::{print_summary, print_warning};

/// Evaluates the custom attribute rules per host and writes the changes back.
pub async fn run(ctx: &AccountContext, dry_run: bool) -> Result<()> {
    let collector: DynAttributeCollector = Arc::new(ctx.collector());
    let writer: DynAttributeWriter = Arc::new(SourceWriter::new(ctx.source.clone()));

    let mut pipeline = ExportPipeline::new(collector, ctx.rules()?, writer, ctx.store.clone())
        .with_filter(ctx.account.settings.filter.clone())
        .with_dry_run(dry_run)
        .with_policy(ctx.policy);
    if let Some(rewrite) = ctx.rewrite_rules()? {
        pipeline = pipeline.with_rewrite(rewrite);
    }

    let summary = pipeline.run().await?;
    if dry_run {
        print_warning("Dry run: nothing was written");
    } else {
        ctx.persist().await?;
    }

    print_summary(&format!("Custom attribute export to {}", ctx.name), &summary);
    Ok(())
}
