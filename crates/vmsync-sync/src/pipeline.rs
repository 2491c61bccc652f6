//! Custom attribute export.
//!
//! [`ExportPipeline`] drives the three stages for every selected host:
//!
//! 1. the collector runs once and its objects are indexed by name,
//! 2. the host attributes go through the optional rewrite rules and the custom
//!    attribute rules,
//! 3. the rule output is diffed against the collected state of the matching object
//!    and only the changed keys are written back.

use std::collections::HashMap;

use vmsync_core::{ErrorPolicy, ObjectOutcome, RunSummary, SkipReason, SyncError};
use vmsync_rules::DynRuleEvaluator;
use vmsync_storage::{DynHostStore, HostFilter, HostRecord};
use vmsync_vsphere::{CollectFilter, CollectedObject, DynAttributeCollector};

use crate::delta::Delta;
use crate::writer::{DynAttributeWriter, WriteBack};

pub struct ExportPipeline {
    collector: DynAttributeCollector,
    rules: DynRuleEvaluator,
    rewrite: Option<DynRuleEvaluator>,
    writeback: WriteBack,
    store: DynHostStore,
    filter: HostFilter,
    collect_filter: CollectFilter,
    dry_run: bool,
    policy: ErrorPolicy,
}

impl ExportPipeline {
    pub fn new(
        collector: DynAttributeCollector,
        rules: DynRuleEvaluator,
        writer: DynAttributeWriter,
        store: DynHostStore,
    ) -> Self {
        Self {
            collector,
            rules,
            rewrite: None,
            writeback: WriteBack::new(writer),
            store,
            filter: HostFilter::all(),
            collect_filter: CollectFilter::all(),
            dry_run: false,
            policy: ErrorPolicy::default(),
        }
    }

    /// Rules whose output is overlaid onto the host attributes before the custom
    /// attribute rules run.
    #[must_use]
    pub fn with_rewrite(mut self, rewrite: DynRuleEvaluator) -> Self {
        self.rewrite = Some(rewrite);
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: HostFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn with_collect_filter(mut self, filter: CollectFilter) -> Self {
        self.collect_filter = filter;
        self
    }

    /// Compute deltas without writing.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn run(&self) -> Result<RunSummary, SyncError> {
        let collection = self.collector.collect(&self.collect_filter).await?;
        let mut summary = collection.summary.clone();
        let index = collection.into_index();

        let hosts = self.store.objects_by_filter(&self.filter).await?;
        tracing::info!(
            hosts = hosts.len(),
            objects = index.len(),
            backend = self.store.backend_name(),
            dry_run = self.dry_run,
            "exporting custom attributes"
        );

        for host in &hosts {
            let outcome = match self.export_host(host, &index).await {
                Ok(outcome) => outcome,
                Err(e) => self.policy.handle(&host.hostname, e)?,
            };
            if let ObjectOutcome::Skipped(reason) = &outcome {
                tracing::debug!(host = %host.hostname, reason = %reason, "host skipped");
            }
            summary.record(&host.hostname, &outcome);
        }

        tracing::info!(%summary, "custom attribute export finished");
        Ok(summary)
    }

    async fn export_host(
        &self,
        host: &HostRecord,
        index: &HashMap<String, CollectedObject>,
    ) -> Result<ObjectOutcome, SyncError> {
        let hostname = host.hostname.trim();
        if hostname.is_empty() {
            return Ok(ObjectOutcome::Skipped(SkipReason::BlankName));
        }

        let mut attributes = host.all_attributes();
        if attributes.is_empty() {
            return Ok(ObjectOutcome::Skipped(SkipReason::NoAttributes));
        }

        if let Some(rewrite) = &self.rewrite {
            let rewritten = rewrite
                .apply(hostname, &attributes)
                .map_err(|e| e.for_object(hostname))?;
            attributes.overlay(rewritten);
        }

        let target = self
            .rules
            .apply(hostname, &attributes)
            .map_err(|e| e.for_object(hostname))?;
        if target.is_empty() {
            return Ok(ObjectOutcome::Skipped(SkipReason::NoRuleOutput));
        }

        let Some(object) = index.get(hostname) else {
            return Ok(ObjectOutcome::Skipped(SkipReason::NotFoundInSource));
        };

        let target = self.writeback.encode(target);
        let delta = Delta::compute(hostname, &target, &object.attributes);
        if delta.is_empty() {
            return Ok(ObjectOutcome::Unchanged);
        }

        if self.dry_run {
            for (key, change) in delta.iter() {
                tracing::info!(
                    host = %hostname,
                    key = %key,
                    old = ?change.old.as_ref().map(|v| v.to_text()),
                    new = %change.new,
                    "would write"
                );
            }
            return Ok(ObjectOutcome::Updated {
                keys: delta.keys().cloned().collect(),
            });
        }

        let report = self.writeback.apply(&object.identity, &delta).await;
        tracing::debug!(
            host = %hostname,
            written = report.written.len(),
            failed = report.failed.len(),
            "delta applied"
        );
        report.into_outcome(hostname, &self.policy)
    }
}
