//! Host import: one host record per source object.

use vmsync_core::{AttributeMap, ErrorPolicy, ObjectOutcome, RunSummary, SkipReason, SyncError};
use vmsync_storage::{AccountRef, DynHostStore};

use crate::delta::Delta;

/// Creates or updates host records from `(hostname, labels)` pairs.
pub struct Importer {
    store: DynHostStore,
    account: AccountRef,
    policy: ErrorPolicy,
}

impl Importer {
    pub fn new(store: DynHostStore, account: AccountRef) -> Self {
        Self {
            store,
            account,
            policy: ErrorPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn run(&self, objects: Vec<(String, AttributeMap)>) -> Result<RunSummary, SyncError> {
        let mut summary = RunSummary::new();

        for (hostname, labels) in objects {
            let hostname = hostname.trim();
            let outcome = if hostname.is_empty() {
                ObjectOutcome::Skipped(SkipReason::BlankName)
            } else {
                match self.import_one(hostname, labels).await {
                    Ok(outcome) => outcome,
                    Err(e) => self.policy.handle(hostname, e)?,
                }
            };
            summary.record(hostname, &outcome);
        }

        tracing::info!(account = %self.account.name, %summary, "import finished");
        Ok(summary)
    }

    async fn import_one(
        &self,
        hostname: &str,
        labels: AttributeMap,
    ) -> Result<ObjectOutcome, SyncError> {
        let (mut record, created) = self.store.get_or_create(hostname).await?;

        if created {
            record.set_account(&self.account);
            record.update_labels(labels);
            self.store.save(&record).await?;
            tracing::debug!(host = %hostname, "host created");
            return Ok(ObjectOutcome::Created);
        }

        let unowned = record.account.is_none();
        if !record.set_account(&self.account) {
            tracing::warn!(
                host = %hostname,
                owner = record.account.as_deref().unwrap_or_default(),
                "host belongs to another account, skipping"
            );
            return Ok(ObjectOutcome::Skipped(SkipReason::ForeignAccount));
        }

        let keys: Vec<String> = Delta::compute(hostname, &labels, &record.labels)
            .keys()
            .cloned()
            .collect();
        if !record.update_labels(labels) && !unowned {
            return Ok(ObjectOutcome::Unchanged);
        }

        self.store.save(&record).await?;
        tracing::debug!(host = %hostname, changed = keys.len(), "host updated");
        Ok(ObjectOutcome::Updated { keys })
    }
}
