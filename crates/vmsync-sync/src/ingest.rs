//! Inventory ingestion strategies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vmsync_core::{AttributeMap, ErrorPolicy, ObjectOutcome, RunSummary, SkipReason, SyncError};
use vmsync_storage::{DynHostStore, DynInventorySink, InventoryConfig, InventoryReport};

pub const DEFAULT_PROGRESS_EVERY: usize = 100;

/// How inventory data reaches the sink. Chosen by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    /// One aggregate submission for every object.
    #[default]
    Bulk,
    /// One submission per object, as soon as it is known.
    Individual,
}

impl fmt::Display for IngestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bulk => write!(f, "bulk"),
            Self::Individual => write!(f, "individual"),
        }
    }
}

impl FromStr for IngestMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bulk" => Ok(Self::Bulk),
            "individual" => Ok(Self::Individual),
            other => Err(SyncError::configuration(format!(
                "unknown ingest mode: {other}"
            ))),
        }
    }
}

/// Submits `(hostname, attributes)` pairs to an inventory sink.
pub struct Ingestor {
    store: DynHostStore,
    sink: DynInventorySink,
    progress_every: usize,
    policy: ErrorPolicy,
}

impl Ingestor {
    pub fn new(store: DynHostStore, sink: DynInventorySink) -> Self {
        Self {
            store,
            sink,
            progress_every: DEFAULT_PROGRESS_EVERY,
            policy: ErrorPolicy::default(),
        }
    }

    /// Progress is logged every `every` objects in individual mode. Zero is treated
    /// as one.
    #[must_use]
    pub fn with_progress_every(mut self, every: usize) -> Self {
        self.progress_every = every.max(1);
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Ingests a complete batch of pairs.
    pub async fn run(
        &self,
        config: &InventoryConfig,
        pairs: Vec<(String, AttributeMap)>,
        mode: IngestMode,
    ) -> Result<RunSummary, SyncError> {
        let mut session = self.session(config, mode, pairs.len());
        for (hostname, data) in pairs {
            session.push(hostname, data).await?;
        }
        session.finish().await
    }

    /// Starts an ingestion that accepts pairs as they are produced.
    ///
    /// In individual mode every pushed pair is submitted before `push` returns; in bulk
    /// mode pairs are held until [`IngestSession::finish`]. `expected` is only used for
    /// progress reporting.
    pub fn session<'a>(
        &'a self,
        config: &'a InventoryConfig,
        mode: IngestMode,
        expected: usize,
    ) -> IngestSession<'a> {
        tracing::info!(
            account = %config.account,
            key = %config.inventory_key,
            mode = %mode,
            objects = expected,
            "ingesting inventory"
        );
        IngestSession {
            ingestor: self,
            config,
            mode,
            expected,
            pending: Vec::new(),
            summary: RunSummary::new(),
            submitted: 0,
            progress_reports: 0,
        }
    }

    async fn bulk(
        &self,
        config: &InventoryConfig,
        pairs: Vec<(String, AttributeMap)>,
    ) -> Result<RunSummary, SyncError> {
        let mut summary = RunSummary::new();
        let hostnames: Vec<String> = pairs.iter().map(|(hostname, _)| hostname.clone()).collect();

        let report = match self.sink.bulk_submit(config, pairs).await {
            Ok(report) => report,
            Err(e) => {
                let outcome = self.policy.handle("bulk submission", e.into())?;
                for hostname in &hostnames {
                    summary.record(hostname, &outcome);
                }
                return Ok(summary);
            }
        };

        record_report(&mut summary, &report);
        Ok(summary)
    }

    async fn submit(
        &self,
        config: &InventoryConfig,
        hostname: &str,
        data: AttributeMap,
    ) -> Result<ObjectOutcome, SyncError> {
        let Some(mut record) = self.store.get_host(hostname).await? else {
            tracing::debug!(host = %hostname, "host not found, skipping");
            return Ok(ObjectOutcome::Skipped(SkipReason::NotFoundInStore));
        };

        let changed = self
            .sink
            .submit_one(&mut record, data, &config.inventory_key, config)
            .await?;
        Ok(if changed {
            ObjectOutcome::Updated {
                keys: vec![config.inventory_key.clone()],
            }
        } else {
            ObjectOutcome::Unchanged
        })
    }
}

/// One ingestion in progress. Created by [`Ingestor::session`].
pub struct IngestSession<'a> {
    ingestor: &'a Ingestor,
    config: &'a InventoryConfig,
    mode: IngestMode,
    expected: usize,
    pending: Vec<(String, AttributeMap)>,
    summary: RunSummary,
    submitted: usize,
    progress_reports: usize,
}

impl IngestSession<'_> {
    pub fn mode(&self) -> IngestMode {
        self.mode
    }

    /// Records an outcome decided before ingestion, e.g. a skipped or failed object.
    pub fn record(&mut self, object: &str, outcome: &ObjectOutcome) {
        self.summary.record(object, outcome);
    }

    pub async fn push(&mut self, hostname: String, data: AttributeMap) -> Result<(), SyncError> {
        let hostname = hostname.trim().to_string();
        if hostname.is_empty() {
            self.summary
                .record(&hostname, &ObjectOutcome::Skipped(SkipReason::BlankName));
            return Ok(());
        }
        if data.is_empty() {
            self.summary
                .record(&hostname, &ObjectOutcome::Skipped(SkipReason::NoAttributes));
            return Ok(());
        }

        match self.mode {
            IngestMode::Bulk => self.pending.push((hostname, data)),
            IngestMode::Individual => {
                let outcome = match self.ingestor.submit(self.config, &hostname, data).await {
                    Ok(outcome) => outcome,
                    Err(e) => self.ingestor.policy.handle(&hostname, e)?,
                };
                self.summary.record(&hostname, &outcome);

                self.submitted += 1;
                if progress_due(self.submitted, self.ingestor.progress_every) {
                    self.progress_reports += 1;
                    tracing::info!(
                        processed = self.submitted,
                        total = self.expected,
                        "inventory progress"
                    );
                }
            }
        }
        Ok(())
    }

    /// Submits what bulk mode held back and returns the run summary.
    pub async fn finish(mut self) -> Result<RunSummary, SyncError> {
        if !self.pending.is_empty() {
            let pending = std::mem::take(&mut self.pending);
            let ingested = self.ingestor.bulk(self.config, pending).await?;
            self.summary.merge(ingested);
        }
        tracing::info!(mode = %self.mode, summary = %self.summary, "inventory ingestion finished");
        Ok(self.summary)
    }
}

fn progress_due(processed: usize, every: usize) -> bool {
    processed > 0 && processed % every == 0
}

fn record_report(summary: &mut RunSummary, report: &InventoryReport) {
    summary.updated += report.updated;
    summary.unchanged += report.unchanged;
    for hostname in &report.not_found {
        tracing::debug!(host = %hostname, "host not found, skipped");
        summary.record(hostname, &ObjectOutcome::Skipped(SkipReason::NotFoundInStore));
    }
    for (hostname, message) in &report.errors {
        tracing::error!(host = %hostname, "{message}");
        summary.record(
            hostname,
            &ObjectOutcome::Failed {
                message: message.clone(),
                written: Vec::new(),
            },
        );
    }
}
