//! Per-object results and run summaries.
//!
//! Every pipeline stage reports what happened to each object as an
//! [`ObjectOutcome`]; the run folds them into a [`RunSummary`].

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::SyncError;

/// Why an object was left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The object has an empty or blank name.
    BlankName,
    /// The object is a template and templates are excluded.
    Template,
    /// The host has no attributes to evaluate.
    NoAttributes,
    /// No rule produced any output.
    NoRuleOutput,
    /// The object is not present in the source system data.
    NotFoundInSource,
    /// The object has no record in the host store.
    NotFoundInStore,
    /// The host record belongs to another account.
    ForeignAccount,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BlankName => "blank_name",
            Self::Template => "template",
            Self::NoAttributes => "no_attributes",
            Self::NoRuleOutput => "no_rule_output",
            Self::NotFoundInSource => "not_found_in_source",
            Self::NotFoundInStore => "not_found_in_store",
            Self::ForeignAccount => "foreign_account",
        };
        f.write_str(s)
    }
}

/// What happened to one object.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectOutcome {
    Created,
    /// Attributes were written; `keys` lists what changed.
    Updated { keys: Vec<String> },
    Unchanged,
    Skipped(SkipReason),
    /// Processing failed. `written` lists the keys that did succeed before or
    /// alongside the failure.
    Failed { message: String, written: Vec<String> },
}

impl ObjectOutcome {
    pub fn failed(error: &SyncError) -> Self {
        Self::Failed {
            message: error.to_string(),
            written: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Counts for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
    /// `(object, message)` for every failed object.
    pub errors: Vec<(String, String)>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, object: &str, outcome: &ObjectOutcome) {
        match outcome {
            ObjectOutcome::Created => self.created += 1,
            ObjectOutcome::Updated { .. } => self.updated += 1,
            ObjectOutcome::Unchanged => self.unchanged += 1,
            ObjectOutcome::Skipped(reason) => *self.skipped.entry(*reason).or_insert(0) += 1,
            ObjectOutcome::Failed { message, .. } => {
                self.failed += 1;
                self.errors.push((object.to_string(), message.clone()));
            }
        }
    }

    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    /// Number of objects that reached a terminal outcome.
    pub fn total(&self) -> usize {
        self.created + self.updated + self.unchanged + self.failed + self.skipped_total()
    }

    pub fn merge(&mut self, other: RunSummary) {
        self.created += other.created;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.failed += other.failed;
        for (reason, count) in other.skipped {
            *self.skipped.entry(reason).or_insert(0) += count;
        }
        self.errors.extend(other.errors);
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created={} updated={} unchanged={} skipped={} failed={}",
            self.created,
            self.updated,
            self.unchanged,
            self.skipped_total(),
            self.failed
        )
    }
}

/// Decides what a per-object error does to the run.
///
/// Operational runs (`debug = false`) log the error and record the object as failed.
/// Diagnostic runs (`debug = true`) abort on the first error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorPolicy {
    pub debug: bool,
}

impl ErrorPolicy {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    pub fn handle(&self, object: &str, error: SyncError) -> Result<ObjectOutcome, SyncError> {
        self.handle_partial(object, error, Vec::new())
    }

    /// Same as [`handle`](Self::handle) but keeps the keys that were written.
    pub fn handle_partial(
        &self,
        object: &str,
        error: SyncError,
        written: Vec<String>,
    ) -> Result<ObjectOutcome, SyncError> {
        if self.debug {
            return Err(error);
        }
        tracing::error!(
            object = %object,
            category = %error.category(),
            written = written.len(),
            "{error}"
        );
        Ok(ObjectOutcome::Failed {
            message: error.to_string(),
            written,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut summary = RunSummary::new();
        summary.record("a", &ObjectOutcome::Created);
        summary.record("b", &ObjectOutcome::Updated { keys: vec!["owner".into()] });
        summary.record("", &ObjectOutcome::Skipped(SkipReason::BlankName));
        summary.record("c", &ObjectOutcome::Skipped(SkipReason::NotFoundInSource));
        summary.record("d", &ObjectOutcome::Skipped(SkipReason::NotFoundInSource));
        summary.record(
            "e",
            &ObjectOutcome::failed(&SyncError::object_absent("e")),
        );

        assert_eq!(summary.created, 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.skipped_for(SkipReason::BlankName), 1);
        assert_eq!(summary.skipped_for(SkipReason::NotFoundInSource), 2);
        assert_eq!(summary.skipped_total(), 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors[0].0, "e");
        assert_eq!(summary.total(), 6);
        assert_eq!(
            summary.to_string(),
            "created=1 updated=1 unchanged=0 skipped=3 failed=1"
        );
    }

    #[test]
    fn test_merge() {
        let mut a = RunSummary::new();
        a.record("x", &ObjectOutcome::Skipped(SkipReason::Template));
        let mut b = RunSummary::new();
        b.record("y", &ObjectOutcome::Skipped(SkipReason::Template));
        b.record("z", &ObjectOutcome::Unchanged);
        a.merge(b);
        assert_eq!(a.skipped_for(SkipReason::Template), 2);
        assert_eq!(a.unchanged, 1);
    }

    #[test]
    fn test_policy_records_failure_in_operational_mode() {
        let policy = ErrorPolicy::new(false);
        let outcome = policy
            .handle_partial(
                "web01",
                SyncError::write_failure("web01", "owner", "denied"),
                vec!["env".to_string()],
            )
            .unwrap();
        match outcome {
            ObjectOutcome::Failed { written, .. } => assert_eq!(written, vec!["env"]),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_policy_aborts_in_debug_mode() {
        let policy = ErrorPolicy::new(true);
        let err = policy
            .handle("web01", SyncError::connectivity("timeout"))
            .unwrap_err();
        assert!(err.is_connectivity());
    }
}
