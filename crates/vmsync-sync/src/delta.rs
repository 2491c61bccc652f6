//! Change detection between rule output and remote state.

use std::collections::BTreeMap;

use serde::Serialize;
use vmsync_core::{AttributeMap, AttributeValue};

/// One changed key. `old` is `None` when the key is absent remotely.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub old: Option<AttributeValue>,
    pub new: AttributeValue,
}

/// The keys of a target map whose value differs from the remote state.
///
/// Deltas are additive: a key present remotely but missing from the target is never
/// part of a delta. Values are compared exactly, so `Integer(0)` and `"0"` differ.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Delta {
    object: String,
    changes: BTreeMap<String, Change>,
}

impl Delta {
    pub fn compute(object: &str, target: &AttributeMap, current: &AttributeMap) -> Self {
        let changes = target
            .iter()
            .filter_map(|(key, new)| {
                let old = current.get(key);
                (old != Some(new)).then(|| {
                    (
                        key.clone(),
                        Change {
                            old: old.cloned(),
                            new: new.clone(),
                        },
                    )
                })
            })
            .collect();

        Self {
            object: object.to_string(),
            changes,
        }
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn get(&self, key: &str) -> Option<&Change> {
        self.changes.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.changes.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Change)> {
        self.changes.iter()
    }

    /// The new values only.
    pub fn to_map(&self) -> AttributeMap {
        self.changes
            .iter()
            .map(|(key, change)| (key.clone(), change.new.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, AttributeValue)]) -> AttributeMap {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn test_only_changed_keys_are_included() {
        let current = map(&[("annotation", "old".into())]);
        let target = map(&[("annotation", "old".into()), ("owner", "teamA".into())]);

        let delta = Delta::compute("web01", &target, &current);
        assert_eq!(delta.len(), 1);
        assert_eq!(
            delta.get("owner"),
            Some(&Change {
                old: None,
                new: "teamA".into()
            })
        );
        assert_eq!(delta.object(), "web01");
    }

    #[test]
    fn test_remote_only_keys_are_ignored() {
        let current = map(&[("legacy", "keep".into()), ("owner", "teamB".into())]);
        let target = map(&[("owner", "teamA".into())]);

        let delta = Delta::compute("web01", &target, &current);
        assert_eq!(delta.keys().collect::<Vec<_>>(), vec!["owner"]);
        assert_eq!(delta.get("owner").unwrap().old, Some("teamB".into()));
    }

    #[test]
    fn test_comparison_is_type_sensitive() {
        let current = map(&[("cpu_count", AttributeValue::Integer(0))]);
        let target = map(&[("cpu_count", "0".into())]);
        assert_eq!(Delta::compute("vm", &target, &current).len(), 1);

        let target = map(&[("cpu_count", AttributeValue::Integer(0))]);
        assert!(Delta::compute("vm", &target, &current).is_empty());
    }

    #[test]
    fn test_to_map() {
        let target = map(&[("a", "1".into()), ("b", "2".into())]);
        let delta = Delta::compute("vm", &target, &AttributeMap::new());
        assert_eq!(delta.to_map(), target);
    }
}
