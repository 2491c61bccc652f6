//! Rule set evaluation.
//!
//! Rules run in ascending `sort_field` order; rules sharing a sort value keep their
//! document order. Every matching rule writes its outcomes into one target map, so a
//! later rule overwrites the keys of an earlier one. Outcomes that render to nothing are
//! omitted and leave earlier values in place.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use vmsync_core::{AttributeMap, AttributeValue};

use crate::error::RuleError;
use crate::model::{Condition, ConditionKind, ConditionType, Outcome, Rule, Transform};
use crate::template;

/// Produces a target attribute map from a source attribute map.
///
/// Implementations are pure: the result depends only on `source` and the rules.
pub trait RuleEvaluator: Send + Sync {
    fn apply(&self, object: &str, source: &AttributeMap) -> Result<AttributeMap, RuleError>;

    /// Number of rules that can contribute output.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub type DynRuleEvaluator = Arc<dyn RuleEvaluator>;

type PatternKey = (String, bool);

#[derive(Debug, Deserialize)]
struct RulesDocument {
    #[serde(default, rename = "rule")]
    rules: Vec<Rule>,
}

/// An ordered collection of rules with their compiled patterns.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
    /// Compiled once per set. A pattern that fails to compile is kept as its error so
    /// only objects that reach it fail.
    patterns: HashMap<PatternKey, Result<Regex, String>>,
}

impl RuleSet {
    pub fn new(mut rules: Vec<Rule>) -> Self {
        rules.sort_by_key(|rule| rule.sort_field);

        let mut patterns = HashMap::new();
        for rule in &rules {
            for condition in &rule.conditions {
                if condition.kind == ConditionKind::Regex {
                    let key = (condition.value.clone(), condition.case_sensitive);
                    patterns
                        .entry(key)
                        .or_insert_with(|| compile(&condition.value, condition.case_sensitive));
                }
            }
            for outcome in &rule.outcomes {
                if let Some(Transform::Regex { pattern, .. }) = outcome.transform() {
                    patterns
                        .entry((pattern.clone(), true))
                        .or_insert_with(|| compile(pattern, true));
                }
            }
        }

        let invalid = patterns.values().filter(|p| p.is_err()).count();
        if invalid > 0 {
            tracing::warn!(invalid, "rule set contains patterns that do not compile");
        }

        Self { rules, patterns }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Parses a TOML rules document made of `[[rule]]` tables.
    pub fn from_toml(document: &str) -> Result<Self, RuleError> {
        let doc: RulesDocument =
            toml::from_str(document).map_err(|e| RuleError::Parse(e.to_string()))?;
        Ok(Self::new(doc.rules))
    }

    pub fn from_file(path: &Path) -> Result<Self, RuleError> {
        let content = std::fs::read_to_string(path).map_err(|e| RuleError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let set = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), rules = set.rules.len(), "loaded rules");
        Ok(set)
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    fn pattern(&self, rule: &Rule, pattern: &str, case_sensitive: bool) -> Result<&Regex, RuleError> {
        match self.patterns.get(&(pattern.to_string(), case_sensitive)) {
            Some(Ok(re)) => Ok(re),
            Some(Err(message)) => Err(RuleError::invalid_pattern(&rule.name, pattern, message)),
            None => Err(RuleError::invalid_pattern(
                &rule.name,
                pattern,
                "pattern was not compiled",
            )),
        }
    }

    fn matches(&self, rule: &Rule, source: &AttributeMap) -> Result<bool, RuleError> {
        match rule.condition_typ {
            ConditionType::Anyway => Ok(true),
            ConditionType::All => {
                for condition in &rule.conditions {
                    if !self.condition_matches(rule, condition, source)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            ConditionType::Any => {
                for condition in &rule.conditions {
                    if self.condition_matches(rule, condition, source)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn condition_matches(
        &self,
        rule: &Rule,
        condition: &Condition,
        source: &AttributeMap,
    ) -> Result<bool, RuleError> {
        let value = source.get(&condition.attribute);
        let matched = match (condition.kind, value) {
            (ConditionKind::Exists, value) => value.is_some(),
            (_, None) => false,
            (_, Some(value)) => self.value_matches(rule, condition, value)?,
        };
        Ok(matched != condition.negate)
    }

    /// Lists match when any element matches. Records only support `Exists`.
    fn value_matches(
        &self,
        rule: &Rule,
        condition: &Condition,
        value: &AttributeValue,
    ) -> Result<bool, RuleError> {
        match value {
            AttributeValue::List(items) => {
                for item in items {
                    if self.value_matches(rule, condition, item)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            AttributeValue::Record(_) => Ok(false),
            scalar => self.text_matches(rule, condition, &scalar.to_text()),
        }
    }

    fn text_matches(&self, rule: &Rule, condition: &Condition, text: &str) -> Result<bool, RuleError> {
        if condition.kind == ConditionKind::Regex {
            let re = self.pattern(rule, &condition.value, condition.case_sensitive)?;
            return Ok(re.is_match(text));
        }

        let (text, expected) = if condition.case_sensitive {
            (text.to_string(), condition.value.clone())
        } else {
            (text.to_lowercase(), condition.value.to_lowercase())
        };

        Ok(match condition.kind {
            ConditionKind::Equal => text == expected,
            ConditionKind::Contains => text.contains(&expected),
            ConditionKind::StartsWith => text.starts_with(&expected),
            ConditionKind::EndsWith => text.ends_with(&expected),
            ConditionKind::In => expected.split(',').map(str::trim).any(|entry| entry == text),
            ConditionKind::Exists | ConditionKind::Regex => true,
        })
    }

    fn produce(
        &self,
        rule: &Rule,
        outcome: &Outcome,
        source: &AttributeMap,
        target: &mut AttributeMap,
    ) -> Result<(), RuleError> {
        let (name, value) = match outcome {
            Outcome::Set { name, value, .. } => (
                template::render(name, source),
                AttributeValue::String(template::render(value, source)),
            ),
            Outcome::Copy { from, to, .. } => match source.get(from) {
                Some(value) => (template::render(to, source), value.clone()),
                None => return Ok(()),
            },
        };

        let name = name.trim();
        if name.is_empty() {
            return Ok(());
        }

        let value = match outcome.transform() {
            Some(transform) => {
                AttributeValue::String(self.transform(rule, transform, &value.to_text())?)
            }
            None => value,
        };

        target.set(name, value);
        Ok(())
    }

    fn transform(&self, rule: &Rule, transform: &Transform, value: &str) -> Result<String, RuleError> {
        Ok(match transform {
            Transform::Lowercase => value.to_lowercase(),
            Transform::Uppercase => value.to_uppercase(),
            Transform::Trim => value.trim().to_string(),
            Transform::Replace { from, to } => value.replace(from.as_str(), to),
            Transform::Regex { pattern, group } => {
                let re = self.pattern(rule, pattern, true)?;
                re.captures(value)
                    .and_then(|caps| caps.get(*group))
                    .map_or_else(String::new, |m| m.as_str().to_string())
            }
        })
    }
}

impl RuleEvaluator for RuleSet {
    fn apply(&self, object: &str, source: &AttributeMap) -> Result<AttributeMap, RuleError> {
        let mut target = AttributeMap::new();

        for rule in self.rules.iter().filter(|rule| rule.enabled) {
            if !self.matches(rule, source)? {
                continue;
            }
            tracing::trace!(object = %object, rule = %rule.name, "rule matched");

            for outcome in &rule.outcomes {
                self.produce(rule, outcome, source, &mut target)?;
            }

            if rule.last_match {
                break;
            }
        }

        Ok(target)
    }

    fn len(&self) -> usize {
        self.rules.iter().filter(|rule| rule.enabled).count()
    }
}

fn compile(pattern: &str, case_sensitive: bool) -> Result<Regex, String> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| e.to_string())
}
