//! Rule definitions.
//!
//! A rules document is a TOML file with one `[[rule]]` table per rule:
//!
//! ```toml
//! [[rule]]
//! name = "owner from folder"
//! sort_field = 10
//! condition_typ = "all"
//!
//! [[rule.conditions]]
//! attribute = "folder_hierarchy"
//! kind = "contains"
//! value = "Finance"
//!
//! [[rule.outcomes]]
//! action = "set"
//! name = "owner"
//! value = "finance-{{guest_os}}"
//! transform = { type = "lowercase" }
//! ```

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// One ordered, conditional transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    /// Evaluation order, ascending. Later rules overwrite earlier ones.
    #[serde(default)]
    pub sort_field: i64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub condition_typ: ConditionType,
    /// Stop evaluating further rules once this one matched.
    #[serde(default)]
    pub last_match: bool,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub outcomes: Vec<Outcome>,
}

impl Rule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sort_field: 0,
            enabled: true,
            condition_typ: ConditionType::All,
            last_match: false,
            conditions: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    #[must_use]
    pub fn sort_field(mut self, sort_field: i64) -> Self {
        self.sort_field = sort_field;
        self
    }

    #[must_use]
    pub fn condition_typ(mut self, condition_typ: ConditionType) -> Self {
        self.condition_typ = condition_typ;
        self
    }

    #[must_use]
    pub fn last_match(mut self) -> Self {
        self.last_match = true;
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    #[must_use]
    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    #[must_use]
    pub fn then(mut self, outcome: Outcome) -> Self {
        self.outcomes.push(outcome);
        self
    }
}

/// How the conditions of a rule combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    /// Every condition must match. A rule without conditions matches.
    #[default]
    All,
    /// At least one condition must match. A rule without conditions never matches.
    Any,
    /// The rule always matches.
    Anyway,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    #[default]
    Equal,
    Contains,
    StartsWith,
    EndsWith,
    Regex,
    /// The attribute is present. `value` is ignored.
    Exists,
    /// The attribute equals one of the comma-separated entries in `value`.
    In,
}

/// A predicate over one source attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub attribute: String,
    #[serde(default)]
    pub kind: ConditionKind,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub negate: bool,
    #[serde(default)]
    pub case_sensitive: bool,
}

impl Condition {
    pub fn new(attribute: impl Into<String>, kind: ConditionKind, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            kind,
            value: value.into(),
            negate: false,
            case_sensitive: false,
        }
    }

    pub fn exists(attribute: impl Into<String>) -> Self {
        Self::new(attribute, ConditionKind::Exists, "")
    }

    #[must_use]
    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }

    #[must_use]
    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }
}

/// What a matching rule contributes to the target map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Outcome {
    /// Sets `name` to the rendered `value` template.
    Set {
        name: String,
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transform: Option<Transform>,
    },
    /// Copies the source attribute `from` to `to`, keeping its type unless transformed.
    Copy {
        from: String,
        to: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transform: Option<Transform>,
    },
}

impl Outcome {
    pub fn set(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Set {
            name: name.into(),
            value: value.into(),
            transform: None,
        }
    }

    pub fn copy(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::Copy {
            from: from.into(),
            to: to.into(),
            transform: None,
        }
    }

    #[must_use]
    pub fn with_transform(mut self, value: Transform) -> Self {
        match &mut self {
            Self::Set { transform, .. } | Self::Copy { transform, .. } => {
                *transform = Some(value);
            }
        }
        self
    }

    pub fn transform(&self) -> Option<&Transform> {
        match self {
            Self::Set { transform, .. } | Self::Copy { transform, .. } => transform.as_ref(),
        }
    }
}

/// Transformation applied to the text form of an outcome value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transform {
    Lowercase,
    Uppercase,
    Trim,
    Replace {
        from: String,
        to: String,
    },
    /// Keeps capture `group` of the first match (0 = whole match); no match yields empty.
    Regex {
        pattern: String,
        #[serde(default)]
        group: usize,
    },
}
