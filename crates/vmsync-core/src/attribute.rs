//! Typed attribute values and the normalized attribute map.
//!
//! Every map built by the collector, the rule engine or the label normalizers goes
//! through [`AttributeMap::set`], which drops empty values. A key is either present
//! with a meaningful value or absent; it never maps to an empty string or an empty
//! collection.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// A single attribute value.
///
/// The set of kinds is closed: anything a source system returns that is not one of
/// these is converted to its text form with [`AttributeValue::display`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<AttributeValue>),
    Record(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Wraps the `Display` form of an arbitrary value.
    pub fn display(value: impl fmt::Display) -> Self {
        Self::String(value.to_string())
    }

    /// Builds a record from `(name, value)` pairs, dropping empty members.
    pub fn record<K, V, I>(fields: I) -> Self
    where
        K: Into<String>,
        V: Into<AttributeValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut record = BTreeMap::new();
        for (key, value) in fields {
            if let Some(value) = value.into().normalized() {
                record.insert(key.into(), value);
            }
        }
        Self::Record(record)
    }

    /// Returns `true` for blank strings and for collections without a non-empty member.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::String(s) => s.trim().is_empty(),
            Self::List(items) => items.iter().all(AttributeValue::is_empty),
            Self::Record(fields) => fields.values().all(AttributeValue::is_empty),
            Self::Bool(_) | Self::Integer(_) | Self::Float(_) => false,
        }
    }

    /// Recursively prunes empty members. Returns `None` when nothing is left.
    pub fn normalized(self) -> Option<Self> {
        match self {
            Self::String(s) if s.trim().is_empty() => None,
            Self::List(items) => {
                let items: Vec<_> = items.into_iter().filter_map(Self::normalized).collect();
                (!items.is_empty()).then_some(Self::List(items))
            }
            Self::Record(fields) => {
                let fields: BTreeMap<_, _> = fields
                    .into_iter()
                    .filter_map(|(k, v)| v.normalized().map(|v| (k, v)))
                    .collect();
                (!fields.is_empty()).then_some(Self::Record(fields))
            }
            other => Some(other),
        }
    }

    /// Text form of the value.
    ///
    /// Floats always keep a fractional part (`4.0` renders as `"4.0"`), lists are joined
    /// with `", "` and records render as compact JSON.
    pub fn to_text(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => format!("{f:?}"),
            Self::List(items) => items
                .iter()
                .map(AttributeValue::to_text)
                .collect::<Vec<_>>()
                .join(", "),
            Self::Record(_) => serde_json::to_string(self).unwrap_or_default(),
        }
    }

    /// Short name of the value kind, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Record(_) => "record",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&BTreeMap<String, AttributeValue>> {
        match self {
            Self::Record(fields) => Some(fields),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&String> for AttributeValue {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<OffsetDateTime> for AttributeValue {
    fn from(value: OffsetDateTime) -> Self {
        Self::String(value.format(&Rfc3339).unwrap_or_else(|_| value.to_string()))
    }
}

impl<T: Into<AttributeValue>> From<Vec<T>> for AttributeValue {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

/// A flat, ordered map from attribute name to value.
///
/// Ordering is by key, so two maps with the same content serialize identically
/// regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AttributeMap(BTreeMap<String, AttributeValue>);

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` under `key` unless it normalizes to nothing.
    ///
    /// An empty value contributes nothing: it neither inserts nor removes an existing
    /// entry. Returns `true` when the map now holds the value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> bool {
        match value.into().normalized() {
            Some(value) => {
                self.0.insert(key.into(), value);
                true
            }
            None => false,
        }
    }

    /// Like [`set`](Self::set) for optional source fields.
    pub fn set_opt<V: Into<AttributeValue>>(
        &mut self,
        key: impl Into<String>,
        value: Option<V>,
    ) -> bool {
        match value {
            Some(value) => self.set(key, value),
            None => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0.get(key)
    }

    pub fn get_text(&self, key: &str) -> Option<String> {
        self.0.get(key).map(AttributeValue::to_text)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<AttributeValue> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Writes every entry of `other` over this map. Entries of `other` win.
    pub fn overlay(&mut self, other: AttributeMap) {
        self.0.extend(other.0);
    }

    /// Returns a copy with every key prefixed by `<prefix>__`.
    pub fn prefixed(&self, prefix: &str) -> AttributeMap {
        AttributeMap(
            self.0
                .iter()
                .map(|(k, v)| (format!("{prefix}__{k}"), v.clone()))
                .collect(),
        )
    }

    pub fn into_inner(self) -> BTreeMap<String, AttributeValue> {
        self.0
    }
}

impl<K, V> FromIterator<(K, V)> for AttributeMap
where
    K: Into<String>,
    V: Into<AttributeValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = AttributeMap::new();
        for (k, v) in iter {
            map.set(k, v);
        }
        map
    }
}

impl IntoIterator for AttributeMap {
    type Item = (String, AttributeValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a AttributeMap {
    type Item = (&'a String, &'a AttributeValue);
    type IntoIter = std::collections::btree_map::Iter<'a, String, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<'de> Deserialize<'de> for AttributeMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Option<AttributeValue>>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect())
    }
}
