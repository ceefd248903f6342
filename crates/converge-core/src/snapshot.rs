//! Snapshot value model.
//!
//! A [`Snapshot`] is an immutable-by-convention record of one resource
//! instance, either the desired specification or the last-observed
//! remote state. Fields are addressed by dot-separated paths; absence
//! is expressed by a path simply not resolving, never by a sentinel
//! value, so absence and zero-value stay distinct through comparison
//! and patch-building.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A scalar field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    String(String),
    Integer(i64),
    Number(f64),
    Bool(bool),
}

impl Scalar {
    /// Render the wire form used in patch operation values.
    ///
    /// The backend's patch document is stringly typed: booleans and
    /// numbers travel as their canonical string rendering.
    pub fn to_patch_value(&self) -> String {
        match self {
            Scalar::String(s) => s.clone(),
            Scalar::Integer(i) => i.to_string(),
            Scalar::Number(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// A field value in a snapshot.
///
/// Collections use ordered containers so that every derived artifact
/// (deltas, patch plans, tag plans) is reproducible for the same pair
/// of snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// A scalar (string, number, boolean).
    Scalar(Scalar),
    /// A nested record of named fields.
    Record(BTreeMap<String, Value>),
    /// An unordered, membership-significant set of values.
    Set(BTreeSet<String>),
    /// An order-significant sequence of values.
    Sequence(Vec<String>),
    /// A key/value map with unique keys.
    Map(BTreeMap<String, String>),
}

impl Value {
    /// Create a scalar value.
    pub fn scalar(value: impl Into<Scalar>) -> Self {
        Value::Scalar(value.into())
    }

    /// Create a set from string-like members.
    pub fn set<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::Set(members.into_iter().map(Into::into).collect())
    }

    /// Create a sequence from string-like elements.
    pub fn sequence<I, S>(elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::Sequence(elements.into_iter().map(Into::into).collect())
    }

    /// Create a map from key/value pairs.
    pub fn map<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Value::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Create an empty record.
    pub fn empty_record() -> Self {
        Value::Record(BTreeMap::new())
    }

    /// Short name of this value's shape, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "scalar",
            Value::Record(_) => "record",
            Value::Set(_) => "set",
            Value::Sequence(_) => "sequence",
            Value::Map(_) => "map",
        }
    }

    /// Whether this is a composite value with no members.
    pub fn is_empty_composite(&self) -> bool {
        match self {
            Value::Scalar(_) => false,
            Value::Record(fields) => fields.is_empty(),
            Value::Set(members) => members.is_empty(),
            Value::Sequence(elements) => elements.is_empty(),
            Value::Map(entries) => entries.is_empty(),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Scalar(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Scalar(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Scalar(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Scalar(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Scalar(value.into())
    }
}

impl From<Scalar> for Value {
    fn from(value: Scalar) -> Self {
        Value::Scalar(value)
    }
}

/// One resource instance: the desired specification or the observed
/// remote state, constructed fresh on every reconciliation attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    root: BTreeMap<String, Value>,
}

impl Snapshot {
    /// Create an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; creates intermediate records as needed.
    #[must_use]
    pub fn with(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.insert(path, value.into());
        self
    }

    /// Insert a value at a dot-separated path, creating intermediate
    /// records as needed. A non-record value along the way is replaced.
    pub fn insert(&mut self, path: &str, value: impl Into<Value>) {
        let mut value = Some(value.into());
        let mut current = &mut self.root;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                if let Some(v) = value.take() {
                    current.insert(segment.to_string(), v);
                }
                break;
            }
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(Value::empty_record);
            if !matches!(entry, Value::Record(_)) {
                *entry = Value::empty_record();
            }
            match entry {
                Value::Record(fields) => current = fields,
                _ => break,
            }
        }
    }

    /// Look up a value by dot-separated path.
    ///
    /// Returns `None` if any segment along the way is absent or a
    /// non-record value is traversed into.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            match current {
                Value::Record(fields) => current = fields.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Mutable lookup by dot-separated path.
    ///
    /// Useful for pre-compare normalization, e.g. forcing a composite
    /// field present on both sides before diffing.
    pub fn get_mut(&mut self, path: &str) -> Option<&mut Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.root.get_mut(first)?;
        for segment in segments {
            match current {
                Value::Record(fields) => current = fields.get_mut(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Remove and return the value at a dot-separated path.
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        match path.rsplit_once('.') {
            None => self.root.remove(path),
            Some((parent, leaf)) => match self.get_mut(parent) {
                Some(Value::Record(fields)) => fields.remove(leaf),
                _ => None,
            },
        }
    }

    /// Check whether a path resolves to a value.
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Whether the snapshot has no fields at all.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_insert_and_get() {
        let snapshot = Snapshot::new()
            .with("name", "orders-api")
            .with("canary_settings.percent_traffic", 12.5)
            .with("canary_settings.use_stage_cache", true);

        assert_eq!(
            snapshot.get("name"),
            Some(&Value::scalar("orders-api"))
        );
        assert_eq!(
            snapshot.get("canary_settings.percent_traffic"),
            Some(&Value::scalar(12.5))
        );
        assert!(matches!(
            snapshot.get("canary_settings"),
            Some(Value::Record(_))
        ));
        assert_eq!(snapshot.get("canary_settings.deployment_id"), None);
        assert_eq!(snapshot.get("missing.leaf"), None);
    }

    #[test]
    fn test_traversal_through_scalar_is_absent() {
        let snapshot = Snapshot::new().with("name", "x");
        assert_eq!(snapshot.get("name.child"), None);
    }

    #[test]
    fn test_remove() {
        let mut snapshot = Snapshot::new()
            .with("a.b", "v")
            .with("a.c", "w");

        assert_eq!(snapshot.remove("a.b"), Some(Value::scalar("v")));
        assert_eq!(snapshot.get("a.b"), None);
        assert_eq!(snapshot.get("a.c"), Some(&Value::scalar("w")));
        assert_eq!(snapshot.remove("a.b"), None);
    }

    #[test]
    fn test_patch_value_rendering() {
        assert_eq!(Scalar::from(true).to_patch_value(), "true");
        assert_eq!(Scalar::from(42i64).to_patch_value(), "42");
        assert_eq!(Scalar::from("plain").to_patch_value(), "plain");
    }

    #[test]
    fn test_empty_composite() {
        assert!(Value::map(Vec::<(String, String)>::new()).is_empty_composite());
        assert!(Value::empty_record().is_empty_composite());
        assert!(!Value::set(["a"]).is_empty_composite());
        assert!(!Value::scalar("").is_empty_composite());
    }

    #[test]
    fn test_set_ignores_duplicates_and_order() {
        assert_eq!(Value::set(["b", "a", "b"]), Value::set(["a", "b"]));
    }
}
