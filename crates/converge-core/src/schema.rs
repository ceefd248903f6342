//! Field kinds and the per-field policy table.
//!
//! Each resource kind is described by a [`Schema`]: an ordered table of
//! field paths, each carrying the static metadata the comparator and
//! patch builder need. Field walking is data-driven; no reflection, no
//! per-kind diff code.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::snapshot::Value;

/// The declared shape of a field. Static schema metadata, never
/// inferred from values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// A scalar, possibly absent.
    Scalar,
    /// A nested record; children are declared as their own fields.
    Record,
    /// An unordered set; membership-significant, order-insignificant.
    Set,
    /// An order-significant sequence.
    Sequence,
    /// A key/value map with unique keys.
    Map,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Scalar => "scalar",
            FieldKind::Record => "record",
            FieldKind::Set => "set",
            FieldKind::Sequence => "sequence",
            FieldKind::Map => "map",
        };
        f.write_str(name)
    }
}

/// Per-field policy consumed by the comparator and the patch builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPolicy {
    /// The field's declared kind.
    pub kind: FieldKind,
    /// Slash-delimited pointer into the remote document. Static
    /// segments are written literally; only dynamic segments (map
    /// keys, set members) appended at plan time get escaped.
    pub pointer: String,
    /// Whether the backend accepts `add` for new map keys. When false,
    /// `replace` is emitted and the backend treats it as an upsert.
    pub add_supported: bool,
    /// Whether an absent desired scalar clears the remote value with
    /// `remove` rather than `replace` carrying no value.
    pub clear_via_remove: bool,
    /// Whether an empty composite compares equal to an absent one.
    /// Defaults on for records, sets and maps.
    pub empty_equals_absent: bool,
    /// For sequences whose backend requires exactly one element.
    pub require_single: bool,
}

impl FieldPolicy {
    fn new(kind: FieldKind, pointer: impl Into<String>) -> Self {
        let empty_equals_absent = matches!(
            kind,
            FieldKind::Record | FieldKind::Set | FieldKind::Map
        );
        Self {
            kind,
            pointer: pointer.into(),
            add_supported: false,
            clear_via_remove: false,
            empty_equals_absent,
            require_single: false,
        }
    }

    /// Declare a scalar field.
    pub fn scalar(pointer: impl Into<String>) -> Self {
        Self::new(FieldKind::Scalar, pointer)
    }

    /// Declare a nested record field.
    pub fn record(pointer: impl Into<String>) -> Self {
        Self::new(FieldKind::Record, pointer)
    }

    /// Declare an unordered set field.
    pub fn set(pointer: impl Into<String>) -> Self {
        Self::new(FieldKind::Set, pointer)
    }

    /// Declare an order-significant sequence field.
    pub fn sequence(pointer: impl Into<String>) -> Self {
        Self::new(FieldKind::Sequence, pointer)
    }

    /// Declare a key/value map field.
    pub fn map(pointer: impl Into<String>) -> Self {
        Self::new(FieldKind::Map, pointer)
    }

    /// Mark that the backend accepts `add` for new map keys.
    #[must_use]
    pub fn add_supported(mut self) -> Self {
        self.add_supported = true;
        self
    }

    /// Clear an absent desired scalar with `remove` instead of an
    /// empty `replace`.
    #[must_use]
    pub fn clear_via_remove(mut self) -> Self {
        self.clear_via_remove = true;
        self
    }

    /// Treat an empty composite as different from an absent one.
    #[must_use]
    pub fn compare_empty_as_present(mut self) -> Self {
        self.empty_equals_absent = false;
        self
    }

    /// Require exactly one element in this sequence.
    #[must_use]
    pub fn require_single(mut self) -> Self {
        self.require_single = true;
        self
    }

    /// The value as the comparator sees it: an empty composite counts
    /// as absent when this field's policy says so.
    pub(crate) fn effective<'a>(&self, value: Option<&'a Value>) -> Option<&'a Value> {
        match value {
            Some(v) if self.empty_equals_absent && v.is_empty_composite() => None,
            other => other,
        }
    }
}

/// An ordered field-policy table for one resource kind.
///
/// Declaration order defines delta order and therefore patch order.
/// Record fields must be declared before their children so that a
/// whole-record removal is planned before the child entries it
/// suppresses.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<(String, FieldPolicy)>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// Start building a schema.
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder { fields: Vec::new() }
    }

    /// Look up the policy for a field path.
    pub fn policy(&self, path: &str) -> Option<&FieldPolicy> {
        self.index.get(path).map(|&i| &self.fields[i].1)
    }

    /// Whether a field path is declared.
    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Iterate fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldPolicy)> {
        self.fields.iter().map(|(p, policy)| (p.as_str(), policy))
    }

    /// Iterate the declared descendants of a record field.
    pub fn children<'a>(
        &'a self,
        parent: &str,
    ) -> impl Iterator<Item = (&'a str, &'a FieldPolicy)> + 'a {
        let prefix = format!("{parent}.");
        self.fields
            .iter()
            .filter(move |(p, _)| p.starts_with(&prefix))
            .map(|(p, policy)| (p.as_str(), policy))
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builder for [`Schema`].
#[derive(Debug)]
pub struct SchemaBuilder {
    fields: Vec<(String, FieldPolicy)>,
}

impl SchemaBuilder {
    /// Declare a field. Re-declaring a path replaces its policy while
    /// keeping the original position.
    #[must_use]
    pub fn field(mut self, path: impl Into<String>, policy: FieldPolicy) -> Self {
        let path = path.into();
        if let Some(existing) = self.fields.iter_mut().find(|(p, _)| *p == path) {
            existing.1 = policy;
        } else {
            self.fields.push((path, policy));
        }
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> Schema {
        let index = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, (path, _))| (path.clone(), i))
            .collect();
        Schema {
            fields: self.fields,
            index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_order_preserved() {
        let schema = Schema::builder()
            .field("b", FieldPolicy::scalar("/b"))
            .field("a", FieldPolicy::scalar("/a"))
            .field("a.child", FieldPolicy::scalar("/a/child"))
            .build();

        let order: Vec<&str> = schema.fields().map(|(p, _)| p).collect();
        assert_eq!(order, vec!["b", "a", "a.child"]);
        assert_eq!(schema.len(), 3);
    }

    #[test]
    fn test_redeclaration_replaces_in_place() {
        let schema = Schema::builder()
            .field("tags", FieldPolicy::map("/tags"))
            .field("name", FieldPolicy::scalar("/name"))
            .field("tags", FieldPolicy::map("/tags").add_supported())
            .build();

        let order: Vec<&str> = schema.fields().map(|(p, _)| p).collect();
        assert_eq!(order, vec!["tags", "name"]);
        assert!(schema.policy("tags").unwrap().add_supported);
    }

    #[test]
    fn test_children() {
        let schema = Schema::builder()
            .field("canary", FieldPolicy::record("/canary"))
            .field("canary.deployment_id", FieldPolicy::scalar("/canary/deploymentId"))
            .field("canary.overrides", FieldPolicy::map("/canary/overrides"))
            .field("canary_other", FieldPolicy::scalar("/canaryOther"))
            .build();

        let children: Vec<&str> = schema.children("canary").map(|(p, _)| p).collect();
        assert_eq!(children, vec!["canary.deployment_id", "canary.overrides"]);
    }

    #[test]
    fn test_empty_equals_absent_defaults() {
        assert!(FieldPolicy::map("/m").empty_equals_absent);
        assert!(FieldPolicy::set("/s").empty_equals_absent);
        assert!(FieldPolicy::record("/r").empty_equals_absent);
        assert!(!FieldPolicy::scalar("/v").empty_equals_absent);
        assert!(!FieldPolicy::sequence("/q").empty_equals_absent);
        assert!(!FieldPolicy::map("/m").compare_empty_as_present().empty_equals_absent);
    }
}
