//! Field comparator.
//!
//! Produces a [`Delta`] between a desired and an observed snapshot by
//! applying each field's kind-specific equality rule. Pure and total:
//! absent required fields are differences, never errors.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::schema::{FieldKind, FieldPolicy, Schema};
use crate::snapshot::{Snapshot, Value};

/// One field path at which two snapshots differ, with both sides kept
/// for patch-building and caller logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaEntry {
    /// Dot-separated logical address into the schema.
    pub path: String,
    /// The desired side, if present.
    pub desired: Option<Value>,
    /// The observed side, if present.
    pub observed: Option<Value>,
}

/// Ordered list of field paths where two snapshots differ.
///
/// Empty iff the snapshots are equivalent under the per-kind equality
/// rules. Entry order follows schema declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Delta {
    entries: Vec<DeltaEntry>,
}

impl Delta {
    /// Whether the snapshots were equivalent.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of differing field paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the given field path differs.
    pub fn different_at(&self, path: &str) -> bool {
        self.entries.iter().any(|e| e.path == path)
    }

    /// Iterate entries in schema order.
    pub fn entries(&self) -> impl Iterator<Item = &DeltaEntry> {
        self.entries.iter()
    }

    fn push(&mut self, path: &str, desired: Option<Value>, observed: Option<Value>) {
        self.entries.push(DeltaEntry {
            path: path.to_string(),
            desired,
            observed,
        });
    }
}

/// Compare two snapshots under a schema.
///
/// Equality rules per field kind:
/// - scalar: different iff exactly one side is absent, or the values
///   are unequal
/// - record: presence difference is recorded at the parent; any child
///   difference also lifts to the parent while the child path stays
///   individually recorded
/// - set: value-set equality, ignoring order and duplicates; a changed
///   set reports its path once
/// - map: key-set and per-key value equality, independent of iteration
///   order
/// - sequence: element-wise, order-sensitive; a `require_single`
///   sequence additionally differs whenever the desired cardinality is
///   not exactly one
///
/// An empty composite compares equal to an absent one for fields whose
/// policy says so; callers wanting different behavior pre-normalize
/// the snapshots or opt out per field.
pub fn compare(schema: &Schema, desired: &Snapshot, observed: &Snapshot) -> Delta {
    let mut differs: HashSet<&str> = HashSet::new();
    for (path, policy) in schema.fields() {
        let d = policy.effective(desired.get(path));
        let o = policy.effective(observed.get(path));
        if field_differs(policy, d, o) {
            differs.insert(path);
        }
    }

    // Emit in declaration order, lifting child differences onto their
    // record parents.
    let mut delta = Delta::default();
    for (path, policy) in schema.fields() {
        let lifted = policy.kind == FieldKind::Record
            && schema.children(path).any(|(child, _)| differs.contains(child));
        if differs.contains(path) || lifted {
            delta.push(path, desired.get(path).cloned(), observed.get(path).cloned());
        }
    }
    delta
}

fn field_differs(policy: &FieldPolicy, d: Option<&Value>, o: Option<&Value>) -> bool {
    match policy.kind {
        // Presence only here; content differences surface through the
        // declared children.
        FieldKind::Record => matches!((d, o), (None, Some(_)) | (Some(_), None)),
        FieldKind::Sequence => {
            let bad_cardinality = policy.require_single
                && matches!(d, Some(Value::Sequence(elements)) if elements.len() != 1);
            d != o || bad_cardinality
        }
        // Set and map containers are ordered internally, so plain
        // equality is already order- and duplicate-insensitive.
        FieldKind::Scalar | FieldKind::Set | FieldKind::Map => d != o,
    }
}
