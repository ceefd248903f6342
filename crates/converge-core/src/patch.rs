//! Patch operations and the patch builder.
//!
//! Translates a [`Delta`] into an ordered [`PatchSet`] in the backend's
//! generic patch-document form. Within a field, removals precede
//! additions so backends that apply operations one at a time never see
//! a transient duplicate value.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::delta::Delta;
use crate::error::{PlanError, PlanResult};
use crate::schema::{FieldKind, FieldPolicy, Schema};
use crate::snapshot::{Snapshot, Value};

/// A patch operation verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchVerb {
    Add,
    Remove,
    Replace,
}

/// A single mutating instruction against the remote document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchOp {
    /// The verb to apply.
    #[serde(rename = "op")]
    pub verb: PatchVerb,
    /// Slash-delimited pointer into the remote document.
    #[serde(rename = "path")]
    pub pointer: String,
    /// Present for `add`/`replace`; usually absent for `remove`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Escape a dynamic pointer segment (`~` → `~0`, `/` → `~1`) so it
/// cannot be confused with pointer syntax. Applied to map keys and set
/// members, never to static schema pointers.
pub fn escape_pointer_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// An ordered set of patch operations for one update call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchSet {
    ops: Vec<PatchOp>,
}

impl PatchSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a `replace` at the given pointer.
    pub fn replace(&mut self, pointer: &str, value: Option<String>) {
        self.ops.push(PatchOp {
            verb: PatchVerb::Replace,
            pointer: pointer.to_string(),
            value,
        });
    }

    /// Queue an `add` at the given pointer.
    pub fn add(&mut self, pointer: &str, value: Option<String>) {
        self.ops.push(PatchOp {
            verb: PatchVerb::Add,
            pointer: pointer.to_string(),
            value,
        });
    }

    /// Queue a `remove` of the given pointer.
    pub fn remove(&mut self, pointer: &str) {
        self.ops.push(PatchOp {
            verb: PatchVerb::Remove,
            pointer: pointer.to_string(),
            value: None,
        });
    }

    /// Queue a `remove` that carries a value, for backends that remove
    /// list members by value rather than by pointer segment.
    pub fn remove_with_value(&mut self, pointer: &str, value: String) {
        self.ops.push(PatchOp {
            verb: PatchVerb::Remove,
            pointer: pointer.to_string(),
            value: Some(value),
        });
    }

    /// Queue operations converging an unordered set field: removals of
    /// stale members first, then additions, each addressed by its
    /// escaped member value.
    pub fn for_set(&mut self, pointer: &str, observed: &BTreeSet<String>, desired: &BTreeSet<String>) {
        for member in observed.difference(desired) {
            self.remove(&format!("{pointer}/{}", escape_pointer_segment(member)));
        }
        for member in desired.difference(observed) {
            self.add(&format!("{pointer}/{}", escape_pointer_segment(member)), None);
        }
    }

    /// Queue operations converging a map field: removals of dropped
    /// keys first, then an upsert per changed or new key. Unchanged
    /// keys emit nothing. New keys use `add` only when the backend
    /// supports it; otherwise `replace` acts as the upsert.
    pub fn for_map(
        &mut self,
        pointer: &str,
        observed: &BTreeMap<String, String>,
        desired: &BTreeMap<String, String>,
        add_supported: bool,
    ) {
        for key in observed.keys() {
            if !desired.contains_key(key) {
                self.remove(&format!("{pointer}/{}", escape_pointer_segment(key)));
            }
        }
        for (key, value) in desired {
            let target = format!("{pointer}/{}", escape_pointer_segment(key));
            match observed.get(key) {
                Some(existing) if existing == value => {}
                Some(_) => self.replace(&target, Some(value.clone())),
                None if add_supported => self.add(&target, Some(value.clone())),
                None => self.replace(&target, Some(value.clone())),
            }
        }
    }

    /// The queued operations, in application order.
    pub fn ops(&self) -> &[PatchOp] {
        &self.ops
    }

    /// Consume the set, yielding the operations.
    pub fn into_ops(self) -> Vec<PatchOp> {
        self.ops
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether no operations were queued.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Build the patch operation set for a delta.
///
/// Never mutates its inputs; an empty delta yields an empty set. A
/// delta path without a declared policy is a programming error and
/// fails with [`PlanError::UnknownField`].
pub fn build(
    schema: &Schema,
    delta: &Delta,
    desired: &Snapshot,
    observed: &Snapshot,
) -> PlanResult<PatchSet> {
    let mut set = PatchSet::new();
    if delta.is_empty() {
        return Ok(set);
    }

    // Records whose desired side is gone entirely collapse to a single
    // remove at the parent pointer; their child entries are skipped.
    let mut removed_records: Vec<&str> = Vec::new();
    for entry in delta.entries() {
        if let Some(policy) = schema.policy(&entry.path) {
            if policy.kind == FieldKind::Record
                && policy.effective(desired.get(&entry.path)).is_none()
            {
                removed_records.push(entry.path.as_str());
            }
        }
    }

    for entry in delta.entries() {
        let path = entry.path.as_str();
        if under_removed_record(&removed_records, path) {
            continue;
        }
        let policy = schema
            .policy(path)
            .ok_or_else(|| PlanError::UnknownField {
                path: path.to_string(),
            })?;
        match policy.kind {
            FieldKind::Record => {
                if policy.effective(desired.get(path)).is_none() {
                    set.remove(&policy.pointer);
                }
                // A present record carries no operation of its own;
                // its children target their sub-pointers directly.
            }
            FieldKind::Scalar => match scalar_value(desired, path)? {
                None if policy.clear_via_remove => set.remove(&policy.pointer),
                value => set.replace(&policy.pointer, value),
            },
            FieldKind::Set => {
                let d = set_view(desired, path)?;
                let o = set_view(observed, path)?;
                set.for_set(&policy.pointer, &o, &d);
            }
            FieldKind::Map => {
                let d = map_view(desired, path)?;
                let o = map_view(observed, path)?;
                set.for_map(&policy.pointer, &o, &d, policy.add_supported);
            }
            FieldKind::Sequence => build_sequence(&mut set, policy, path, desired, observed)?,
        }
    }
    Ok(set)
}

fn under_removed_record(removed: &[&str], path: &str) -> bool {
    removed.iter().any(|parent| {
        path.len() > parent.len()
            && path.starts_with(parent)
            && path.as_bytes()[parent.len()] == b'.'
    })
}

fn build_sequence(
    set: &mut PatchSet,
    policy: &FieldPolicy,
    path: &str,
    desired: &Snapshot,
    observed: &Snapshot,
) -> PlanResult<()> {
    let d = sequence_view(desired, path)?;
    if policy.require_single {
        if d.len() != 1 {
            return Err(PlanError::InvalidCardinality {
                path: path.to_string(),
                actual: d.len(),
            });
        }
        set.replace(&format!("{}/0", policy.pointer), Some(d[0].clone()));
        return Ok(());
    }

    // Positional convergence: shrink from the tail first so earlier
    // indices stay stable, then upsert changed or new positions.
    let o = sequence_view(observed, path)?;
    for index in (d.len()..o.len()).rev() {
        set.remove(&format!("{}/{index}", policy.pointer));
    }
    for (index, value) in d.iter().enumerate() {
        let target = format!("{}/{index}", policy.pointer);
        match o.get(index) {
            Some(existing) if existing == value => {}
            Some(_) => set.replace(&target, Some(value.clone())),
            None => set.add(&target, Some(value.clone())),
        }
    }
    Ok(())
}

fn scalar_value(snapshot: &Snapshot, path: &str) -> PlanResult<Option<String>> {
    match snapshot.get(path) {
        None => Ok(None),
        Some(Value::Scalar(scalar)) => Ok(Some(scalar.to_patch_value())),
        Some(other) => Err(kind_mismatch(path, FieldKind::Scalar, other)),
    }
}

fn set_view(snapshot: &Snapshot, path: &str) -> PlanResult<BTreeSet<String>> {
    match snapshot.get(path) {
        None => Ok(BTreeSet::new()),
        Some(Value::Set(members)) => Ok(members.clone()),
        Some(other) => Err(kind_mismatch(path, FieldKind::Set, other)),
    }
}

fn map_view(snapshot: &Snapshot, path: &str) -> PlanResult<BTreeMap<String, String>> {
    match snapshot.get(path) {
        None => Ok(BTreeMap::new()),
        Some(Value::Map(entries)) => Ok(entries.clone()),
        Some(other) => Err(kind_mismatch(path, FieldKind::Map, other)),
    }
}

fn sequence_view(snapshot: &Snapshot, path: &str) -> PlanResult<Vec<String>> {
    match snapshot.get(path) {
        None => Ok(Vec::new()),
        Some(Value::Sequence(elements)) => Ok(elements.clone()),
        Some(other) => Err(kind_mismatch(path, FieldKind::Sequence, other)),
    }
}

fn kind_mismatch(path: &str, expected: FieldKind, found: &Value) -> PlanError {
    PlanError::KindMismatch {
        path: path.to_string(),
        expected,
        found: found.kind_name(),
    }
}
