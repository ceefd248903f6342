//! Tag synchronization.
//!
//! Tag sets converge through a specialized comparator/builder pair
//! because the backend tag API has no patch verb, only add/update and
//! remove batches. Removal applies before upsert; some backends reject
//! an add for a key still present under conflicting metadata until the
//! removal completes, so the ordering is a contract, not an accident.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::client::TagClient;
use crate::error::BackendResult;

/// Partition of two tag maps into added, updated and removed keys.
///
/// The three key sets are pairwise disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDiff {
    /// Keys only in the desired map.
    pub added: BTreeMap<String, String>,
    /// Keys in both maps with different values; desired values kept.
    pub updated: BTreeMap<String, String>,
    /// Keys only in the observed map; observed values kept.
    pub removed: BTreeMap<String, String>,
}

impl TagDiff {
    /// Whether the two tag maps were already in sync.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    /// Turn the diff into an executable plan: keys to remove and the
    /// union of added and updated entries to upsert.
    #[must_use]
    pub fn plan(&self) -> TagPlan {
        let mut upsert = self.added.clone();
        upsert.extend(self.updated.clone());
        TagPlan {
            remove_keys: self.removed.keys().cloned().collect(),
            upsert,
        }
    }
}

/// The two batches a tag sync executes, in order: remove, then upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPlan {
    /// Keys to remove before anything is added.
    pub remove_keys: Vec<String>,
    /// Entries to add or update after removal completes.
    pub upsert: BTreeMap<String, String>,
}

impl TagPlan {
    /// Whether there is nothing to do.
    pub fn is_empty(&self) -> bool {
        self.remove_keys.is_empty() && self.upsert.is_empty()
    }
}

/// Diff two tag maps.
pub fn diff_tags(
    desired: &BTreeMap<String, String>,
    observed: &BTreeMap<String, String>,
) -> TagDiff {
    let mut diff = TagDiff::default();
    for (key, value) in desired {
        match observed.get(key) {
            None => {
                diff.added.insert(key.clone(), value.clone());
            }
            Some(existing) if existing != value => {
                diff.updated.insert(key.clone(), value.clone());
            }
            Some(_) => {}
        }
    }
    for (key, value) in observed {
        if !desired.contains_key(key) {
            diff.removed.insert(key.clone(), value.clone());
        }
    }
    diff
}

/// Converge the resource's tags: remove stale keys first, then upsert
/// added and updated entries.
///
/// Fail-fast: an error in the remove phase prevents the upsert phase
/// from running. No-op phases skip the backend call entirely, so a
/// fully synced tag set performs no I/O. Safe to re-run after a
/// mid-sequence abandonment; the next attempt diffs fresh state.
#[instrument(skip(client, desired, observed))]
pub async fn sync_tags<C>(
    client: &C,
    resource_ref: &str,
    desired: &BTreeMap<String, String>,
    observed: &BTreeMap<String, String>,
) -> BackendResult<()>
where
    C: TagClient + ?Sized,
{
    let plan = diff_tags(desired, observed).plan();
    if plan.is_empty() {
        return Ok(());
    }
    debug!(
        removals = plan.remove_keys.len(),
        upserts = plan.upsert.len(),
        "syncing tags"
    );
    if !plan.remove_keys.is_empty() {
        client.remove_tags(resource_ref, &plan.remove_keys).await?;
    }
    if !plan.upsert.is_empty() {
        client.add_or_update_tags(resource_ref, &plan.upsert).await?;
    }
    Ok(())
}
