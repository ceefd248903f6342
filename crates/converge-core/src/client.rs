//! Collaborator traits for the remote backend.
//!
//! This crate issues no network calls of its own; callers implement
//! these traits over their transport and pass them into the pipeline's
//! entry points explicitly. Transport-level retries, authentication
//! and timeouts live behind these seams.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::BackendResult;
use crate::patch::PatchSet;
use crate::snapshot::Snapshot;

/// CRUD access to one remote resource kind.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Create the resource from its desired snapshot.
    ///
    /// Returns the observed state the backend reports after creation.
    async fn create(&self, desired: &Snapshot) -> BackendResult<Snapshot>;

    /// Read the current remote state.
    ///
    /// Fails with [`BackendError::NotFound`](crate::error::BackendError::NotFound)
    /// when the resource is absent.
    async fn read(&self, resource_ref: &str) -> BackendResult<Snapshot>;

    /// Apply an ordered patch operation set, returning the resulting
    /// observed state.
    async fn apply_patch(&self, resource_ref: &str, patch: &PatchSet) -> BackendResult<Snapshot>;

    /// Delete the resource.
    async fn delete(&self, resource_ref: &str) -> BackendResult<()>;
}

/// Tag access for backends whose tag API has no patch verb, only
/// add/update and remove.
#[async_trait]
pub trait TagClient: Send + Sync {
    /// Add new tags or update existing ones.
    async fn add_or_update_tags(
        &self,
        resource_ref: &str,
        tags: &BTreeMap<String, String>,
    ) -> BackendResult<()>;

    /// Remove tags by key.
    async fn remove_tags(&self, resource_ref: &str, keys: &[String]) -> BackendResult<()>;

    /// List the tags currently on the resource.
    async fn list_tags(&self, resource_ref: &str) -> BackendResult<BTreeMap<String, String>>;
}
