//! # Reconciliation Core
//!
//! Building blocks for converging a declared resource specification with
//! its last-observed remote state.
//!
//! This crate provides the pieces that are identical across resource
//! kinds:
//! - Schema-driven comparison of desired vs. observed snapshots
//! - Translation of differences into ordered patch operations
//! - Add/remove-only synchronization of key/value tag sets
//! - Classification of backend failures into retryable vs. permanent
//!   outcomes, tracked as status conditions
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────┐   ┌──────────┐   ┌──────────┐
//! │ compare  │──►│ Delta │──►│  build   │──►│ PatchSet │
//! └──────────┘   └───────┘   └──────────┘   └────┬─────┘
//!                                                │  (caller applies
//!                                                ▼   via its client)
//!                                         ┌─────────────┐
//!                   ConditionSet ◄────────│   record    │
//!                                         └─────────────┘
//! ```
//!
//! The crate performs no I/O of its own. Backend access happens through
//! the [`ResourceClient`] and [`TagClient`] traits, which the caller
//! implements and passes in explicitly; the one operation that drives a
//! client directly is [`sync_tags`], because the remove-then-upsert
//! ordering of tag synchronization is part of its contract.
//!
//! ## Example
//!
//! ```ignore
//! use converge_core::{FieldPolicy, Reconciler, Schema};
//!
//! let schema = Schema::builder()
//!     .field("name", FieldPolicy::scalar("/name"))
//!     .field("variables", FieldPolicy::map("/variables"))
//!     .build();
//! let reconciler = Reconciler::new(schema);
//!
//! let patch = reconciler.plan(&desired, &observed)?;
//! let result = client.apply_patch(&resource_ref, &patch).await;
//! let (outcome, changed) = reconciler.record(&mut conditions, result.as_ref().err());
//! if changed {
//!     status_sink.persist(&conditions).await?;
//! }
//! ```

pub mod client;
pub mod conditions;
pub mod delta;
pub mod error;
pub mod patch;
pub mod reconciler;
pub mod schema;
pub mod snapshot;
pub mod tags;

// Re-exports for convenience
pub use client::{ResourceClient, TagClient};
pub use conditions::{Classifier, Condition, ConditionKind, ConditionSet, Health, Outcome};
pub use delta::{compare, Delta, DeltaEntry};
pub use error::{BackendError, BackendResult, PlanError, PlanResult};
pub use patch::{build, escape_pointer_segment, PatchOp, PatchSet, PatchVerb};
pub use reconciler::Reconciler;
pub use schema::{FieldKind, FieldPolicy, Schema, SchemaBuilder};
pub use snapshot::{Scalar, Snapshot, Value};
pub use tags::{diff_tags, sync_tags, TagDiff, TagPlan};
