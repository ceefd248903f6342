//! Pipeline facade.
//!
//! Ties one resource kind's schema and classifier together so callers
//! drive compare → build → record without re-plumbing the pieces. Pure
//! composition: no I/O, no locking, no shared mutable state, so
//! reconciliations of different resources may run fully in parallel.

use tracing::debug;

use crate::conditions::{Classifier, ConditionSet, Outcome};
use crate::delta::{self, Delta};
use crate::error::{BackendError, PlanResult};
use crate::patch::{self, PatchSet};
use crate::schema::Schema;
use crate::snapshot::Snapshot;

/// Reconciliation pipeline for one resource kind.
#[derive(Debug, Clone)]
pub struct Reconciler {
    schema: Schema,
    classifier: Classifier,
}

impl Reconciler {
    /// Create a reconciler with the default classifier.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            classifier: Classifier::default(),
        }
    }

    /// Replace the classifier, e.g. with a backend-specific permanent
    /// code set.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// The schema this reconciler plans against.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Compare the desired spec against the observed remote state.
    pub fn compare(&self, desired: &Snapshot, observed: &Snapshot) -> Delta {
        delta::compare(&self.schema, desired, observed)
    }

    /// Compare and translate the result into a patch operation set.
    ///
    /// Given identical snapshots the plan is always empty; applying the
    /// plan and re-planning from the result converges to empty.
    pub fn plan(&self, desired: &Snapshot, observed: &Snapshot) -> PlanResult<PatchSet> {
        let delta = self.compare(desired, observed);
        let patch = patch::build(&self.schema, &delta, desired, observed)?;
        debug!(paths = delta.len(), ops = patch.len(), "planned update");
        Ok(patch)
    }

    /// Classify an attempt's result and fold it into the condition
    /// list. `None` is a success.
    ///
    /// Returns the classification together with whether the condition
    /// list actually changed; the borrowed error stays with the caller
    /// for logging.
    pub fn record(
        &self,
        conditions: &mut ConditionSet,
        error: Option<&BackendError>,
    ) -> (Outcome, bool) {
        let outcome = match error {
            None => Outcome::Success,
            Some(err) => self.classifier.classify(err),
        };
        let message = error.map(ToString::to_string);
        let changed = conditions.record(outcome, message.as_deref());
        debug!(?outcome, changed, "recorded attempt result");
        (outcome, changed)
    }
}
