//! Status conditions and the retry classifier.
//!
//! After each mutating backend call the caller feeds the outcome here.
//! Failures classify as permanent (terminal, no further retry) or
//! recoverable (retry on the caller's schedule) against an enumerated
//! per-backend set of error codes; unrecognized errors fail open
//! toward retrying, never toward silently giving up.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BackendError;

/// The fixed set of condition kinds tracked per resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionKind {
    /// A permanent failure; suppresses further retry until a later
    /// attempt succeeds.
    Terminal,
    /// A transient failure; the caller should retry.
    Recoverable,
    /// The resource converged on the last attempt.
    Synced,
}

/// One status condition. At most one instance exists per kind in a
/// resource's condition list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Which condition this is.
    pub kind: ConditionKind,
    /// Whether the condition currently holds.
    pub active: bool,
    /// The triggering error's message, when active for a failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// When active or message last changed.
    pub last_transition: DateTime<Utc>,
}

/// Classification of one reconciliation attempt's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The mutating call succeeded.
    Success,
    /// The call failed transiently; retry.
    RetryableFailure,
    /// The call failed permanently; do not retry.
    PermanentFailure,
}

/// Aggregate health derived from the condition list. Terminal takes
/// priority over Recoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Health {
    Healthy,
    Recoverable,
    Terminal,
}

/// Classifies backend errors against an enumerated set of permanent
/// error codes.
#[derive(Debug, Clone)]
pub struct Classifier {
    permanent_codes: BTreeSet<String>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            permanent_codes: [
                "BadRequestException",
                "ConflictException",
                "NotFoundException",
                "InvalidParameterException",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        }
    }
}

impl Classifier {
    /// Create a classifier with the default permanent code set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a classifier from an explicit permanent code set.
    pub fn with_permanent_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            permanent_codes: codes.into_iter().map(Into::into).collect(),
        }
    }

    /// Add a permanent code to the set.
    #[must_use]
    pub fn permanent_code(mut self, code: impl Into<String>) -> Self {
        self.permanent_codes.insert(code.into());
        self
    }

    /// Classify a backend error.
    ///
    /// Only enumerated API error codes are permanent; everything else,
    /// transport failures included, is retryable. The error itself is
    /// left with the caller for logging; classification never consumes
    /// or discards it.
    pub fn classify(&self, error: &BackendError) -> Outcome {
        match error {
            BackendError::Api { code, .. } if self.permanent_codes.contains(code) => {
                Outcome::PermanentFailure
            }
            BackendError::Api { code, .. } => {
                debug!(%code, "error code not in the permanent set, treating as retryable");
                Outcome::RetryableFailure
            }
            _ => Outcome::RetryableFailure,
        }
    }
}

/// A resource's condition list.
///
/// Conditions persist across reconciliation attempts as part of the
/// resource's status; they are mutated in place when present, appended
/// when first needed, never duplicated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionSet {
    conditions: Vec<Condition>,
}

impl ConditionSet {
    /// Create an empty condition list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a condition by kind.
    pub fn get(&self, kind: ConditionKind) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.kind == kind)
    }

    /// The conditions, for persistence by the caller's status sink.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Number of conditions present.
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Whether no conditions have been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Aggregate health. Terminal, once active, wins over Recoverable.
    pub fn health(&self) -> Health {
        if self.is_active(ConditionKind::Terminal) {
            Health::Terminal
        } else if self.is_active(ConditionKind::Recoverable) {
            Health::Recoverable
        } else {
            Health::Healthy
        }
    }

    /// Whether a condition exists and currently holds.
    pub fn is_active(&self, kind: ConditionKind) -> bool {
        self.get(kind).is_some_and(|c| c.active)
    }

    /// Apply an attempt's outcome to the condition list.
    ///
    /// Transition rules:
    /// - `Success`: deactivate Terminal and Recoverable if present,
    ///   clearing their messages; mark Synced active.
    /// - `RetryableFailure`: deactivate Terminal if present; activate
    ///   Recoverable (creating it if absent) with the error message.
    /// - `PermanentFailure`: activate Terminal (creating it if absent)
    ///   with the error message; Recoverable is left untouched.
    ///
    /// Returns whether any condition's active flag or message actually
    /// changed, so the caller persists status only when necessary.
    pub fn record(&mut self, outcome: Outcome, message: Option<&str>) -> bool {
        match outcome {
            Outcome::Success => {
                let mut changed = self.set_state(ConditionKind::Terminal, false, None, false);
                changed |= self.set_state(ConditionKind::Recoverable, false, None, false);
                changed | self.set_state(ConditionKind::Synced, true, None, true)
            }
            Outcome::RetryableFailure => {
                let mut changed = self.set_state(ConditionKind::Terminal, false, None, false);
                changed |= self.set_state(ConditionKind::Recoverable, true, message, true);
                changed | self.set_state(ConditionKind::Synced, false, message, false)
            }
            Outcome::PermanentFailure => {
                let changed = self.set_state(ConditionKind::Terminal, true, message, true);
                changed | self.set_state(ConditionKind::Synced, false, message, false)
            }
        }
    }

    /// Set a condition's state, creating it when `create` is set.
    /// Returns whether anything changed; the transition timestamp only
    /// moves on an actual change.
    fn set_state(
        &mut self,
        kind: ConditionKind,
        active: bool,
        message: Option<&str>,
        create: bool,
    ) -> bool {
        let message = message.map(str::to_string);
        if let Some(condition) = self.conditions.iter_mut().find(|c| c.kind == kind) {
            if condition.active == active && condition.message == message {
                return false;
            }
            condition.active = active;
            condition.message = message;
            condition.last_transition = Utc::now();
            true
        } else if create {
            self.conditions.push(Condition {
                kind,
                active,
                message,
                last_transition: Utc::now(),
            });
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_permanent_codes() {
        let classifier = Classifier::new();
        let err = BackendError::api("BadRequestException", "malformed patch document");
        assert_eq!(classifier.classify(&err), Outcome::PermanentFailure);

        let err = BackendError::api("ConflictException", "state conflict");
        assert_eq!(classifier.classify(&err), Outcome::PermanentFailure);
    }

    #[test]
    fn test_classify_fails_open_toward_retry() {
        let classifier = Classifier::new();
        let err = BackendError::api("SomeNewException", "never seen before");
        assert_eq!(classifier.classify(&err), Outcome::RetryableFailure);

        let err = BackendError::transport("connection reset");
        assert_eq!(classifier.classify(&err), Outcome::RetryableFailure);

        let err = BackendError::not_found("restapis/abc");
        assert_eq!(classifier.classify(&err), Outcome::RetryableFailure);
    }

    #[test]
    fn test_custom_permanent_codes() {
        let classifier =
            Classifier::with_permanent_codes(["AccessDeniedException"]).permanent_code("Frozen");
        let err = BackendError::api("AccessDeniedException", "no");
        assert_eq!(classifier.classify(&err), Outcome::PermanentFailure);
        let err = BackendError::api("BadRequestException", "bad");
        assert_eq!(classifier.classify(&err), Outcome::RetryableFailure);
    }

    #[test]
    fn test_permanent_then_success_then_redundant_success() {
        let mut set = ConditionSet::new();

        let changed = set.record(Outcome::PermanentFailure, Some("invalid parameter"));
        assert!(changed);
        let terminal = set.get(ConditionKind::Terminal).unwrap();
        assert!(terminal.active);
        assert_eq!(terminal.message.as_deref(), Some("invalid parameter"));
        assert!(set.get(ConditionKind::Recoverable).is_none());
        assert_eq!(
            set.conditions()
                .iter()
                .filter(|c| c.active)
                .count(),
            1
        );

        let changed = set.record(Outcome::Success, None);
        assert!(changed);
        let terminal = set.get(ConditionKind::Terminal).unwrap();
        assert!(!terminal.active);
        assert_eq!(terminal.message, None);
        assert!(set.is_active(ConditionKind::Synced));

        let changed = set.record(Outcome::Success, None);
        assert!(!changed, "a redundant success must not dirty the status");
    }

    #[test]
    fn test_retryable_deactivates_terminal() {
        let mut set = ConditionSet::new();
        set.record(Outcome::PermanentFailure, Some("bad request"));
        assert_eq!(set.health(), Health::Terminal);

        set.record(Outcome::RetryableFailure, Some("throttled"));
        assert!(!set.is_active(ConditionKind::Terminal));
        let recoverable = set.get(ConditionKind::Recoverable).unwrap();
        assert!(recoverable.active);
        assert_eq!(recoverable.message.as_deref(), Some("throttled"));
        assert_eq!(set.health(), Health::Recoverable);
    }

    #[test]
    fn test_permanent_leaves_recoverable_untouched() {
        let mut set = ConditionSet::new();
        set.record(Outcome::RetryableFailure, Some("timeout"));
        set.record(Outcome::PermanentFailure, Some("conflict"));

        let recoverable = set.get(ConditionKind::Recoverable).unwrap();
        assert!(recoverable.active);
        assert_eq!(recoverable.message.as_deref(), Some("timeout"));
        assert_eq!(set.health(), Health::Terminal, "terminal takes priority");
    }

    #[test]
    fn test_no_duplicate_conditions() {
        let mut set = ConditionSet::new();
        set.record(Outcome::RetryableFailure, Some("one"));
        set.record(Outcome::RetryableFailure, Some("two"));
        set.record(Outcome::Success, None);
        set.record(Outcome::PermanentFailure, Some("three"));

        let recoverable_count = set
            .conditions()
            .iter()
            .filter(|c| c.kind == ConditionKind::Recoverable)
            .count();
        assert_eq!(recoverable_count, 1);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_repeated_retryable_with_same_message_is_unchanged() {
        let mut set = ConditionSet::new();
        assert!(set.record(Outcome::RetryableFailure, Some("timeout")));
        assert!(!set.record(Outcome::RetryableFailure, Some("timeout")));
        assert!(set.record(Outcome::RetryableFailure, Some("refused")));
    }
}
