//! Error types with transient/permanent classification for retry logic.

use thiserror::Error;

use crate::schema::FieldKind;

/// Errors raised while planning a patch.
///
/// These indicate a misconfigured schema or a snapshot that contradicts
/// it, never a backend problem: the comparator and builder perform no
/// backend calls. They are programming errors and must surface loudly.
#[derive(Debug, Error)]
pub enum PlanError {
    /// A delta path has no declared field policy.
    #[error("no field policy declared for path '{path}'")]
    UnknownField { path: String },

    /// A single-element sequence field does not hold exactly one value.
    #[error("field '{path}' must contain exactly one element, found {actual}")]
    InvalidCardinality { path: String, actual: usize },

    /// A snapshot value does not match the kind its policy declares.
    #[error("field '{path}' expected a {expected} value, found {found}")]
    KindMismatch {
        path: String,
        expected: FieldKind,
        found: &'static str,
    },
}

/// Result type for plan operations.
pub type PlanResult<T> = Result<T, PlanError>;

/// Errors reported by the remote backend, or shaped for it.
///
/// This crate never raises these itself; they arrive from the caller's
/// [`ResourceClient`](crate::client::ResourceClient) and
/// [`TagClient`](crate::client::TagClient) implementations and are fed
/// to the [`Classifier`](crate::conditions::Classifier).
#[derive(Debug, Error)]
pub enum BackendError {
    /// The desired snapshot lacks an identifier needed before any
    /// backend call. Callers treat this as "not yet created", not as a
    /// failure.
    #[error("missing required field '{field}' in desired state")]
    MissingRequiredField { field: String },

    /// The backend reports the resource absent.
    #[error("resource not found: {resource_ref}")]
    NotFound { resource_ref: String },

    /// The backend rejected a call with a service error code.
    #[error("backend returned {code}: {message}")]
    Api { code: String, message: String },

    /// The call never reached the backend.
    #[error("transport error: {message}")]
    Transport { message: String },
}

impl BackendError {
    /// Create a missing required field error.
    pub fn missing_required_field(field: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(resource_ref: impl Into<String>) -> Self {
        Self::NotFound {
            resource_ref: resource_ref.into(),
        }
    }

    /// Create an API error with a service error code.
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Check if the backend reported the resource absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The service error code, when the backend supplied one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_error_display() {
        let err = PlanError::UnknownField {
            path: "spec.bogus".to_string(),
        };
        assert!(err.to_string().contains("spec.bogus"));

        let err = PlanError::InvalidCardinality {
            path: "endpoint.types".to_string(),
            actual: 2,
        };
        assert!(err.to_string().contains("exactly one element"));
        assert!(err.to_string().contains('2'));
    }

    #[test]
    fn test_backend_error_code() {
        let err = BackendError::api("BadRequestException", "malformed patch");
        assert_eq!(err.code(), Some("BadRequestException"));
        assert!(err.to_string().contains("malformed patch"));

        assert_eq!(BackendError::transport("timed out").code(), None);
    }

    #[test]
    fn test_is_not_found() {
        assert!(BackendError::not_found("rest-api/abc").is_not_found());
        assert!(!BackendError::transport("refused").is_not_found());
    }
}
