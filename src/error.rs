use thiserror::Error;

use crate::api::ApiError;
use crate::retry::RetryError;

/// Errors surfaced by reconcile and data-source operations.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Rejected locally, before any network call.
    #[error("validation failed for {resource_type}: {message}")]
    Validation {
        resource_type: String,
        message: String,
    },

    #[error("{resource_type} '{id}' not found")]
    NotFound { resource_type: String, id: String },

    /// Every attempt was retryable and the timeout budget ran out.
    #[error("{action} on {target} timed out after {attempts} attempts: {source}")]
    Timeout {
        action: String,
        target: String,
        attempts: u32,
        #[source]
        source: ApiError,
    },

    /// The remote side rejected the action.
    #[error("{action} on {target} failed: {source}")]
    Remote {
        action: String,
        target: String,
        #[source]
        source: ApiError,
    },

    #[error("malformed identifier '{id}': expected {expected} part(s)")]
    MalformedId { id: String, expected: usize },

    #[error("{action} on {target}: response is missing '{path}'")]
    MissingField {
        action: String,
        target: String,
        path: String,
    },

    #[error("{operation} is not supported for {resource_type}")]
    Unsupported {
        resource_type: String,
        operation: &'static str,
    },

    #[error("unknown resource type: {0}")]
    UnknownResource(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReconcileError {
    pub fn validation(resource_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            resource_type: resource_type.into(),
            message: message.into(),
        }
    }

    /// Wrap a retry failure with the action and the identifier (or resource
    /// type, before one exists) it was acting on.
    pub fn from_retry(action: &str, target: &str, err: RetryError) -> Self {
        match err {
            RetryError::Exhausted { attempts, last } => Self::Timeout {
                action: action.to_string(),
                target: target.to_string(),
                attempts,
                source: last,
            },
            RetryError::Failed { error, .. } => Self::Remote {
                action: action.to_string(),
                target: target.to_string(),
                source: error,
            },
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Remote { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ErrorClass;

    fn throttled() -> ApiError {
        ApiError::Service {
            action: "DeleteTopic".to_string(),
            status: 400,
            code: "Throttling.User".to_string(),
            message: "slow down".to_string(),
            request_id: None,
            class: ErrorClass::Retryable,
        }
    }

    #[test]
    fn test_validation_error_display() {
        let err = ReconcileError::validation(
            "alibabacloudstack_alikafka_topic",
            "partition_num can only grow",
        );
        assert_eq!(
            err.to_string(),
            "validation failed for alibabacloudstack_alikafka_topic: partition_num can only grow"
        );
        assert!(err.is_validation());
    }

    #[test]
    fn test_not_found_display() {
        let err = ReconcileError::NotFound {
            resource_type: "alibabacloudstack_oos_template".to_string(),
            id: "deploy".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "alibabacloudstack_oos_template 'deploy' not found"
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_from_retry_exhausted_is_timeout() {
        let err = ReconcileError::from_retry(
            "DeleteTopic",
            "inst:orders",
            RetryError::Exhausted {
                attempts: 4,
                last: throttled(),
            },
        );
        assert!(matches!(err, ReconcileError::Timeout { attempts: 4, .. }));
        let message = err.to_string();
        assert!(message.contains("DeleteTopic on inst:orders timed out after 4 attempts"));
        assert!(message.contains("Throttling.User"));
    }

    #[test]
    fn test_from_retry_failed_is_remote() {
        let err = ReconcileError::from_retry(
            "DeleteTopic",
            "inst:orders",
            RetryError::Failed {
                attempts: 1,
                error: throttled(),
            },
        );
        assert!(matches!(err, ReconcileError::Remote { .. }));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_malformed_id_display() {
        let err = ReconcileError::MalformedId {
            id: "abc".to_string(),
            expected: 2,
        };
        assert_eq!(
            err.to_string(),
            "malformed identifier 'abc': expected 2 part(s)"
        );
    }

    #[test]
    fn test_serde_error_from_conversion() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ReconcileError = serde_err.into();
        assert!(matches!(err, ReconcileError::Serialization(_)));
    }

    #[test]
    fn test_unsupported_display() {
        let err = ReconcileError::Unsupported {
            resource_type: "alibabacloudstack_dms_enterprise_user".to_string(),
            operation: "create",
        };
        assert_eq!(
            err.to_string(),
            "create is not supported for alibabacloudstack_dms_enterprise_user"
        );
    }
}
