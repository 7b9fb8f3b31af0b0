use std::time::Duration;

use thiserror::Error;

use super::types::ErrorClass;

/// Errors raised by a single control-plane call.
///
/// SECURITY: Error messages must NEVER contain the access key secret.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service answered with an error code
    #[error("{action} failed ({status}) {code}: {message}")]
    Service {
        action: String,
        status: u16,
        code: String,
        message: String,
        request_id: Option<String>,
        class: ErrorClass,
    },

    /// Connection-level failure before a response arrived
    #[error("network error calling {action}: {source}")]
    Transport {
        action: String,
        #[source]
        source: reqwest::Error,
    },

    /// The call did not finish inside its share of the timeout budget
    #[error("{action} did not answer within {timeout:?}")]
    Timeout { action: String, timeout: Duration },

    /// The response could not be decoded
    #[error("failed to decode {action} response: {message}")]
    Decode { action: String, message: String },

    /// The client could not be built from its configuration
    #[error("invalid client configuration: {message}")]
    Config { message: String },
}

impl ApiError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Service { class, .. } => *class,
            Self::Transport { .. } | Self::Timeout { .. } => ErrorClass::Retryable,
            Self::Decode { .. } | Self::Config { .. } => ErrorClass::Fatal,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Service { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Retryable
    }

    pub fn is_not_found(&self) -> bool {
        self.class() == ErrorClass::NotFound
    }
}
