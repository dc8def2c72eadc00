//! Error types for Campus Counsel
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling. Provider failures are
//! classified into distinct variants so that the HTTP boundary can pick a
//! status code and user-facing copy for each of them.

use thiserror::Error;

/// Main error type for Campus Counsel operations
#[derive(Error, Debug)]
pub enum CounselError {
    /// Configuration file or value errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The LLM credential is not configured
    #[error("{0}")]
    ConfigurationMissing(String),

    /// The provider answered with a non-2xx status or an in-body error
    #[error("Provider rejected request: {message}")]
    UpstreamRejected {
        /// HTTP status returned by the provider, if any
        status: Option<u16>,
        /// Raw diagnostic detail (response body or provider error message)
        message: String,
    },

    /// The outbound call exceeded its deadline
    #[error("Provider request timed out: {0}")]
    Timeout(String),

    /// The provider signalled throttling
    #[error("Provider rate limit exceeded: {0}")]
    RateLimited(String),

    /// The provider response could not be decoded or lacked expected fields
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// Caller input rejected before any network call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Session does not exist or is not owned by the caller
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Consultation storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Transport-level HTTP errors that are not timeouts
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Coarse classification of a failure, used for metrics labels and for
/// choosing the response the boundary shows to the end user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Credential not configured
    ConfigurationMissing,
    /// Provider rejected the request
    UpstreamRejected,
    /// Deadline exceeded
    Timeout,
    /// Provider throttling
    RateLimited,
    /// Undecodable provider response
    MalformedResponse,
    /// Rejected caller input
    InvalidInput,
    /// Unknown or foreign session
    SessionNotFound,
    /// Persistence failure
    Storage,
    /// Anything else
    Internal,
}

impl ErrorCategory {
    /// Stable label used in metrics and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigurationMissing => "configuration_missing",
            Self::UpstreamRejected => "upstream_rejected",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::MalformedResponse => "malformed_response",
            Self::InvalidInput => "invalid_input",
            Self::SessionNotFound => "session_not_found",
            Self::Storage => "storage",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CounselError {
    /// Classify this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigurationMissing(_) => ErrorCategory::ConfigurationMissing,
            Self::UpstreamRejected { .. } => ErrorCategory::UpstreamRejected,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::RateLimited(_) => ErrorCategory::RateLimited,
            Self::MalformedResponse(_) | Self::Serialization(_) => {
                ErrorCategory::MalformedResponse
            }
            Self::InvalidInput(_) => ErrorCategory::InvalidInput,
            Self::SessionNotFound(_) => ErrorCategory::SessionNotFound,
            Self::Storage(_) => ErrorCategory::Storage,
            Self::Http(e) if e.is_timeout() => ErrorCategory::Timeout,
            Self::Config(_) | Self::Io(_) | Self::Yaml(_) | Self::Http(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// Map a `reqwest` transport error into the taxonomy
    ///
    /// Deadline failures become [`CounselError::Timeout`]; everything else is
    /// kept as a transport error.
    pub fn from_transport(context: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(format!("{}: {}", context, err))
        } else {
            Self::Http(err)
        }
    }
}

/// Classify an arbitrary error chain
///
/// Walks the `anyhow` chain looking for a [`CounselError`]; errors that carry
/// none are reported as [`ErrorCategory::Internal`].
pub fn categorize(err: &anyhow::Error) -> ErrorCategory {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<CounselError>())
        .map(CounselError::category)
        .unwrap_or(ErrorCategory::Internal)
}

/// Result type alias for Campus Counsel operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = CounselError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_configuration_missing_display_is_operator_message() {
        let error = CounselError::ConfigurationMissing("set LLM_API_KEY".to_string());
        assert_eq!(error.to_string(), "set LLM_API_KEY");
        assert_eq!(error.category(), ErrorCategory::ConfigurationMissing);
    }

    #[test]
    fn test_upstream_rejected_display() {
        let error = CounselError::UpstreamRejected {
            status: Some(500),
            message: "boom".to_string(),
        };
        assert_eq!(error.to_string(), "Provider rejected request: boom");
        assert_eq!(error.category(), ErrorCategory::UpstreamRejected);
    }

    #[test]
    fn test_rate_limited_category() {
        let error = CounselError::RateLimited("slow down".to_string());
        assert_eq!(error.category(), ErrorCategory::RateLimited);
        assert_eq!(error.category().as_str(), "rate_limited");
    }

    #[test]
    fn test_json_error_is_malformed_response() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let error: CounselError = json_error.into();
        assert_eq!(error.category(), ErrorCategory::MalformedResponse);
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: : yaml").unwrap_err();
        let error: CounselError = yaml_error.into();
        assert!(matches!(error, CounselError::Yaml(_)));
        assert_eq!(error.category(), ErrorCategory::Internal);
    }

    #[test]
    fn test_categorize_walks_context_chain() {
        let err = anyhow::Error::new(CounselError::Timeout("deadline".to_string()))
            .context("failed to get LLM response");
        assert_eq!(categorize(&err), ErrorCategory::Timeout);
    }

    #[test]
    fn test_categorize_unknown_error_is_internal() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(categorize(&err), ErrorCategory::Internal);
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CounselError>();
    }
}
