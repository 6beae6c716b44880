//! Error types for management API calls.
//!
//! Errors are categorized by HTTP status so that callers can tell a missing
//! object from a conflict, and so the transport can decide what to retry.

use thiserror::Error;

/// Categories of API errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 404
    NotFound,
    /// 409: already exists, or still in use
    Conflict,
    /// 401 or 403
    Auth,
    /// 429 (transient, retryable)
    RateLimited,
    /// 429 caused by an exhausted quota
    Quota,
    /// Other 4xx
    Request,
    /// 5xx
    Server,
    /// No response at all (connection, timeout, DNS)
    Network,
    /// A response that could not be decoded
    Format,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Resource not found",
            Self::Conflict => "Resource conflict",
            Self::Auth => "Not authorized",
            Self::RateLimited => "Rate limited",
            Self::Quota => "Quota exceeded",
            Self::Request => "Request rejected",
            Self::Server => "Server error",
            Self::Network => "Network connectivity issue",
            Self::Format => "Unexpected response",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NotFound => "Check the org, kind and name",
            Self::Conflict => "Import the existing resource or wait for dependents to be removed",
            Self::Auth => "Check the token passed with --token or CPLN_TOKEN",
            Self::RateLimited => "Wait a moment and try again",
            Self::Quota => "Raise the org quota or remove unused resources",
            Self::Request => "Check the declared values against the API's constraints",
            Self::Server => "Try again later",
            Self::Network => "Check your internet connection and the endpoint",
            Self::Format | Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur during API calls.
#[derive(Debug, Error)]
pub enum Error {
    /// The API answered with a non-success status
    #[error("status: {status}, body: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// No usable response (connection, timeout, DNS, etc.)
    #[error("network error: {message}")]
    Network {
        /// Detailed error message from the failed network operation
        message: String,
    },

    /// The response body was not the expected JSON
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Get the error category for retry logic.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Status { status, body } => match status {
                404 => ErrorCategory::NotFound,
                409 => ErrorCategory::Conflict,
                401 | 403 => ErrorCategory::Auth,
                429 if body.to_lowercase().contains("quota") => ErrorCategory::Quota,
                429 => ErrorCategory::RateLimited,
                400..=499 => ErrorCategory::Request,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Other,
            },
            Self::Network { .. } => ErrorCategory::Network,
            Self::InvalidResponse(_) => ErrorCategory::Format,
            Self::Other(_) => ErrorCategory::Other,
        }
    }

    /// HTTP status, when the API answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.category() == ErrorCategory::Conflict
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(status) => Self::Status {
                status,
                body: String::new(),
            },
            other => Self::Network {
                message: other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16, body: &str) -> Error {
        Error::Status {
            status: code,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_status_categories() {
        assert_eq!(status(404, "").category(), ErrorCategory::NotFound);
        assert_eq!(status(409, "").category(), ErrorCategory::Conflict);
        assert_eq!(status(403, "").category(), ErrorCategory::Auth);
        assert_eq!(status(422, "").category(), ErrorCategory::Request);
        assert_eq!(status(503, "").category(), ErrorCategory::Server);
        assert_eq!(
            Error::Network {
                message: "timeout".into()
            }
            .category(),
            ErrorCategory::Network
        );
    }

    #[test]
    fn test_rate_limit_is_retryable_unless_quota() {
        assert!(status(429, "slow down").is_retryable());
        assert!(!status(429, "org Quota exceeded").is_retryable());
        assert_eq!(status(429, "quota").category(), ErrorCategory::Quota);
        assert!(!status(500, "").is_retryable());
        assert!(!status(409, "").is_retryable());
    }

    #[test]
    fn test_status_message_format() {
        assert_eq!(status(400, "bad name").to_string(), "status: 400, body: bad name");
        assert_eq!(status(400, "").status(), Some(400));
        assert_eq!(Error::Other("x".into()).status(), None);
    }

    #[test]
    fn test_category_text() {
        assert_eq!(ErrorCategory::Auth.description(), "Not authorized");
        assert!(ErrorCategory::Auth.advice().contains("CPLN_TOKEN"));
    }
}
