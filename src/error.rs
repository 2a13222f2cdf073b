use std::time::Duration;
use thiserror::Error;

/// Error categorization shared by every external integration
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (permanent failures)
    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors (potentially transient)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors (usually permanent)
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    // Network errors (transient - should retry)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Network timeout after {timeout:?}: {message}")]
    NetworkTimeout { timeout: Duration, message: String },

    // Service-specific errors
    #[error("PubMed service error: {code} - {message}")]
    PubMed { code: u16, message: String },

    #[error("LLM provider error: {provider} - {message}")]
    Llm { provider: String, message: String },

    #[error("Rate limit exceeded: retry after {retry_after:?}")]
    RateLimitExceeded { retry_after: Duration },

    // Client errors (permanent - don't retry)
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    // Server errors (transient - should retry)
    #[error("Service temporarily unavailable: {service} - {reason}")]
    ServiceUnavailable { service: String, reason: String },

    #[error("Timeout error: operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    // Parse errors
    #[error("Parse error in {context}: {message}")]
    Parse { context: String, message: String },

    // PDF handling
    #[error("PDF error: {0}")]
    Pdf(String),

    // Spreadsheet delivery
    #[error("Spreadsheet error: {0}")]
    Sheet(String),

    // Email delivery
    #[error("SMTP error: {0}")]
    Smtp(String),

    #[error("Email rejected: {0}")]
    EmailRejected(String),

    // General service error
    #[error("Service error: {0}")]
    Service(String),
}

/// Error categorization for retry strategies
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorCategory {
    /// Permanent errors - should not retry
    Permanent,
    /// Transient errors - safe to retry
    Transient,
    /// Rate limited - retry with backoff
    RateLimited,
}

impl Error {
    /// Categorize error for retry logic
    pub fn category(&self) -> ErrorCategory {
        match self {
            // Permanent errors - don't retry
            Error::Config(_)
            | Error::InvalidInput { .. }
            | Error::AuthenticationFailed(_)
            | Error::Parse { .. }
            | Error::Pdf(_)
            | Error::Sheet(_)
            | Error::EmailRejected(_)
            | Error::Serde(_) => ErrorCategory::Permanent,

            // Rate limited - retry with backoff
            Error::RateLimitExceeded { .. } => ErrorCategory::RateLimited,

            // Transient errors - retry
            Error::Http(_)
            | Error::NetworkTimeout { .. }
            | Error::ServiceUnavailable { .. }
            | Error::Timeout { .. }
            | Error::Smtp(_)
            | Error::Llm { .. }
            | Error::Service(_)
            | Error::Io(_) => ErrorCategory::Transient,

            // HTTP-status-bearing service: 429 rate limited, 4xx permanent, 5xx transient
            Error::PubMed { code, .. } => match *code {
                429 => ErrorCategory::RateLimited,
                400..=499 => ErrorCategory::Permanent,
                _ => ErrorCategory::Transient,
            },
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Transient | ErrorCategory::RateLimited
        )
    }

    /// Get suggested retry delay for rate limited errors
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimitExceeded { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
