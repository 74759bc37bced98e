//! Error types for CrewAI notification calls.
//!
//! Two layers: `TransportError` describes a single failed HTTP attempt and is
//! always retried; `NotifyError` is what callers of the client see, either a
//! fatal configuration problem or the terminal failure after every attempt
//! was spent.

use thiserror::Error;

/// Result type alias for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;

/// Failure of a single HTTP attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection could not be established or was dropped.
    #[error("network connection failed: {message}")]
    Network {
        /// Underlying cause
        message: String,
    },

    /// No complete response arrived within the request timeout.
    #[error("request timeout after {timeout_ms}ms")]
    Timeout {
        /// Timeout that elapsed, in milliseconds
        timeout_ms: u64,
    },

    /// Server answered with a non-2xx status.
    #[error("HTTP {status_code}: {body}")]
    Status {
        /// Response status code
        status_code: u16,
        /// Response body, truncated
        body: String,
    },

    /// A 2xx response whose body is not valid JSON.
    #[error("invalid JSON response: {message}")]
    Decode {
        /// Parser error
        message: String,
    },
}

impl TransportError {
    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    /// Creates an HTTP status error.
    pub fn status(status_code: u16, body: impl Into<String>) -> Self {
        Self::Status { status_code, body: body.into() }
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode { message: message.into() }
    }

    /// Returns the HTTP status code when the server answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

/// Errors surfaced by the notification client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// Client cannot be built from the supplied configuration.
    #[error("configuration error: {message}")]
    Configuration {
        /// What is wrong
        message: String,
    },

    /// Request payload could not be encoded as JSON.
    #[error("invalid request payload: {message}")]
    InvalidPayload {
        /// Encoder error
        message: String,
    },

    /// Every attempt failed.
    #[error("request to {url} failed after {attempts} attempts: {last_error}")]
    RetryExhausted {
        /// Target URL
        url: String,
        /// Number of attempts made
        attempts: u32,
        /// Failure of the final attempt
        #[source]
        last_error: TransportError,
    },
}

impl NotifyError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Creates a payload encoding error.
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload { message: message.into() }
    }

    /// Creates a retries exhausted error.
    pub fn retry_exhausted(url: impl Into<String>, attempts: u32, last_error: TransportError) -> Self {
        Self::RetryExhausted { url: url.into(), attempts, last_error }
    }

    /// Returns the attempt count for exhausted retries.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::RetryExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}
