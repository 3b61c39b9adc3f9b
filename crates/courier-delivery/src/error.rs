//! Error types for downstream delivery.
//!
//! These errors never reach API clients. The forwarder folds them into a
//! boolean and the publisher hands them to the handler, which maps them to a
//! generic server-error envelope.

use thiserror::Error;

/// Result type alias for delivery operations.
pub type Result<T> = std::result::Result<T, DeliveryError>;

/// Failure modes of a single forward or publish.
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    /// Network-level connectivity failure.
    #[error("network connection failed: {message}")]
    NetworkError {
        /// Error message describing the network failure
        message: String,
    },

    /// The transport gave up waiting for a response.
    #[error("request timed out: {message}")]
    Timeout {
        /// Transport error message
        message: String,
    },

    /// Downstream answered with a non-2xx status.
    #[error("unexpected response status: HTTP {status_code}")]
    UnexpectedStatus {
        /// HTTP status code returned downstream
        status_code: u16,
    },

    /// The component has no target configured.
    #[error("{component} is not configured")]
    NotConfigured {
        /// Name of the unconfigured component
        component: &'static str,
    },

    /// Invalid or missing configuration.
    #[error("invalid configuration: {message}")]
    ConfigurationError {
        /// Configuration error message
        message: String,
    },

    /// Payload could not be serialized.
    #[error("failed to serialize payload: {message}")]
    SerializationError {
        /// Serializer error message
        message: String,
    },
}

impl DeliveryError {
    /// Creates a network error from a message.
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError { message: message.into() }
    }

    /// Creates a timeout error from a message.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout { message: message.into() }
    }

    /// Creates an unexpected-status error.
    pub fn unexpected_status(status_code: u16) -> Self {
        Self::UnexpectedStatus { status_code }
    }

    /// Creates a not-configured error for the named component.
    pub fn not_configured(component: &'static str) -> Self {
        Self::NotConfigured { component }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError { message: message.into() }
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError { message: message.into() }
    }
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(err.to_string())
        } else if err.is_connect() {
            Self::network(format!("connection failed: {err}"))
        } else {
            Self::network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DeliveryError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}
