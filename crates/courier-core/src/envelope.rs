//! Uniform response envelope returned by every endpoint.

use serde::{Deserialize, Serialize};

/// Standard API response wrapper.
///
/// Every handler answers with `{"success": .., "message": .., "data": ..}`.
/// `data` is always serialized and is `null` when the response carries no
/// payload, so callers can rely on a single shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T = serde_json::Value> {
    /// Whether the request was handled successfully.
    pub success: bool,
    /// Human-readable outcome description.
    pub message: String,
    /// Optional structured payload.
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Creates a successful response without payload.
    pub fn success(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into(), data: None }
    }

    /// Creates a failed response without payload.
    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), data: None }
    }

    /// Attaches a payload to the response.
    #[must_use]
    pub fn with_data(mut self, data: T) -> Self {
        self.data = Some(data);
        self
    }
}
