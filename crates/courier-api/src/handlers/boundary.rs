//! Error-mapping boundary shared by the request handlers.
//!
//! Handlers describe their work as a future returning
//! `Result<Response, HandlerError>`. [`error_boundary`] runs that future,
//! turns every error into a response envelope and catches panics so no fault
//! reaches the transport.

use std::{any::Any, future::Future, panic::AssertUnwindSafe};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use courier_core::ApiResponse;
use futures::FutureExt;
use serde_json::Value;
use tracing::{error, warn};

/// Ways a handler can fail.
#[derive(Debug)]
pub enum HandlerError {
    /// Client input was rejected before any downstream call.
    InvalidInput {
        /// Message returned to the client.
        message: String,
        /// Per-field details, returned as the envelope `data`.
        details: Option<Value>,
    },
    /// The downstream collaborator reported failure.
    Unavailable {
        /// Message returned to the client.
        message: String,
    },
    /// Unexpected error. Logged in full, never shown to the client.
    Fault(anyhow::Error),
}

impl HandlerError {
    /// Input error without details.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput { message: message.into(), details: None }
    }

    /// Input error carrying per-field details.
    pub fn invalid_with(message: impl Into<String>, details: Value) -> Self {
        Self::InvalidInput { message: message.into(), details: Some(details) }
    }

    /// Downstream failure.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable { message: message.into() }
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(error: anyhow::Error) -> Self {
        Self::Fault(error)
    }
}

/// Runs `work` and maps its outcome to a response.
///
/// Faults and panics both become a 500 envelope carrying `fault_message`.
/// The underlying error is logged under `operation` and never echoed.
pub async fn error_boundary<F>(
    operation: &'static str,
    fault_message: &'static str,
    work: F,
) -> Response
where
    F: Future<Output = Result<Response, HandlerError>> + Send,
{
    match AssertUnwindSafe(work).catch_unwind().await {
        Ok(Ok(response)) => response,
        Ok(Err(HandlerError::InvalidInput { message, details })) => {
            warn!(operation, message = %message, "Rejected invalid input");
            let body = ApiResponse::failure(message);
            let body = match details {
                Some(details) => body.with_data(details),
                None => body,
            };
            envelope(StatusCode::BAD_REQUEST, body)
        },
        Ok(Err(HandlerError::Unavailable { message })) => {
            warn!(operation, message = %message, "Downstream call did not succeed");
            envelope(StatusCode::INTERNAL_SERVER_ERROR, ApiResponse::failure(message))
        },
        Ok(Err(HandlerError::Fault(err))) => {
            error!(operation, error = %format_args!("{err:#}"), "Request failed");
            envelope(StatusCode::INTERNAL_SERVER_ERROR, ApiResponse::failure(fault_message))
        },
        Err(panic) => {
            error!(operation, panic = %panic_message(panic.as_ref()), "Handler panicked");
            envelope(StatusCode::INTERNAL_SERVER_ERROR, ApiResponse::failure(fault_message))
        },
    }
}

/// Serializes an envelope with the given status.
pub fn envelope(status: StatusCode, body: ApiResponse) -> Response {
    (status, Json(body)).into_response()
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
