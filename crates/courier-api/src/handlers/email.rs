//! Email dispatch handler.
//!
//! Validates the receiver address and forwards it to the email-export
//! service through the configured [`EmailForwarder`].
//!
//! [`EmailForwarder`]: courier_delivery::EmailForwarder

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Response,
    Json,
};
use courier_core::{validation_details, ApiResponse, EmailTriggerRequest};
use tracing::{debug, info, instrument};
use validator::Validate;

use super::boundary::{envelope, error_boundary, HandlerError};
use crate::AppState;

const RECEIVER_REQUIRED: &str = "Receiver email is required";
const INVALID_ADDRESS: &str = "Invalid email address";
const SEND_FAILED: &str = "Failed to send email";
const SEND_FAULT: &str = "An error occurred while sending email";

/// Triggers one email send.
///
/// # Errors
///
/// Returns appropriate HTTP status codes:
/// - 400: Body missing or unparseable, receiver empty or not an address
/// - 500: Email service reported failure, or an unexpected fault
#[instrument(name = "send_email", skip(state, payload))]
pub async fn send_email(
    State(state): State<AppState>,
    payload: Result<Json<EmailTriggerRequest>, JsonRejection>,
) -> Response {
    error_boundary("send_email", SEND_FAULT, async move {
        let request = match payload {
            Ok(Json(request)) if request.has_receiver() => request,
            Ok(_) => return Err(HandlerError::invalid(RECEIVER_REQUIRED)),
            Err(rejection) => {
                debug!(rejection = %rejection.body_text(), "Email request body rejected");
                return Err(HandlerError::invalid(RECEIVER_REQUIRED));
            },
        };

        if let Err(errors) = request.validate() {
            return Err(HandlerError::invalid_with(INVALID_ADDRESS, validation_details(&errors)));
        }

        let receiver = request.receiver_email;
        if !state.forwarder.trigger(&receiver).await {
            return Err(HandlerError::unavailable(SEND_FAILED));
        }

        info!(receiver = %receiver, "Email dispatched");
        Ok(envelope(
            StatusCode::OK,
            ApiResponse::success(format!("Email sent successfully to {receiver}")),
        ))
    })
    .await
}
