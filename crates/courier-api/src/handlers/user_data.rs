//! User-data submission handler.

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Response,
    Json,
};
use courier_core::{validation_details, ApiResponse, UserDataSubmission};
use serde_json::json;
use tracing::{debug, info, instrument};
use validator::Validate;

use super::boundary::{envelope, error_boundary, HandlerError};
use crate::AppState;

const INVALID_DATA: &str = "Invalid data provided";
const SUBMITTED: &str = "User data submitted successfully";
const SUBMIT_FAULT: &str = "An error occurred while processing your request";

/// Validates a `(name, age)` record and publishes it to the queue.
///
/// # Errors
///
/// Returns appropriate HTTP status codes:
/// - 400: Body unparseable or a field out of bounds
/// - 500: Publishing failed; the cause is logged, not returned
#[instrument(name = "submit_user_data", skip(state, payload))]
pub async fn submit_user_data(
    State(state): State<AppState>,
    payload: Result<Json<UserDataSubmission>, JsonRejection>,
) -> Response {
    error_boundary("submit_user_data", SUBMIT_FAULT, async move {
        let submission = match payload {
            Ok(Json(submission)) => submission,
            Err(rejection) => {
                debug!(rejection = %rejection.body_text(), "User data body rejected");
                return Err(HandlerError::invalid_with(
                    INVALID_DATA,
                    json!({ "body": [rejection.body_text()] }),
                ));
            },
        };

        if let Err(errors) = submission.validate() {
            return Err(HandlerError::invalid_with(INVALID_DATA, validation_details(&errors)));
        }

        state.publisher.publish(&submission).await.context("failed to publish user data")?;

        info!(name = %submission.name, age = submission.age, "User data published");
        Ok(envelope(
            StatusCode::OK,
            ApiResponse::success(SUBMITTED)
                .with_data(json!({ "name": submission.name, "age": submission.age })),
        ))
    })
    .await
}
