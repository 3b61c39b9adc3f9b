//! Request models accepted by the gateway.
//!
//! Both models are ephemeral: constructed from a request body, validated,
//! forwarded, and dropped once the response is produced.

use std::{borrow::Cow, collections::BTreeMap};

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

/// Minimum accepted name length in characters.
pub const NAME_MIN_CHARS: usize = 2;

/// Maximum accepted name length in characters.
pub const NAME_MAX_CHARS: usize = 100;

/// Minimum accepted age.
pub const AGE_MIN: i32 = 1;

/// Maximum accepted age.
pub const AGE_MAX: i32 = 150;

/// Request to trigger email sending for one receiver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EmailTriggerRequest {
    /// Address the downstream email service should send to.
    #[serde(default)]
    #[validate(email(message = "Receiver email must be a valid email address"))]
    pub receiver_email: String,
}

impl EmailTriggerRequest {
    /// Creates a request for the given receiver.
    pub fn new(receiver_email: impl Into<String>) -> Self {
        Self { receiver_email: receiver_email.into() }
    }

    /// Returns true when the address is present and not just whitespace.
    pub fn has_receiver(&self) -> bool {
        !self.receiver_email.trim().is_empty()
    }
}

/// A `(name, age)` record submitted for queue delivery.
///
/// Missing fields deserialize to their defaults so that absence is reported
/// by validation ("Name is required", age out of range) rather than as a
/// JSON parse failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserDataSubmission {
    /// Display name, 2 to 100 characters.
    #[serde(default)]
    #[validate(custom(function = "validate_name"))]
    pub name: String,
    /// Age in years, 1 to 150.
    #[serde(default)]
    #[validate(range(min = 1, max = 150, message = "Age must be between 1 and 150"))]
    pub age: i32,
}

impl UserDataSubmission {
    /// Creates a submission from its parts.
    pub fn new(name: impl Into<String>, age: i32) -> Self {
        Self { name: name.into(), age }
    }
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some(Cow::Borrowed("Name is required"));
        return Err(err);
    }

    let length = name.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&length) {
        let mut err = ValidationError::new("length");
        err.message = Some(Cow::Borrowed("Name must be between 2 and 100 characters"));
        err.add_param(Cow::Borrowed("actual"), &length);
        return Err(err);
    }

    Ok(())
}

/// Flattens validation errors into a `field -> [messages]` JSON object.
///
/// Field keys use the camelCase wire names the request models deserialize
/// from, so `receiver_email` is reported as `receiverEmail`. Errors without
/// a message fall back to their code. Fields are ordered by name so the
/// output is stable.
pub fn validation_details(errors: &ValidationErrors) -> serde_json::Value {
    let details: BTreeMap<String, Vec<String>> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| e.message.as_ref().map_or_else(|| e.code.to_string(), ToString::to_string))
                .collect();
            (wire_name(&field), messages)
        })
        .collect();

    serde_json::json!(details)
}

/// Converts a snake_case field name to its camelCase wire name.
fn wire_name(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;

    for c in field.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }

    out
}
