//! Core request models and response types.
//!
//! Provides the validated request shapes accepted by the gateway, the uniform
//! response envelope every endpoint returns, and the clock abstraction used
//! for timestamps. All other crates depend on these foundational types.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod envelope;
pub mod models;
pub mod time;

pub use envelope::ApiResponse;
pub use models::{validation_details, EmailTriggerRequest, UserDataSubmission};
pub use time::{Clock, RealClock, TestClock};
