//! HTTP request handlers for the Courier API.
//!
//! Every handler answers with the uniform `{success, message, data}`
//! envelope. Email and user-data handlers run their work inside
//! [`boundary::error_boundary`], which maps input errors to 400 and
//! downstream failures, faults and panics to 500.

pub mod boundary;
pub mod email;
pub mod health;
pub mod user_data;

pub use boundary::{error_boundary, HandlerError};
pub use email::send_email;
pub use health::health_check;
pub use user_data::submit_user_data;
