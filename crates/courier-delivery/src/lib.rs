//! Downstream delivery for the Courier gateway.
//!
//! Each request is forwarded to exactly one collaborator:
//!
//! - **Email Forwarder** issues one `POST` to the email-export service and
//!   reports the outcome as a boolean. Failures are logged and swallowed.
//! - **Queue Publisher** sends one message to an Azure Service Bus queue and
//!   returns an error when the send cannot be completed.
//!
//! Neither collaborator retries or buffers. The HTTP clients behind them are
//! built once and shared across all concurrent requests.
//!
//! # Example
//!
//! ```no_run
//! use courier_delivery::{ClientConfig, EmailForwarder, HttpEmailForwarder};
//!
//! # async fn example() -> courier_delivery::Result<()> {
//! let forwarder = HttpEmailForwarder::new(Some("mail.internal"), ClientConfig::default())?;
//! let delivered = forwarder.trigger("a@b.com").await;
//! # let _ = delivered;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod forwarder;
pub mod queue;

pub use client::ClientConfig;
pub use error::{DeliveryError, Result};
pub use forwarder::{EmailForwarder, HttpEmailForwarder};
pub use queue::{
    decode_message, encode_message, ConnectionString, QueuePublisher, ServiceBusPublisher,
    UserDataMessage,
};

/// Queue used when none is configured.
pub const DEFAULT_QUEUE_NAME: &str = "userdata-queue";
