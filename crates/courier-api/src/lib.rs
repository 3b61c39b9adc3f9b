//! Courier HTTP API.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use courier_core::{Clock, RealClock};
use courier_delivery::{EmailForwarder, QueuePublisher};

pub mod config;
pub mod handlers;
pub mod server;

pub use config::{Config, LogFormat};
pub use server::{create_router, start_server};

/// Long-lived collaborators shared by every request.
///
/// Built once at startup and cloned cheaply into each handler. Nothing in
/// here is mutated after construction.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Forwards email triggers to the email-export service.
    pub forwarder: Arc<dyn EmailForwarder>,
    /// Publishes user data to the queue.
    pub publisher: Arc<dyn QueuePublisher>,
    /// Time source for response timestamps.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Creates application state using the system clock.
    pub fn new(forwarder: Arc<dyn EmailForwarder>, publisher: Arc<dyn QueuePublisher>) -> Self {
        Self { forwarder, publisher, clock: Arc::new(RealClock::new()) }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
