//! Test infrastructure for Courier.
//!
//! Recording doubles for the delivery collaborators, shared by the handler
//! and router test suites.

#![warn(missing_docs)]

pub mod delivery;

pub use delivery::{
    ForwardOutcome, MockEmailForwarder, MockQueuePublisher, PublishOutcome, PublishedMessage,
};
