//! Call-recording doubles for the delivery collaborators.
//!
//! Lets handler logic be exercised without a network. Each double records
//! what it was asked to do and answers with a configurable outcome.

use std::{sync::Arc, time::Duration};

use courier_core::UserDataSubmission;
use courier_delivery::{
    decode_message, encode_message,
    queue::{MESSAGE_CONTENT_TYPE, MESSAGE_SUBJECT},
    DeliveryError, EmailForwarder, QueuePublisher, Result,
};
use tokio::sync::RwLock;

/// Outcome returned by [`MockEmailForwarder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// Report the email as sent.
    Delivered,
    /// Report the email as sent after waiting this long.
    DeliveredAfter(Duration),
    /// Report a failed forward.
    Rejected,
    /// Panic inside the call.
    Panic,
}

/// Email forwarder double that records every receiver it was called with.
#[derive(Debug, Clone)]
pub struct MockEmailForwarder {
    outcome: Arc<RwLock<ForwardOutcome>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockEmailForwarder {
    /// Creates a forwarder answering with `outcome`.
    pub fn new(outcome: ForwardOutcome) -> Self {
        Self { outcome: Arc::new(RwLock::new(outcome)), calls: Arc::new(RwLock::new(Vec::new())) }
    }

    /// Forwarder that reports every email as sent.
    pub fn delivering() -> Self {
        Self::new(ForwardOutcome::Delivered)
    }

    /// Forwarder that reports every email as sent once `delay` has passed.
    pub fn delivering_after(delay: Duration) -> Self {
        Self::new(ForwardOutcome::DeliveredAfter(delay))
    }

    /// Forwarder that reports every email as failed.
    pub fn rejecting() -> Self {
        Self::new(ForwardOutcome::Rejected)
    }

    /// Forwarder that panics on every call.
    pub fn panicking() -> Self {
        Self::new(ForwardOutcome::Panic)
    }

    /// Changes the outcome of subsequent calls.
    pub async fn set_outcome(&self, outcome: ForwardOutcome) {
        *self.outcome.write().await = outcome;
    }

    /// Returns the receivers passed to `trigger`, in call order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }

    /// Returns how many times `trigger` was called.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }
}

#[async_trait::async_trait]
impl EmailForwarder for MockEmailForwarder {
    async fn trigger(&self, receiver_email: &str) -> bool {
        self.calls.write().await.push(receiver_email.to_string());

        let outcome = *self.outcome.read().await;
        match outcome {
            ForwardOutcome::Delivered => true,
            ForwardOutcome::DeliveredAfter(delay) => {
                tokio::time::sleep(delay).await;
                true
            },
            ForwardOutcome::Rejected => false,
            ForwardOutcome::Panic => panic!("mock forwarder panicked for {receiver_email}"),
        }
    }
}

/// Outcome returned by [`MockQueuePublisher`].
#[derive(Debug, Clone)]
pub enum PublishOutcome {
    /// Accept the message.
    Accepted,
    /// Return the given error.
    Failed(DeliveryError),
    /// Panic inside the call.
    Panic,
}

/// A message captured by [`MockQueuePublisher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    /// Serialized message body, as it would go on the wire.
    pub body: Vec<u8>,
    /// Content type the message would carry.
    pub content_type: &'static str,
    /// Subject label the message would carry.
    pub subject: &'static str,
}

impl PublishedMessage {
    /// Decodes the body back into a submission.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::SerializationError` if the body is not a
    /// valid queue message.
    pub fn decode(&self) -> Result<UserDataSubmission> {
        decode_message(&self.body)
    }
}

/// Queue publisher double that records every message it was asked to send.
///
/// Messages are serialized exactly like the real publisher does, so tests can
/// assert on the wire payload.
#[derive(Debug, Clone)]
pub struct MockQueuePublisher {
    outcome: Arc<RwLock<PublishOutcome>>,
    published: Arc<RwLock<Vec<PublishedMessage>>>,
}

impl MockQueuePublisher {
    /// Creates a publisher answering with `outcome`.
    pub fn new(outcome: PublishOutcome) -> Self {
        Self {
            outcome: Arc::new(RwLock::new(outcome)),
            published: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Publisher that accepts every message.
    pub fn accepting() -> Self {
        Self::new(PublishOutcome::Accepted)
    }

    /// Publisher that fails every send with `error`.
    pub fn failing(error: DeliveryError) -> Self {
        Self::new(PublishOutcome::Failed(error))
    }

    /// Publisher that panics on every send.
    pub fn panicking() -> Self {
        Self::new(PublishOutcome::Panic)
    }

    /// Changes the outcome of subsequent sends.
    pub async fn set_outcome(&self, outcome: PublishOutcome) {
        *self.outcome.write().await = outcome;
    }

    /// Returns all attempted messages, in call order.
    ///
    /// Failed sends are recorded too: the attempt happened even if the
    /// broker refused it.
    pub async fn published(&self) -> Vec<PublishedMessage> {
        self.published.read().await.clone()
    }

    /// Returns how many times `publish` was called.
    pub async fn publish_count(&self) -> usize {
        self.published.read().await.len()
    }
}

#[async_trait::async_trait]
impl QueuePublisher for MockQueuePublisher {
    async fn publish(&self, submission: &UserDataSubmission) -> Result<()> {
        let body = encode_message(submission)?;
        self.published.write().await.push(PublishedMessage {
            body,
            content_type: MESSAGE_CONTENT_TYPE,
            subject: MESSAGE_SUBJECT,
        });

        let outcome = self.outcome.read().await.clone();
        match outcome {
            PublishOutcome::Accepted => Ok(()),
            PublishOutcome::Failed(error) => Err(error),
            PublishOutcome::Panic => panic!("mock publisher panicked"),
        }
    }
}
