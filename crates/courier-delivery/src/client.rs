//! Shared HTTP client construction.
//!
//! Both collaborators talk HTTP. Each builds one pooled `reqwest::Client` at
//! startup from this configuration and reuses it for every call.

use std::time::Duration;

use crate::error::{DeliveryError, Result};

/// Configuration for outbound HTTP clients.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Overall request timeout. `None` keeps the transport default.
    pub timeout: Option<Duration>,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { timeout: None, user_agent: format!("Courier/{}", env!("CARGO_PKG_VERSION")) }
    }
}

impl ClientConfig {
    /// Builds a `reqwest::Client` from this configuration.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::ConfigurationError` if the TLS backend or
    /// client settings cannot be initialized.
    pub fn build_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().user_agent(&self.user_agent);

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        builder
            .build()
            .map_err(|e| DeliveryError::configuration(format!("failed to build HTTP client: {e}")))
    }
}
