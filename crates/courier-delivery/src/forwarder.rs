//! Email forwarding to the external email-export service.
//!
//! The forwarder is fail-soft: every outcome, including misconfiguration and
//! transport faults, is logged and folded into a boolean. Callers never see
//! the underlying error.

use serde::Serialize;
use tracing::{info_span, Instrument};

use crate::{
    client::ClientConfig,
    error::{DeliveryError, Result},
};

/// Path on the email service that accepts send requests.
pub const SEND_PATH: &str = "/api/email/send";

/// Issues one outbound email trigger per call.
#[async_trait::async_trait]
pub trait EmailForwarder: Send + Sync + std::fmt::Debug {
    /// Triggers email sending for `receiver_email`.
    ///
    /// Returns `true` only if the downstream service acknowledged the request
    /// with a 2xx status. Never retries.
    async fn trigger(&self, receiver_email: &str) -> bool;
}

/// JSON body expected by the email service.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailPayload<'a> {
    receiver_email: &'a str,
}

/// Forwarder backed by a pooled HTTP client.
///
/// The base URL is fixed at construction. When none was resolved the
/// forwarder stays unconfigured and every call fails without network I/O.
#[derive(Debug, Clone)]
pub struct HttpEmailForwarder {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl HttpEmailForwarder {
    /// Creates a forwarder for the given base URL.
    ///
    /// A base URL without an `http://` or `https://` prefix gets `https://`
    /// prepended. Empty or missing values leave the forwarder unconfigured.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::ConfigurationError` if the HTTP client cannot
    /// be built.
    pub fn new(base_url: Option<&str>, config: ClientConfig) -> Result<Self> {
        let client = config.build_client()?;

        let base_url = base_url.map(str::trim).filter(|url| !url.is_empty()).map(|raw| {
            let normalized = normalize_base_url(raw);
            if normalized != raw {
                tracing::info!(url = %normalized, "Added https:// prefix to email service URL");
            }
            normalized
        });

        match &base_url {
            Some(url) => tracing::info!(url = %url, "Email export service configured"),
            None => tracing::warn!("Email export service URL is not configured"),
        }

        Ok(Self { client, base_url })
    }

    /// Returns the normalized base URL, if configured.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Returns the full send endpoint, if configured.
    pub fn endpoint(&self) -> Option<String> {
        self.base_url.as_deref().map(compose_endpoint)
    }

    async fn send(&self, receiver_email: &str) -> Result<()> {
        let endpoint = self.endpoint().ok_or_else(|| {
            DeliveryError::not_configured("email export service")
        })?;

        tracing::info!(endpoint = %endpoint, "Calling email export service");

        let response = self
            .client
            .post(&endpoint)
            .json(&SendEmailPayload { receiver_email })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::unexpected_status(status.as_u16()))
        }
    }
}

#[async_trait::async_trait]
impl EmailForwarder for HttpEmailForwarder {
    async fn trigger(&self, receiver_email: &str) -> bool {
        let span = info_span!(
            "email_forward",
            receiver = %receiver_email,
            endpoint = self.endpoint().as_deref().unwrap_or("unconfigured"),
        );

        async move {
            match self.send(receiver_email).await {
                Ok(()) => {
                    tracing::info!("Successfully triggered email sending");
                    true
                },
                Err(DeliveryError::UnexpectedStatus { status_code }) => {
                    tracing::warn!(status = status_code, "Email export service rejected request");
                    false
                },
                Err(e) => {
                    tracing::error!(error = %e, "Error calling email export service");
                    false
                },
            }
        }
        .instrument(span)
        .await
    }
}

/// Ensures the base URL carries a scheme, defaulting to `https://`.
pub fn normalize_base_url(raw: &str) -> String {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    }
}

fn compose_endpoint(base_url: &str) -> String {
    format!("{}{SEND_PATH}", base_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_less_url_gets_https_prefix() {
        assert_eq!(normalize_base_url("mail.internal:8443"), "https://mail.internal:8443");
    }

    #[test]
    fn existing_scheme_preserved() {
        assert_eq!(normalize_base_url("http://localhost:9000"), "http://localhost:9000");
        assert_eq!(normalize_base_url("https://mail.example.com"), "https://mail.example.com");
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        assert_eq!(compose_endpoint("https://mail.example.com/"), "https://mail.example.com/api/email/send");
        assert_eq!(compose_endpoint("https://mail.example.com"), "https://mail.example.com/api/email/send");
    }

    #[test]
    fn blank_base_url_leaves_forwarder_unconfigured() {
        let forwarder = HttpEmailForwarder::new(Some("   "), ClientConfig::default()).unwrap();

        assert!(forwarder.base_url().is_none());
        assert!(forwarder.endpoint().is_none());
    }

    #[test]
    fn stored_base_url_is_normalized() {
        let forwarder =
            HttpEmailForwarder::new(Some("mail.internal"), ClientConfig::default()).unwrap();

        assert_eq!(forwarder.base_url(), Some("https://mail.internal"));
    }
}
