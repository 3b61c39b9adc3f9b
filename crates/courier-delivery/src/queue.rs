//! Queue publishing to Azure Service Bus.
//!
//! Messages are sent through the Service Bus REST API with a shared access
//! signature minted per send. The publisher is fail-loud: errors are logged
//! and then returned for the caller to map.

use std::{fmt, sync::Arc, time::Duration};

use base64::prelude::*;
use courier_core::{Clock, RealClock, UserDataSubmission};
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::{
    client::ClientConfig,
    error::{DeliveryError, Result},
};

type HmacSha256 = Hmac<Sha256>;

/// Content type stamped on every message.
pub const MESSAGE_CONTENT_TYPE: &str = "application/json";

/// Subject label stamped on every message.
pub const MESSAGE_SUBJECT: &str = "UserData";

/// Header carrying Service Bus message properties.
pub const BROKER_PROPERTIES_HEADER: &str = "BrokerProperties";

/// Lifetime of a minted shared access signature.
const TOKEN_TTL: Duration = Duration::from_secs(3600);

/// Publishes one message per submission.
#[async_trait::async_trait]
pub trait QueuePublisher: Send + Sync + std::fmt::Debug {
    /// Serializes `submission` and sends it as a single queue message.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be serialized or the broker
    /// does not accept it.
    async fn publish(&self, submission: &UserDataSubmission) -> Result<()>;
}

/// Parsed Service Bus connection string.
///
/// Accepts the portal format
/// `Endpoint=sb://<ns>.servicebus.windows.net/;SharedAccessKeyName=<name>;SharedAccessKey=<key>`.
/// Keys are case-insensitive and unknown keys are ignored.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    endpoint: String,
    key_name: String,
    key: String,
}

impl ConnectionString {
    /// Parses a connection string.
    ///
    /// An `sb://` endpoint maps to `https://`; `http://` and `https://`
    /// endpoints are kept as given.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::ConfigurationError` if the endpoint, key name
    /// or key is missing, or the endpoint scheme is unsupported.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut endpoint = None;
        let mut key_name = None;
        let mut key = None;

        for part in raw.split(';').map(str::trim).filter(|part| !part.is_empty()) {
            let Some((name, value)) = part.split_once('=') else {
                return Err(DeliveryError::configuration(
                    "malformed connection string segment without '='",
                ));
            };

            match name.trim().to_ascii_lowercase().as_str() {
                "endpoint" => endpoint = Some(value.trim().to_string()),
                "sharedaccesskeyname" => key_name = Some(value.trim().to_string()),
                "sharedaccesskey" => key = Some(value.trim().to_string()),
                _ => {},
            }
        }

        let endpoint = endpoint
            .filter(|v| !v.is_empty())
            .ok_or_else(|| DeliveryError::configuration("connection string is missing Endpoint"))?;
        let key_name = key_name.filter(|v| !v.is_empty()).ok_or_else(|| {
            DeliveryError::configuration("connection string is missing SharedAccessKeyName")
        })?;
        let key = key.filter(|v| !v.is_empty()).ok_or_else(|| {
            DeliveryError::configuration("connection string is missing SharedAccessKey")
        })?;

        Ok(Self { endpoint: http_endpoint(&endpoint)?, key_name, key })
    }

    /// Returns the namespace endpoint as an HTTP(S) URL without trailing `/`.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the shared access key name.
    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    /// Builds a shared access signature for `resource_uri` valid until
    /// `expires_at` (seconds since the Unix epoch).
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::ConfigurationError` if the key cannot seed
    /// the HMAC.
    pub fn sas_token(&self, resource_uri: &str, expires_at: i64) -> Result<String> {
        let encoded_uri = urlencoding::encode(resource_uri);
        let string_to_sign = format!("{encoded_uri}\n{expires_at}");

        let mut mac = HmacSha256::new_from_slice(self.key.as_bytes())
            .map_err(|_| DeliveryError::configuration("invalid shared access key"))?;
        mac.update(string_to_sign.as_bytes());
        let signature = BASE64_STANDARD.encode(mac.finalize().into_bytes());

        Ok(format!(
            "SharedAccessSignature sr={encoded_uri}&sig={}&se={expires_at}&skn={}",
            urlencoding::encode(&signature),
            urlencoding::encode(&self.key_name),
        ))
    }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("endpoint", &self.endpoint)
            .field("key_name", &self.key_name)
            .field("key", &"***")
            .finish()
    }
}

fn http_endpoint(endpoint: &str) -> Result<String> {
    let endpoint = endpoint.trim_end_matches('/');

    if let Some(host) = endpoint.strip_prefix("sb://") {
        Ok(format!("https://{host}"))
    } else if endpoint.starts_with("https://") || endpoint.starts_with("http://") {
        Ok(endpoint.to_string())
    } else {
        Err(DeliveryError::configuration(format!(
            "unsupported Service Bus endpoint scheme: {endpoint}"
        )))
    }
}

/// Body of a queue message.
///
/// The queue consumer reads PascalCase keys (`{"Name":..,"Age":..}`), so the
/// message has its own field names, independent of the client-facing
/// submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserDataMessage {
    /// Display name.
    pub name: String,
    /// Age in years.
    pub age: i32,
}

impl From<&UserDataSubmission> for UserDataMessage {
    fn from(submission: &UserDataSubmission) -> Self {
        Self { name: submission.name.clone(), age: submission.age }
    }
}

impl From<UserDataMessage> for UserDataSubmission {
    fn from(message: UserDataMessage) -> Self {
        Self::new(message.name, message.age)
    }
}

/// Serializes `submission` into the queue message body.
///
/// # Errors
///
/// Returns `DeliveryError::SerializationError` if serialization fails.
pub fn encode_message(submission: &UserDataSubmission) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&UserDataMessage::from(submission))?)
}

/// Parses a queue message body back into a submission.
///
/// # Errors
///
/// Returns `DeliveryError::SerializationError` if the body is not a valid
/// message.
pub fn decode_message(body: &[u8]) -> Result<UserDataSubmission> {
    let message: UserDataMessage = serde_json::from_slice(body)?;
    Ok(message.into())
}

/// Properties sent in the `BrokerProperties` header.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct BrokerProperties {
    label: &'static str,
    message_id: String,
}

/// Publisher sending to a single Service Bus queue over HTTPS.
///
/// Construct once at startup. The client and parsed credentials are shared
/// by every concurrent `publish` call.
#[derive(Debug, Clone)]
pub struct ServiceBusPublisher {
    client: reqwest::Client,
    connection: ConnectionString,
    queue_name: String,
    clock: Arc<dyn Clock>,
}

impl ServiceBusPublisher {
    /// Creates a publisher for `queue_name`.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::ConfigurationError` if the connection string
    /// is missing, blank or malformed, or the HTTP client cannot be built.
    /// A publisher is never constructed half-configured.
    pub fn new(
        connection_string: Option<&str>,
        queue_name: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        let raw = connection_string.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| {
            DeliveryError::configuration("Azure Service Bus connection string is not configured")
        })?;

        let queue_name = queue_name.into();
        if queue_name.trim().is_empty() {
            return Err(DeliveryError::configuration("Service Bus queue name is empty"));
        }

        let connection = ConnectionString::parse(raw)?;
        let client = config.build_client()?;

        tracing::info!(
            endpoint = %connection.endpoint(),
            queue = %queue_name,
            "Service Bus publisher configured"
        );

        Ok(Self { client, connection, queue_name, clock: Arc::new(RealClock::new()) })
    }

    /// Replaces the clock used for token expiry.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the target queue name.
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Returns the REST URL messages are posted to.
    pub fn messages_url(&self) -> String {
        format!("{}/{}/messages", self.connection.endpoint(), self.queue_name)
    }

    fn resource_uri(&self) -> String {
        format!("{}/{}", self.connection.endpoint(), self.queue_name).to_lowercase()
    }

    async fn send(&self, submission: &UserDataSubmission) -> Result<()> {
        let body = encode_message(submission)?;

        let expires_at = self.clock.now_utc().timestamp() + TOKEN_TTL.as_secs() as i64;
        let token = self.connection.sas_token(&self.resource_uri(), expires_at)?;

        let properties = serde_json::to_string(&BrokerProperties {
            label: MESSAGE_SUBJECT,
            message_id: Uuid::new_v4().to_string(),
        })?;

        let response = self
            .client
            .post(self.messages_url())
            .header(AUTHORIZATION, token)
            .header(CONTENT_TYPE, MESSAGE_CONTENT_TYPE)
            .header(BROKER_PROPERTIES_HEADER, properties)
            .body(body)
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
impl QueuePublisher for ServiceBusPublisher {
    async fn publish(&self, submission: &UserDataSubmission) -> Result<()> {
        let span = info_span!("queue_publish", queue = %self.queue_name);

        async move {
            match self.send(submission).await {
                Ok(()) => {
                    tracing::info!("Message sent to Service Bus queue");
                    Ok(())
                },
                Err(e) => {
                    tracing::error!(error = %e, "Error sending message to Service Bus");
                    Err(e)
                },
            }
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONNECTION: &str = "Endpoint=sb://courier-test.servicebus.windows.net/;\
                              SharedAccessKeyName=RootManageSharedAccessKey;\
                              SharedAccessKey=c2VjcmV0LWtleQ==";

    #[test]
    fn parses_portal_connection_string() {
        let connection = ConnectionString::parse(CONNECTION).unwrap();

        assert_eq!(connection.endpoint(), "https://courier-test.servicebus.windows.net");
        assert_eq!(connection.key_name(), "RootManageSharedAccessKey");
    }

    #[test]
    fn key_value_may_contain_equals_signs() {
        let connection = ConnectionString::parse(CONNECTION).unwrap();

        assert_eq!(connection.key, "c2VjcmV0LWtleQ==");
    }

    #[test]
    fn keys_are_case_insensitive() {
        let connection = ConnectionString::parse(
            "endpoint=http://localhost:5672;sharedaccesskeyname=k;sharedaccesskey=s",
        )
        .unwrap();

        assert_eq!(connection.endpoint(), "http://localhost:5672");
    }

    #[test]
    fn missing_parts_rejected() {
        assert!(ConnectionString::parse("Endpoint=sb://ns.servicebus.windows.net/").is_err());
        assert!(ConnectionString::parse("SharedAccessKeyName=k;SharedAccessKey=s").is_err());
        assert!(ConnectionString::parse("garbage").is_err());
    }

    #[test]
    fn unsupported_scheme_rejected() {
        let result =
            ConnectionString::parse("Endpoint=amqp://ns/;SharedAccessKeyName=k;SharedAccessKey=s");

        assert!(result.is_err());
    }

    #[test]
    fn debug_output_redacts_key() {
        let connection = ConnectionString::parse(CONNECTION).unwrap();
        let debug = format!("{connection:?}");

        assert!(!debug.contains("c2VjcmV0LWtleQ=="));
        assert!(debug.contains("***"));
    }

    #[test]
    fn sas_token_signs_encoded_uri_and_expiry() {
        let connection = ConnectionString::parse(CONNECTION).unwrap();
        let uri = "https://courier-test.servicebus.windows.net/userdata-queue";

        let token = connection.sas_token(uri, 1_700_000_000).unwrap();

        let mut mac = HmacSha256::new_from_slice(b"c2VjcmV0LWtleQ==").unwrap();
        mac.update(format!("{}\n1700000000", urlencoding::encode(uri)).as_bytes());
        let expected_sig = BASE64_STANDARD.encode(mac.finalize().into_bytes());

        assert_eq!(
            token,
            format!(
                "SharedAccessSignature sr={}&sig={}&se=1700000000&skn=RootManageSharedAccessKey",
                urlencoding::encode(uri),
                urlencoding::encode(&expected_sig),
            )
        );
    }

    #[test]
    fn sas_token_changes_with_expiry() {
        let connection = ConnectionString::parse(CONNECTION).unwrap();
        let uri = "https://courier-test.servicebus.windows.net/userdata-queue";

        assert_ne!(
            connection.sas_token(uri, 1_700_000_000).unwrap(),
            connection.sas_token(uri, 1_700_003_600).unwrap()
        );
    }

    #[test]
    fn message_body_uses_pascal_case_keys() {
        let body = encode_message(&UserDataSubmission::new("Al", 30)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(value, serde_json::json!({"Name": "Al", "Age": 30}));
    }

    #[test]
    fn message_body_decodes_to_submission() {
        let submission = decode_message(br#"{"Name":"Al","Age":30}"#).unwrap();

        assert_eq!(submission, UserDataSubmission::new("Al", 30));
    }

    #[test]
    fn lowercase_body_is_not_a_message() {
        assert!(decode_message(br#"{"name":"Al","age":30}"#).is_err());
    }

    #[test]
    fn missing_connection_string_fails_construction() {
        let result = ServiceBusPublisher::new(None, "userdata-queue", ClientConfig::default());

        assert!(matches!(result, Err(DeliveryError::ConfigurationError { .. })));
    }

    #[test]
    fn blank_connection_string_fails_construction() {
        let result = ServiceBusPublisher::new(Some("  "), "userdata-queue", ClientConfig::default());

        assert!(result.is_err());
    }

    #[test]
    fn messages_url_targets_queue() {
        let publisher =
            ServiceBusPublisher::new(Some(CONNECTION), "userdata-queue", ClientConfig::default())
                .unwrap();

        assert_eq!(
            publisher.messages_url(),
            "https://courier-test.servicebus.windows.net/userdata-queue/messages"
        );
    }
}
