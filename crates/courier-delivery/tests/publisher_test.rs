//! Integration tests for the Service Bus publisher.
//!
//! Runs the publisher against a wiremock stand-in for the Service Bus REST
//! endpoint and checks the message shape, credentials and error propagation.

use std::{
    sync::Arc,
    time::{Duration, UNIX_EPOCH},
};

use courier_core::{TestClock, UserDataSubmission};
use courier_delivery::{ClientConfig, DeliveryError, QueuePublisher, ServiceBusPublisher};
use serde_json::{json, Value};
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

fn connection_string(server: &MockServer) -> String {
    format!(
        "Endpoint={}/;SharedAccessKeyName=courier-send;SharedAccessKey=dGVzdC1rZXk=",
        server.uri()
    )
}

/// Returns a local address nothing listens on.
fn closed_address() -> std::net::SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

fn publisher_for(server: &MockServer) -> ServiceBusPublisher {
    ServiceBusPublisher::new(
        Some(&connection_string(server)),
        "userdata-queue",
        ClientConfig::default(),
    )
    .expect("publisher should build")
}

#[tokio::test]
async fn publishes_pascal_case_message_with_label() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .and(matchers::path("/userdata-queue/messages"))
        .and(matchers::header("content-type", "application/json"))
        .and(matchers::header_exists("authorization"))
        .and(matchers::body_json(json!({"Name": "Al", "Age": 30})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    publisher_for(&server)
        .publish(&UserDataSubmission::new("Al", 30))
        .await
        .expect("publish should succeed");

    let requests = server.received_requests().await.expect("recording enabled");
    let properties: Value = serde_json::from_str(
        requests[0].headers.get("brokerproperties").unwrap().to_str().unwrap(),
    )
    .unwrap();

    assert_eq!(properties["Label"], "UserData");
    assert!(properties["MessageId"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn authorization_is_a_shared_access_signature() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("POST")).respond_with(ResponseTemplate::new(201)).mount(&server).await;

    let clock = TestClock::with_start_time(UNIX_EPOCH + Duration::from_secs(1_700_000_000));
    let publisher = publisher_for(&server).with_clock(Arc::new(clock));

    publisher.publish(&UserDataSubmission::new("Al", 30)).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let token = requests[0].headers.get("authorization").unwrap().to_str().unwrap();

    assert!(token.starts_with("SharedAccessSignature sr="));
    assert!(token.contains("&se=1700003600&"));
    assert!(token.ends_with("&skn=courier-send"));
}

#[tokio::test]
async fn rejected_message_returns_error() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("InvalidSignature"))
        .expect(1)
        .mount(&server)
        .await;

    let result = publisher_for(&server).publish(&UserDataSubmission::new("Al", 30)).await;

    assert!(matches!(result, Err(DeliveryError::UnexpectedStatus { status_code: 401 })));
}

#[tokio::test]
async fn unreachable_broker_returns_network_error() {
    let connection = format!(
        "Endpoint=http://{};SharedAccessKeyName=courier-send;SharedAccessKey=dGVzdC1rZXk=",
        closed_address()
    );

    let publisher =
        ServiceBusPublisher::new(Some(&connection), "userdata-queue", ClientConfig::default())
            .unwrap();

    let result = publisher.publish(&UserDataSubmission::new("Al", 30)).await;

    assert!(matches!(result, Err(DeliveryError::NetworkError { .. })));
}

#[tokio::test]
async fn concurrent_publishes_share_one_publisher() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(8)
        .mount(&server)
        .await;

    let publisher = Arc::new(publisher_for(&server));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let publisher = Arc::clone(&publisher);
            tokio::spawn(async move {
                publisher.publish(&UserDataSubmission::new(format!("User {i}"), 20 + i)).await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
}

#[test]
fn missing_connection_string_is_fatal_at_construction() {
    let result = ServiceBusPublisher::new(None, "userdata-queue", ClientConfig::default());

    match result {
        Err(DeliveryError::ConfigurationError { message }) => {
            assert_eq!(message, "Azure Service Bus connection string is not configured");
        },
        other => panic!("expected configuration error, got {other:?}"),
    }
}
