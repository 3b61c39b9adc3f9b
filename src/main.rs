//! Courier HTTP gateway.
//!
//! Main entry point. Loads configuration, builds the downstream
//! collaborators once and serves requests until a shutdown signal arrives.

use std::sync::Arc;

use anyhow::{Context, Result};
use courier_api::{start_server, AppState, Config, LogFormat};
use courier_delivery::{HttpEmailForwarder, ServiceBusPublisher};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    init_tracing(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        log_format = ?config.log_format,
        "Starting Courier gateway"
    );
    config.log_provenance();

    let client_config = config.to_client_config();

    let forwarder = HttpEmailForwarder::new(
        config.downstream.email_service_url.as_deref(),
        client_config.clone(),
    )
    .context("Failed to build email forwarder")?;

    let publisher = ServiceBusPublisher::new(
        config.downstream.service_bus_connection_string.as_deref(),
        config.downstream.service_bus_queue_name.as_str(),
        client_config,
    )
    .context("Failed to build Service Bus publisher")?;

    info!(
        email_endpoint = forwarder.endpoint().as_deref().unwrap_or("unconfigured"),
        queue = publisher.queue_name(),
        "Downstream collaborators ready"
    );

    let state = AppState::new(Arc::new(forwarder), Arc::new(publisher));
    let addr = config.parse_server_addr()?;

    start_server(state, addr).await.context("Server failed")?;

    info!("Courier shutdown complete");
    Ok(())
}

/// Initializes tracing from the configured filter and output format.
fn init_tracing(config: &Config) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_new(&config.rust_log).unwrap_or_else(|_| EnvFilter::new("info"));

    let json_layer = (config.log_format == LogFormat::Json)
        .then(|| fmt::layer().json().with_current_span(true).with_span_list(false));

    let pretty_layer = (config.log_format == LogFormat::Pretty)
        .then(|| fmt::layer().with_target(true).with_thread_ids(true).with_line_number(true));

    tracing_subscriber::registry().with(filter).with(json_layer).with(pretty_layer).init();
}
