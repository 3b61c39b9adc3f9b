//! Configuration management for the Courier gateway.

use std::{fmt, net::SocketAddr, str::FromStr};

use anyhow::{Context, Result};
use courier_delivery::{ClientConfig, DEFAULT_QUEUE_NAME};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::info;

const CONFIG_FILE: &str = "config.toml";

/// A place a configuration value can be read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Process environment variable.
    Env(&'static str),
    /// Dotted key in the configuration file.
    File(&'static str),
}

impl Source {
    fn lookup(self, env: &dyn Fn(&str) -> Option<String>, figment: &Figment) -> Option<String> {
        match self {
            Self::Env(name) => env(name),
            Self::File(path) => figment.find_value(path).ok().and_then(|value| value.into_string()),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Env(name) => write!(f, "env:{name}"),
            Self::File(path) => write!(f, "{CONFIG_FILE}:{path}"),
        }
    }
}

/// Email-export service base URL, highest priority first.
pub const EMAIL_SERVICE_URL_SOURCES: &[Source] = &[
    Source::Env("EMAIL_EXPORT_SERVICE_URL"),
    Source::Env("JAVA_EMAIL_SERVICE_URL"),
    Source::File("email_export_service.base_url"),
];

/// Service Bus connection string, highest priority first.
pub const SERVICE_BUS_CONNECTION_SOURCES: &[Source] = &[
    Source::Env("AZURE_SERVICEBUS_CONNECTIONSTRING"),
    Source::File("service_bus.connection_string"),
];

/// Service Bus queue name, highest priority first.
pub const SERVICE_BUS_QUEUE_SOURCES: &[Source] = &[
    Source::Env("AZURE_SERVICEBUS_QUEUENAME"),
    Source::File("service_bus.queue_name"),
];

/// Returns the first non-blank value among `sources`, with the source it
/// came from.
pub fn first_non_empty(
    sources: &[Source],
    env: &dyn Fn(&str) -> Option<String>,
    figment: &Figment,
) -> Option<(Source, String)> {
    sources.iter().find_map(|&source| {
        source
            .lookup(env, figment)
            .filter(|value| !value.trim().is_empty())
            .map(|value| (source, value))
    })
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Downstream targets resolved through the source chains.
///
/// Values are raw: normalization of the email URL and parsing of the
/// connection string belong to the collaborators built from them.
#[derive(Clone, PartialEq, Eq)]
pub struct DownstreamConfig {
    /// Email-export service base URL, if any source provided one.
    pub email_service_url: Option<String>,
    /// Service Bus connection string, if any source provided one.
    pub service_bus_connection_string: Option<String>,
    /// Target queue name.
    pub service_bus_queue_name: String,
    /// Winning source for each resolved setting, in resolution order.
    /// Settings left at their default have no entry.
    pub provenance: Vec<(&'static str, Source)>,
}

impl DownstreamConfig {
    /// Returns the source `setting` was resolved from, if any.
    pub fn source_of(&self, setting: &str) -> Option<Source> {
        self.provenance.iter().find(|(name, _)| *name == setting).map(|&(_, source)| source)
    }
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            email_service_url: None,
            service_bus_connection_string: None,
            service_bus_queue_name: DEFAULT_QUEUE_NAME.to_string(),
            provenance: Vec::new(),
        }
    }
}

impl fmt::Debug for DownstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownstreamConfig")
            .field("email_service_url", &self.email_service_url)
            .field(
                "service_bus_connection_string",
                &self.service_bus_connection_string.as_ref().map(|_| "***"),
            )
            .field("service_bus_queue_name", &self.service_bus_queue_name)
            .field("provenance", &self.provenance)
            .finish()
    }
}

/// Complete service configuration.
///
/// Server settings are loaded in priority order:
/// 1. Environment variables (highest priority)
/// 2. Configuration file (`config.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// Downstream targets are resolved separately through ordered [`Source`]
/// chains where the first non-empty value wins.
///
/// # Example
///
/// ```no_run
/// use courier_api::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
///
/// println!("Server will bind to {}:{}", config.host, config.port);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address.
    ///
    /// Environment variable: `HOST`
    #[serde(default = "default_host", alias = "HOST")]
    pub host: String,
    /// Server bind port.
    ///
    /// Environment variable: `PORT`
    #[serde(default = "default_port", alias = "PORT")]
    pub port: u16,
    /// Log filter directives.
    ///
    /// Environment variable: `RUST_LOG`
    #[serde(default = "default_log_level", alias = "RUST_LOG")]
    pub rust_log: String,
    /// Log output format.
    ///
    /// Environment variable: `LOG_FORMAT`
    #[serde(default, alias = "LOG_FORMAT")]
    pub log_format: LogFormat,
    /// Resolved downstream targets.
    #[serde(skip)]
    pub downstream: DownstreamConfig,
}

impl Config {
    /// Loads configuration from defaults, `config.toml` and the process
    /// environment.
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(""));

        Self::from_figment(&figment, &|name: &str| std::env::var(name).ok())
    }

    /// Builds configuration from an assembled figment and an environment
    /// lookup.
    pub fn from_figment(figment: &Figment, env: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config: Self = figment.extract().context("Failed to load configuration")?;

        let mut provenance = Vec::new();
        let mut resolve = |setting: &'static str, sources: &[Source]| {
            first_non_empty(sources, env, figment).map(|(source, value)| {
                provenance.push((setting, source));
                value
            })
        };

        let email_service_url = resolve("email_service_url", EMAIL_SERVICE_URL_SOURCES);
        let service_bus_connection_string =
            resolve("service_bus_connection_string", SERVICE_BUS_CONNECTION_SOURCES);
        let service_bus_queue_name = resolve("service_bus_queue_name", SERVICE_BUS_QUEUE_SOURCES)
            .unwrap_or_else(|| DEFAULT_QUEUE_NAME.to_string());

        config.downstream = DownstreamConfig {
            email_service_url,
            service_bus_connection_string,
            service_bus_queue_name,
            provenance,
        };

        config.validate()?;
        Ok(config)
    }

    /// Logs where each downstream setting came from.
    ///
    /// Only sources are logged, never values, so secrets stay out of the
    /// output.
    pub fn log_provenance(&self) {
        for (setting, source) in &self.downstream.provenance {
            info!(setting, source = %source, "Resolved downstream setting");
        }
    }

    /// Builds the outbound HTTP client configuration.
    ///
    /// No timeout is set: downstream calls run on the transport default.
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig::default()
    }

    /// Parse server socket address from host and port configuration.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.downstream.service_bus_queue_name.trim().is_empty() {
            anyhow::bail!("service bus queue name must not be empty");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            rust_log: default_log_level(),
            log_format: LogFormat::default(),
            downstream: DownstreamConfig::default(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}
