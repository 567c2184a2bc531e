use std::path::PathBuf;

use clap::Parser;

use crate::config::{ConfigError, HelmConfig, parse_delays};

#[derive(Parser, Debug, Default)]
#[command(
    name = "beach-helm",
    about = "Drive a host UI from a remote controller over a websocket",
    version
)]
pub struct Cli {
    #[arg(
        long,
        env = "BEACH_HELM_ENDPOINT",
        value_name = "URL",
        help = "Controller websocket endpoint (ws:// or wss://)"
    )]
    pub endpoint: Option<String>,

    #[arg(
        long,
        env = "BEACH_HELM_DOCUMENT",
        value_name = "PATH",
        help = "JSON fixture describing the host document"
    )]
    pub document: Option<PathBuf>,

    #[arg(
        long = "reconnect-delays",
        env = "BEACH_HELM_RECONNECT_DELAYS_MS",
        value_name = "MS,MS,...",
        help = "Comma-separated reconnect delays in milliseconds"
    )]
    pub reconnect_delays: Option<String>,

    #[arg(
        long = "log-filter",
        env = "RUST_LOG",
        value_name = "FILTER",
        help = "tracing EnvFilter directive"
    )]
    pub log_filter: Option<String>,
}

impl Cli {
    /// Layers explicit flags over `config`.
    pub fn apply(self, mut config: HelmConfig) -> Result<HelmConfig, ConfigError> {
        if let Some(endpoint) = self.endpoint {
            config.endpoint = endpoint;
        }
        if let Some(document) = self.document {
            config.document_path = Some(document);
        }
        if let Some(raw) = self.reconnect_delays {
            config.reconnect_delays_ms = parse_delays(&raw)?;
        }
        if let Some(filter) = self.log_filter {
            config.log_filter = filter;
        }
        Ok(config)
    }
}
