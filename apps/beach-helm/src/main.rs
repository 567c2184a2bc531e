use std::sync::Arc;

use anyhow::Context;
use beach_helm::cli::Cli;
use beach_helm::config::HelmConfig;
use beach_helm::connection::{ConnectionManager, WebSocketConnector};
use beach_helm::dispatch::Dispatcher;
use beach_helm::host::Document;
use beach_helm::telemetry::init_tracing;
use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let cfg = cli.apply(HelmConfig::from_env()?)?;
    cfg.validate()?;
    init_tracing(&cfg.log_filter);

    let document = match &cfg.document_path {
        Some(path) => Document::load(path)
            .with_context(|| format!("loading host document {}", path.display()))?,
        None => Document::new(),
    };
    let elements = document.len();
    let dispatcher =
        Dispatcher::new(Arc::new(document)).with_settings(cfg.handler_settings());
    let connector = WebSocketConnector::new(cfg.endpoint_url()?);
    let manager = ConnectionManager::new(Arc::new(connector), Arc::new(dispatcher), cfg.backoff());

    info!(
        target = "helm::main",
        endpoint = %cfg.endpoint,
        elements,
        reconnect_delays_ms = ?cfg.reconnect_delays_ms,
        highlight_ms = cfg.highlight_duration_ms,
        hover_ms = cfg.hover_duration_ms,
        "starting beach-helm"
    );
    manager.start()?;

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    manager.stop();
    info!(target = "helm::main", "beach-helm stopped");
    Ok(())
}
