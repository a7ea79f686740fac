//! Console server command: `backoffice serve`.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use backoffice::client::ApiClient;
use backoffice::config::ConsoleToml;
use backoffice::console::{ServerConfig, start_server};

pub async fn cmd_serve(
    config_path: Option<&Path>,
    port: Option<u16>,
    dev: bool,
    open: bool,
) -> Result<()> {
    let (config, used) = ConsoleToml::discover(config_path)?;
    if let Some(path) = &used {
        tracing::info!(target: "backoffice::cmd", path = %path.display(), "configuration loaded");
    }

    let ctx = config.request_context()?;
    tracing::info!(target: "backoffice::cmd", api = ctx.base_url(), "using API");
    let client = ApiClient::new(ctx).context("Failed to build API client")?;

    let port = port.unwrap_or(config.server.port);
    let dev = dev || config.server.dev;

    // Skip in dev mode (no browser inside containers)
    if open && !dev {
        let url = format!("http://localhost:{}", port);
        tokio::spawn(async move {
            // Small delay to let the server start binding
            tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
            if let Err(e) = open::that(&url) {
                eprintln!("Failed to open browser: {}", e);
            }
        });
    }

    start_server(
        ServerConfig {
            port,
            dev_mode: dev,
        },
        Arc::new(client),
    )
    .await
}
