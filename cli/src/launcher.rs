use anyhow::{Context, Result};
use engine::{build_processes, build_services};
use tools::http::http_server::{HttpServer, HttpServerConfig};

use crate::{config::Config, ui};

pub async fn start(config_path: std::path::PathBuf) -> Result<()> {
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            ui::print_config_error(&config_path, &e);
            return Ok(());
        }
    };

    let (ingest, sender) = build_services::<solana::Provider, _>(&config.solana).await?;
    let processes = build_processes(ingest, sender);

    let server_config = HttpServerConfig {
        addr: config.general.server_addr.clone(),
        metrics_addr: config.general.metrics_addr.clone(),
        ..Default::default()
    };

    HttpServer::from_config(server_config)
        .with_processes(processes)
        .run()
        .await
        .context("HTTP Server failed")
}
