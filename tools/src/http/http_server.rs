use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// A long-running unit supervised by the [`HttpServer`]: the server
/// spawns every registered process, serves health/metrics while they
/// run, and cancels all of them when one exits or ctrl-c arrives.
#[async_trait]
pub trait HttpServerProcess: Send + Sync {
    /// Runs once before any process is spawned; a failure aborts startup.
    async fn pre_run(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn run(&self, token: CancellationToken) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct HttpServerConfig {
    /// Health endpoint bind address.
    pub addr: String,
    /// Prometheus exporter bind address.
    pub metrics_addr: String,
    /// Grace period for processes after cancellation.
    pub shutdown_timeout: Duration,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9000".to_owned(),
            metrics_addr: "127.0.0.1:9007".to_owned(),
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

pub struct HttpServer {
    config: HttpServerConfig,
    processes: Vec<Arc<dyn HttpServerProcess>>,
}

impl HttpServer {
    #[must_use]
    pub fn from_config(config: HttpServerConfig) -> Self {
        Self {
            config,
            processes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_processes(mut self, processes: Vec<Arc<dyn HttpServerProcess>>) -> Self {
        self.processes = processes;
        self
    }

    /// Installs the Prometheus exporter, spawns all processes and the
    /// health endpoint, and blocks until shutdown.
    pub async fn run(self) -> anyhow::Result<()> {
        let metrics_addr: SocketAddr = self
            .config
            .metrics_addr
            .parse()
            .context("Invalid metrics addr")?;

        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()
            .context("Failed to install Prometheus exporter")?;

        for process in &self.processes {
            process.pre_run().await?;
        }

        let token = CancellationToken::new();
        let mut tasks: JoinSet<anyhow::Result<()>> = JoinSet::new();

        for process in &self.processes {
            let process = process.clone();
            let token = token.clone();
            tasks.spawn(async move { process.run(token).await });
        }

        let app = Router::new().route("/healthz", get(|| async { "ok" }));
        let listener = tokio::net::TcpListener::bind(&self.config.addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.config.addr))?;

        info!(addr = %self.config.addr, metrics = %metrics_addr, "HTTP server started");

        let server_token = token.clone();
        tasks.spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { server_token.cancelled().await })
                .await
                .map_err(Into::into)
        });

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
            }
            result = tasks.join_next() => {
                match result {
                    Some(Ok(Err(e))) => error!(error = ?e, "Process exited with error"),
                    Some(Err(e)) => error!(error = ?e, "Process panicked"),
                    _ => info!("Process exited"),
                }
            }
        }

        token.cancel();

        let drain = async {
            while tasks.join_next().await.is_some() {}
        };
        if tokio::time::timeout(self.config.shutdown_timeout, drain)
            .await
            .is_err()
        {
            error!("Shutdown grace period elapsed, aborting remaining tasks");
            tasks.abort_all();
        }

        Ok(())
    }
}
