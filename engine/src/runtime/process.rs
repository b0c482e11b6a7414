use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tools::http::http_server::HttpServerProcess;
use tracing::error;

use crate::service::traits::PipelineService;

/// Wraps a pipeline service into a supervised process: restart on
/// error with a fixed backoff, stop on cancellation.
pub struct GenericProcess<S>
where
    S: PipelineService + ?Sized,
{
    error_timeout: Duration,
    service: Arc<S>,
}

impl<S: PipelineService + ?Sized + 'static> GenericProcess<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self {
            service,
            error_timeout: Duration::from_secs(60),
        }
    }
}

#[async_trait]
impl<S: PipelineService + ?Sized + 'static> HttpServerProcess for GenericProcess<S> {
    async fn pre_run(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn run(&self, token: CancellationToken) -> anyhow::Result<()> {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                result = self.service.start(token.child_token()) => {
                    if let Err(e) = result {
                        error!(error = ?e, "error during pipeline process");
                        tokio::time::sleep(self.error_timeout).await;
                    }
                }
            }
        }
        Ok(())
    }
}
