use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait PipelineService: Send + Sync {
    async fn start(&self, token: CancellationToken) -> anyhow::Result<()>;
}

/// Stream ingest + decode + state + opportunity scan (critical worker).
#[async_trait]
pub trait Ingest: PipelineService {}

/// Bundle submission towards the relay.
#[async_trait]
pub trait Sender: PipelineService {}

/// Startup-time config validation; failures are fatal by design (§7:
/// invalid program IDs or a missing payer must abort, not limp).
pub trait Validatable {
    fn validate(&mut self) -> anyhow::Result<()>;
}
