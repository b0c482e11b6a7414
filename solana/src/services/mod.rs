pub mod ingest;
pub mod sender;

use std::sync::Arc;

use async_trait::async_trait;
use engine::{Ingest, Sender, ServiceFactory};

use crate::{
    config::Config,
    services::{ingest::IngestService, sender::SenderService},
};

/// Service factory wiring the ingest/sender pair for the launcher.
pub struct Provider;

#[async_trait]
impl ServiceFactory<dyn Ingest> for Provider {
    type Config = Config;

    async fn from_config(config: &Self::Config) -> anyhow::Result<Arc<dyn Ingest>> {
        Ok(Arc::new(IngestService::from_config(config).await?))
    }
}

#[async_trait]
impl ServiceFactory<dyn Sender> for Provider {
    type Config = Config;

    async fn from_config(config: &Self::Config) -> anyhow::Result<Arc<dyn Sender>> {
        Ok(Arc::new(SenderService::from_config(config).await?))
    }
}
