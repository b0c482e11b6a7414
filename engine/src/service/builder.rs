use std::sync::Arc;

use tools::http::http_server::HttpServerProcess;

use crate::{Ingest, Sender, ServiceFactory, runtime::process::GenericProcess};

pub async fn build_services<P, C>(config: &C) -> anyhow::Result<(Arc<dyn Ingest>, Arc<dyn Sender>)>
where
    P: ServiceFactory<dyn Ingest, Config = C> + ServiceFactory<dyn Sender, Config = C>,
{
    let ingest = P::from_config(config).await?;
    let sender = P::from_config(config).await?;
    Ok((ingest, sender))
}

pub fn build_processes(
    ingest: Arc<dyn Ingest>,
    sender: Arc<dyn Sender>,
) -> Vec<Arc<dyn HttpServerProcess>> {
    vec![
        Arc::new(GenericProcess::new(ingest)),
        Arc::new(GenericProcess::new(sender)),
    ]
}
