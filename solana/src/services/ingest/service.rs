//! Ingest service: owns the stream driver, the ALT backfill, the
//! evidence writer and the critical worker, wired together with
//! bounded channels.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use engine::{Ingest, METRICS, PipelineService};
use solana_sdk::{pubkey::Pubkey, signer::keypair::read_keypair_file};
use tokio::{
    sync::{mpsc, watch},
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    bundle::builder::BundleBuilder,
    config::Config,
    evidence::{EvidenceSink, EvidenceWriter},
    libs::solana_client::{
        GrpcClient, GrpcConfig, RpcClient, RpcConfig,
        alt::{AltCache, AltFetcher, load_hotlist},
        dex::DEX_REGISTRY,
    },
    services::ingest::worker::Worker,
};

/// Events queued from the stream driver towards the critical worker.
const EVENTS_CHANNEL_CAPACITY: usize = 4_096;

pub struct IngestService {
    config: Config,
}

impl IngestService {
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            config: config.clone(),
        })
    }

    fn build_bundle_builder(&self) -> anyhow::Result<BundleBuilder> {
        let payer = read_keypair_file(&self.config.payer_keypair_path)
            .map_err(|e| anyhow::anyhow!("Failed to read payer keypair: {e}"))?;

        let tip_accounts: Vec<Pubkey> = self
            .config
            .relay
            .tip_accounts
            .iter()
            .map(|s| s.parse().context("Invalid tip account"))
            .collect::<anyhow::Result<_>>()?;

        Ok(BundleBuilder::new(
            payer,
            tip_accounts,
            self.config.strategy.compute_unit_limit,
            self.config.strategy.compute_unit_price,
        ))
    }
}

impl Ingest for IngestService {}

#[async_trait]
impl PipelineService for IngestService {
    async fn start(&self, token: CancellationToken) -> anyhow::Result<()> {
        let builder = self.build_bundle_builder()?;
        info!(payer = %builder.payer_pubkey(), "Ingest starting");

        let rpc = Arc::new(RpcClient::new(RpcConfig {
            endpoint: self.config.rpc_endpoint.clone(),
        }));

        let (alts, miss_rx) = AltCache::new();
        let fetcher = Arc::new(AltFetcher::new(
            alts.clone(),
            rpc.clone(),
            miss_rx,
            self.config.alt_hotlist_path.clone(),
        ));

        // Warm the ALT cache from the hotlist before the stream opens.
        if let Some(path) = &self.config.alt_hotlist_path {
            match load_hotlist(path) {
                Ok(keys) if !keys.is_empty() => {
                    let loaded = fetcher.prefetch(&keys).await.unwrap_or(0);
                    info!(requested = keys.len(), loaded, "ALT hotlist prefetched");
                }
                Ok(_) => {}
                Err(e) => info!(error = %e, "No usable ALT hotlist"),
            }
        }

        let (evidence, evidence_rx) = EvidenceSink::new();
        let writer = EvidenceWriter::new(self.config.evidence_path.clone(), evidence_rx);

        let (vault_watch_tx, vault_watch_rx) = watch::channel(Vec::new());
        let (events_tx, events_rx) = mpsc::channel(EVENTS_CHANNEL_CAPACITY);

        let worker = Worker::new(
            self.config.clone(),
            builder,
            alts,
            evidence,
            vault_watch_tx,
        );

        let mut grpc = GrpcClient::new(GrpcConfig {
            endpoint: self.config.grpc_endpoint.clone(),
            x_token: self.config.x_token.clone(),
            batch_size: 64,
            batch_fill_timeout: Duration::from_micros(200),
            program_ids: DEX_REGISTRY
                .program_ids()
                .iter()
                .map(Pubkey::to_string)
                .collect(),
            options: None,
        })
        .with_callback(move |events| {
            if events_tx.try_send(events).is_err() {
                // Worker behind: drop the burst rather than stall the
                // stream reader.
                METRICS.record_decode_skipped("worker_backpressure");
            }
            Ok(())
        });

        let mut tasks: JoinSet<anyhow::Result<()>> = JoinSet::new();
        {
            let token = token.child_token();
            tasks.spawn(async move { worker.run(events_rx, token).await });
        }
        {
            let token = token.child_token();
            let fetcher = fetcher.clone();
            tasks.spawn(async move { fetcher.run(token).await });
        }
        {
            let token = token.child_token();
            tasks.spawn(async move { writer.run(token).await });
        }
        {
            let token = token.child_token();
            tasks.spawn(async move { grpc.subscribe(token, vault_watch_rx).await });
        }

        let result = tasks.join_next().await;
        token.cancel();
        while tasks.join_next().await.is_some() {}

        match result {
            Some(Ok(Err(e))) => {
                error!(error = ?e, "Ingest task failed");
                Err(e)
            }
            Some(Err(e)) => Err(anyhow::anyhow!("Ingest task panicked: {e}")),
            _ => Ok(()),
        }
    }
}
