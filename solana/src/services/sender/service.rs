//! Sender service: drains the global bundle channel, submits to the
//! relay fire-and-forget, and tracks outcomes in the LRU registry.

use async_trait::async_trait;
use engine::{BUNDLES_CHANNEL, BundleJob, PipelineService, Sender};
use solana_sdk::pubkey::Pubkey;
use tokio_util::sync::CancellationToken;
use tools::misc::time::get_timestamp_ms;
use tracing::{debug, info, warn};

use crate::{
    bundle::{builder::MAX_BUNDLE_AGE_MS, registry::BundleRegistry, relay::RelayClient},
    config::Config,
};

/// Registry cap; old records age out by LRU.
const REGISTRY_CAPACITY: usize = 2_048;

/// A submitted bundle with no relay verdict after this long is failed.
const SUBMIT_TIMEOUT_MS: u64 = 30_000;

pub struct SenderService {
    config: Config,
}

impl SenderService {
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            config: config.clone(),
        })
    }
}

impl Sender for SenderService {}

#[async_trait]
impl PipelineService for SenderService {
    async fn start(&self, token: CancellationToken) -> anyhow::Result<()> {
        let relay = RelayClient::new(
            self.config.relay.endpoints.clone(),
            self.config.relay.max_retries,
        );
        let mut registry = BundleRegistry::new(REGISTRY_CAPACITY);

        let mut rx = BUNDLES_CHANNEL.rx.lock().await;
        let mut poll = tokio::time::interval(std::time::Duration::from_secs(2));
        info!(
            endpoints = self.config.relay.endpoints.len(),
            "Sender started"
        );

        loop {
            tokio::select! {
                _ = token.cancelled() => break,

                _ = poll.tick() => {
                    Self::poll_statuses(&relay, &mut registry).await;
                    registry.expire_older_than(SUBMIT_TIMEOUT_MS, get_timestamp_ms());
                }

                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let job = rx.borrow_and_update().clone();
                    if job.is_empty() {
                        continue;
                    }
                    Self::submit(&relay, &mut registry, job).await;
                }
            }
        }

        Ok(())
    }
}

impl SenderService {
    async fn submit(relay: &RelayClient, registry: &mut BundleRegistry, job: BundleJob) {
        let now_ms = get_timestamp_ms();
        if now_ms.saturating_sub(job.ts) > MAX_BUNDLE_AGE_MS {
            debug!(id = %job.id, "Bundle aged out before submission");
            return;
        }

        let Ok(pool) = job.pool.parse::<Pubkey>() else {
            warn!(id = %job.id, pool = %job.pool, "Unparseable pool label");
            return;
        };

        // One in-flight submission per pool.
        if registry.has_inflight(&pool) {
            debug!(id = %job.id, pool = %job.pool, "Pool already in flight, skipping");
            return;
        }

        match relay.send_bundle(&job.transactions).await {
            Ok(relay_id) => {
                info!(
                    id = %job.id,
                    relay_id,
                    venue = job.venue,
                    profit_est = job.profit_est,
                    "Bundle submitted"
                );
                registry.record_submitted(job.id, pool, Some(relay_id), job.profit_est, now_ms);
            }
            Err(e) => {
                warn!(id = %job.id, error = %e, "Bundle submission failed");
                registry.record_submitted(job.id, pool, None, job.profit_est, now_ms);
                registry.mark_failed(&job.id);
            }
        }
    }

    async fn poll_statuses(relay: &RelayClient, registry: &mut BundleRegistry) {
        let submitted = registry.submitted();
        if submitted.is_empty() {
            return;
        }

        let relay_ids: Vec<String> = submitted.iter().map(|(_, rid)| rid.clone()).collect();
        let statuses = match relay.get_bundle_statuses(&relay_ids).await {
            Ok(statuses) => statuses,
            Err(e) => {
                debug!(error = %e, "Bundle status poll failed");
                return;
            }
        };

        for ((id, _), status) in submitted.iter().zip(statuses) {
            match status.as_deref() {
                Some("confirmed" | "finalized" | "landed") => registry.mark_landed(id),
                Some("failed" | "invalid") => registry.mark_failed(id),
                _ => {}
            }
        }
    }
}
