//! Address-lookup-table cache with background backfill.
//!
//! The hot path only ever does a synchronous map lookup; a miss is
//! queued for the fetcher and the decode that needed it reports the
//! miss list instead of blocking.

use std::{path::Path, sync::Arc, time::Duration};

use anyhow::Context;
use dashmap::{DashMap, DashSet};
use engine::METRICS;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::libs::solana_client::rpc::RpcClient;

/// Serialized lookup-table metadata length; addresses follow as raw
/// 32-byte chunks.
const LOOKUP_TABLE_META_SIZE: usize = 56;

/// Max keys per `getMultipleAccounts` call.
const FETCH_BATCH: usize = 100;

pub struct AltCache {
    tables: DashMap<Pubkey, Arc<Vec<Pubkey>>>,
    /// Tables the chain reports as non-existent; distinct from
    /// "not fetched yet" so we do not refetch them forever.
    missing: DashSet<Pubkey>,
    /// Keys already queued towards the fetcher.
    inflight: DashSet<Pubkey>,
    miss_tx: mpsc::UnboundedSender<Pubkey>,
}

impl AltCache {
    #[must_use]
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Pubkey>) {
        let (miss_tx, miss_rx) = mpsc::unbounded_channel();
        let cache = Arc::new(Self {
            tables: DashMap::new(),
            missing: DashSet::new(),
            inflight: DashSet::new(),
            miss_tx,
        });
        (cache, miss_rx)
    }

    /// Synchronous lookup. A miss enqueues the key for backfill exactly
    /// once and returns `None` immediately.
    pub fn get(&self, key: &Pubkey) -> Option<Arc<Vec<Pubkey>>> {
        if let Some(entry) = self.tables.get(key) {
            METRICS.record_alt_lookup(true);
            return Some(entry.value().clone());
        }

        METRICS.record_alt_lookup(false);
        if !self.missing.contains(key) && self.inflight.insert(*key) {
            // Receiver dropped means the fetcher is gone; nothing to do.
            let _ = self.miss_tx.send(*key);
        }
        None
    }

    pub fn insert(&self, key: Pubkey, addresses: Vec<Pubkey>) {
        self.inflight.remove(&key);
        self.missing.remove(&key);
        self.tables.insert(key, Arc::new(addresses));
    }

    pub fn mark_missing(&self, key: Pubkey) {
        self.inflight.remove(&key);
        self.missing.insert(key);
    }

    #[must_use]
    pub fn contains(&self, key: &Pubkey) -> bool {
        self.tables.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    #[must_use]
    pub fn known_keys(&self) -> Vec<Pubkey> {
        self.tables.iter().map(|e| *e.key()).collect()
    }
}

/// Extracts the address list from a raw lookup-table account.
#[must_use]
pub fn parse_lookup_table(data: &[u8]) -> Option<Vec<Pubkey>> {
    if data.len() < LOOKUP_TABLE_META_SIZE {
        return None;
    }
    let raw = &data[LOOKUP_TABLE_META_SIZE..];
    if raw.len() % 32 != 0 {
        return None;
    }
    Some(
        raw.chunks_exact(32)
            .map(|chunk| Pubkey::new_from_array(chunk.try_into().unwrap()))
            .collect(),
    )
}

/// Background task: drains miss keys, fetches them in batches and
/// publishes results back into the cache.
pub struct AltFetcher {
    cache: Arc<AltCache>,
    rpc: Arc<RpcClient>,
    miss_rx: Mutex<mpsc::UnboundedReceiver<Pubkey>>,
    hotlist_path: Option<String>,
}

impl AltFetcher {
    #[must_use]
    pub fn new(
        cache: Arc<AltCache>,
        rpc: Arc<RpcClient>,
        miss_rx: mpsc::UnboundedReceiver<Pubkey>,
        hotlist_path: Option<String>,
    ) -> Self {
        Self {
            cache,
            rpc,
            miss_rx: Mutex::new(miss_rx),
            hotlist_path,
        }
    }

    /// Bootstrap: fetches a known batch of tables up front.
    pub async fn prefetch(&self, keys: &[Pubkey]) -> anyhow::Result<usize> {
        let mut loaded = 0;
        for chunk in keys.chunks(FETCH_BATCH) {
            loaded += self.fetch_batch(chunk).await?;
        }
        debug!(requested = keys.len(), loaded, "ALT prefetch done");
        Ok(loaded)
    }

    pub async fn run(&self, token: CancellationToken) -> anyhow::Result<()> {
        let mut rx = self.miss_rx.lock().await;
        let mut batch: Vec<Pubkey> = Vec::with_capacity(FETCH_BATCH);

        while !token.is_cancelled() {
            batch.clear();

            tokio::select! {
                _ = token.cancelled() => break,
                received = rx.recv() => match received {
                    Some(key) => batch.push(key),
                    None => break,
                },
            }

            // Coalesce whatever else is already queued.
            while batch.len() < FETCH_BATCH {
                match tokio::time::timeout(Duration::from_millis(10), rx.recv()).await {
                    Ok(Some(key)) => batch.push(key),
                    _ => break,
                }
            }

            if let Err(e) = self.fetch_batch(&batch).await {
                error!(error = %e, "ALT backfill batch failed");
                // Keys stay inflight-marked; drop the marks so a later
                // lookup can requeue them.
                for key in &batch {
                    self.cache.inflight.remove(key);
                }
            } else if let Some(path) = &self.hotlist_path
                && let Err(e) = append_hotlist(path, &batch)
            {
                warn!(error = %e, "Failed to append ALT hotlist");
            }
        }

        Ok(())
    }

    async fn fetch_batch(&self, keys: &[Pubkey]) -> anyhow::Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }

        let accounts = self.rpc.get_accounts(keys).await?;
        let mut loaded = 0;

        for (key, account) in keys.iter().zip(accounts) {
            match account.as_ref().and_then(|a| parse_lookup_table(&a.data)) {
                Some(addresses) => {
                    self.cache.insert(*key, addresses);
                    loaded += 1;
                }
                None => self.cache.mark_missing(*key),
            }
        }

        Ok(loaded)
    }
}

/// Persisted ALT hotlist: `{version, updated_at, alts: [base58]}`.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Hotlist {
    pub version: u32,
    pub updated_at: u64,
    pub alts: Vec<String>,
}

pub fn load_hotlist(path: impl AsRef<Path>) -> anyhow::Result<Vec<Pubkey>> {
    let raw = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Could not read hotlist {:?}", path.as_ref().display()))?;
    let hotlist: Hotlist = serde_json::from_str(&raw).context("Invalid hotlist JSON")?;

    Ok(hotlist
        .alts
        .iter()
        .filter_map(|s| s.parse::<Pubkey>().ok())
        .collect())
}

/// Append-on-discovery, deduplicated. Rewrites the whole file; the
/// list is small (hundreds of tables).
pub fn append_hotlist(path: impl AsRef<Path>, keys: &[Pubkey]) -> anyhow::Result<()> {
    let mut hotlist = match std::fs::read_to_string(path.as_ref()) {
        Ok(raw) => serde_json::from_str::<Hotlist>(&raw).unwrap_or_default(),
        Err(_) => Hotlist::default(),
    };

    for key in keys {
        let encoded = key.to_string();
        if !hotlist.alts.contains(&encoded) {
            hotlist.alts.push(encoded);
        }
    }

    hotlist.version = 1;
    hotlist.updated_at = tools::misc::time::get_timestamp_ms();

    std::fs::write(path.as_ref(), serde_json::to_vec_pretty(&hotlist)?)
        .with_context(|| format!("Could not write hotlist {:?}", path.as_ref().display()))
}
