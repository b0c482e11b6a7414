//! The critical worker: every cache commit, lifecycle transition,
//! speculative overlay and opportunity decision happens on this one
//! task, so state never needs cross-thread locking.

use std::sync::Arc;

use engine::{BUNDLES_CHANNEL, BundleJob, METRICS, enums::RejectReason};
use solana_sdk::{hash::Hash, pubkey::Pubkey};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tools::misc::time::get_timestamp_ms;
use tracing::{debug, info, warn};

use crate::{
    bundle::builder::{BundleBuilder, validate_bundle},
    config::Config,
    evidence::{EvidenceKind, EvidenceRow, EvidenceSink},
    libs::solana_client::{
        alt::AltCache,
        dex::{
            AccountEntity, AccountUpdate, DEX_REGISTRY, Event, IxEntity, MessagePayload,
            PendingSwap, SwapDirection, TxMeta, TxUpdate, UpdateSource, meteora_dlmm, pump_swap,
            raydium_amm, raydium_clmm,
            registry::AccountDecode,
        },
        message::{DecodedMessage, decode_message},
        utils::TOKEN_2022_PROGRAM_ID,
    },
    opportunity::{OpportunityEngine, build_snapshot, infer_victim_deltas, resolve_direction},
    state::{
        StateCaches,
        fee_oracle::FeeOracle,
        lifecycle::PoolPhase,
        pool::PoolState,
        speculative::{PendingEntry, PredictionRecorder, SpeculativeLayer},
        vault::decode_vault,
    },
};

const PREDICTION_WINDOW: usize = 1_000;

pub struct Worker {
    config: Config,
    caches: StateCaches,
    oracle: crate::state::topology::TopologyOracle,
    speculative: SpeculativeLayer,
    fee_oracle: FeeOracle,
    recorder: PredictionRecorder,
    engine: OpportunityEngine,
    builder: BundleBuilder,
    alts: Arc<AltCache>,
    evidence: EvidenceSink,
    vault_watch_tx: watch::Sender<Vec<String>>,
    current_slot: u64,
    latest_blockhash: Option<Hash>,
    subscription_started: bool,
}

impl Worker {
    pub fn new(
        config: Config,
        builder: BundleBuilder,
        alts: Arc<AltCache>,
        evidence: EvidenceSink,
        vault_watch_tx: watch::Sender<Vec<String>>,
    ) -> Self {
        let strategy = &config.strategy;
        Self {
            engine: OpportunityEngine::new(strategy),
            oracle: crate::state::topology::TopologyOracle::new(
                strategy.tick_array_radius,
                strategy.bin_array_radius,
            ),
            speculative: SpeculativeLayer::new(strategy.pending_timeout_ms),
            caches: StateCaches::new(),
            fee_oracle: FeeOracle::new(),
            recorder: PredictionRecorder::new(PREDICTION_WINDOW),
            builder,
            alts,
            evidence,
            vault_watch_tx,
            current_slot: 0,
            latest_blockhash: None,
            subscription_started: false,
            config,
        }
    }

    pub async fn run(
        mut self,
        mut events_rx: mpsc::Receiver<Vec<Event>>,
        token: CancellationToken,
    ) -> anyhow::Result<()> {
        let mut sweep = tokio::time::interval(std::time::Duration::from_secs(1));
        let mut summary = tokio::time::interval(std::time::Duration::from_secs(30));

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = sweep.tick() => self.sweep(),
                _ = summary.tick() => self.log_summary(),
                batch = events_rx.recv() => match batch {
                    Some(events) => self.handle_events(events),
                    None => break,
                },
            }
        }

        Ok(())
    }

    pub fn handle_events(&mut self, events: Vec<Event>) {
        for event in events {
            match event {
                Event::Slot(slot) => {
                    self.current_slot = self.current_slot.max(slot.slot);
                    if !self.subscription_started {
                        self.oracle.set_subscription_start(slot.slot);
                        self.subscription_started = true;
                        info!(slot = slot.slot, "Subscription start slot recorded");
                    }
                }
                Event::BlockMeta(meta) => {
                    self.latest_blockhash = meta.blockhash.parse().ok();
                }
                Event::Account(update) => self.handle_account(*update),
                Event::Tx(tx) => self.handle_tx(*tx),
            }
        }

        self.process_dirty_pools();
    }

    fn sweep(&mut self) {
        let expired = self.speculative.expire(get_timestamp_ms());
        if expired > 0 {
            debug!(expired, "Expired speculative overlays");
        }
    }

    fn log_summary(&self) {
        info!(
            slot = self.current_slot,
            pools = self.oracle.pool_count(),
            vaults = self.caches.vaults.len(),
            pending = self.speculative.tracked_signatures(),
            learned_fees = self.fee_oracle.len(),
            prediction_accuracy = ?self.recorder.accuracy(),
            "Engine state"
        );
    }

    // ---- account path -------------------------------------------------

    fn handle_account(&mut self, update: AccountUpdate) {
        if !self
            .oracle
            .allows_write(&update.pubkey, update.source, update.slot)
        {
            METRICS.record_cache_reject("write_gate");
            return;
        }

        if update.owner == spl_token::ID || update.owner == TOKEN_2022_PROGRAM_ID {
            self.handle_vault(&update);
            return;
        }

        match DEX_REGISTRY.decode_account(&update.owner, &update.data) {
            AccountDecode::SkippedNonTarget => METRICS.record_decode_skipped("non_target"),
            AccountDecode::SkippedNonPool => METRICS.record_decode_skipped("non_pool"),
            AccountDecode::Failed(venue) => METRICS.record_pool_decode_failed(venue.as_str()),
            AccountDecode::Decoded(entity) => self.commit_entity(&update, entity),
        }
    }

    fn handle_vault(&mut self, update: &AccountUpdate) {
        let Some(balance) = decode_vault(&update.data) else {
            METRICS.record_decode_skipped("non_vault");
            return;
        };

        // Confirmation check happens against the overlay as it stood
        // before this write lands.
        let confirmed_sig = update
            .txn_signature
            .filter(|sig| self.speculative.is_tracked(sig));
        let affected = self.oracle.mark_dirty(&update.pubkey);

        if let Some(sig) = confirmed_sig {
            self.settle_prediction(&affected, &update.pubkey, balance.amount);
            self.speculative.remove(&sig);
        }

        self.caches.vaults.commit(
            update.pubkey,
            balance,
            update.slot,
            update.write_version,
            update.source,
        );
        METRICS.record_account_update("vault", update.source.as_str());
    }

    /// Compares the overlay's predicted reserve against the observed
    /// post-confirm balance, one vault side at a time.
    fn settle_prediction(&mut self, affected_pools: &[Pubkey], vault: &Pubkey, observed: u64) {
        for pool in affected_pools {
            let Some(topology) = self.oracle.topology(pool) else {
                continue;
            };
            let confirmed_a = self
                .caches
                .vaults
                .get(&topology.base_vault)
                .map_or(0, |e| e.value.amount);
            let confirmed_b = self
                .caches
                .vaults
                .get(&topology.quote_vault)
                .map_or(0, |e| e.value.amount);
            let snap = self
                .speculative
                .snapshot(pool, confirmed_a, confirmed_b, self.current_slot);

            if *vault == topology.base_vault {
                self.recorder.record_one(snap.reserve_a, observed);
            } else if *vault == topology.quote_vault {
                self.recorder.record_one(snap.reserve_b, observed);
            }
        }
    }

    fn commit_entity(&mut self, update: &AccountUpdate, entity: AccountEntity) {
        let source = update.source;
        let (slot, wv) = (update.slot, update.write_version);

        match entity {
            AccountEntity::PumpSwapPool(pool) => {
                self.commit_pool(update, PoolState::PumpSwap(pool));
            }
            AccountEntity::AmmInfo(info) => {
                self.commit_pool(update, PoolState::RaydiumAmm(info));
            }
            AccountEntity::ClmmPool(pool) => {
                self.commit_pool(update, PoolState::RaydiumClmm(pool));
            }
            AccountEntity::LbPair(pair) => {
                self.commit_pool(update, PoolState::MeteoraDlmm(pair));
            }
            AccountEntity::PumpSwapConfig(config) => {
                self.caches
                    .pump_configs
                    .commit(update.pubkey, *config, slot, wv, source);
                METRICS.record_account_update("pump_swap", source.as_str());
            }
            AccountEntity::ClmmConfig(config) => {
                self.caches
                    .clmm_configs
                    .commit(update.pubkey, *config, slot, wv, source);
                METRICS.record_account_update("raydium_clmm", source.as_str());
            }
            AccountEntity::TickArray(array) => {
                let pool = array.pool_id();
                let start_index = array.start_tick_index;
                self.caches
                    .tick_arrays
                    .commit((pool, start_index), array, slot, wv, source);
                self.oracle.mark_pool_dirty(&pool);
                METRICS.record_account_update("raydium_clmm", source.as_str());
            }
            AccountEntity::BinArray(array) => {
                let pool = array.lb_pair();
                let index = array.index;
                self.caches
                    .bin_arrays
                    .commit((pool, index), array, slot, wv, source);
                self.oracle.mark_pool_dirty(&pool);
                METRICS.record_account_update("meteora_dlmm", source.as_str());
            }
        }
    }

    fn commit_pool(&mut self, update: &AccountUpdate, state: PoolState) {
        let venue = state.venue();
        METRICS.record_account_update(venue.as_str(), update.source.as_str());

        self.caches.pools.commit(
            update.pubkey,
            state,
            update.slot,
            update.write_version,
            update.source,
        );

        if self.oracle.observe_pool(update.pubkey) {
            debug!(pool = %update.pubkey, venue = venue.as_str(), "Pool discovered");
        }
        self.oracle.mark_pool_dirty(&update.pubkey);
    }

    // ---- lifecycle sweep ----------------------------------------------

    fn process_dirty_pools(&mut self) {
        let now_ms = get_timestamp_ms();

        for pool in self.oracle.take_dirty() {
            let Some(phase) = self.oracle.phase(&pool) else {
                continue;
            };

            match phase {
                PoolPhase::Discovered => {
                    self.freeze_and_activate(pool, now_ms);
                }
                PoolPhase::Frozen | PoolPhase::Incomplete => {
                    self.mark_bitmap_tombstones(&pool);
                    self.oracle.try_activate(&pool, &self.caches);
                }
                PoolPhase::Active => {
                    let Some(entry) = self.caches.pools.get(&pool) else {
                        continue;
                    };
                    if self.oracle.needs_refresh(&pool, &entry.value) {
                        let state = entry.value.clone();
                        if self.oracle.begin_refresh(&pool).is_ok() {
                            let _ = self
                                .oracle
                                .freeze_pool(pool, &state, self.current_slot, now_ms);
                            self.mark_bitmap_tombstones(&pool);
                            self.oracle.try_activate(&pool, &self.caches);
                        }
                    }
                }
                PoolPhase::Refreshing | PoolPhase::Retired => {}
            }
        }

        self.publish_vault_watch_set();
    }

    fn freeze_and_activate(&mut self, pool: Pubkey, now_ms: u64) {
        let Some(entry) = self.caches.pools.get(&pool) else {
            return;
        };
        let state = entry.value.clone();

        if let Err(e) = self
            .oracle
            .freeze_pool(pool, &state, self.current_slot, now_ms)
        {
            warn!(pool = %pool, error = %e, "Freeze failed");
            return;
        }
        self.mark_bitmap_tombstones(&pool);
        self.oracle.try_activate(&pool, &self.caches);
    }

    /// Required arrays whose pool bitmap says "uninitialized" become
    /// tombstones so activation can treat them as virtual.
    fn mark_bitmap_tombstones(&mut self, pool: &Pubkey) {
        let Some(topology) = self.oracle.topology(pool) else {
            return;
        };
        let Some(entry) = self.caches.pools.get(pool) else {
            return;
        };

        match &entry.value {
            PoolState::RaydiumClmm(state) => {
                for index in topology.tick_array_indexes.clone() {
                    if state.is_tick_array_initialized(index) == Some(false)
                        && self.caches.tick_arrays.get(&(*pool, index)).is_none()
                    {
                        self.caches.tick_arrays.mark_non_existent((*pool, index));
                    }
                }
            }
            PoolState::MeteoraDlmm(pair) => {
                for index in topology.bin_array_indexes.clone() {
                    if pair.is_bin_array_initialized(index) == Some(false)
                        && self.caches.bin_arrays.get(&(*pool, index)).is_none()
                    {
                        self.caches.bin_arrays.mark_non_existent((*pool, index));
                    }
                }
            }
            PoolState::PumpSwap(_) | PoolState::RaydiumAmm(_) => {}
        }
    }

    /// Keeps the stream driver's vault subscription aligned with the
    /// union of frozen topologies.
    fn publish_vault_watch_set(&self) {
        let vaults: Vec<String> = self
            .oracle
            .watched_vaults()
            .iter()
            .map(Pubkey::to_string)
            .collect();

        if !vaults.is_empty() && *self.vault_watch_tx.borrow() != vaults {
            let _ = self.vault_watch_tx.send(vaults);
        }
    }

    // ---- transaction path ---------------------------------------------

    fn handle_tx(&mut self, tx: TxUpdate) {
        let message = match &tx.message {
            MessagePayload::Parsed(message) => message.clone(),
            MessagePayload::Raw(bytes) => match decode_message(bytes, &self.alts) {
                Ok(message) if message.resolved => message,
                Ok(message) => {
                    debug!(
                        sig = %tx.signature,
                        misses = message.alt_misses.len(),
                        "Decode deferred on ALT misses"
                    );
                    return;
                }
                Err(e) => {
                    debug!(sig = %tx.signature, error = %e, "Tx decode failed");
                    return;
                }
            },
        };

        let swaps = extract_swaps(&message);
        if swaps.is_empty() {
            return;
        }

        match tx.source {
            UpdateSource::Pending => {
                if self.speculative.tracked_signatures() >= self.config.strategy.pending_high_water
                {
                    METRICS.record_decode_skipped("backpressure");
                    return;
                }
                let received_ms = get_timestamp_ms();
                for swap in swaps {
                    self.handle_pending_swap(&tx, &swap, received_ms);
                }
            }
            UpdateSource::Grpc | UpdateSource::Bootstrap => {
                if self.speculative.is_tracked(&tx.signature)
                    && let Some(first) = swaps.first()
                {
                    self.evidence.record(EvidenceRow {
                        kind: EvidenceKind::Confirm,
                        ts: get_timestamp_ms(),
                        pool: first.pool.to_string(),
                        venue: first.venue.as_str().to_owned(),
                        reason: None,
                        profit_est: None,
                        sig: Some(tx.signature.to_string()),
                    });
                }
                self.speculative.remove(&tx.signature);
                if let Some(meta) = &tx.meta {
                    for swap in swaps {
                        self.learn_fee(&message, meta, &swap);
                    }
                }
            }
        }
    }

    fn handle_pending_swap(&mut self, tx: &TxUpdate, swap: &PendingSwap, received_ms: u64) {
        match self.evaluate_pending_swap(tx, swap) {
            Ok(job) => {
                self.evidence.record(EvidenceRow {
                    kind: EvidenceKind::Detect,
                    ts: received_ms,
                    pool: swap.pool.to_string(),
                    venue: swap.venue.as_str().to_owned(),
                    reason: None,
                    profit_est: Some(job.profit_est),
                    sig: Some(tx.signature.to_string()),
                });
                job.print_info();
                self.evidence.record(EvidenceRow {
                    kind: EvidenceKind::Submit,
                    ts: get_timestamp_ms(),
                    pool: swap.pool.to_string(),
                    venue: swap.venue.as_str().to_owned(),
                    reason: None,
                    profit_est: Some(job.profit_est),
                    sig: Some(tx.signature.to_string()),
                });
                let _ = BUNDLES_CHANNEL.tx.send(job);
            }
            Err(reason) => {
                METRICS.record_rejection(reason);
                self.evidence.record(EvidenceRow {
                    kind: EvidenceKind::Reject,
                    ts: received_ms,
                    pool: swap.pool.to_string(),
                    venue: swap.venue.as_str().to_owned(),
                    reason: Some(reason.to_string()),
                    profit_est: None,
                    sig: Some(tx.signature.to_string()),
                });
            }
        }
        METRICS.record_decision_latency(
            (get_timestamp_ms().saturating_sub(received_ms)) as f64 / 1_000.0,
        );
    }

    fn evaluate_pending_swap(
        &mut self,
        tx: &TxUpdate,
        swap: &PendingSwap,
    ) -> Result<BundleJob, RejectReason> {
        let pool_entry = self.caches.pools.get(&swap.pool).ok_or(RejectReason::NoPool)?;
        let state = pool_entry.value.clone();

        if self.oracle.phase(&swap.pool) != Some(PoolPhase::Active) {
            return Err(RejectReason::MissingTopology);
        }
        let topology = self
            .oracle
            .topology(&swap.pool)
            .ok_or(RejectReason::MissingTopology)?
            .clone();

        let direction = resolve_direction(swap, &state).ok_or(RejectReason::WeirdFlow)?;

        let snapshot = build_snapshot(
            &state,
            &topology,
            &self.caches,
            &self.speculative,
            &self.fee_oracle,
        )?;

        let sim_started = std::time::Instant::now();
        let evaluated = self
            .engine
            .evaluate(swap.pool, &state, &snapshot, swap, direction);
        METRICS.record_sim_latency(swap.venue.as_str(), sim_started.elapsed().as_secs_f64());

        // Whatever the outcome, overlay the victim's expected deltas so
        // later scans see post-victim reserves.
        if let Some(delta) = infer_victim_deltas(swap.pool, &snapshot, swap, direction) {
            self.speculative.apply(
                &PendingEntry {
                    signature: tx.signature,
                    slot: tx.slot,
                    deltas: vec![delta],
                },
                get_timestamp_ms(),
            );
        }

        let plan = evaluated?;
        let blockhash = self.latest_blockhash.ok_or(RejectReason::StaleData)?;

        let bundle = self
            .builder
            .build_backrun(
                &plan,
                &state,
                &topology,
                None,
                blockhash,
                self.config.strategy.tip_lamports,
                get_timestamp_ms(),
            )
            .map_err(|_| RejectReason::SimFailure)?;

        validate_bundle(
            &bundle,
            self.config.relay.tip_floor_lamports,
            get_timestamp_ms(),
        )
        .map_err(|_| RejectReason::SimFailure)?;

        let transactions = bundle
            .serialize_transactions()
            .map_err(|_| RejectReason::SimFailure)?;

        Ok(BundleJob {
            ts: get_timestamp_ms(),
            id: bundle.id,
            transactions,
            tip_lamports: bundle.tip_lamports,
            pool: plan.pool.to_string(),
            venue: plan.venue.as_str(),
            profit_est: plan.net_profit,
        })
    }

    /// Confirmed fills teach the fee oracle for CP venues: vault
    /// balances from meta give `(reserve_in, reserve_out, amount_in,
    /// actual_out)` directly.
    fn learn_fee(&mut self, message: &DecodedMessage, meta: &TxMeta, swap: &PendingSwap) {
        let Some(entry) = self.caches.pools.get(&swap.pool) else {
            return;
        };
        let state = entry.value.clone();
        if !matches!(state, PoolState::PumpSwap(_) | PoolState::RaydiumAmm(_)) {
            return;
        }
        let Some(direction) = resolve_direction(swap, &state) else {
            return;
        };

        let (vault_in, vault_out) = match direction {
            SwapDirection::AtoB => (state.vault_a(), state.vault_b()),
            SwapDirection::BtoA => (state.vault_b(), state.vault_a()),
        };

        let balance = |vault: &Pubkey, balances: &[crate::libs::solana_client::dex::TokenBalance]| {
            let index = message.account_keys.iter().position(|k| k == vault)?;
            balances
                .iter()
                .find(|b| usize::from(b.account_index) == index)
                .map(|b| b.amount)
        };

        let (Some(pre_in), Some(post_in), Some(pre_out), Some(post_out)) = (
            balance(&vault_in, &meta.pre_token_balances),
            balance(&vault_in, &meta.post_token_balances),
            balance(&vault_out, &meta.pre_token_balances),
            balance(&vault_out, &meta.post_token_balances),
        ) else {
            return;
        };

        let amount_in = post_in.saturating_sub(pre_in);
        let actual_out = pre_out.saturating_sub(post_out);
        if amount_in == 0 || actual_out == 0 {
            return;
        }

        self.fee_oracle
            .observe_swap(swap.pool, direction, pre_in, pre_out, amount_in, actual_out);
    }
}

/// Pulls every venue swap out of a resolved message.
fn extract_swaps(message: &DecodedMessage) -> Vec<PendingSwap> {
    let mut swaps = Vec::new();

    for ix in &message.instructions {
        let Some(program_id) = message.program_id(ix) else {
            continue;
        };
        let Some(entity) = DEX_REGISTRY.decode_instruction(program_id, &ix.data) else {
            continue;
        };

        let accounts: Vec<Pubkey> = ix
            .account_indexes
            .iter()
            .filter_map(|index| message.key(*index).copied())
            .collect();
        if accounts.len() != ix.account_indexes.len() {
            continue;
        }

        let swap = match entity {
            IxEntity::PumpSwapBuy(args) => pump_swap::resolve_buy(&args, &accounts),
            IxEntity::PumpSwapSell(args) => pump_swap::resolve_sell(&args, &accounts),
            IxEntity::AmmSwapBaseIn(args) => raydium_amm::resolve_swap_base_in(&args, &accounts),
            IxEntity::AmmSwapBaseOut(args) => raydium_amm::resolve_swap_base_out(&args, &accounts),
            IxEntity::ClmmSwap(args) => raydium_clmm::resolve_swap(
                args.amount,
                args.other_amount_threshold,
                args.is_base_input,
                &accounts,
            ),
            IxEntity::ClmmSwapV2(args) => raydium_clmm::resolve_swap(
                args.amount,
                args.other_amount_threshold,
                args.is_base_input,
                &accounts,
            ),
            IxEntity::DlmmSwap(args) => meteora_dlmm::resolve_swap(&args, &accounts),
        };

        if let Some(swap) = swap {
            swaps.push(swap);
        }
    }

    swaps
}
