use ahash::{AHashMap, AHashSet};
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use crate::{
    libs::solana_client::dex::{UpdateSource, Venue, meteora_dlmm, raydium_clmm},
    state::{
        StateCaches,
        lifecycle::{self, IncompleteReason, PoolPhase},
        pool::PoolState,
        store::{Entry, Lookup},
    },
};

/// The exact account set a simulation for the pool may read. Installed
/// atomically by `freeze_pool`; replaced as a whole on refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrozenTopology {
    pub pool: Pubkey,
    pub venue: Venue,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub tick_array_indexes: Vec<i32>,
    pub bin_array_indexes: Vec<i64>,
    pub amm_config: Option<Pubkey>,
    pub frozen_at_slot: u64,
    pub frozen_at_ms: u64,
}

impl FrozenTopology {
    /// Plain-account dependencies (arrays are keyed `(pool, index)` and
    /// tracked through the pool itself, not the reverse index).
    #[must_use]
    pub fn accounts(&self) -> Vec<Pubkey> {
        let mut keys = vec![self.base_vault, self.quote_vault];
        if let Some(config) = self.amm_config {
            keys.push(config);
        }
        keys
    }
}

/// Venue-aware dependency enumeration: vaults, a window of tick/bin
/// array indexes around the current price, and the config account.
#[must_use]
pub fn derive_pool_dependencies(
    state: &PoolState,
    tick_radius: i32,
    bin_radius: i64,
) -> (Vec<i32>, Vec<i64>) {
    match state {
        PoolState::PumpSwap(_) | PoolState::RaydiumAmm(_) => (Vec::new(), Vec::new()),
        PoolState::RaydiumClmm(p) => {
            let ticks_per_array = i32::from(p.tick_spacing) * raydium_clmm::TICK_ARRAY_SIZE;
            let current = p.tick_array_start_index(p.tick_current);
            let indexes = (-tick_radius..=tick_radius)
                .map(|r| current + r * ticks_per_array)
                .collect();
            (indexes, Vec::new())
        }
        PoolState::MeteoraDlmm(p) => {
            let current = meteora_dlmm::bin_array_index(p.active_id);
            let indexes = (-bin_radius..=bin_radius).map(|r| current + r).collect();
            (Vec::new(), indexes)
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ActivationOutcome {
    Activated,
    Incomplete(IncompleteReason),
    /// Pool is not in a phase where activation applies.
    NotFrozen,
}

#[derive(Debug)]
struct PoolEntry {
    phase: PoolPhase,
    reason: Option<IncompleteReason>,
    dirty: bool,
}

/// Owns the pool lifecycle map, the frozen topologies and the reverse
/// `account -> pools` index. Single-threaded: only the critical worker
/// touches it.
pub struct TopologyOracle {
    tick_radius: i32,
    bin_radius: i64,
    subscription_start_slot: u64,
    entries: AHashMap<Pubkey, PoolEntry>,
    topologies: AHashMap<Pubkey, FrozenTopology>,
    account_pools: AHashMap<Pubkey, AHashSet<Pubkey>>,
}

impl TopologyOracle {
    #[must_use]
    pub fn new(tick_radius: i32, bin_radius: i64) -> Self {
        Self {
            tick_radius,
            bin_radius,
            subscription_start_slot: 0,
            entries: AHashMap::new(),
            topologies: AHashMap::new(),
            account_pools: AHashMap::new(),
        }
    }

    /// Records where the live stream began; the convergence predicate
    /// measures bootstrap data against this slot.
    pub fn set_subscription_start(&mut self, slot: u64) {
        self.subscription_start_slot = slot;
    }

    /// Registers a pool on first decode. Returns true when new.
    pub fn observe_pool(&mut self, pool: Pubkey) -> bool {
        if self.entries.contains_key(&pool) {
            return false;
        }
        self.entries.insert(
            pool,
            PoolEntry {
                phase: PoolPhase::Discovered,
                reason: None,
                dirty: true,
            },
        );
        true
    }

    #[must_use]
    pub fn phase(&self, pool: &Pubkey) -> Option<PoolPhase> {
        self.entries.get(pool).map(|e| e.phase)
    }

    #[must_use]
    pub fn incomplete_reason(&self, pool: &Pubkey) -> Option<&IncompleteReason> {
        self.entries.get(pool).and_then(|e| e.reason.as_ref())
    }

    #[must_use]
    pub fn topology(&self, pool: &Pubkey) -> Option<&FrozenTopology> {
        self.topologies.get(pool)
    }

    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.entries.len()
    }

    /// Snapshots the dependency set and transitions to `Frozen`. Valid
    /// from `Discovered` and `Refreshing` only.
    pub fn freeze_pool(
        &mut self,
        pool: Pubkey,
        state: &PoolState,
        slot: u64,
        now_ms: u64,
    ) -> Result<(), lifecycle::TransitionError> {
        let phase = self
            .entries
            .get(&pool)
            .map_or(PoolPhase::Discovered, |e| e.phase);

        if !phase.can_freeze() {
            return Err(lifecycle::TransitionError {
                from: phase,
                to: PoolPhase::Frozen,
            });
        }

        let (tick_array_indexes, bin_array_indexes) =
            derive_pool_dependencies(state, self.tick_radius, self.bin_radius);

        let topology = FrozenTopology {
            pool,
            venue: state.venue(),
            base_vault: state.vault_a(),
            quote_vault: state.vault_b(),
            tick_array_indexes,
            bin_array_indexes,
            amm_config: state.amm_config(),
            frozen_at_slot: slot,
            frozen_at_ms: now_ms,
        };

        // Minimal churn: relink only the delta against the previous set.
        if let Some(old) = self.topologies.get(&pool) {
            let old_accounts = old.accounts();
            for key in &old_accounts {
                if let Some(pools) = self.account_pools.get_mut(key) {
                    pools.remove(&pool);
                    if pools.is_empty() {
                        self.account_pools.remove(key);
                    }
                }
            }
        }
        for key in topology.accounts() {
            self.account_pools.entry(key).or_default().insert(pool);
        }

        self.topologies.insert(pool, topology);

        let next = lifecycle::transition(phase, PoolPhase::Frozen)?;
        let entry = self.entries.entry(pool).or_insert(PoolEntry {
            phase: PoolPhase::Discovered,
            reason: None,
            dirty: true,
        });
        entry.phase = next;
        entry.reason = None;
        entry.dirty = true;

        debug!(pool = %pool, slot, "Pool topology frozen");
        Ok(())
    }

    /// Write gate for frozen dependencies: once an account feeds a
    /// frozen pool, only gRPC writes or bootstrap writes at or after
    /// the subscription start may mutate it.
    #[must_use]
    pub fn allows_write(&self, account: &Pubkey, source: UpdateSource, slot: u64) -> bool {
        let guards_frozen_dep = self
            .account_pools
            .get(account)
            .is_some_and(|pools| !pools.is_empty())
            || self
                .entries
                .get(account)
                .is_some_and(|e| e.phase != PoolPhase::Discovered);

        if !guards_frozen_dep {
            return true;
        }

        match source {
            UpdateSource::Grpc => true,
            UpdateSource::Bootstrap => slot >= self.subscription_start_slot,
            UpdateSource::Pending => false,
        }
    }

    /// Checks the full dependency set and the convergence predicate;
    /// transitions to `Active` or `Incomplete` with a structured
    /// reason.
    pub fn try_activate(&mut self, pool: &Pubkey, caches: &StateCaches) -> ActivationOutcome {
        let Some(entry) = self.entries.get(pool) else {
            return ActivationOutcome::NotFrozen;
        };
        if !matches!(entry.phase, PoolPhase::Frozen | PoolPhase::Incomplete) {
            return ActivationOutcome::NotFrozen;
        }
        let Some(topology) = self.topologies.get(pool) else {
            return ActivationOutcome::NotFrozen;
        };

        let outcome = self.check_dependencies(pool, topology, caches);

        let Some(entry) = self.entries.get_mut(pool) else {
            return outcome;
        };
        match &outcome {
            ActivationOutcome::Activated => {
                if let Ok(next) = lifecycle::transition(entry.phase, PoolPhase::Active) {
                    entry.phase = next;
                    entry.reason = None;
                }
            }
            ActivationOutcome::Incomplete(reason) => {
                if let Ok(next) = lifecycle::transition(entry.phase, PoolPhase::Incomplete) {
                    entry.phase = next;
                    entry.reason = Some(reason.clone());
                }
            }
            ActivationOutcome::NotFrozen => {}
        }

        outcome
    }

    fn check_dependencies(
        &self,
        pool: &Pubkey,
        topology: &FrozenTopology,
        caches: &StateCaches,
    ) -> ActivationOutcome {
        use ActivationOutcome::Incomplete;

        let Some(pool_entry) = caches.pools.get(pool) else {
            return Incomplete(IncompleteReason::MissingVaults(2));
        };
        if !pool_entry.value.is_enabled() {
            return Incomplete(IncompleteReason::PoolDisabled);
        }

        // Vaults: cached and convergent.
        let mut missing_vaults = 0;
        for vault in [topology.base_vault, topology.quote_vault] {
            match caches.vaults.get(&vault) {
                None => missing_vaults += 1,
                Some(entry) => {
                    if !self.is_convergent(entry) {
                        return Incomplete(IncompleteReason::Convergence(vault));
                    }
                }
            }
        }
        if missing_vaults > 0 {
            return Incomplete(IncompleteReason::MissingVaults(missing_vaults));
        }

        // Config: the only static-allowlisted dependency. Presence is
        // required; convergence is not (the account is immutable for
        // simulation purposes).
        if let Some(config) = topology.amm_config {
            assert!(
                self.is_static_dep(topology, &config),
                "static allowlist violation"
            );
            let present = match topology.venue {
                Venue::RaydiumClmm => caches.clmm_configs.get(&config).is_some(),
                Venue::PumpSwap => caches.pump_configs.get(&config).is_some(),
                Venue::RaydiumAmm | Venue::MeteoraDlmm => true,
            };
            if !present {
                return Incomplete(IncompleteReason::MissingConfig);
            }
        }

        // Arrays: every required index resolved (real and convergent,
        // or tombstoned virtual), and at least one real when any were
        // required.
        let mut missing = 0;
        let mut real = 0;
        for index in &topology.tick_array_indexes {
            match caches.tick_arrays.lookup(&(*pool, *index)) {
                Lookup::Present(entry) => {
                    if !self.is_convergent(entry) {
                        return Incomplete(IncompleteReason::Convergence(*pool));
                    }
                    real += 1;
                }
                Lookup::NonExistent => {}
                Lookup::Missing => missing += 1,
            }
        }
        if missing > 0 {
            return Incomplete(IncompleteReason::MissingTickArrays(missing));
        }

        let mut missing = 0;
        for index in &topology.bin_array_indexes {
            match caches.bin_arrays.lookup(&(*pool, *index)) {
                Lookup::Present(entry) => {
                    if !self.is_convergent(entry) {
                        return Incomplete(IncompleteReason::Convergence(*pool));
                    }
                    real += 1;
                }
                Lookup::NonExistent => {}
                Lookup::Missing => missing += 1,
            }
        }
        if missing > 0 {
            return Incomplete(IncompleteReason::MissingBinArrays(missing));
        }

        let arrays_required =
            !topology.tick_array_indexes.is_empty() || !topology.bin_array_indexes.is_empty();
        if arrays_required && real == 0 {
            return Incomplete(IncompleteReason::AllArraysVirtual);
        }

        ActivationOutcome::Activated
    }

    fn is_convergent<V>(&self, entry: &Entry<V>) -> bool {
        match entry.source {
            UpdateSource::Grpc => true,
            UpdateSource::Bootstrap => entry.slot >= self.subscription_start_slot,
            UpdateSource::Pending => false,
        }
    }

    fn is_static_dep(&self, topology: &FrozenTopology, key: &Pubkey) -> bool {
        topology.amm_config == Some(*key)
    }

    /// Union of vault accounts across all frozen topologies, for the
    /// stream driver's subscription set.
    #[must_use]
    pub fn watched_vaults(&self) -> Vec<Pubkey> {
        let mut vaults: Vec<Pubkey> = self
            .topologies
            .values()
            .flat_map(|t| [t.base_vault, t.quote_vault])
            .collect();
        vaults.sort_unstable();
        vaults.dedup();
        vaults
    }

    /// Marks pools depending on `account` dirty; returns them.
    pub fn mark_dirty(&mut self, account: &Pubkey) -> Vec<Pubkey> {
        let mut affected = Vec::new();

        if let Some(pools) = self.account_pools.get(account) {
            affected.extend(pools.iter().copied());
        }
        if self.entries.contains_key(account) {
            affected.push(*account);
        }

        for pool in &affected {
            if let Some(entry) = self.entries.get_mut(pool) {
                entry.dirty = true;
            }
        }
        affected
    }

    pub fn mark_pool_dirty(&mut self, pool: &Pubkey) {
        if let Some(entry) = self.entries.get_mut(pool) {
            entry.dirty = true;
        }
    }

    /// Drains the dirty set for the worker's transition sweep.
    pub fn take_dirty(&mut self) -> Vec<Pubkey> {
        let mut dirty = Vec::new();
        for (pool, entry) in self.entries.iter_mut() {
            if entry.dirty {
                entry.dirty = false;
                dirty.push(*pool);
            }
        }
        dirty
    }

    /// The inferred dependency window drifted away from the frozen
    /// one (tick left the radius, active bin changed arrays).
    #[must_use]
    pub fn needs_refresh(&self, pool: &Pubkey, state: &PoolState) -> bool {
        let Some(topology) = self.topologies.get(pool) else {
            return false;
        };
        let (ticks, bins) = derive_pool_dependencies(state, self.tick_radius, self.bin_radius);
        ticks != topology.tick_array_indexes || bins != topology.bin_array_indexes
    }

    /// `Active -> Refreshing`; the caller re-freezes with current state.
    pub fn begin_refresh(&mut self, pool: &Pubkey) -> Result<(), lifecycle::TransitionError> {
        let Some(entry) = self.entries.get_mut(pool) else {
            return Ok(());
        };
        entry.phase = lifecycle::transition(entry.phase, PoolPhase::Refreshing)?;
        Ok(())
    }

    pub fn retire(&mut self, pool: &Pubkey) {
        if let Some(entry) = self.entries.get_mut(pool)
            && let Ok(next) = lifecycle::transition(entry.phase, PoolPhase::Retired)
        {
            entry.phase = next;
        }
        if let Some(old) = self.topologies.remove(pool) {
            for key in old.accounts() {
                if let Some(pools) = self.account_pools.get_mut(&key) {
                    pools.remove(pool);
                    if pools.is_empty() {
                        self.account_pools.remove(&key);
                    }
                }
            }
        }
    }
}
