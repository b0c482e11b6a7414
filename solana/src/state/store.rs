use std::hash::Hash;

use ahash::AHashMap;
use engine::METRICS;

use crate::libs::solana_client::dex::UpdateSource;

/// A committed value plus the ordering/provenance metadata every
/// downstream check needs.
#[derive(Debug, Clone)]
pub struct Entry<V> {
    pub value: V,
    pub slot: u64,
    pub write_version: u64,
    pub source: UpdateSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Accepted,
    /// Dropped: not strictly newer by `(slot, write_version)`.
    Stale,
}

/// Lookup result distinguishing "never seen" from "known absent".
pub enum Lookup<'a, V> {
    Present(&'a Entry<V>),
    /// Tombstone: the chain says this account does not exist (bitmap
    /// cleared for an array index, closed account).
    NonExistent,
    Missing,
}

/// Typed per-entity store with monotone `(slot, write_version)` commit
/// discipline. Single writer (the critical worker); readers take
/// snapshots via clone of the entry values they need.
pub struct Store<K, V> {
    entity: &'static str,
    map: AHashMap<K, Slot<V>>,
}

#[derive(Debug, Clone)]
enum Slot<V> {
    Present(Entry<V>),
    NonExistent,
}

impl<K: Eq + Hash + Copy, V> Store<K, V> {
    #[must_use]
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            map: AHashMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, key: &K) -> Option<&Entry<V>> {
        match self.map.get(key) {
            Some(Slot::Present(entry)) => Some(entry),
            _ => None,
        }
    }

    #[must_use]
    pub fn lookup(&self, key: &K) -> Lookup<'_, V> {
        match self.map.get(key) {
            Some(Slot::Present(entry)) => Lookup::Present(entry),
            Some(Slot::NonExistent) => Lookup::NonExistent,
            None => Lookup::Missing,
        }
    }

    #[must_use]
    pub fn is_non_existent(&self, key: &K) -> bool {
        matches!(self.map.get(key), Some(Slot::NonExistent))
    }

    /// Accepts only strictly newer updates. A tombstone is replaced by
    /// any commit (the account came back into existence).
    pub fn commit(
        &mut self,
        key: K,
        value: V,
        slot: u64,
        write_version: u64,
        source: UpdateSource,
    ) -> CommitOutcome {
        if let Some(Slot::Present(existing)) = self.map.get(&key)
            && (slot, write_version) <= (existing.slot, existing.write_version)
        {
            METRICS.record_cache_reject(self.entity);
            return CommitOutcome::Stale;
        }

        self.map.insert(
            key,
            Slot::Present(Entry {
                value,
                slot,
                write_version,
                source,
            }),
        );
        METRICS.record_cache_commit(self.entity);
        CommitOutcome::Accepted
    }

    /// Records that the account is known not to exist; distinct from
    /// never having been fetched.
    pub fn mark_non_existent(&mut self, key: K) {
        self.map.insert(key, Slot::NonExistent);
    }

    pub fn remove(&mut self, key: &K) -> Option<Entry<V>> {
        match self.map.remove(key) {
            Some(Slot::Present(entry)) => Some(entry),
            _ => None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Array stores (ticks/bins) answer reads with a synthetic
/// zero-liquidity value when the index is tombstoned.
impl<K: Eq + Hash + Copy, V: Clone> Store<K, V> {
    /// `Some((value, is_virtual))`, or `None` when the key was never
    /// resolved either way.
    #[must_use]
    pub fn get_or_virtual(&self, key: &K, make_virtual: impl FnOnce() -> V) -> Option<(V, bool)> {
        match self.map.get(key) {
            Some(Slot::Present(entry)) => Some((entry.value.clone(), false)),
            Some(Slot::NonExistent) => Some((make_virtual(), true)),
            None => None,
        }
    }
}
