//! In-memory bundle history: LRU-capped records with
//! submit/land/fail transitions and the per-pool in-flight gate.

use std::collections::VecDeque;

use ahash::AHashMap;
use engine::{METRICS, enums::BundleStatus};
use solana_sdk::pubkey::Pubkey;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct BundleRecord {
    pub id: Uuid,
    pub pool: Pubkey,
    pub status: BundleStatus,
    pub relay_id: Option<String>,
    pub submitted_at_ms: u64,
    pub profit_est: i128,
}

pub struct BundleRegistry {
    capacity: usize,
    records: AHashMap<Uuid, BundleRecord>,
    order: VecDeque<Uuid>,
    /// At most one in-flight submission per pool.
    inflight: AHashMap<Pubkey, Uuid>,
}

impl BundleRegistry {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: AHashMap::new(),
            order: VecDeque::new(),
            inflight: AHashMap::new(),
        }
    }

    #[must_use]
    pub fn has_inflight(&self, pool: &Pubkey) -> bool {
        self.inflight.contains_key(pool)
    }

    #[must_use]
    pub fn get(&self, id: &Uuid) -> Option<&BundleRecord> {
        self.records.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record_submitted(
        &mut self,
        id: Uuid,
        pool: Pubkey,
        relay_id: Option<String>,
        profit_est: i128,
        now_ms: u64,
    ) {
        if self.records.len() == self.capacity
            && let Some(oldest) = self.order.pop_front()
            && let Some(evicted) = self.records.remove(&oldest)
        {
            // Keep the gate consistent if the evicted record was
            // somehow still marked in flight.
            if self.inflight.get(&evicted.pool) == Some(&oldest) {
                self.inflight.remove(&evicted.pool);
            }
        }

        self.records.insert(
            id,
            BundleRecord {
                id,
                pool,
                status: BundleStatus::Submitted,
                relay_id,
                submitted_at_ms: now_ms,
                profit_est,
            },
        );
        self.order.push_back(id);
        self.inflight.insert(pool, id);
        METRICS.record_bundle_status(BundleStatus::Submitted);
    }

    /// Submitted records with a relay id, for status polling.
    #[must_use]
    pub fn submitted(&self) -> Vec<(Uuid, String)> {
        self.records
            .values()
            .filter(|r| r.status == BundleStatus::Submitted)
            .filter_map(|r| r.relay_id.clone().map(|relay_id| (r.id, relay_id)))
            .collect()
    }

    pub fn mark_landed(&mut self, id: &Uuid) {
        self.transition(id, BundleStatus::Landed);
    }

    pub fn mark_failed(&mut self, id: &Uuid) {
        self.transition(id, BundleStatus::Failed);
    }

    /// Times out submitted bundles past the deadline; returns how many
    /// were expired.
    pub fn expire_older_than(&mut self, timeout_ms: u64, now_ms: u64) -> usize {
        let expired: Vec<Uuid> = self
            .records
            .values()
            .filter(|r| {
                r.status == BundleStatus::Submitted
                    && now_ms.saturating_sub(r.submitted_at_ms) > timeout_ms
            })
            .map(|r| r.id)
            .collect();

        for id in &expired {
            self.transition(id, BundleStatus::Expired);
        }
        expired.len()
    }

    fn transition(&mut self, id: &Uuid, status: BundleStatus) {
        let Some(record) = self.records.get_mut(id) else {
            return;
        };
        if record.status != BundleStatus::Submitted {
            return;
        }
        record.status = status;
        if self.inflight.get(&record.pool) == Some(id) {
            self.inflight.remove(&record.pool);
        }
        METRICS.record_bundle_status(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_sets_inflight_gate() {
        let mut registry = BundleRegistry::new(8);
        let pool = Pubkey::new_unique();
        let id = Uuid::new_v4();

        assert!(!registry.has_inflight(&pool));
        registry.record_submitted(id, pool, Some("r1".to_owned()), 1_000, 1);
        assert!(registry.has_inflight(&pool));

        registry.mark_landed(&id);
        assert!(!registry.has_inflight(&pool));
        assert_eq!(registry.get(&id).unwrap().status, BundleStatus::Landed);
    }

    #[test]
    fn test_terminal_states_do_not_regress() {
        let mut registry = BundleRegistry::new(8);
        let pool = Pubkey::new_unique();
        let id = Uuid::new_v4();

        registry.record_submitted(id, pool, None, 0, 1);
        registry.mark_failed(&id);
        registry.mark_landed(&id);
        assert_eq!(registry.get(&id).unwrap().status, BundleStatus::Failed);
    }

    #[test]
    fn test_lru_eviction_caps_size() {
        let mut registry = BundleRegistry::new(2);
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();

        for id in &ids {
            registry.record_submitted(*id, Pubkey::new_unique(), None, 0, 1);
        }

        assert_eq!(registry.len(), 2);
        assert!(registry.get(&ids[0]).is_none());
        assert!(registry.get(&ids[2]).is_some());
    }

    #[test]
    fn test_expiry_sweep() {
        let mut registry = BundleRegistry::new(8);
        let pool = Pubkey::new_unique();
        let id = Uuid::new_v4();

        registry.record_submitted(id, pool, None, 0, 1_000);
        assert_eq!(registry.expire_older_than(5_000, 3_000), 0);
        assert_eq!(registry.expire_older_than(5_000, 7_000), 1);
        assert_eq!(registry.get(&id).unwrap().status, BundleStatus::Expired);
        assert!(!registry.has_inflight(&pool));
    }
}
