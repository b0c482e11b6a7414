use std::collections::VecDeque;

use ahash::AHashMap;
use engine::METRICS;
use solana_sdk::{pubkey::Pubkey, signature::Signature};

/// Expected vault movement of one pending swap on one pool. Positive
/// delta on the input side, negative on the output side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolDelta {
    pub pool: Pubkey,
    pub vault_a_delta: i128,
    pub vault_b_delta: i128,
}

/// A pending transaction with its inferred pool deltas.
#[derive(Debug, Clone)]
pub struct PendingEntry {
    pub signature: Signature,
    pub slot: u64,
    pub deltas: Vec<PoolDelta>,
}

/// Confirmed reserves with the pending overlay applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeculativeSnapshot {
    pub reserve_a: u64,
    pub reserve_b: u64,
    pub confirmed_slot: u64,
    /// Highest slot among the pending signatures folded in.
    pub speculative_slot: u64,
    pub pending_count: usize,
}

#[derive(Debug, Clone, Copy)]
struct AppliedDelta {
    vault_a_delta: i128,
    vault_b_delta: i128,
    slot: u64,
    applied_at_ms: u64,
}

#[derive(Debug, Default)]
struct Accumulator {
    vault_a_delta: i128,
    vault_b_delta: i128,
    pending: AHashMap<Signature, AppliedDelta>,
}

/// Overlay of pending-transaction deltas on confirmed reserves, so
/// backrun simulations run against post-victim state. Apply is
/// idempotent per `(signature, pool)`; remove restores the exact
/// pre-apply accumulator.
pub struct SpeculativeLayer {
    pools: AHashMap<Pubkey, Accumulator>,
    sig_pools: AHashMap<Signature, Vec<Pubkey>>,
    timeout_ms: u64,
}

impl SpeculativeLayer {
    #[must_use]
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            pools: AHashMap::new(),
            sig_pools: AHashMap::new(),
            timeout_ms,
        }
    }

    /// Folds the entry's deltas in, once per signature.
    pub fn apply(&mut self, entry: &PendingEntry, now_ms: u64) {
        for delta in &entry.deltas {
            let acc = self.pools.entry(delta.pool).or_default();
            if acc.pending.contains_key(&entry.signature) {
                continue;
            }

            acc.vault_a_delta += delta.vault_a_delta;
            acc.vault_b_delta += delta.vault_b_delta;
            acc.pending.insert(
                entry.signature,
                AppliedDelta {
                    vault_a_delta: delta.vault_a_delta,
                    vault_b_delta: delta.vault_b_delta,
                    slot: entry.slot,
                    applied_at_ms: now_ms,
                },
            );

            self.sig_pools
                .entry(entry.signature)
                .or_default()
                .push(delta.pool);
            METRICS.record_speculative("applied");
        }
    }

    /// Retires a signature (confirmation or drop), restoring the
    /// accumulator. Removal of the last signature leaves a zero delta.
    pub fn remove(&mut self, signature: &Signature) {
        let Some(pools) = self.sig_pools.remove(signature) else {
            return;
        };

        for pool in pools {
            if let Some(acc) = self.pools.get_mut(&pool) {
                if let Some(applied) = acc.pending.remove(signature) {
                    acc.vault_a_delta -= applied.vault_a_delta;
                    acc.vault_b_delta -= applied.vault_b_delta;
                    METRICS.record_speculative("removed");
                }
                if acc.pending.is_empty() {
                    self.pools.remove(&pool);
                }
            }
        }
    }

    /// Sweeps overlays older than the configured timeout. Returns the
    /// number of expired signatures.
    pub fn expire(&mut self, now_ms: u64) -> usize {
        let mut expired = Vec::new();
        for (sig, pools) in &self.sig_pools {
            let timed_out = pools.iter().any(|pool| {
                self.pools
                    .get(pool)
                    .and_then(|acc| acc.pending.get(sig))
                    .is_some_and(|a| now_ms.saturating_sub(a.applied_at_ms) > self.timeout_ms)
            });
            if timed_out {
                expired.push(*sig);
            }
        }

        for sig in &expired {
            self.remove(sig);
            METRICS.record_speculative("expired");
        }
        expired.len()
    }

    #[must_use]
    pub fn has_pending(&self, pool: &Pubkey) -> bool {
        self.pools.contains_key(pool)
    }

    #[must_use]
    pub fn pending_signatures(&self, pool: &Pubkey) -> usize {
        self.pools.get(pool).map_or(0, |acc| acc.pending.len())
    }

    #[must_use]
    pub fn tracked_signatures(&self) -> usize {
        self.sig_pools.len()
    }

    #[must_use]
    pub fn is_tracked(&self, signature: &Signature) -> bool {
        self.sig_pools.contains_key(signature)
    }

    /// Confirmed reserves plus overlay, floored at zero. i128 keeps a
    /// large negative delta from wrapping before the floor applies.
    #[must_use]
    pub fn snapshot(
        &self,
        pool: &Pubkey,
        reserve_a: u64,
        reserve_b: u64,
        confirmed_slot: u64,
    ) -> SpeculativeSnapshot {
        let Some(acc) = self.pools.get(pool) else {
            return SpeculativeSnapshot {
                reserve_a,
                reserve_b,
                confirmed_slot,
                speculative_slot: confirmed_slot,
                pending_count: 0,
            };
        };

        let apply = |reserve: u64, delta: i128| -> u64 {
            let merged = i128::from(reserve) + delta;
            merged.clamp(0, i128::from(u64::MAX)) as u64
        };

        let speculative_slot = acc
            .pending
            .values()
            .map(|a| a.slot)
            .max()
            .unwrap_or(confirmed_slot)
            .max(confirmed_slot);

        SpeculativeSnapshot {
            reserve_a: apply(reserve_a, acc.vault_a_delta),
            reserve_b: apply(reserve_b, acc.vault_b_delta),
            confirmed_slot,
            speculative_slot,
            pending_count: acc.pending.len(),
        }
    }
}

/// Rolling predicted-vs-observed accuracy over post-confirm reserves,
/// within a 10 bps tolerance.
pub struct PredictionRecorder {
    window: VecDeque<bool>,
    capacity: usize,
}

impl PredictionRecorder {
    const TOLERANCE_BPS: u128 = 10;

    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Single-sided sample, for when only one vault of the pair has
    /// confirmed so far.
    pub fn record_one(&mut self, predicted: u64, observed: u64) {
        self.record((predicted, predicted), (observed, observed));
    }

    pub fn record(&mut self, predicted: (u64, u64), observed: (u64, u64)) {
        let hit = Self::within_tolerance(predicted.0, observed.0)
            && Self::within_tolerance(predicted.1, observed.1);
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(hit);
    }

    fn within_tolerance(predicted: u64, observed: u64) -> bool {
        if observed == 0 {
            return predicted == 0;
        }
        let diff = u128::from(predicted.abs_diff(observed));
        diff * 10_000 <= u128::from(observed) * Self::TOLERANCE_BPS
    }

    #[must_use]
    pub fn accuracy(&self) -> Option<f64> {
        if self.window.is_empty() {
            return None;
        }
        let hits = self.window.iter().filter(|h| **h).count();
        Some(hits as f64 / self.window.len() as f64)
    }

    #[must_use]
    pub fn samples(&self) -> usize {
        self.window.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(n: u8) -> Signature {
        Signature::from([n; 64])
    }

    fn entry(n: u8, pool: Pubkey, a: i128, b: i128) -> PendingEntry {
        PendingEntry {
            signature: sig(n),
            slot: 100,
            deltas: vec![PoolDelta {
                pool,
                vault_a_delta: a,
                vault_b_delta: b,
            }],
        }
    }

    #[test]
    fn test_apply_and_remove_roundtrip() {
        let pool = Pubkey::new_unique();
        let mut layer = SpeculativeLayer::new(5_000);

        layer.apply(&entry(1, pool, 100, -182), 0);
        let snap = layer.snapshot(&pool, 1_000, 2_000, 50);
        assert_eq!((snap.reserve_a, snap.reserve_b), (1_100, 1_818));
        assert_eq!(snap.pending_count, 1);
        assert_eq!(snap.speculative_slot, 100);

        layer.remove(&sig(1));
        let snap = layer.snapshot(&pool, 1_000, 2_000, 50);
        assert_eq!((snap.reserve_a, snap.reserve_b), (1_000, 2_000));
        assert_eq!(snap.pending_count, 0);
        assert_eq!(snap.speculative_slot, 50);
        assert!(!layer.has_pending(&pool));
    }

    #[test]
    fn test_apply_is_idempotent_per_signature() {
        let pool = Pubkey::new_unique();
        let mut layer = SpeculativeLayer::new(5_000);

        let e = entry(1, pool, 100, -182);
        layer.apply(&e, 0);
        layer.apply(&e, 1);

        let snap = layer.snapshot(&pool, 1_000, 2_000, 50);
        assert_eq!((snap.reserve_a, snap.reserve_b), (1_100, 1_818));

        // apply; apply; remove == apply; remove.
        layer.remove(&sig(1));
        let snap = layer.snapshot(&pool, 1_000, 2_000, 50);
        assert_eq!((snap.reserve_a, snap.reserve_b), (1_000, 2_000));
    }

    #[test]
    fn test_multiple_signatures_accumulate() {
        let pool = Pubkey::new_unique();
        let mut layer = SpeculativeLayer::new(5_000);

        layer.apply(&entry(1, pool, 100, -50), 0);
        layer.apply(&entry(2, pool, 30, -10), 0);

        let snap = layer.snapshot(&pool, 1_000, 1_000, 10);
        assert_eq!((snap.reserve_a, snap.reserve_b), (1_130, 940));

        layer.remove(&sig(1));
        let snap = layer.snapshot(&pool, 1_000, 1_000, 10);
        assert_eq!((snap.reserve_a, snap.reserve_b), (1_030, 990));
    }

    #[test]
    fn test_snapshot_floors_at_zero() {
        let pool = Pubkey::new_unique();
        let mut layer = SpeculativeLayer::new(5_000);

        layer.apply(&entry(1, pool, -5_000, 0), 0);
        let snap = layer.snapshot(&pool, 1_000, 1_000, 10);
        assert_eq!(snap.reserve_a, 0);
        assert_eq!(snap.reserve_b, 1_000);
    }

    #[test]
    fn test_expire_sweeps_old_overlays() {
        let pool = Pubkey::new_unique();
        let mut layer = SpeculativeLayer::new(5_000);

        layer.apply(&entry(1, pool, 10, -10), 0);
        layer.apply(&entry(2, pool, 20, -20), 4_000);

        assert_eq!(layer.expire(6_000), 1);
        assert!(layer.is_tracked(&sig(2)));
        assert!(!layer.is_tracked(&sig(1)));

        let snap = layer.snapshot(&pool, 100, 100, 1);
        assert_eq!((snap.reserve_a, snap.reserve_b), (120, 80));
    }

    #[test]
    fn test_prediction_recorder_tolerance() {
        let mut rec = PredictionRecorder::new(4);

        rec.record((10_000, 10_000), (10_005, 10_000)); // 5 bps: hit
        rec.record((10_000, 10_000), (10_020, 10_000)); // 20 bps: miss
        rec.record((0, 0), (0, 0)); // exact zero: hit

        assert_eq!(rec.samples(), 3);
        let accuracy = rec.accuracy().unwrap();
        assert!((accuracy - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_prediction_recorder_window_caps() {
        let mut rec = PredictionRecorder::new(2);
        rec.record((1, 1), (100, 100));
        rec.record((1, 1), (1, 1));
        rec.record((1, 1), (1, 1));
        assert_eq!(rec.samples(), 2);
        assert_eq!(rec.accuracy(), Some(1.0));
    }
}
