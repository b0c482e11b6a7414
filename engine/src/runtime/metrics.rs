use std::sync::LazyLock;

use metrics::{counter, describe_counter, describe_histogram, histogram};

use crate::enums::{BundleStatus, RejectReason};

/// Global metrics registry for the application.
pub static METRICS: LazyLock<Metrics> = LazyLock::new(|| {
    describe_counter!(
        "account_updates_total",
        "Account updates received from the stream, by venue and source",
    );
    describe_counter!(
        "pool_decode_failed_total",
        "Accounts whose discriminator matched but decode failed, by venue",
    );
    describe_counter!(
        "decode_skipped_total",
        "Accounts/instructions skipped before decode (non-target owner, non-pool data)",
    );
    describe_counter!(
        "cache_commits_total",
        "Cache commits accepted, by entity kind",
    );
    describe_counter!(
        "cache_rejects_total",
        "Cache commits dropped as stale by (slot, write_version), by entity kind",
    );
    describe_counter!(
        "lifecycle_transitions_total",
        "Pool lifecycle transitions, by target phase",
    );
    describe_counter!(
        "opportunity_rejects_total",
        "Opportunities dropped, by rejection reason",
    );
    describe_counter!("alt_lookups_total", "ALT cache lookups, by outcome");
    describe_counter!(
        "speculative_ops_total",
        "Speculative overlay operations (applied, removed, expired)",
    );
    describe_counter!("bundles_total", "Bundle transitions, by status");
    describe_counter!(
        "evidence_dropped_total",
        "Evidence rows dropped on sink backpressure",
    );
    describe_histogram!("sim_latency_seconds", "Single-swap simulation latency");
    describe_histogram!(
        "decision_latency_seconds",
        "Pending-tx arrival to bundle-build decision latency",
    );

    Metrics
});

/// Application metrics facade (static methods for counters/histograms).
pub struct Metrics;

impl Metrics {
    pub fn record_account_update(&self, venue: &'static str, source: &'static str) {
        counter!("account_updates_total", "venue" => venue, "source" => source).increment(1);
    }

    pub fn record_pool_decode_failed(&self, venue: &'static str) {
        counter!("pool_decode_failed_total", "venue" => venue).increment(1);
    }

    pub fn record_decode_skipped(&self, kind: &'static str) {
        counter!("decode_skipped_total", "kind" => kind).increment(1);
    }

    pub fn record_cache_commit(&self, entity: &'static str) {
        counter!("cache_commits_total", "entity" => entity).increment(1);
    }

    pub fn record_cache_reject(&self, entity: &'static str) {
        counter!("cache_rejects_total", "entity" => entity).increment(1);
    }

    pub fn record_lifecycle_transition(&self, phase: &'static str) {
        counter!("lifecycle_transitions_total", "phase" => phase).increment(1);
    }

    pub fn record_rejection(&self, reason: RejectReason) {
        counter!("opportunity_rejects_total", "reason" => reason.to_string()).increment(1);
    }

    pub fn record_alt_lookup(&self, hit: bool) {
        let outcome = if hit { "hit" } else { "miss" };
        counter!("alt_lookups_total", "outcome" => outcome).increment(1);
    }

    pub fn record_speculative(&self, op: &'static str) {
        counter!("speculative_ops_total", "op" => op).increment(1);
    }

    pub fn record_bundle_status(&self, status: BundleStatus) {
        counter!("bundles_total", "status" => status.to_string()).increment(1);
    }

    pub fn record_evidence_drop(&self) {
        counter!("evidence_dropped_total").increment(1);
    }

    pub fn record_sim_latency(&self, venue: &'static str, seconds: f64) {
        histogram!("sim_latency_seconds", "venue" => venue).record(seconds);
    }

    pub fn record_decision_latency(&self, seconds: f64) {
        histogram!("decision_latency_seconds").record(seconds);
    }
}
