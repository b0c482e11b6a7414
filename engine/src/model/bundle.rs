use std::fmt::{Display, Formatter};

use tracing::info;
use uuid::Uuid;

/// A fully built, signed bundle handed from the critical worker to the
/// sender. Transactions are already wire-serialized so the engine stays
/// agnostic of the chain SDK; the sender only base64-encodes and ships.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BundleJob {
    pub ts: u64,
    pub id: Uuid,
    /// Wire-serialized signed transactions, relay order.
    pub transactions: Vec<Vec<u8>>,
    pub tip_lamports: u64,
    /// Base58 pool the opportunity was found on, for labels only.
    pub pool: String,
    pub venue: &'static str,
    /// Estimated net profit in lamports after gas and tip.
    pub profit_est: i128,
}

impl Display for BundleJob {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "bundle {} ({} txs, tip {} lamports, est profit {} lamports, pool {})",
            self.id,
            self.transactions.len(),
            self.tip_lamports,
            self.profit_est,
            self.pool,
        )
    }
}

impl BundleJob {
    /// The watch channel seeds receivers with a default value; an
    /// empty job is the "nothing yet" marker and must be skipped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn print_info(&self) {
        info!(
            ts = self.ts,
            id = %self.id,
            venue = self.venue,
            pool = %self.pool,
            tip = self.tip_lamports,
            profit_est = self.profit_est,
            "Bundle job queued"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_job_is_empty() {
        assert!(BundleJob::default().is_empty());
    }

    #[test]
    fn test_built_job_is_not_empty() {
        let job = BundleJob {
            transactions: vec![vec![1, 2, 3]],
            ..Default::default()
        };
        assert!(!job.is_empty());
    }
}
