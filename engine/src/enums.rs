use std::fmt::{Display, Formatter};

use strum::EnumIter;

/// Why a candidate opportunity was dropped. Every decision point in
/// the pipeline maps to exactly one of these; the set is closed so
/// that counters and evidence rows stay joinable offline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter)]
pub enum RejectReason {
    MissingTopology,
    MissingReserves,
    StaleData,
    NoPool,
    NoSpread,
    BelowThreshold,
    SimFailure,
    BondingCurve,
    DustInput,
    WeirdFlow,
    EmptyPool,
    SlippageExceeded,
    InsufficientLiquidity,
    MathOverflow,
    Unknown,
}

impl Display for RejectReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::MissingTopology => "missing_topology",
            Self::MissingReserves => "missing_reserves",
            Self::StaleData => "stale_data",
            Self::NoPool => "no_pool",
            Self::NoSpread => "no_spread",
            Self::BelowThreshold => "below_threshold",
            Self::SimFailure => "sim_failure",
            Self::BondingCurve => "bonding_curve",
            Self::DustInput => "dust_input",
            Self::WeirdFlow => "weird_flow",
            Self::EmptyPool => "empty_pool",
            Self::SlippageExceeded => "slippage_exceeded",
            Self::InsufficientLiquidity => "insufficient_liquidity",
            Self::MathOverflow => "math_overflow",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Relay-side lifecycle of a submitted bundle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter)]
pub enum BundleStatus {
    Submitted,
    Landed,
    Failed,
    Expired,
}

impl Display for BundleStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Submitted => f.write_str("submitted"),
            Self::Landed => f.write_str("landed"),
            Self::Failed => f.write_str("failed"),
            Self::Expired => f.write_str("expired"),
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_reject_reason_labels_are_unique() {
        let labels: Vec<String> = RejectReason::iter().map(|r| r.to_string()).collect();
        let mut deduped = labels.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(labels.len(), deduped.len());
    }

    #[test]
    fn test_bundle_status_labels() {
        assert_eq!(BundleStatus::Submitted.to_string(), "submitted");
        assert_eq!(BundleStatus::Landed.to_string(), "landed");
    }
}
