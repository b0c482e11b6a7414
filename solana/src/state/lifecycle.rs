use std::fmt::{Display, Formatter};

use engine::METRICS;
use thiserror::Error;

/// Per-pool lifecycle:
///
/// ```text
/// Discovered --freeze--> Frozen --activate--> Active
///                          |                    |
///                          +-- markIncomplete <-+
///                                               |
///                                           Refreshing
/// ```
///
/// `Retired` is terminal and reachable from anywhere. Transitions are
/// monotone apart from the refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolPhase {
    Discovered,
    Frozen,
    Incomplete,
    Active,
    Refreshing,
    Retired,
}

impl PoolPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Frozen => "frozen",
            Self::Incomplete => "incomplete",
            Self::Active => "active",
            Self::Refreshing => "refreshing",
            Self::Retired => "retired",
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        if next == Self::Retired {
            return self != Self::Retired;
        }

        matches!(
            (self, next),
            (Self::Discovered, Self::Frozen)
                | (Self::Frozen, Self::Active)
                | (Self::Frozen, Self::Incomplete)
                | (Self::Incomplete, Self::Active)
                | (Self::Incomplete, Self::Incomplete)
                | (Self::Active, Self::Refreshing)
                | (Self::Refreshing, Self::Frozen)
        )
    }

    /// `freeze_pool` is only valid from these phases.
    #[must_use]
    pub fn can_freeze(self) -> bool {
        matches!(self, Self::Discovered | Self::Refreshing)
    }
}

impl Display for PoolPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid lifecycle transition {from} -> {to}")]
pub struct TransitionError {
    pub from: PoolPhase,
    pub to: PoolPhase,
}

/// Applies a transition, recording it in metrics. The caller keeps the
/// returned phase; invalid transitions leave state untouched.
pub fn transition(from: PoolPhase, to: PoolPhase) -> Result<PoolPhase, TransitionError> {
    if !from.can_transition_to(to) {
        return Err(TransitionError { from, to });
    }
    METRICS.record_lifecycle_transition(to.as_str());
    Ok(to)
}

/// Why activation was refused; attached to the `Incomplete` phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncompleteReason {
    MissingVaults(usize),
    MissingTickArrays(usize),
    MissingBinArrays(usize),
    MissingConfig,
    /// A dependency exists but fails the convergence predicate.
    Convergence(solana_sdk::pubkey::Pubkey),
    /// Every required array is virtual; simulating against nothing but
    /// synthetic zero liquidity is meaningless.
    AllArraysVirtual,
    PoolDisabled,
}

impl Display for IncompleteReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingVaults(n) => write!(f, "missing_vaults({n})"),
            Self::MissingTickArrays(n) => write!(f, "missing_tick_arrays({n})"),
            Self::MissingBinArrays(n) => write!(f, "missing_bin_arrays({n})"),
            Self::MissingConfig => f.write_str("missing_config"),
            Self::Convergence(key) => write!(f, "convergence({key})"),
            Self::AllArraysVirtual => f.write_str("all_arrays_virtual"),
            Self::PoolDisabled => f.write_str("pool_disabled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut phase = PoolPhase::Discovered;
        for next in [
            PoolPhase::Frozen,
            PoolPhase::Active,
            PoolPhase::Refreshing,
            PoolPhase::Frozen,
            PoolPhase::Incomplete,
            PoolPhase::Active,
        ] {
            phase = transition(phase, next).unwrap();
        }
        assert_eq!(phase, PoolPhase::Active);
    }

    #[test]
    fn test_no_backwards_transitions() {
        assert!(transition(PoolPhase::Active, PoolPhase::Discovered).is_err());
        assert!(transition(PoolPhase::Active, PoolPhase::Frozen).is_err());
        assert!(transition(PoolPhase::Frozen, PoolPhase::Discovered).is_err());
        assert!(transition(PoolPhase::Incomplete, PoolPhase::Frozen).is_err());
        assert!(transition(PoolPhase::Discovered, PoolPhase::Active).is_err());
    }

    #[test]
    fn test_retired_is_terminal() {
        for phase in [
            PoolPhase::Discovered,
            PoolPhase::Frozen,
            PoolPhase::Incomplete,
            PoolPhase::Active,
            PoolPhase::Refreshing,
        ] {
            assert!(transition(phase, PoolPhase::Retired).is_ok());
        }
        assert!(transition(PoolPhase::Retired, PoolPhase::Retired).is_err());
        assert!(transition(PoolPhase::Retired, PoolPhase::Active).is_err());
    }

    #[test]
    fn test_freeze_only_from_discovered_or_refreshing() {
        assert!(PoolPhase::Discovered.can_freeze());
        assert!(PoolPhase::Refreshing.can_freeze());
        assert!(!PoolPhase::Active.can_freeze());
        assert!(!PoolPhase::Frozen.can_freeze());
        assert!(!PoolPhase::Incomplete.can_freeze());
    }
}
