use ahash::AHashMap;
use solana_sdk::pubkey::Pubkey;
use tracing::trace;

use crate::libs::solana_client::dex::SwapDirection;

/// Reserve-ratio ceiling beyond which the pool is in its bonding-curve
/// region and constant-product inference is meaningless.
const MAX_RESERVE_RATIO: u128 = 10_000;

/// Inputs below this are dust; integer rounding dominates the signal.
const MIN_AMOUNT_IN: u64 = 10_000;

/// Learns effective swap fees per `(pool, direction)` for venues whose
/// fee is not a first-class pool field. Inference solves the
/// constant-product formula backwards from one observed fill.
pub struct FeeOracle {
    fees: AHashMap<(Pubkey, SwapDirection), u64>,
}

impl FeeOracle {
    #[must_use]
    pub fn new() -> Self {
        Self {
            fees: AHashMap::new(),
        }
    }

    #[must_use]
    pub fn fee_bps(&self, pool: &Pubkey, direction: SwapDirection) -> Option<u64> {
        self.fees.get(&(*pool, direction)).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fees.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fees.is_empty()
    }

    /// Learns from a confirmed fill. First observation per key wins;
    /// later fills on the same key are ignored (the fee is a pool
    /// constant, re-deriving it only adds rounding jitter).
    pub fn observe_swap(
        &mut self,
        pool: Pubkey,
        direction: SwapDirection,
        reserve_in: u64,
        reserve_out: u64,
        amount_in: u64,
        actual_out: u64,
    ) {
        if self.fees.contains_key(&(pool, direction)) {
            return;
        }
        let Some(implied) =
            implied_fee_bps(reserve_in, reserve_out, amount_in, actual_out)
        else {
            return;
        };

        trace!(pool = %pool, ?direction, implied, "Fee learned");
        self.fees.insert((pool, direction), implied);
    }
}

impl Default for FeeOracle {
    fn default() -> Self {
        Self::new()
    }
}

/// Solves for the fee that explains `actual_out`:
/// the effective (post-fee) input is
/// `dx_eff = actual_out * reserve_in / (reserve_out - actual_out)`,
/// and the fee relative to it is
/// `bps = round((amount_in - dx_eff) * 10000 / dx_eff)`.
#[must_use]
pub fn implied_fee_bps(
    reserve_in: u64,
    reserve_out: u64,
    amount_in: u64,
    actual_out: u64,
) -> Option<u64> {
    if amount_in < MIN_AMOUNT_IN || actual_out == 0 || actual_out >= reserve_out {
        return None;
    }

    // Bonding-curve region: reserves this lopsided do not follow CPMM
    // semantics, skip learning.
    if reserve_out == 0 || u128::from(reserve_in) / u128::from(reserve_out) > MAX_RESERVE_RATIO {
        return None;
    }

    let numerator = u128::from(actual_out) * u128::from(reserve_in);
    let denominator = u128::from(reserve_out) - u128::from(actual_out);
    let dx_eff = numerator / denominator;
    if dx_eff == 0 || dx_eff > u128::from(amount_in) {
        return None;
    }

    let overpay = u128::from(amount_in) - dx_eff;
    let bps = (overpay * 10_000 + dx_eff / 2) / dx_eff;
    u64::try_from(bps).ok().filter(|bps| *bps < 10_000)
}
