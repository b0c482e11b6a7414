//! Constant-product engine with the fee-deducted-from-input formula:
//!
//! ```text
//! dx_net = amount_in * (10000 - fee_bps)
//! out    = reserve_out * dx_net / (reserve_in * 10000 + dx_net)
//! ```
//!
//! The fee stays in the pool, so the input reserve grows by
//! `amount_in - fee_paid`. All arithmetic is u128-widened integer; the
//! quote is bit-exact against the on-chain program.

use crate::sim::model::SimError;

const BPS: u128 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpQuote {
    pub amount_out: u64,
    pub fee_paid: u64,
    pub new_reserve_in: u64,
    pub new_reserve_out: u64,
    pub price_impact_bps: u64,
}

/// Exact-input quote.
pub fn get_amount_out(
    reserve_in: u64,
    reserve_out: u64,
    amount_in: u64,
    fee_bps: u64,
) -> Result<CpQuote, SimError> {
    if amount_in == 0 || fee_bps >= 10_000 {
        return Err(SimError::InvalidInput);
    }
    if reserve_in == 0 || reserve_out == 0 {
        return Err(SimError::InsufficientLiquidity);
    }

    let dx_net = u128::from(amount_in) * (BPS - u128::from(fee_bps));
    let numerator = u128::from(reserve_out) * dx_net;
    let denominator = u128::from(reserve_in) * BPS + dx_net;
    let amount_out = (numerator / denominator) as u64;

    if amount_out >= reserve_out {
        return Err(SimError::InsufficientLiquidity);
    }
    if amount_out == 0 {
        return Err(SimError::MathOverflow);
    }

    let fee_paid = (u128::from(amount_in) * u128::from(fee_bps) / BPS) as u64;

    // Shortfall versus the zero-impact fill at the current spot price.
    let spot_out = dx_net * u128::from(reserve_out) / (u128::from(reserve_in) * BPS);
    let price_impact_bps = if spot_out == 0 {
        0
    } else {
        ((spot_out - u128::from(amount_out)) * BPS / spot_out) as u64
    };

    Ok(CpQuote {
        amount_out,
        fee_paid,
        new_reserve_in: reserve_in + (amount_in - fee_paid),
        new_reserve_out: reserve_out - amount_out,
        price_impact_bps,
    })
}

/// Exact-output back-solve (ceiling):
/// `dx = reserve_in * dy * 10000 / ((reserve_out - dy) * (10000 - fee_bps)) + 1`.
pub fn get_amount_in(
    reserve_in: u64,
    reserve_out: u64,
    amount_out: u64,
    fee_bps: u64,
) -> Result<u64, SimError> {
    if amount_out == 0 || fee_bps >= 10_000 {
        return Err(SimError::InvalidInput);
    }
    if amount_out >= reserve_out {
        return Err(SimError::InsufficientLiquidity);
    }

    let numerator = u128::from(reserve_in) * u128::from(amount_out) * BPS;
    let denominator = u128::from(reserve_out - amount_out) * (BPS - u128::from(fee_bps));
    let amount_in = numerator / denominator + 1;

    u64::try_from(amount_in).map_err(|_| SimError::MathOverflow)
}
