//! Closed-form swap-within-range math for the concentrated engine.
//! Q64.64 sqrt prices, u128 liquidity, U256 intermediates.

use ruint::aliases::U256;

use crate::sim::model::SimError;

/// Fee denominator used by the venue's amm config (`trade_fee_rate`).
pub const FEE_RATE_DENOMINATOR: u128 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapStep {
    pub sqrt_price_next_x64: u128,
    pub amount_in: u64,
    pub amount_out: u64,
    pub fee_amount: u64,
}

fn to_u64(value: U256) -> Result<u64, SimError> {
    u64::try_from(value).map_err(|_| SimError::MathOverflow)
}

fn to_u128(value: U256) -> Result<u128, SimError> {
    u128::try_from(value).map_err(|_| SimError::MathOverflow)
}

/// Token0 amount between two sqrt prices:
/// `delta0 = L * (sqrt_b - sqrt_a) * 2^64 / (sqrt_a * sqrt_b)`.
pub fn get_delta_amount_0(
    sqrt_price_a_x64: u128,
    sqrt_price_b_x64: u128,
    liquidity: u128,
    round_up: bool,
) -> Result<u64, SimError> {
    let (lower, upper) = if sqrt_price_a_x64 <= sqrt_price_b_x64 {
        (sqrt_price_a_x64, sqrt_price_b_x64)
    } else {
        (sqrt_price_b_x64, sqrt_price_a_x64)
    };
    if lower == 0 {
        return Err(SimError::MathOverflow);
    }

    let numerator = U256::from(liquidity) * (U256::from(upper) - U256::from(lower)) << 64usize;
    let denominator = U256::from(upper) * U256::from(lower);

    let quotient = if round_up {
        (numerator + denominator - U256::from(1u8)) / denominator
    } else {
        numerator / denominator
    };
    to_u64(quotient)
}

/// Token1 amount between two sqrt prices:
/// `delta1 = L * (sqrt_b - sqrt_a) / 2^64`.
pub fn get_delta_amount_1(
    sqrt_price_a_x64: u128,
    sqrt_price_b_x64: u128,
    liquidity: u128,
    round_up: bool,
) -> Result<u64, SimError> {
    let (lower, upper) = if sqrt_price_a_x64 <= sqrt_price_b_x64 {
        (sqrt_price_a_x64, sqrt_price_b_x64)
    } else {
        (sqrt_price_b_x64, sqrt_price_a_x64)
    };

    let product = U256::from(liquidity) * (U256::from(upper) - U256::from(lower));
    let quotient = if round_up {
        (product + (U256::from(1u8) << 64usize) - U256::from(1u8)) >> 64usize
    } else {
        product >> 64usize
    };
    to_u64(quotient)
}

/// Next sqrt price after spending `amount_in`, direction-aware.
///
/// Token0 in (price drops): `p' = L*p*2^64 / (L*2^64 + in*p)`, rounded
/// up so the output is never overstated. Token1 in (price rises):
/// `p' = p + in*2^64/L`, rounded down.
pub fn get_next_sqrt_price_from_input(
    sqrt_price_x64: u128,
    liquidity: u128,
    amount_in: u64,
    zero_for_one: bool,
) -> Result<u128, SimError> {
    if liquidity == 0 {
        return Err(SimError::InsufficientLiquidity);
    }
    if amount_in == 0 {
        return Ok(sqrt_price_x64);
    }

    if zero_for_one {
        let liquidity_shifted = U256::from(liquidity) << 64usize;
        let numerator = liquidity_shifted * U256::from(sqrt_price_x64);
        let denominator = liquidity_shifted + U256::from(amount_in) * U256::from(sqrt_price_x64);
        let next = (numerator + denominator - U256::from(1u8)) / denominator;
        to_u128(next)
    } else {
        let step = (U256::from(amount_in) << 64usize) / U256::from(liquidity);
        to_u128(U256::from(sqrt_price_x64) + step)
    }
}

/// One bounded step of the tick walk: swap from `sqrt_price_current`
/// towards `sqrt_price_target` with constant liquidity, splitting the
/// remaining exact input into (amount_in, fee, amount_out).
pub fn compute_swap_step(
    sqrt_price_current_x64: u128,
    sqrt_price_target_x64: u128,
    liquidity: u128,
    amount_remaining: u64,
    fee_rate: u64,
) -> Result<SwapStep, SimError> {
    let zero_for_one = sqrt_price_target_x64 < sqrt_price_current_x64;

    let amount_remaining_less_fee = (u128::from(amount_remaining)
        * (FEE_RATE_DENOMINATOR - u128::from(fee_rate))
        / FEE_RATE_DENOMINATOR) as u64;

    let amount_in_to_target = if zero_for_one {
        get_delta_amount_0(sqrt_price_target_x64, sqrt_price_current_x64, liquidity, true)?
    } else {
        get_delta_amount_1(sqrt_price_current_x64, sqrt_price_target_x64, liquidity, true)?
    };

    let reaches_target = amount_remaining_less_fee >= amount_in_to_target;

    let (sqrt_price_next_x64, amount_in) = if reaches_target {
        (sqrt_price_target_x64, amount_in_to_target)
    } else {
        let next = get_next_sqrt_price_from_input(
            sqrt_price_current_x64,
            liquidity,
            amount_remaining_less_fee,
            zero_for_one,
        )?;
        let used = if zero_for_one {
            get_delta_amount_0(next, sqrt_price_current_x64, liquidity, true)?
        } else {
            get_delta_amount_1(sqrt_price_current_x64, next, liquidity, true)?
        };
        (next, used.min(amount_remaining_less_fee))
    };

    let amount_out = if zero_for_one {
        get_delta_amount_1(sqrt_price_next_x64, sqrt_price_current_x64, liquidity, false)?
    } else {
        get_delta_amount_0(sqrt_price_current_x64, sqrt_price_next_x64, liquidity, false)?
    };

    let fee_amount = if reaches_target {
        // Fee on the amount actually spent inside the range.
        let fee = u128::from(amount_in) * u128::from(fee_rate)
            / (FEE_RATE_DENOMINATOR - u128::from(fee_rate));
        (fee + 1) as u64
    } else {
        // Input exhausted: everything beyond the net spend is fee.
        amount_remaining - amount_in
    };

    Ok(SwapStep {
        sqrt_price_next_x64,
        amount_in,
        amount_out,
        fee_amount,
    })
}
