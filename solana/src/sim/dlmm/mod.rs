//! Discretized-bin engine: price per bin is `(1 + bin_step/10000)^id`
//! in Q64.64, liquidity is consumed bin by bin in the direction of the
//! swap, and the composed (base + variable) fee is charged on the
//! input per bin. Bins are mutated in place so sequential legs see the
//! deposits of earlier ones.

use ahash::AHashMap;
use ruint::aliases::U256;

use crate::{
    libs::solana_client::dex::meteora_dlmm::{
        BASIS_POINT_MAX, BinArray, FEE_PRECISION, LbPair, MAX_FEE_RATE, bin_array_index,
    },
    sim::model::SimError,
};

const Q64: u128 = 1u128 << 64;

/// Fee/volatility parameters the simulator needs off the pair, frozen
/// at snapshot time (the accumulator is not re-derived mid-swap).
#[derive(Debug, Clone, Copy)]
pub struct DlmmParams {
    pub bin_step: u16,
    pub base_factor: u16,
    pub variable_fee_control: u32,
    pub volatility_accumulator: u32,
    pub protocol_share: u16,
}

impl DlmmParams {
    #[must_use]
    pub fn from_pair(pair: &LbPair) -> Self {
        Self {
            bin_step: pair.bin_step,
            base_factor: pair.parameters.base_factor,
            variable_fee_control: pair.parameters.variable_fee_control,
            volatility_accumulator: pair.v_parameters.volatility_accumulator,
            protocol_share: pair.parameters.protocol_share,
        }
    }
}

/// Base fee rate in 1e9 units: `bin_step * base_factor * 10`.
#[must_use]
pub fn base_fee_rate(bin_step: u16, base_factor: u16) -> u128 {
    u128::from(bin_step) * u128::from(base_factor) * 10
}

/// Variable fee rate in 1e9 units, from the frozen volatility
/// accumulator: `(vol_acc * bin_step)^2 * control / 1e11`, rounded up.
#[must_use]
pub fn variable_fee_rate(bin_step: u16, variable_fee_control: u32, volatility_accumulator: u32) -> u128 {
    if variable_fee_control == 0 {
        return 0;
    }
    let vol_times_step = u128::from(volatility_accumulator) * u128::from(bin_step);
    let squared = vol_times_step * vol_times_step;
    (squared * u128::from(variable_fee_control) + 99_999_999_999) / 100_000_000_000
}

/// Composed fee rate, capped at the venue maximum (10%).
#[must_use]
pub fn composed_fee_rate(params: &DlmmParams) -> u128 {
    let total = base_fee_rate(params.bin_step, params.base_factor)
        + variable_fee_rate(
            params.bin_step,
            params.variable_fee_control,
            params.volatility_accumulator,
        );
    total.min(MAX_FEE_RATE)
}

/// Q64.64 price (token Y per token X) of a bin id.
pub fn get_price_from_id(bin_id: i32, bin_step: u16) -> Result<u128, SimError> {
    let base = Q64 + ((u128::from(bin_step) << 64) / BASIS_POINT_MAX);
    pow_q64(base, bin_id)
}

/// Binary exponentiation in Q64.64, inverting for negative exponents.
fn pow_q64(base: u128, exp: i32) -> Result<u128, SimError> {
    let mut result = U256::from(Q64);
    let mut factor = U256::from(base);
    let mut e = exp.unsigned_abs();

    while e > 0 {
        if e & 1 == 1 {
            result = (result * factor) >> 64usize;
        }
        factor = (factor * factor) >> 64usize;
        if factor > U256::from(u128::MAX) {
            return Err(SimError::MathOverflow);
        }
        e >>= 1;
    }

    if result.is_zero() {
        return Err(SimError::MathOverflow);
    }

    let price = if exp < 0 {
        (U256::from(1u8) << 128usize) / result
    } else {
        result
    };

    u128::try_from(price).map_err(|_| SimError::MathOverflow)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DlmmSwapResult {
    pub amount_out: u64,
    pub fee_paid: u64,
    pub active_id: i32,
}

/// Exact-input swap. `swap_for_y` sells X into the pool (active id
/// walks down); otherwise Y is sold (active id walks up). Virtual
/// (zeroed) arrays are traversable; absent arrays fail closed.
pub fn simulate_swap(
    active_id: i32,
    params: &DlmmParams,
    arrays: &mut AHashMap<i64, Box<BinArray>>,
    amount_in: u64,
    swap_for_y: bool,
    fee_rate: u128,
) -> Result<DlmmSwapResult, SimError> {
    if amount_in == 0 {
        return Err(SimError::InvalidInput);
    }
    if fee_rate >= FEE_PRECISION {
        return Err(SimError::InvalidInput);
    }

    let mut id = active_id;
    let mut remaining = amount_in;
    let mut total_out: u64 = 0;
    let mut total_fee: u64 = 0;

    while remaining > 0 {
        let array_index = bin_array_index(id);
        let Some(array) = arrays.get_mut(&array_index) else {
            return Err(SimError::MissingBinArray(array_index));
        };

        let start = array.start_bin_id();
        let offset = (id - start) as usize;
        let price = get_price_from_id(id, params.bin_step)?;
        let bin = &mut array.bins[offset];

        let bin_out = if swap_for_y { bin.amount_y } else { bin.amount_x };
        if bin_out > 0 {
            // Net input that fully drains this bin.
            let net_capacity = if swap_for_y {
                ceil_div_q64(U256::from(bin_out) << 64usize, price)?
            } else {
                // X out: y_in = x * price.
                ceil_shr_q64(U256::from(bin_out) * U256::from(price))?
            };

            // Gross input for that net spend, fee included.
            let gross_capacity = ceil_mul_div(
                net_capacity,
                FEE_PRECISION,
                FEE_PRECISION - fee_rate,
            )?;

            let (gross, net, out) = if u128::from(remaining) >= gross_capacity {
                (gross_capacity as u64, net_capacity as u64, bin_out)
            } else {
                let fee = ceil_mul_div(u128::from(remaining), fee_rate, FEE_PRECISION)?;
                let net = u128::from(remaining) - fee;
                let out = if swap_for_y {
                    ((U256::from(net) * U256::from(price)) >> 64usize)
                        .try_into()
                        .map_err(|_| SimError::MathOverflow)?
                } else {
                    u64::try_from((U256::from(net) << 64usize) / U256::from(price))
                        .map_err(|_| SimError::MathOverflow)?
                };
                (remaining, net as u64, u64::min(out, bin_out))
            };

            if swap_for_y {
                bin.amount_x = bin.amount_x.saturating_add(net);
                bin.amount_y -= out;
            } else {
                bin.amount_y = bin.amount_y.saturating_add(net);
                bin.amount_x -= out;
            }

            total_out = total_out.checked_add(out).ok_or(SimError::MathOverflow)?;
            total_fee = total_fee.saturating_add(gross - net);
            remaining -= gross.min(remaining);
        }

        if remaining > 0 {
            id = if swap_for_y { id - 1 } else { id + 1 };
        }
    }

    if total_out == 0 {
        return Err(SimError::InsufficientLiquidity);
    }

    Ok(DlmmSwapResult {
        amount_out: total_out,
        fee_paid: total_fee,
        active_id: id,
    })
}

fn ceil_div_q64(numerator: U256, price: u128) -> Result<u128, SimError> {
    let den = U256::from(price);
    let out = (numerator + den - U256::from(1u8)) / den;
    u128::try_from(out).map_err(|_| SimError::MathOverflow)
}

fn ceil_shr_q64(value: U256) -> Result<u128, SimError> {
    let out = (value + (U256::from(1u8) << 64usize) - U256::from(1u8)) >> 64usize;
    u128::try_from(out).map_err(|_| SimError::MathOverflow)
}

fn ceil_mul_div(value: u128, numerator: u128, denominator: u128) -> Result<u128, SimError> {
    if denominator == 0 {
        return Err(SimError::MathOverflow);
    }
    let out = (U256::from(value) * U256::from(numerator) + U256::from(denominator)
        - U256::from(1u8))
        / U256::from(denominator);
    u128::try_from(out).map_err(|_| SimError::MathOverflow)
}

#[cfg(test)]
mod tests {
    use bytemuck::Zeroable;

    use super::*;

    const BINS: i32 = 70;

    fn params() -> DlmmParams {
        DlmmParams {
            bin_step: 25,
            base_factor: 10_000,
            variable_fee_control: 0,
            volatility_accumulator: 0,
            protocol_share: 2_000,
        }
    }

    fn array_at(index: i64) -> Box<BinArray> {
        let mut array = BinArray::zeroed();
        array.index = index;
        Box::new(array)
    }

    #[test]
    fn test_price_at_zero_is_unit() {
        assert_eq!(get_price_from_id(0, 25).unwrap(), Q64);
    }

    #[test]
    fn test_price_monotonic_and_symmetric() {
        let step = 25u16;
        let up = get_price_from_id(1, step).unwrap();
        let down = get_price_from_id(-1, step).unwrap();
        assert!(up > Q64);
        assert!(down < Q64);

        // up * down ~= 2^128.
        let product = (U256::from(up) * U256::from(down)) >> 128usize;
        assert!(u128::try_from(product).unwrap() <= 1);

        // One bin step of 25 bps.
        let expected = Q64 + Q64 * 25 / 10_000;
        assert!(up.abs_diff(expected) <= 1);
    }

    #[test]
    fn test_base_fee_composition() {
        // bin_step 25, base_factor 10000 -> 0.25% of 1e9.
        assert_eq!(base_fee_rate(25, 10_000), 2_500_000);
        assert_eq!(variable_fee_rate(25, 0, 10_000), 0);

        // Variable part kicks in with control and volatility.
        let var = variable_fee_rate(25, 40_000, 10_000);
        assert!(var > 0);

        let composed = composed_fee_rate(&DlmmParams {
            bin_step: 25,
            base_factor: 10_000,
            variable_fee_control: 40_000,
            volatility_accumulator: 10_000,
            protocol_share: 2_000,
        });
        assert_eq!(composed, 2_500_000 + var);
    }

    #[test]
    fn test_fee_cap() {
        // Absurd volatility saturates at 10%.
        let composed = composed_fee_rate(&DlmmParams {
            bin_step: 100,
            base_factor: 50_000,
            variable_fee_control: u32::MAX,
            volatility_accumulator: u32::MAX,
            protocol_share: 0,
        });
        assert_eq!(composed, MAX_FEE_RATE);
    }

    #[test]
    fn test_swap_within_active_bin() {
        let mut arrays = AHashMap::from_iter([(0i64, array_at(0))]);
        arrays.get_mut(&0).unwrap().bins[5].amount_y = 10_000_000;

        // Active bin 5, price ~= 1.0125. Sell X for Y.
        let result = simulate_swap(5, &params(), &mut arrays, 1_000_000, true, 2_500_000)
            .unwrap();

        // Fee 0.25%: net ~= 997_500; out ~= net * price.
        assert!(result.amount_out > 1_000_000); // price > 1 at bin 5
        assert!(result.fee_paid >= 2_500);
        assert_eq!(result.active_id, 5);

        // Bin mutated in place for the next leg.
        let bin = arrays.get(&0).unwrap().bins[5];
        assert_eq!(bin.amount_y, 10_000_000 - result.amount_out);
        assert!(bin.amount_x > 0);
    }

    #[test]
    fn test_walk_across_bins_moves_active_id() {
        let mut arrays = AHashMap::from_iter([(0i64, array_at(0)), (-1i64, array_at(-1))]);
        // 500k of Y in bins 2 and 1 each; selling enough X must drain
        // bin 2 and continue into bin 1.
        arrays.get_mut(&0).unwrap().bins[2].amount_y = 500_000;
        arrays.get_mut(&0).unwrap().bins[1].amount_y = 500_000;

        let result =
            simulate_swap(2, &params(), &mut arrays, 700_000, true, 2_500_000).unwrap();
        assert!(result.amount_out > 500_000);
        assert_eq!(result.active_id, 1);
        assert_eq!(arrays.get(&0).unwrap().bins[2].amount_y, 0);
    }

    #[test]
    fn test_virtual_bins_are_traversable() {
        let mut arrays = AHashMap::from_iter([(0i64, array_at(0))]);
        // Liquidity only in bin 0; start at bin 4 with empty bins
        // in between (all zeroed = virtual).
        arrays.get_mut(&0).unwrap().bins[0].amount_y = 1_000_000;

        let result =
            simulate_swap(4, &params(), &mut arrays, 100_000, true, 2_500_000).unwrap();
        assert!(result.amount_out > 0);
        assert_eq!(result.active_id, 0);
    }

    #[test]
    fn test_missing_array_fails_closed() {
        let mut arrays = AHashMap::from_iter([(0i64, array_at(0))]);
        // Nothing to consume in array 0 and array -1 absent.
        let result = simulate_swap(0, &params(), &mut arrays, 100_000, true, 2_500_000);
        assert_eq!(result.unwrap_err(), SimError::MissingBinArray(-1));
    }

    #[test]
    fn test_reverse_direction_walks_up() {
        let mut arrays = AHashMap::from_iter([(0i64, array_at(0))]);
        arrays.get_mut(&0).unwrap().bins[3].amount_x = 2_000_000;
        arrays.get_mut(&0).unwrap().bins[4].amount_x = 2_000_000;

        let result =
            simulate_swap(3, &params(), &mut arrays, 3_000_000, false, 2_500_000).unwrap();
        assert!(result.amount_out > 2_000_000);
        assert_eq!(result.active_id, 4);
    }
}
