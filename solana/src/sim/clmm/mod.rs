//! Concentrated-liquidity engine: a tick walk over the frozen set of
//! tick arrays, applying the closed-form swap-step math range by range
//! and folding `liquidity_net` at every initialized tick crossing.

pub mod swap_math;
pub mod tick_math;

use ahash::AHashMap;

use crate::{
    libs::solana_client::dex::raydium_clmm::{TICK_ARRAY_SIZE, TickArrayState},
    sim::model::SimError,
};

/// Mutable scratch state threaded between sequential simulations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClmmState {
    pub sqrt_price_x64: u128,
    pub liquidity: u128,
    pub tick_current: i32,
    pub tick_spacing: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClmmSwapResult {
    pub amount_out: u64,
    pub fee_paid: u64,
    pub state: ClmmState,
}

/// Exact-input swap. `zero_for_one` sells token0 (price moves down).
/// Arrays beyond the provided frozen set fail with `NoTickArray`.
pub fn simulate_swap(
    state: &ClmmState,
    arrays: &AHashMap<i32, Box<TickArrayState>>,
    amount_in: u64,
    zero_for_one: bool,
    fee_rate: u64,
) -> Result<ClmmSwapResult, SimError> {
    if amount_in == 0 {
        return Err(SimError::InvalidInput);
    }

    let mut sqrt_price = state.sqrt_price_x64;
    let mut liquidity = state.liquidity;
    let mut tick = state.tick_current;
    let mut remaining = amount_in;
    let mut total_out: u64 = 0;
    let mut total_fee: u64 = 0;

    while remaining > 0 {
        let (tick_next, initialized, liquidity_net) =
            next_tick_target(arrays, state.tick_spacing, tick, zero_for_one)?;

        let sqrt_target = tick_math::get_sqrt_price_at_tick(tick_next)?;
        let step = swap_math::compute_swap_step(
            sqrt_price,
            sqrt_target,
            liquidity,
            remaining,
            fee_rate,
        )?;

        remaining = remaining.saturating_sub(step.amount_in.saturating_add(step.fee_amount));
        total_out = total_out
            .checked_add(step.amount_out)
            .ok_or(SimError::MathOverflow)?;
        total_fee = total_fee.saturating_add(step.fee_amount);
        sqrt_price = step.sqrt_price_next_x64;

        if sqrt_price == sqrt_target {
            if initialized {
                let signed = if zero_for_one {
                    -liquidity_net
                } else {
                    liquidity_net
                };
                liquidity = apply_liquidity_net(liquidity, signed)?;
            } else if remaining > 0 {
                // Uninitialized targets only occur at the tick range
                // extremes; there is nothing left to swap against.
                return Err(SimError::InsufficientLiquidity);
            }
            tick = if zero_for_one { tick_next - 1 } else { tick_next };
        } else {
            tick = get_tick_at_sqrt_price(sqrt_price)?;
        }
    }

    if total_out == 0 {
        return Err(SimError::InsufficientLiquidity);
    }

    Ok(ClmmSwapResult {
        amount_out: total_out,
        fee_paid: total_fee,
        state: ClmmState {
            sqrt_price_x64: sqrt_price,
            liquidity,
            tick_current: tick,
            tick_spacing: state.tick_spacing,
        },
    })
}

fn apply_liquidity_net(liquidity: u128, net: i128) -> Result<u128, SimError> {
    if net >= 0 {
        liquidity
            .checked_add(net as u128)
            .ok_or(SimError::MathOverflow)
    } else {
        liquidity
            .checked_sub(net.unsigned_abs())
            .ok_or(SimError::MathOverflow)
    }
}

/// Next swap-step target: the nearest initialized tick in the
/// direction of travel, searching across consecutive arrays of the
/// frozen set. Needing an array outside the set is a closure failure;
/// walking off the tick range returns the uninitialized extreme.
fn next_tick_target(
    arrays: &AHashMap<i32, Box<TickArrayState>>,
    tick_spacing: u16,
    tick: i32,
    zero_for_one: bool,
) -> Result<(i32, bool, i128), SimError> {
    let spacing = i32::from(tick_spacing);
    let ticks_per_array = spacing * TICK_ARRAY_SIZE;

    if zero_for_one {
        let mut search = tick;
        loop {
            if search < tick_math::MIN_TICK {
                return Ok((tick_math::MIN_TICK, false, 0));
            }
            let array_start = search.div_euclid(ticks_per_array) * ticks_per_array;
            let Some(array) = arrays.get(&array_start) else {
                return Err(SimError::NoTickArray(array_start));
            };

            let ticks = array.ticks();
            let mut offset = ((search - array_start) / spacing).min(TICK_ARRAY_SIZE - 1);
            while offset >= 0 {
                let slot = &ticks[offset as usize];
                if slot.is_initialized() {
                    return Ok((array_start + offset * spacing, true, slot.liquidity_net));
                }
                offset -= 1;
            }
            search = array_start - 1;
        }
    } else {
        let mut search = tick + 1;
        loop {
            if search > tick_math::MAX_TICK {
                return Ok((tick_math::MAX_TICK, false, 0));
            }
            let array_start = search.div_euclid(ticks_per_array) * ticks_per_array;
            let Some(array) = arrays.get(&array_start) else {
                return Err(SimError::NoTickArray(array_start));
            };

            let ticks = array.ticks();
            let mut offset = (search - array_start + spacing - 1) / spacing;
            while offset < TICK_ARRAY_SIZE {
                let slot = &ticks[offset as usize];
                if slot.is_initialized() {
                    return Ok((array_start + offset * spacing, true, slot.liquidity_net));
                }
                offset += 1;
            }
            search = array_start + ticks_per_array;
        }
    }
}

/// Largest tick whose sqrt price does not exceed `sqrt_price_x64`
/// (binary search over the forward conversion).
pub fn get_tick_at_sqrt_price(sqrt_price_x64: u128) -> Result<i32, SimError> {
    if !(tick_math::MIN_SQRT_PRICE_X64..=tick_math::MAX_SQRT_PRICE_X64).contains(&sqrt_price_x64) {
        return Err(SimError::InvalidInput);
    }

    let mut lo = tick_math::MIN_TICK;
    let mut hi = tick_math::MAX_TICK;
    while lo < hi {
        let mid = lo + (hi - lo + 1) / 2;
        if tick_math::get_sqrt_price_at_tick(mid)? <= sqrt_price_x64 {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    Ok(lo)
}

#[cfg(test)]
mod tests {
    use bytemuck::Zeroable;

    use super::*;

    const Q64: u128 = 1u128 << 64;
    const SPACING: u16 = 10;
    const TICKS_PER_ARRAY: i32 = SPACING as i32 * TICK_ARRAY_SIZE; // 600

    /// One array with initialized ticks at the given offsets.
    fn array_with_ticks(start: i32, ticks: &[(i32, i128)]) -> Box<TickArrayState> {
        let mut array = TickArrayState::zeroed();
        array.start_tick_index = start;
        let mut slots = array.ticks;
        for (tick, net) in ticks {
            let offset = ((tick - start) / i32::from(SPACING)) as usize;
            slots[offset].tick = *tick;
            slots[offset].liquidity_net = *net;
            slots[offset].liquidity_gross = net.unsigned_abs().max(1);
        }
        array.ticks = slots;
        array.initialized_tick_count = ticks.len() as u8;
        Box::new(array)
    }

    fn in_range_state() -> ClmmState {
        ClmmState {
            sqrt_price_x64: Q64,
            liquidity: 1_000_000_000_000,
            tick_current: 0,
            tick_spacing: SPACING,
        }
    }

    fn full_window() -> AHashMap<i32, Box<TickArrayState>> {
        // Position spans [-600, 600): +L at -600, -L at 600.
        let liquidity_net = 1_000_000_000_000i128;
        AHashMap::from_iter([
            (-TICKS_PER_ARRAY, array_with_ticks(-TICKS_PER_ARRAY, &[(-600, liquidity_net)])),
            (0, array_with_ticks(0, &[])),
            (TICKS_PER_ARRAY, array_with_ticks(TICKS_PER_ARRAY, &[(600, -liquidity_net)])),
        ])
    }

    #[test]
    fn test_small_swap_stays_in_range() {
        let state = in_range_state();
        let arrays = full_window();

        let result = simulate_swap(&state, &arrays, 1_000_000, true, 2_500).unwrap();
        assert!(result.amount_out > 0);
        // ~unit price minus fee and a little impact.
        assert!(result.amount_out < 1_000_000);
        assert!(result.amount_out > 990_000);
        assert!(result.state.sqrt_price_x64 < Q64);
        assert_eq!(result.state.liquidity, state.liquidity);
    }

    #[test]
    fn test_directions_move_price_oppositely() {
        let state = in_range_state();
        let arrays = full_window();

        let down = simulate_swap(&state, &arrays, 1_000_000, true, 2_500).unwrap();
        let up = simulate_swap(&state, &arrays, 1_000_000, false, 2_500).unwrap();
        assert!(down.state.sqrt_price_x64 < Q64);
        assert!(up.state.sqrt_price_x64 > Q64);
    }

    #[test]
    fn test_crossing_out_of_position_drops_liquidity() {
        let state = in_range_state();
        let arrays = full_window();

        // Large swap pushes past tick 600 where -L is posted; with no
        // liquidity beyond and input remaining, the walk needs the
        // next array and fails closure.
        let result = simulate_swap(&state, &arrays, u64::MAX / 1_000, false, 2_500);
        assert_eq!(result.unwrap_err(), SimError::NoTickArray(2 * TICKS_PER_ARRAY));
    }

    #[test]
    fn test_missing_array_fails_closed() {
        let state = in_range_state();
        let mut arrays = full_window();
        arrays.remove(&0);

        let result = simulate_swap(&state, &arrays, 1_000_000, true, 2_500);
        assert_eq!(result.unwrap_err(), SimError::NoTickArray(0));
    }

    #[test]
    fn test_fee_rate_reduces_output() {
        let state = in_range_state();
        let arrays = full_window();

        let cheap = simulate_swap(&state, &arrays, 10_000_000, true, 100).unwrap();
        let pricey = simulate_swap(&state, &arrays, 10_000_000, true, 10_000).unwrap();
        assert!(cheap.amount_out > pricey.amount_out);
        assert!(pricey.fee_paid > cheap.fee_paid);
    }

    #[test]
    fn test_tick_at_sqrt_price_inverts_conversion() {
        for tick in [-10_000, -55, 0, 55, 10_000] {
            let price = tick_math::get_sqrt_price_at_tick(tick).unwrap();
            assert_eq!(get_tick_at_sqrt_price(price).unwrap(), tick);
            // Just above the boundary still maps to the same tick.
            assert_eq!(get_tick_at_sqrt_price(price + 1).unwrap(), tick);
        }
    }

    #[test]
    fn test_zero_input_rejected() {
        let state = in_range_state();
        let arrays = full_window();
        assert_eq!(
            simulate_swap(&state, &arrays, 0, true, 2_500).unwrap_err(),
            SimError::InvalidInput
        );
    }
}
