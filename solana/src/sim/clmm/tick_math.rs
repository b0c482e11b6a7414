//! Tick index <-> sqrt price (Q64.64) conversion.
//!
//! `sqrt_price(t) = sqrt(1.0001)^t * 2^64`, computed by binary
//! decomposition of the tick over precomputed Q64.64 powers of
//! `sqrt(1/1.0001)`, inverting for positive ticks.

use crate::sim::model::SimError;

pub const MIN_TICK: i32 = -443_636;
pub const MAX_TICK: i32 = 443_636;

pub const MIN_SQRT_PRICE_X64: u128 = 4_295_048_016;
pub const MAX_SQRT_PRICE_X64: u128 = 79_226_673_521_066_979_257_578_248_091;

const Q64: u128 = 1u128 << 64;

/// Q64.64 values of `sqrt(1/1.0001)^(2^k)` for k = 0..19.
const NEG_POWERS: [u128; 19] = [
    0xfffcb933bd6fad37,
    0xfff97272373d4132,
    0xfff2e50f5f656932,
    0xffe5caca7e10e4e6,
    0xffcb9843d60f6159,
    0xff973b41fa98c081,
    0xff2ea16466c96a38,
    0xfe5dee046a99a2a8,
    0xfcbe86c7900a88ae,
    0xf987a7253ac41317,
    0xf3392b0822b70005,
    0xe7159475a2c29b74,
    0xd097f3bdfd2022b8,
    0xa9f746462d870fdf,
    0x70d869a156d2a1b8,
    0x31be135f97d08fd9,
    0x09aa508b5b7a84e1,
    0x005d6af8dedb8119,
    0x00002216e584f5fa,
];

/// Q64.64 sqrt price at a tick index.
pub fn get_sqrt_price_at_tick(tick: i32) -> Result<u128, SimError> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(SimError::InvalidInput);
    }

    let abs_tick = tick.unsigned_abs();
    let mut ratio: u128 = if abs_tick & 1 != 0 { NEG_POWERS[0] } else { Q64 };

    for (k, power) in NEG_POWERS.iter().enumerate().skip(1) {
        if abs_tick & (1 << k) != 0 {
            // ratio <= 2^64 and power < 2^64, so the product fits u128.
            ratio = (ratio * power) >> 64;
        }
    }

    if tick > 0 {
        ratio = u128::MAX / ratio;
    }

    Ok(ratio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_zero_is_unit_price() {
        assert_eq!(get_sqrt_price_at_tick(0).unwrap(), Q64);
    }

    #[test]
    fn test_single_tick_ratio() {
        // sqrt(1.0001) in Q64.64 ~= 1.00005 * 2^64.
        let one = get_sqrt_price_at_tick(1).unwrap();
        assert!(one > Q64);
        let expected = Q64 + Q64 / 20_000; // +0.005%
        let diff = one.abs_diff(expected);
        assert!(diff < Q64 / 1_000_000, "tick 1 price off: {one}");
    }

    #[test]
    fn test_monotonic_increasing() {
        let ticks = [-443_636, -100_000, -1_000, -1, 0, 1, 1_000, 100_000, 443_636];
        let mut last = 0u128;
        for tick in ticks {
            let price = get_sqrt_price_at_tick(tick).unwrap();
            assert!(price > last, "not monotonic at tick {tick}");
            last = price;
        }
    }

    #[test]
    fn test_negative_positive_symmetry() {
        for tick in [1, 77, 1_000, 50_000, 400_000] {
            let pos = get_sqrt_price_at_tick(tick).unwrap();
            let neg = get_sqrt_price_at_tick(-tick).unwrap();
            // pos * neg ~= 2^128, within truncation error.
            let product = (ruint::aliases::U256::from(pos) * ruint::aliases::U256::from(neg))
                >> 128usize;
            let unit = ruint::aliases::U256::from(1u8);
            assert!(
                product.abs_diff(unit) <= unit,
                "symmetry broken at tick {tick}"
            );
        }
    }

    #[test]
    fn test_extremes_near_published_bounds() {
        let min = get_sqrt_price_at_tick(MIN_TICK).unwrap();
        let max = get_sqrt_price_at_tick(MAX_TICK).unwrap();

        // Within 0.1% of the canonical bounds.
        assert!(min.abs_diff(MIN_SQRT_PRICE_X64) < MIN_SQRT_PRICE_X64 / 1_000);
        assert!(max.abs_diff(MAX_SQRT_PRICE_X64) < MAX_SQRT_PRICE_X64 / 1_000);
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(get_sqrt_price_at_tick(MIN_TICK - 1).is_err());
        assert!(get_sqrt_price_at_tick(MAX_TICK + 1).is_err());
    }
}
