//! Integer-precise tick and liquidity-amount math.
//!
//! `sqrt_ratio_at_tick` reproduces the canonical Q64.96 fixed-point table
//! walk (`√1.0001^tick · 2^96`) bit for bit; the float shortcut
//! `1.0001_f64.powi(tick)` drifts by whole ticks near the range bounds and
//! must not be used for TVL accounting. Amount deltas use 512-bit
//! intermediates so no product can overflow.

use alloy_primitives::{U256, U512};

/// Lowest tick representable in a pool.
pub const MIN_TICK: i32 = -887_272;
/// Highest tick representable in a pool.
pub const MAX_TICK: i32 = 887_272;

/// `sqrt_ratio_at_tick(MIN_TICK)`.
pub const MIN_SQRT_RATIO: u128 = 4_295_128_739;

/// Q128.128 multipliers for each bit of the tick magnitude
/// (`√(1/1.0001)^(2^i) · 2^128`, rounded).
const TICK_RATIOS: [u128; 20] = [
    0xfffcb933bd6fad37aa2d162d1a594001,
    0xfff97272373d413259a46990580e213a,
    0xfff2e50f5f656932ef12357cf3c7fdcc,
    0xffe5caca7e10e4e61c3624eaa0941cd0,
    0xffcb9843d60f6159c9db58835c926644,
    0xff973b41fa98c081472e6896dfb254c0,
    0xff2ea16466c96a3843ec78b326b52861,
    0xfe5dee046a99a2a811c461f1969c3053,
    0xfcbe86c7900a88aedcffc83b479aa3a4,
    0xf987a7253ac413176f2b074cf7815e54,
    0xf3392b0822b70005940c7a398e4b70f3,
    0xe7159475a2c29b7443b29c7fa6e889d9,
    0xd097f3bdfd2022b8845ad8f792aa5825,
    0xa9f746462d870fdf8a65dc1f90e061e5,
    0x70d869a156d2a1b890bb3df62baf32f7,
    0x31be135f97d08fd981231505542fcfa6,
    0x09aa508b5b7a84e1c677de54f3e99bc9,
    0x005d6af8dedb81196699c329225ee604,
    0x00002216e584f5fa1ea926041bedfe98,
    0x00000000048a170391f7dc42444e8fa2,
];

/// Computes `√1.0001^tick · 2^96` as a Q64.96 fixed-point integer.
///
/// Ticks outside `[MIN_TICK, MAX_TICK]` are clamped to the bounds so a
/// corrupt event cannot panic the pipeline.
#[must_use]
pub fn sqrt_ratio_at_tick(tick: i32) -> U256 {
    let tick = tick.clamp(MIN_TICK, MAX_TICK);
    let abs_tick = tick.unsigned_abs();

    let mut ratio = if abs_tick & 1 != 0 {
        U256::from(TICK_RATIOS[0])
    } else {
        U256::from(1u8) << 128
    };
    for (bit, multiplier) in TICK_RATIOS.iter().enumerate().skip(1) {
        if abs_tick & (1 << bit) != 0 {
            let product = U512::from(ratio) * U512::from(*multiplier);
            ratio = (product >> 128usize).wrapping_to::<alloy_primitives::U256>();
        }
    }
    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    // Q128.128 → Q64.96, rounding up.
    let shifted = ratio >> 32;
    if (ratio & (U256::from(u32::MAX))).is_zero() {
        shifted
    } else {
        shifted + U256::from(1u8)
    }
}

/// Amount of token0 spanned between two sqrt prices at the given
/// liquidity: `L · 2^96 · (√Pb − √Pa) / (√Pa · √Pb)`.
#[must_use]
pub fn amount0_delta(sqrt_a: U256, sqrt_b: U256, liquidity: u128) -> U256 {
    let (lower, upper) = if sqrt_a > sqrt_b { (sqrt_b, sqrt_a) } else { (sqrt_a, sqrt_b) };
    if lower.is_zero() || liquidity == 0 {
        return U256::ZERO;
    }
    let numerator = (U512::from(liquidity) << 96usize) * U512::from(upper - lower);
    (numerator / U512::from(upper) / U512::from(lower)).wrapping_to::<U256>()
}

/// Amount of token1 spanned between two sqrt prices at the given
/// liquidity: `L · (√Pb − √Pa) / 2^96`.
#[must_use]
pub fn amount1_delta(sqrt_a: U256, sqrt_b: U256, liquidity: u128) -> U256 {
    let (lower, upper) = if sqrt_a > sqrt_b { (sqrt_b, sqrt_a) } else { (sqrt_a, sqrt_b) };
    if liquidity == 0 {
        return U256::ZERO;
    }
    ((U512::from(liquidity) * U512::from(upper - lower)) >> 96usize).wrapping_to::<U256>()
}

/// Token amounts a position of `liquidity` units spans over
/// `[tick_lower, tick_upper]`, given the pool's current sqrt price.
///
/// Three regimes: price below the range moves only token0, above moves
/// only token1, inside splits at the current price.
#[must_use]
pub fn position_amounts(
    sqrt_price: U256,
    tick_lower: i32,
    tick_upper: i32,
    liquidity: u128,
) -> (U256, U256) {
    let sqrt_lower = sqrt_ratio_at_tick(tick_lower);
    let sqrt_upper = sqrt_ratio_at_tick(tick_upper);
    if sqrt_lower >= sqrt_upper {
        return (U256::ZERO, U256::ZERO);
    }

    if sqrt_price <= sqrt_lower {
        (amount0_delta(sqrt_lower, sqrt_upper, liquidity), U256::ZERO)
    } else if sqrt_price < sqrt_upper {
        (
            amount0_delta(sqrt_price, sqrt_upper, liquidity),
            amount1_delta(sqrt_lower, sqrt_price, liquidity),
        )
    } else {
        (U256::ZERO, amount1_delta(sqrt_lower, sqrt_upper, liquidity))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn tick_zero_is_exactly_two_pow_96() {
        assert_eq!(sqrt_ratio_at_tick(0), U256::from(1u8) << 96);
    }

    #[test]
    fn min_tick_matches_canonical_constant() {
        assert_eq!(sqrt_ratio_at_tick(MIN_TICK), U256::from(MIN_SQRT_RATIO));
    }

    #[test]
    fn max_tick_matches_canonical_constant() {
        let expected =
            U256::from_str("1461446703485210103287273052203988822378723970342").ok();
        let Some(expected) = expected else {
            panic!("constant literal");
        };
        assert_eq!(sqrt_ratio_at_tick(MAX_TICK), expected);
    }

    #[test]
    fn ratio_is_monotonic() {
        let ticks = [-887_272, -100_000, -60, -1, 0, 1, 60, 100_000, 887_272];
        for pair in ticks.windows(2) {
            assert!(
                sqrt_ratio_at_tick(pair[0]) < sqrt_ratio_at_tick(pair[1]),
                "ratio not increasing between ticks {} and {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn out_of_range_ticks_clamp() {
        assert_eq!(sqrt_ratio_at_tick(MIN_TICK - 5), sqrt_ratio_at_tick(MIN_TICK));
        assert_eq!(sqrt_ratio_at_tick(MAX_TICK + 5), sqrt_ratio_at_tick(MAX_TICK));
    }

    #[test]
    fn in_range_position_moves_both_tokens() {
        // 1e18 liquidity over ±60 ticks at price 1: roughly 0.3% of the
        // liquidity on each side.
        let liquidity = 1_000_000_000_000_000_000u128;
        let (amount0, amount1) =
            position_amounts(sqrt_ratio_at_tick(0), -60, 60, liquidity);
        let low = U256::from(2_900_000_000_000_000u128);
        let high = U256::from(3_100_000_000_000_000u128);
        assert!(amount0 > low && amount0 < high, "amount0 = {amount0}");
        assert!(amount1 > low && amount1 < high, "amount1 = {amount1}");
    }

    #[test]
    fn below_range_position_is_token0_only() {
        let liquidity = 1_000_000_000_000_000_000u128;
        let (amount0, amount1) =
            position_amounts(sqrt_ratio_at_tick(-120), -60, 60, liquidity);
        assert!(amount0 > U256::ZERO);
        assert_eq!(amount1, U256::ZERO);
    }

    #[test]
    fn above_range_position_is_token1_only() {
        let liquidity = 1_000_000_000_000_000_000u128;
        let (amount0, amount1) =
            position_amounts(sqrt_ratio_at_tick(120), -60, 60, liquidity);
        assert_eq!(amount0, U256::ZERO);
        assert!(amount1 > U256::ZERO);
    }

    #[test]
    fn zero_liquidity_spans_nothing() {
        let (amount0, amount1) = position_amounts(sqrt_ratio_at_tick(0), -60, 60, 0);
        assert_eq!(amount0, U256::ZERO);
        assert_eq!(amount1, U256::ZERO);
    }
}
