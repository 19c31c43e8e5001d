//! Price derivation from on-chain fixed-point values.
//!
//! `sqrtPriceX96` encodes `√(token1/token0) · 2^96` in raw token units.
//! Converting it to a human-unit price requires squaring (a 320-bit
//! intermediate), dividing by `2^192`, and adjusting for the two tokens'
//! decimals. All of that happens in 512-bit integer math; only the final
//! scaled quotient is narrowed into a [`Decimal`].

use alloy_primitives::{U256, U512};
use rust_decimal::Decimal;

/// Largest coefficient a [`Decimal`] can hold (2^96 − 1).
const MAX_MANTISSA: u128 = 79_228_162_514_264_337_593_543_950_335;

/// Fractional digits carried by derived prices.
const PRICE_SCALE: u32 = 18;

/// Human-unit prices for both sides of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPrices {
    /// token0 per 1 token1.
    pub token0_price: Decimal,
    /// token1 per 1 token0.
    pub token1_price: Decimal,
}

impl TokenPrices {
    /// Zero prices, used for degenerate pools.
    pub const ZERO: Self = Self {
        token0_price: Decimal::ZERO,
        token1_price: Decimal::ZERO,
    };
}

/// Derives both token prices from a pool's `sqrtPriceX96`.
///
/// ```text
/// token1_price = sqrtPriceX96² · 10^decimals0 / (2^192 · 10^decimals1)
/// token0_price = 1 / token1_price
/// ```
///
/// Returns [`TokenPrices::ZERO`] when the input is zero or the decimal
/// adjustment overflows the 512-bit intermediate (decimals far outside
/// the ERC-20 norm).
#[must_use]
pub fn sqrt_price_x96_to_token_prices(
    sqrt_price_x96: U256,
    decimals0: u8,
    decimals1: u8,
) -> TokenPrices {
    if sqrt_price_x96.is_zero() {
        return TokenPrices::ZERO;
    }

    let sqrt = U512::from(sqrt_price_x96);
    let squared = sqrt.checked_mul(sqrt);
    let numerator = squared
        .and_then(|s| s.checked_mul(pow10(decimals0 as u32)?))
        .and_then(|s| s.checked_mul(pow10(PRICE_SCALE)?));
    let denominator: Option<U512> = pow10(decimals1 as u32).map(|p| p << 192);

    let (Some(numerator), Some(denominator)) = (numerator, denominator) else {
        return TokenPrices::ZERO;
    };
    if denominator.is_zero() {
        return TokenPrices::ZERO;
    }

    let token1_price = narrow_to_decimal(numerator / denominator, PRICE_SCALE);
    let token0_price = if token1_price.is_zero() {
        Decimal::ZERO
    } else {
        Decimal::ONE.checked_div(token1_price).unwrap_or(Decimal::MAX)
    };

    TokenPrices {
        token0_price,
        token1_price,
    }
}

/// Converts a raw non-negative token amount to human units.
///
/// Precision beyond what a [`Decimal`] can carry is truncated; amounts
/// that exceed its range saturate to [`Decimal::MAX`].
#[must_use]
pub fn human_amount(raw: u128, decimals: u8) -> Decimal {
    if raw == 0 {
        return Decimal::ZERO;
    }
    let mut value = raw;
    let mut scale = decimals as u32;
    while value > MAX_MANTISSA || scale > 28 {
        if scale == 0 {
            return Decimal::MAX;
        }
        value /= 10;
        scale -= 1;
    }
    Decimal::from_i128_with_scale(value as i128, scale)
}

/// Signed variant of [`human_amount`].
#[must_use]
pub fn human_amount_signed(raw: i128, decimals: u8) -> Decimal {
    let magnitude = human_amount(raw.unsigned_abs(), decimals);
    if raw < 0 { -magnitude } else { magnitude }
}

/// Converts a decimal-string raw amount (as stored in `NUMERIC(78,0)`
/// columns) to human units. Values beyond `u128` keep their leading 38
/// digits and shift the scale accordingly; unparsable input maps to zero.
#[must_use]
pub fn human_amount_from_string(raw: &str, decimals: u8) -> Decimal {
    let trimmed = raw.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Decimal::ZERO;
    }
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Decimal::ZERO;
    }

    let magnitude = if let Ok(value) = digits.parse::<u128>() {
        human_amount(value, decimals)
    } else {
        // More than 38 digits: keep the most significant 38 and absorb the
        // dropped tail into the scale.
        let dropped = digits.len() - 38;
        if (decimals as usize) < dropped {
            Decimal::MAX
        } else {
            match digits[..38].parse::<u128>() {
                Ok(head) => human_amount(head, (decimals as usize - dropped) as u8),
                Err(_) => Decimal::ZERO,
            }
        }
    };

    if negative { -magnitude } else { magnitude }
}

/// `10^exp` as a 512-bit integer, `None` on overflow.
fn pow10(exp: u32) -> Option<U512> {
    U512::from(10u8).checked_pow(U512::from(exp))
}

/// Narrows a scaled 512-bit quotient into a [`Decimal`], shedding
/// precision digit by digit until it fits. Saturates to [`Decimal::MAX`].
fn narrow_to_decimal(value: U512, scale: u32) -> Decimal {
    let max = U512::from(MAX_MANTISSA);
    let ten = U512::from(10u8);
    let mut value = value;
    let mut scale = scale;
    while value > max || scale > 28 {
        if scale == 0 {
            return Decimal::MAX;
        }
        value /= ten;
        scale -= 1;
    }
    // Fits in u128 by construction.
    let narrow: u128 = value.wrapping_to();
    Decimal::from_i128_with_scale(narrow as i128, scale)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::str::FromStr;

    /// 2^96, the sqrt price of an exactly 1:1 pool.
    fn sqrt_price_one() -> U256 {
        U256::from(1u8) << 96
    }

    #[test]
    fn unit_price_with_equal_decimals() {
        let prices = sqrt_price_x96_to_token_prices(sqrt_price_one(), 18, 18);
        assert_eq!(prices.token0_price, Decimal::ONE);
        assert_eq!(prices.token1_price, Decimal::ONE);
    }

    #[test]
    fn zero_sqrt_price_yields_zero() {
        let prices = sqrt_price_x96_to_token_prices(U256::ZERO, 18, 18);
        assert_eq!(prices, TokenPrices::ZERO);
    }

    #[test]
    fn price_product_is_close_to_one() {
        // √2 · 2^96, truncated: an arbitrary off-unit price point.
        let sqrt = U256::from(112_045_541_949_572_279_837_463_876_454u128);
        let prices = sqrt_price_x96_to_token_prices(sqrt, 18, 18);
        let product = prices.token0_price * prices.token1_price;
        let error = (product - Decimal::ONE).abs();
        let tolerance = Decimal::from_str("0.000000000001").ok();
        let Some(tolerance) = tolerance else {
            panic!("tolerance literal");
        };
        assert!(error < tolerance, "product {product} strayed from 1");
    }

    #[test]
    fn price_product_with_mixed_decimals() {
        let sqrt = U256::from(112_045_541_949_572_279_837_463_876_454u128);
        let prices = sqrt_price_x96_to_token_prices(sqrt, 6, 18);
        let product = prices.token0_price * prices.token1_price;
        let error = (product - Decimal::ONE).abs();
        let tolerance = Decimal::from_str("0.000000000001").ok();
        let Some(tolerance) = tolerance else {
            panic!("tolerance literal");
        };
        assert!(error < tolerance, "product {product} strayed from 1");
    }

    #[test]
    fn human_amount_one_ether() {
        let value = human_amount(1_000_000_000_000_000_000, 18);
        assert_eq!(value, Decimal::ONE);
    }

    #[test]
    fn human_amount_signed_negates() {
        let value = human_amount_signed(-2_000_000_000_000_000_000, 18);
        assert_eq!(value, -Decimal::TWO);
    }

    #[test]
    fn human_amount_from_string_round_trip() {
        let value = human_amount_from_string("1000000000000000000", 18);
        assert_eq!(value, Decimal::ONE);
        let negative = human_amount_from_string("-500000000000000000", 18);
        assert_eq!(negative, Decimal::from_str("-0.5").ok().unwrap_or_default());
    }

    #[test]
    fn human_amount_from_string_handles_oversized_values() {
        // 45 digits: larger than u128, still finite in human units.
        let value = human_amount_from_string("100000000000000000000000000000000000000000000", 18);
        assert!(value > Decimal::ZERO);
    }

    #[test]
    fn human_amount_from_string_rejects_garbage() {
        assert_eq!(human_amount_from_string("0x123", 18), Decimal::ZERO);
        assert_eq!(human_amount_from_string("", 18), Decimal::ZERO);
    }
}
