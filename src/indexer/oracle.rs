//! Derived price oracle.
//!
//! Prices are expressed in the wrapped-native reference unit and pulled
//! from whitelisted pools only: for each pool a token shares with a
//! reference token, the counterpart's locked value (in native units)
//! must beat both the running best and the configured floor before that
//! pool's price is trusted. Stablecoins are pinned to the inverse of the
//! stablecoin/native pool price.

use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::config::IndexerConfig;
use crate::domain::{ZERO_ADDRESS_HEX, address_hex};
use crate::error::IndexerError;
use crate::persistence::PostgresPersistence;
use crate::persistence::models::{PoolRecord, TokenRecord};

/// Oracle over the pool/token collections.
#[derive(Debug, Clone)]
pub struct PriceOracle {
    persistence: PostgresPersistence,
    wrapped_native: String,
    stablecoin_pool_id: Option<String>,
    stablecoin_is_token0: bool,
    stablecoins: HashSet<String>,
    minimum_native_locked: Decimal,
}

impl PriceOracle {
    /// Builds the oracle from the whitelist configuration.
    #[must_use]
    pub fn new(persistence: PostgresPersistence, config: &IndexerConfig) -> Self {
        Self {
            persistence,
            wrapped_native: address_hex(&config.wrapped_native_address),
            stablecoin_pool_id: config.stablecoin_native_pool_id.map(|id| id.to_hex()),
            stablecoin_is_token0: config.stablecoin_is_token0,
            stablecoins: config.stablecoin_addresses.iter().map(address_hex).collect(),
            minimum_native_locked: config.minimum_native_locked,
        }
    }

    /// USD price of the wrapped-native token, read from the configured
    /// stablecoin ↔ wrapped-native pool. Zero when unconfigured or the
    /// pool does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Persistence`] on database failure.
    pub async fn native_price_usd(&self) -> Result<Decimal, IndexerError> {
        let Some(pool_id) = &self.stablecoin_pool_id else {
            return Ok(Decimal::ZERO);
        };
        let Some(pool) = self.persistence.get_pool(pool_id).await? else {
            return Ok(Decimal::ZERO);
        };
        Ok(if self.stablecoin_is_token0 {
            pool.token0_price
        } else {
            pool.token1_price
        })
    }

    /// Price of `token` in the wrapped-native reference unit.
    ///
    /// Walks the token's whitelist pools and takes the price from the
    /// deepest qualifying one; returns zero when no pool qualifies.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Persistence`] on database failure.
    pub async fn derived_native_per_token(
        &self,
        token: &TokenRecord,
    ) -> Result<Decimal, IndexerError> {
        if token.address == self.wrapped_native || token.address == ZERO_ADDRESS_HEX {
            return Ok(Decimal::ONE);
        }
        if self.stablecoins.contains(&token.address) {
            let native_usd = self.native_price_usd().await?;
            return Ok(Decimal::ONE.checked_div(native_usd).unwrap_or(Decimal::ONE));
        }

        let mut best_locked = Decimal::ZERO;
        let mut price = Decimal::ZERO;
        for pool_id in &token.whitelist_pools {
            let Some(pool) = self.persistence.get_pool(pool_id).await? else {
                continue;
            };
            let side = counterpart_side(&pool, &token.address);
            let Some(other) = self.persistence.get_token(&side.other_address).await? else {
                continue;
            };
            let decimals = u8::try_from(other.decimals).unwrap_or(18);
            let native_locked =
                crate::domain::price::human_amount_from_string(&side.other_locked, decimals)
                    * other.derived_native;
            if native_locked > best_locked && native_locked > self.minimum_native_locked {
                best_locked = native_locked;
                price = side.price_in_other * other.derived_native;
            }
        }
        Ok(price)
    }
}

/// The counterpart token's view of a pool: its address, how much of it
/// is locked, and the price that converts one unit of the subject token
/// into counterpart units.
struct CounterpartSide {
    other_address: String,
    other_locked: String,
    price_in_other: Decimal,
}

fn counterpart_side(pool: &PoolRecord, token_address: &str) -> CounterpartSide {
    if pool.currency0 == token_address {
        CounterpartSide {
            other_address: pool.currency1.clone(),
            other_locked: pool.total_value_locked_token1.clone(),
            price_in_other: pool.token1_price,
        }
    } else {
        CounterpartSide {
            other_address: pool.currency0.clone(),
            other_locked: pool.total_value_locked_token0.clone(),
            price_in_other: pool.token0_price,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn make_pool(currency0: &str, currency1: &str, p0: &str, p1: &str) -> PoolRecord {
        PoolRecord {
            pool_id: "0xaa".to_string(),
            currency0: currency0.to_string(),
            currency1: currency1.to_string(),
            fee: 3000,
            tick_spacing: 60,
            hooks: ZERO_ADDRESS_HEX.to_string(),
            sqrt_price_x96: "79228162514264337593543950336".to_string(),
            tick: 0,
            liquidity: "0".to_string(),
            total_value_locked_token0: "5000000000000000000000".to_string(),
            total_value_locked_token1: "100000000000000000000".to_string(),
            token0_price: Decimal::from_str(p0).unwrap_or_default(),
            token1_price: Decimal::from_str(p1).unwrap_or_default(),
            created_block: 1,
            created_at_timestamp: 60,
            created_tx_hash: "0x01".to_string(),
        }
    }

    #[test]
    fn counterpart_of_currency0_is_currency1() {
        let pool = make_pool("0xtoken", "0xweth", "1000", "0.001");
        let side = counterpart_side(&pool, "0xtoken");
        assert_eq!(side.other_address, "0xweth");
        assert_eq!(side.other_locked, "100000000000000000000");
        assert_eq!(side.price_in_other, Decimal::from_str("0.001").unwrap_or_default());
    }

    #[test]
    fn counterpart_of_currency1_is_currency0() {
        let pool = make_pool("0xweth", "0xtoken", "0.001", "1000");
        let side = counterpart_side(&pool, "0xtoken");
        assert_eq!(side.other_address, "0xweth");
        assert_eq!(side.other_locked, "5000000000000000000000");
        assert_eq!(side.price_in_other, Decimal::from_str("0.001").unwrap_or_default());
    }
}
