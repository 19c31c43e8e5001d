//! Domain layer: core types, on-chain math, and the event system.
//!
//! This module contains pure types and math with no I/O: pool identity,
//! sqrt-price and tick arithmetic, candle intervals, and the typed event
//! bus that fans swap and candle events out to subscribers.

pub mod candle;
pub mod event_bus;
pub mod market_event;
pub mod pool_id;
pub mod price;
pub mod tick_math;

pub use candle::{CandleInterval, CandleStatus};
pub use event_bus::EventBus;
pub use market_event::MarketEvent;
pub use pool_id::PoolId;

use alloy_primitives::{Address, B256, hex};

/// Canonical lowercase `0x…` rendering of an address.
///
/// All persisted addresses use this form; `Address`'s `Display` impl is
/// EIP-55 checksummed and must not leak into storage keys.
#[must_use]
pub fn address_hex(addr: &Address) -> String {
    format!("0x{}", hex::encode(addr.as_slice()))
}

/// Canonical lowercase `0x…` rendering of a 32-byte hash.
#[must_use]
pub fn b256_hex(hash: &B256) -> String {
    format!("0x{}", hex::encode(hash.as_slice()))
}

/// The zero address, in the canonical persisted form.
pub const ZERO_ADDRESS_HEX: &str = "0x0000000000000000000000000000000000000000";

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn address_hex_is_lowercase() {
        let Ok(addr) = Address::from_str("0x6B175474E89094C44Da98b954EedeAC495271d0F") else {
            panic!("valid address");
        };
        assert_eq!(address_hex(&addr), "0x6b175474e89094c44da98b954eedeac495271d0f");
    }

    #[test]
    fn zero_address_matches_helper() {
        assert_eq!(address_hex(&Address::ZERO), ZERO_ADDRESS_HEX);
    }
}
