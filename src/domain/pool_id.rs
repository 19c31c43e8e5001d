//! Type-safe pool identifier.
//!
//! [`PoolId`] is a newtype wrapper around the 32-byte on-chain pool ID
//! emitted by the pool manager, providing type safety so pool identifiers
//! cannot be confused with transaction hashes or other 32-byte values.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// Unique identifier for a pool managed by the pool manager contract.
///
/// Wraps the `bytes32` pool ID from the `Initialize` event. Used as the
/// primary key for the pool collection, the event discriminator, and the
/// WebSocket subscription target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(B256);

impl PoolId {
    /// Creates a `PoolId` from a raw 32-byte value.
    #[must_use]
    pub const fn from_b256(id: B256) -> Self {
        Self(id)
    }

    /// Returns the inner 32-byte value.
    #[must_use]
    pub const fn as_b256(&self) -> &B256 {
        &self.0
    }

    /// Canonical lowercase `0x…` hex form used as the persistence key.
    #[must_use]
    pub fn to_hex(&self) -> String {
        super::b256_hex(&self.0)
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<B256> for PoolId {
    fn from(id: B256) -> Self {
        Self(id)
    }
}

impl From<PoolId> for B256 {
    fn from(id: PoolId) -> Self {
        id.0
    }
}

impl FromStr for PoolId {
    type Err = <B256 as FromStr>::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        B256::from_str(s).map(Self)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn display_is_lowercase_prefixed_hex() {
        let id = PoolId::from_b256(B256::repeat_byte(0xAB));
        let s = format!("{id}");
        assert!(s.starts_with("0x"));
        assert_eq!(s.len(), 66);
        assert_eq!(s, s.to_lowercase());
    }

    #[test]
    fn from_str_round_trip() {
        let id = PoolId::from_b256(B256::repeat_byte(0x42));
        let parsed = PoolId::from_str(&id.to_hex());
        let Ok(parsed) = parsed else {
            panic!("parse failed");
        };
        assert_eq!(id, parsed);
    }

    #[test]
    fn serde_round_trip() {
        let id = PoolId::from_b256(B256::repeat_byte(0x07));
        let json = serde_json::to_string(&id).ok();
        let Some(json) = json else {
            panic!("serialization failed");
        };
        let back: Option<PoolId> = serde_json::from_str(&json).ok();
        assert_eq!(back, Some(id));
    }

    #[test]
    fn hash_works_in_hashmap() {
        use std::collections::HashMap;
        let id = PoolId::from_b256(B256::repeat_byte(0x01));
        let mut map = HashMap::new();
        map.insert(id, "pool");
        assert_eq!(map.get(&id), Some(&"pool"));
    }
}
