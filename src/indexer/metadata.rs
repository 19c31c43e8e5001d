//! Write-through cache for ERC-20 token metadata.
//!
//! Lookup order: in-memory map → token row in the database → `eth_call`.
//! Successful fetches are cached; fetch-failure defaults are returned
//! uncached so a later call can retry the chain.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::Address;
use tokio::sync::RwLock;

use crate::chain::{ChainReader, TokenMetadata};
use crate::domain::address_hex;
use crate::persistence::PostgresPersistence;

/// Thread-safe token metadata cache shared by the pipeline components.
pub struct TokenMetadataCache {
    chain: Arc<dyn ChainReader>,
    persistence: PostgresPersistence,
    cache: RwLock<HashMap<Address, TokenMetadata>>,
}

impl TokenMetadataCache {
    /// Creates an empty cache backed by the given chain and database.
    #[must_use]
    pub fn new(chain: Arc<dyn ChainReader>, persistence: PostgresPersistence) -> Self {
        Self {
            chain,
            persistence,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolves metadata for a token. Never fails: the worst case is the
    /// fetch-failure defaults.
    pub async fn get(&self, token: Address) -> TokenMetadata {
        if let Some(hit) = self.cache.read().await.get(&token) {
            return hit.clone();
        }

        let address = address_hex(&token);
        match self.persistence.get_token(&address).await {
            Ok(Some(row)) if row.symbol != "UNKNOWN" => {
                let metadata = TokenMetadata {
                    decimals: u8::try_from(row.decimals).unwrap_or(18),
                    symbol: row.symbol,
                    name: row.name,
                };
                self.cache.write().await.insert(token, metadata.clone());
                return metadata;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(token = %address, error = %e, "metadata db lookup failed");
            }
        }

        let metadata = self.chain.erc20_metadata(token).await;
        if !metadata.is_default() {
            self.cache.write().await.insert(token, metadata.clone());
        }
        metadata
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn default_metadata_is_not_cached_marker() {
        // `is_default` keys the retry behavior; pin its contract here.
        assert!(TokenMetadata::default().is_default());
        let real = TokenMetadata {
            decimals: 6,
            symbol: "USDC".to_string(),
            name: "USD Coin".to_string(),
        };
        assert!(!real.is_default());
    }
}
