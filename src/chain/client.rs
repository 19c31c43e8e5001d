//! JSON-RPC chain client.
//!
//! [`HttpChainReader`] talks to an Ethereum node over HTTP: batched
//! `eth_getLogs` with a single OR-filter over the three recognized
//! topic0 values (so historical ordering across event kinds is
//! preserved), head and timestamp lookups, and selector-based `eth_call`
//! reads for ERC-20 metadata. Metadata reads never fail the pipeline;
//! reverts and garbage yield safe defaults.

use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::{Address, B256, hex};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::events::event_topics;
use crate::domain::address_hex;
use crate::error::IndexerError;

const DECIMALS_SELECTOR: &str = "0x313ce567";
const SYMBOL_SELECTOR: &str = "0x95d89b41";
const NAME_SELECTOR: &str = "0x06fdde03";

/// One raw log as delivered by the node, already parsed out of hex.
#[derive(Debug, Clone)]
pub struct Log {
    /// Emitting contract.
    pub address: Address,
    /// Indexed topics; `topics[0]` is the event signature hash.
    pub topics: Vec<B256>,
    /// ABI-encoded non-indexed arguments.
    pub data: Vec<u8>,
    /// Block carrying the log.
    pub block_number: u64,
    /// Position within the block.
    pub log_index: u64,
    /// Transaction that emitted the log.
    pub transaction_hash: B256,
}

/// ERC-20 metadata with safe fallback defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    /// Token decimals; defaults to 18.
    pub decimals: u8,
    /// Token symbol; defaults to `"UNKNOWN"`.
    pub symbol: String,
    /// Token name; defaults to `"Unknown Token"`.
    pub name: String,
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self {
            decimals: 18,
            symbol: "UNKNOWN".to_string(),
            name: "Unknown Token".to_string(),
        }
    }
}

impl TokenMetadata {
    /// Whether this metadata is still the fetch-failure default.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.symbol == "UNKNOWN"
    }
}

/// Read access to the pool manager's chain, mockable for tests.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Current head block number.
    async fn block_number(&self) -> Result<u64, IndexerError>;

    /// Timestamp of the given block (epoch seconds).
    async fn block_timestamp(&self, block: u64) -> Result<u64, IndexerError>;

    /// Pool manager logs in `[from_block, to_block]`, ordered by
    /// `(block_number, log_index)`.
    async fn get_logs(&self, from_block: u64, to_block: u64) -> Result<Vec<Log>, IndexerError>;

    /// ERC-20 metadata for a token. Never fails; reverting or malformed
    /// responses yield [`TokenMetadata::default`].
    async fn erc20_metadata(&self, token: Address) -> TokenMetadata;
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLog {
    address: String,
    topics: Vec<String>,
    data: String,
    block_number: String,
    log_index: String,
    transaction_hash: String,
    #[serde(default)]
    removed: bool,
}

#[derive(Deserialize)]
struct RawBlock {
    timestamp: String,
}

/// HTTP JSON-RPC implementation of [`ChainReader`].
#[derive(Debug, Clone)]
pub struct HttpChainReader {
    client: reqwest::Client,
    rpc_url: String,
    pool_manager: Address,
    topics: [B256; 3],
}

impl HttpChainReader {
    /// Builds a reader for one pool manager contract.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Config`] if the HTTP client cannot be
    /// constructed.
    pub fn new(
        rpc_url: impl Into<String>,
        pool_manager: Address,
        timeout: Duration,
    ) -> Result<Self, IndexerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IndexerError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            rpc_url: rpc_url.into(),
            pool_manager,
            topics: event_topics(),
        })
    }

    async fn rpc_call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, IndexerError> {
        let req = RpcRequest { jsonrpc: "2.0", id: 1, method, params };
        let resp = self
            .client
            .post(&self.rpc_url)
            .json(&req)
            .send()
            .await?
            .error_for_status()?;
        let resp: RpcResponse<T> = resp.json().await?;
        if let Some(err) = resp.error {
            return Err(IndexerError::Rpc(format!(
                "{method} failed with code {}: {}",
                err.code, err.message
            )));
        }
        resp.result
            .ok_or_else(|| IndexerError::Rpc(format!("missing result for {method}")))
    }

    async fn eth_call(&self, to: Address, data: &str) -> Result<Vec<u8>, IndexerError> {
        let call = json!({ "to": address_hex(&to), "data": data });
        let raw: String = self.rpc_call("eth_call", json!([call, "latest"])).await?;
        decode_hex_bytes(&raw)
    }

    async fn fetch_metadata(&self, token: Address) -> Result<TokenMetadata, IndexerError> {
        let decimals_word = self.eth_call(token, DECIMALS_SELECTOR).await?;
        let decimals = decode_u8_word(&decimals_word)
            .ok_or_else(|| IndexerError::Decode("bad decimals() response".to_string()))?;

        // Symbol and name failures degrade field-by-field instead of
        // throwing the decimals away.
        let symbol = match self.eth_call(token, SYMBOL_SELECTOR).await {
            Ok(bytes) => decode_string_word(&bytes).unwrap_or_else(|| "UNKNOWN".to_string()),
            Err(_) => "UNKNOWN".to_string(),
        };
        let name = match self.eth_call(token, NAME_SELECTOR).await {
            Ok(bytes) => decode_string_word(&bytes).unwrap_or_else(|| "Unknown Token".to_string()),
            Err(_) => "Unknown Token".to_string(),
        };

        Ok(TokenMetadata { decimals, symbol, name })
    }
}

#[async_trait]
impl ChainReader for HttpChainReader {
    async fn block_number(&self) -> Result<u64, IndexerError> {
        let raw: String = self.rpc_call("eth_blockNumber", json!([])).await?;
        parse_hex_u64(&raw)
    }

    async fn block_timestamp(&self, block: u64) -> Result<u64, IndexerError> {
        let raw: Option<RawBlock> = self
            .rpc_call("eth_getBlockByNumber", json!([format!("0x{block:x}"), false]))
            .await?;
        let block_info =
            raw.ok_or_else(|| IndexerError::Rpc(format!("block {block} not found")))?;
        parse_hex_u64(&block_info.timestamp)
    }

    async fn get_logs(&self, from_block: u64, to_block: u64) -> Result<Vec<Log>, IndexerError> {
        let topic0_filter: Vec<String> =
            self.topics.iter().map(crate::domain::b256_hex).collect();
        let filter = json!([{
            "address": address_hex(&self.pool_manager),
            "fromBlock": format!("0x{from_block:x}"),
            "toBlock": format!("0x{to_block:x}"),
            "topics": [topic0_filter],
        }]);
        let raw: Vec<RawLog> = self.rpc_call("eth_getLogs", filter).await?;

        let mut logs = Vec::with_capacity(raw.len());
        for entry in raw {
            if entry.removed {
                continue;
            }
            logs.push(parse_raw_log(entry)?);
        }
        // Nodes return logs in order, but the ordering guarantee is ours
        // to keep.
        logs.sort_by_key(|log| (log.block_number, log.log_index));
        Ok(logs)
    }

    async fn erc20_metadata(&self, token: Address) -> TokenMetadata {
        match self.fetch_metadata(token).await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(token = %address_hex(&token), error = %e,
                    "metadata fetch failed, using defaults");
                TokenMetadata::default()
            }
        }
    }
}

fn parse_raw_log(raw: RawLog) -> Result<Log, IndexerError> {
    let address = Address::from_str(&raw.address)
        .map_err(|e| IndexerError::Decode(format!("bad log address: {e}")))?;
    let mut topics = Vec::with_capacity(raw.topics.len());
    for topic in &raw.topics {
        topics.push(
            B256::from_str(topic)
                .map_err(|e| IndexerError::Decode(format!("bad log topic: {e}")))?,
        );
    }
    let data = decode_hex_bytes(&raw.data)?;
    let transaction_hash = B256::from_str(&raw.transaction_hash)
        .map_err(|e| IndexerError::Decode(format!("bad tx hash: {e}")))?;
    Ok(Log {
        address,
        topics,
        data,
        block_number: parse_hex_u64(&raw.block_number)?,
        log_index: parse_hex_u64(&raw.log_index)?,
        transaction_hash,
    })
}

fn parse_hex_u64(raw: &str) -> Result<u64, IndexerError> {
    let trimmed = raw.trim_start_matches("0x");
    u64::from_str_radix(trimmed, 16)
        .map_err(|e| IndexerError::Decode(format!("invalid hex u64 '{raw}': {e}")))
}

fn decode_hex_bytes(raw: &str) -> Result<Vec<u8>, IndexerError> {
    let trimmed = raw.trim_start_matches("0x");
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    hex::decode(trimmed).map_err(|e| IndexerError::Decode(format!("invalid hex data: {e}")))
}

/// Decodes a single `uint8` return word.
fn decode_u8_word(bytes: &[u8]) -> Option<u8> {
    if bytes.len() < 32 {
        return None;
    }
    if bytes[..31].iter().any(|b| *b != 0) {
        return None;
    }
    Some(bytes[31])
}

/// Decodes an ABI `string` return value. Tolerates the non-standard
/// `bytes32` encoding some legacy tokens use.
fn decode_string_word(bytes: &[u8]) -> Option<String> {
    if bytes.len() >= 64 {
        let offset = usize_word(&bytes[0..32])?;
        let len_start = offset.checked_add(32)?;
        if bytes.len() < len_start {
            return None;
        }
        let len = usize_word(&bytes[offset..len_start])?;
        let end = len_start.checked_add(len)?;
        if bytes.len() < end {
            return None;
        }
        let text = String::from_utf8_lossy(&bytes[len_start..end]).trim().to_string();
        return if text.is_empty() { None } else { Some(text) };
    }
    if bytes.len() == 32 {
        let text = String::from_utf8_lossy(bytes)
            .trim_matches(char::from(0))
            .trim()
            .to_string();
        return if text.is_empty() { None } else { Some(text) };
    }
    None
}

fn usize_word(word: &[u8]) -> Option<usize> {
    if word.len() != 32 || word[..24].iter().any(|b| *b != 0) {
        return None;
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[24..32]);
    usize::try_from(u64::from_be_bytes(buf)).ok()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn default_metadata_matches_safe_defaults() {
        let meta = TokenMetadata::default();
        assert_eq!(meta.decimals, 18);
        assert_eq!(meta.symbol, "UNKNOWN");
        assert_eq!(meta.name, "Unknown Token");
        assert!(meta.is_default());
    }

    #[test]
    fn parse_hex_u64_accepts_prefixed_values() {
        assert_eq!(parse_hex_u64("0x10").ok(), Some(16));
        assert_eq!(parse_hex_u64("ff").ok(), Some(255));
        assert!(parse_hex_u64("0xzz").is_err());
    }

    #[test]
    fn decode_u8_word_requires_clean_padding() {
        let mut word = [0u8; 32];
        word[31] = 6;
        assert_eq!(decode_u8_word(&word), Some(6));

        word[0] = 1;
        assert_eq!(decode_u8_word(&word), None);
        assert_eq!(decode_u8_word(&[0u8; 16]), None);
    }

    #[test]
    fn decode_string_word_handles_dynamic_encoding() {
        // offset=0x20, len=4, "WETH"
        let mut bytes = vec![0u8; 96];
        bytes[31] = 0x20;
        bytes[63] = 4;
        bytes[64..68].copy_from_slice(b"WETH");
        assert_eq!(decode_string_word(&bytes), Some("WETH".to_string()));
    }

    #[test]
    fn decode_string_word_handles_bytes32_encoding() {
        let mut bytes = [0u8; 32];
        bytes[..3].copy_from_slice(b"DAI");
        assert_eq!(decode_string_word(&bytes), Some("DAI".to_string()));
    }

    #[test]
    fn decode_string_word_rejects_truncated_payloads() {
        let mut bytes = vec![0u8; 64];
        bytes[31] = 0x20;
        bytes[63] = 200; // length reaches past the buffer
        assert_eq!(decode_string_word(&bytes), None);
    }
}
