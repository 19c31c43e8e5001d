//! ABI decoding for the three pool manager events.
//!
//! `topic[0]` is `keccak256` of the event signature; the hashes are
//! computed once at startup. Decoding is strict about word counts and
//! sign-extension so a malformed log surfaces as a warning instead of a
//! corrupted row.

use std::sync::LazyLock;

use alloy_primitives::{Address, B256, I256, U256, keccak256};

use super::client::Log;
use crate::domain::PoolId;
use crate::error::IndexerError;

const INITIALIZE_SIGNATURE: &str =
    "Initialize(bytes32,address,address,uint24,int24,address,uint160,int24)";
const SWAP_SIGNATURE: &str = "Swap(bytes32,address,int128,int128,uint160,uint128,int24,uint24)";
const MODIFY_LIQUIDITY_SIGNATURE: &str =
    "ModifyLiquidity(bytes32,address,int24,int24,int256,bytes32)";

static INITIALIZE_TOPIC: LazyLock<B256> =
    LazyLock::new(|| keccak256(INITIALIZE_SIGNATURE.as_bytes()));
static SWAP_TOPIC: LazyLock<B256> = LazyLock::new(|| keccak256(SWAP_SIGNATURE.as_bytes()));
static MODIFY_LIQUIDITY_TOPIC: LazyLock<B256> =
    LazyLock::new(|| keccak256(MODIFY_LIQUIDITY_SIGNATURE.as_bytes()));

/// The three recognized topic0 values, in declaration order. Passed as a
/// single OR-filter so one `getLogs` call preserves cross-event ordering.
#[must_use]
pub fn event_topics() -> [B256; 3] {
    [*INITIALIZE_TOPIC, *SWAP_TOPIC, *MODIFY_LIQUIDITY_TOPIC]
}

/// Decoded `Initialize` event: a new pool came into existence.
#[derive(Debug, Clone)]
pub struct InitializeEvent {
    /// New pool's identifier.
    pub pool_id: PoolId,
    /// First token as declared by the pool.
    pub currency0: Address,
    /// Second token as declared by the pool.
    pub currency1: Address,
    /// Fee tier in hundredths of a basis point.
    pub fee: u32,
    /// Tick spacing.
    pub tick_spacing: i32,
    /// Hooks contract.
    pub hooks: Address,
    /// Initial sqrt price.
    pub sqrt_price_x96: U256,
    /// Initial tick.
    pub tick: i32,
}

/// Decoded `Swap` event with post-swap pool state.
#[derive(Debug, Clone)]
pub struct SwapEvent {
    /// Pool the swap executed in.
    pub pool_id: PoolId,
    /// Swap router / sender.
    pub sender: Address,
    /// Signed token0 delta (positive = into the pool).
    pub amount0: i128,
    /// Signed token1 delta (positive = into the pool).
    pub amount1: i128,
    /// Pool sqrt price after the swap.
    pub sqrt_price_x96: U256,
    /// Pool liquidity after the swap.
    pub liquidity: u128,
    /// Pool tick after the swap.
    pub tick: i32,
    /// Fee tier applied.
    pub fee: u32,
}

/// Decoded `ModifyLiquidity` event.
#[derive(Debug, Clone)]
pub struct ModifyLiquidityEvent {
    /// Pool whose position changed.
    pub pool_id: PoolId,
    /// Position owner / router.
    pub sender: Address,
    /// Lower tick of the position.
    pub tick_lower: i32,
    /// Upper tick of the position.
    pub tick_upper: i32,
    /// Signed liquidity change.
    pub liquidity_delta: I256,
    /// Position salt.
    pub salt: B256,
}

/// A typed pool manager event.
#[derive(Debug, Clone)]
pub enum PoolManagerEvent {
    /// Pool creation.
    Initialize(InitializeEvent),
    /// Swap execution.
    Swap(SwapEvent),
    /// Liquidity position change.
    ModifyLiquidity(ModifyLiquidityEvent),
}

/// Decodes a raw log into a typed event.
///
/// # Errors
///
/// Returns [`IndexerError::Decode`] for unknown topic0 values, missing
/// topics, or malformed data words.
pub fn decode_log(log: &Log) -> Result<PoolManagerEvent, IndexerError> {
    let topic0 = log
        .topics
        .first()
        .ok_or_else(|| IndexerError::Decode("log has no topics".to_string()))?;

    if *topic0 == *INITIALIZE_TOPIC {
        decode_initialize(log).map(PoolManagerEvent::Initialize)
    } else if *topic0 == *SWAP_TOPIC {
        decode_swap(log).map(PoolManagerEvent::Swap)
    } else if *topic0 == *MODIFY_LIQUIDITY_TOPIC {
        decode_modify_liquidity(log).map(PoolManagerEvent::ModifyLiquidity)
    } else {
        Err(IndexerError::Decode(format!("unrecognized topic0 {topic0}")))
    }
}

fn decode_initialize(log: &Log) -> Result<InitializeEvent, IndexerError> {
    let words = data_words(log, 5, "Initialize")?;
    Ok(InitializeEvent {
        pool_id: PoolId::from_b256(topic(log, 1, "Initialize")?),
        currency0: topic_address(topic(log, 2, "Initialize")?),
        currency1: topic_address(topic(log, 3, "Initialize")?),
        fee: word_to_u32(words[0])?,
        tick_spacing: word_to_i32(words[1])?,
        hooks: word_address(words[2])?,
        sqrt_price_x96: U256::from_be_slice(words[3]),
        tick: word_to_i32(words[4])?,
    })
}

fn decode_swap(log: &Log) -> Result<SwapEvent, IndexerError> {
    let words = data_words(log, 6, "Swap")?;
    Ok(SwapEvent {
        pool_id: PoolId::from_b256(topic(log, 1, "Swap")?),
        sender: topic_address(topic(log, 2, "Swap")?),
        amount0: word_to_i128(words[0])?,
        amount1: word_to_i128(words[1])?,
        sqrt_price_x96: U256::from_be_slice(words[2]),
        liquidity: word_to_u128(words[3])?,
        tick: word_to_i32(words[4])?,
        fee: word_to_u32(words[5])?,
    })
}

fn decode_modify_liquidity(log: &Log) -> Result<ModifyLiquidityEvent, IndexerError> {
    let words = data_words(log, 4, "ModifyLiquidity")?;
    Ok(ModifyLiquidityEvent {
        pool_id: PoolId::from_b256(topic(log, 1, "ModifyLiquidity")?),
        sender: topic_address(topic(log, 2, "ModifyLiquidity")?),
        tick_lower: word_to_i32(words[0])?,
        tick_upper: word_to_i32(words[1])?,
        liquidity_delta: I256::from_raw(U256::from_be_slice(words[2])),
        salt: B256::from_slice(words[3]),
    })
}

fn topic(log: &Log, index: usize, event: &str) -> Result<B256, IndexerError> {
    log.topics
        .get(index)
        .copied()
        .ok_or_else(|| IndexerError::Decode(format!("{event}: missing topic {index}")))
}

fn data_words<'a>(
    log: &'a Log,
    expected: usize,
    event: &str,
) -> Result<Vec<&'a [u8]>, IndexerError> {
    if log.data.len() != expected * 32 {
        return Err(IndexerError::Decode(format!(
            "{event}: expected {} data bytes, got {}",
            expected * 32,
            log.data.len()
        )));
    }
    Ok(log.data.chunks_exact(32).collect())
}

/// Indexed address arguments arrive left-padded inside a topic.
fn topic_address(topic: B256) -> Address {
    Address::from_slice(&topic.as_slice()[12..])
}

fn word_address(word: &[u8]) -> Result<Address, IndexerError> {
    if word[..12].iter().any(|b| *b != 0) {
        return Err(IndexerError::Decode("address word has dirty padding".to_string()));
    }
    Ok(Address::from_slice(&word[12..]))
}

fn word_to_u32(word: &[u8]) -> Result<u32, IndexerError> {
    if word[..28].iter().any(|b| *b != 0) {
        return Err(IndexerError::Decode("u32 word out of range".to_string()));
    }
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&word[28..32]);
    Ok(u32::from_be_bytes(buf))
}

fn word_to_u128(word: &[u8]) -> Result<u128, IndexerError> {
    if word[..16].iter().any(|b| *b != 0) {
        return Err(IndexerError::Decode("u128 word out of range".to_string()));
    }
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&word[16..32]);
    Ok(u128::from_be_bytes(buf))
}

/// Decodes a sign-extended two's-complement `int128` word.
fn word_to_i128(word: &[u8]) -> Result<i128, IndexerError> {
    let negative = word[0] & 0x80 != 0;
    let expected = if negative { 0xFF } else { 0x00 };
    if word[..16].iter().any(|b| *b != expected) {
        return Err(IndexerError::Decode("i128 word not sign-extended".to_string()));
    }
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&word[16..32]);
    Ok(i128::from_be_bytes(buf))
}

fn word_to_i32(word: &[u8]) -> Result<i32, IndexerError> {
    let value = word_to_i128(word)?;
    i32::try_from(value).map_err(|_| IndexerError::Decode("i32 word out of range".to_string()))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn word_u128(value: u128) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[16..].copy_from_slice(&value.to_be_bytes());
        word
    }

    fn word_i128(value: i128) -> [u8; 32] {
        let fill = if value < 0 { 0xFF } else { 0x00 };
        let mut word = [fill; 32];
        word[16..].copy_from_slice(&value.to_be_bytes());
        word
    }

    fn word_addr(addr: Address) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(addr.as_slice());
        word
    }

    fn topic_for(addr: Address) -> B256 {
        B256::from(word_addr(addr))
    }

    fn swap_log() -> Log {
        let mut data = Vec::new();
        data.extend_from_slice(&word_i128(1_000_000_000_000_000_000)); // amount0
        data.extend_from_slice(&word_i128(-2_000_000_000_000_000_000)); // amount1
        data.extend_from_slice(&word_u128(79_228_162_514_264_337_593_543_950_336)); // sqrtPriceX96 = 2^96
        data.extend_from_slice(&word_u128(5_000_000_000_000_000_000)); // liquidity
        data.extend_from_slice(&word_i128(100)); // tick
        data.extend_from_slice(&word_u128(3000)); // fee
        Log {
            address: Address::repeat_byte(0x11),
            topics: vec![
                *SWAP_TOPIC,
                B256::repeat_byte(0xAA),
                topic_for(Address::repeat_byte(0x33)),
            ],
            data,
            block_number: 100,
            log_index: 2,
            transaction_hash: B256::repeat_byte(0xDE),
        }
    }

    #[test]
    fn topics_are_distinct() {
        let topics = event_topics();
        assert_ne!(topics[0], topics[1]);
        assert_ne!(topics[1], topics[2]);
        assert_ne!(topics[0], topics[2]);
    }

    #[test]
    fn decodes_swap_fields() {
        let decoded = decode_log(&swap_log());
        let Ok(PoolManagerEvent::Swap(swap)) = decoded else {
            panic!("expected a Swap event");
        };
        assert_eq!(swap.pool_id.as_b256(), &B256::repeat_byte(0xAA));
        assert_eq!(swap.sender, Address::repeat_byte(0x33));
        assert_eq!(swap.amount0, 1_000_000_000_000_000_000);
        assert_eq!(swap.amount1, -2_000_000_000_000_000_000);
        assert_eq!(swap.sqrt_price_x96, U256::from(1u8) << 96);
        assert_eq!(swap.liquidity, 5_000_000_000_000_000_000);
        assert_eq!(swap.tick, 100);
        assert_eq!(swap.fee, 3000);
    }

    #[test]
    fn decodes_initialize_fields() {
        let currency0 = Address::repeat_byte(0xC0);
        let currency1 = Address::repeat_byte(0xDA);
        let hooks = Address::ZERO;
        let mut data = Vec::new();
        data.extend_from_slice(&word_u128(3000)); // fee
        data.extend_from_slice(&word_i128(60)); // tickSpacing
        data.extend_from_slice(&word_addr(hooks));
        data.extend_from_slice(&word_u128(79_228_162_514_264_337_593_543_950_336));
        data.extend_from_slice(&word_i128(0)); // tick
        let log = Log {
            address: Address::repeat_byte(0x11),
            topics: vec![
                *INITIALIZE_TOPIC,
                B256::repeat_byte(0xAA),
                topic_for(currency0),
                topic_for(currency1),
            ],
            data,
            block_number: 1,
            log_index: 0,
            transaction_hash: B256::repeat_byte(0x01),
        };
        let decoded = decode_log(&log);
        let Ok(PoolManagerEvent::Initialize(init)) = decoded else {
            panic!("expected an Initialize event");
        };
        assert_eq!(init.currency0, currency0);
        assert_eq!(init.currency1, currency1);
        assert_eq!(init.fee, 3000);
        assert_eq!(init.tick_spacing, 60);
        assert_eq!(init.hooks, hooks);
        assert_eq!(init.tick, 0);
    }

    #[test]
    fn decodes_negative_liquidity_delta() {
        let mut data = Vec::new();
        data.extend_from_slice(&word_i128(-60)); // tickLower
        data.extend_from_slice(&word_i128(60)); // tickUpper
        data.extend_from_slice(&word_i128(-1_000_000_000_000_000_000)); // liquidityDelta
        data.extend_from_slice(&[0u8; 32]); // salt
        let log = Log {
            address: Address::repeat_byte(0x11),
            topics: vec![
                *MODIFY_LIQUIDITY_TOPIC,
                B256::repeat_byte(0xAA),
                topic_for(Address::repeat_byte(0x33)),
            ],
            data,
            block_number: 5,
            log_index: 1,
            transaction_hash: B256::repeat_byte(0x02),
        };
        let decoded = decode_log(&log);
        let Ok(PoolManagerEvent::ModifyLiquidity(event)) = decoded else {
            panic!("expected a ModifyLiquidity event");
        };
        assert_eq!(event.tick_lower, -60);
        assert_eq!(event.tick_upper, 60);
        assert!(event.liquidity_delta.is_negative());
        assert_eq!(
            event.liquidity_delta.unsigned_abs(),
            U256::from(1_000_000_000_000_000_000u128)
        );
    }

    #[test]
    fn rejects_unknown_topic0() {
        let mut log = swap_log();
        log.topics[0] = B256::repeat_byte(0x99);
        assert!(decode_log(&log).is_err());
    }

    #[test]
    fn rejects_truncated_data() {
        let mut log = swap_log();
        log.data.truncate(64);
        assert!(decode_log(&log).is_err());
    }

    #[test]
    fn rejects_missing_topics() {
        let mut log = swap_log();
        log.topics.truncate(2);
        assert!(decode_log(&log).is_err());
    }
}
