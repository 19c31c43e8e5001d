//! Response DTOs for the REST surface.

pub mod market_dto;

pub use market_dto::{
    CandleDto, CandleQuery, LimitQuery, PoolDto, SwapDto, SyncStatusDto, TokenDto,
};
