// =============================================================================
// SmartAPI Module
// =============================================================================
//
// Market data gateway for Angel One SmartAPI:
// - TOTP generation for the password login
// - Authenticated historical candle fetches

pub mod client;
pub mod totp;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::DashboardError;
use crate::market_data::RawCandleRow;
use crate::types::Interval;

pub use client::SmartApiClient;

/// One historical candle query.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleRequest {
    pub exchange: String,
    pub symbol_token: String,
    pub interval: Interval,
    /// Exchange-local range start.
    pub from: NaiveDateTime,
    /// Exchange-local range end.
    pub to: NaiveDateTime,
}

/// Anything that can return raw candles for a [`CandleRequest`].
///
/// Implemented by the live SmartAPI session and by test stubs.
#[async_trait]
pub trait MarketDataGateway: Send + Sync {
    async fn fetch_candles(&self, request: &CandleRequest) -> Result<Vec<RawCandleRow>, DashboardError>;
}
