// =============================================================================
// Indicator Engine
// =============================================================================
//
// Runs the fixed indicator battery over one `CandleSeries`:
//
//   SMA_50, EMA_50           trend
//   Supertrend(10, 3×ATR)    trend overlay (line only)
//   RSI(14)                  momentum
//   MACD(12, 26, 9)          momentum (line, signal, histogram)
//   BB(20, 2σ)               volatility (upper, lower)
//   Vol_SMA_5                volume
//   VWAP                     intraday only
//
// An indicator that cannot produce a single value (too little history) is
// absent from the set. Absent means "unavailable", never zero.
// =============================================================================

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use tracing::debug;

use crate::indicators::bollinger::{calculate_bollinger, BollingerSeries};
use crate::indicators::ema::calculate_ema;
use crate::indicators::macd::{self, calculate_macd, MacdSeries};
use crate::indicators::rsi::calculate_rsi;
use crate::indicators::sma::calculate_sma;
use crate::indicators::supertrend::calculate_supertrend;
use crate::indicators::vwap::calculate_vwap;
use crate::indicators::{align, Series};
use crate::market_data::CandleSeries;
use crate::types::VwapAnchor;

pub const TREND_PERIOD: usize = 50;
pub const RSI_PERIOD: usize = 14;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_STD: f64 = 2.0;
pub const SUPERTREND_PERIOD: usize = 10;
pub const SUPERTREND_MULTIPLIER: f64 = 3.0;
pub const VOLUME_SMA_PERIOD: usize = 5;

// =============================================================================
// Keys
// =============================================================================

/// Name of an exposed indicator column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IndicatorKey {
    #[serde(rename = "SMA_50")]
    Sma50,
    #[serde(rename = "EMA_50")]
    Ema50,
    #[serde(rename = "RSI")]
    Rsi,
    Supertrend,
    #[serde(rename = "MACD")]
    Macd,
    #[serde(rename = "MACD_Signal")]
    MacdSignal,
    #[serde(rename = "BB_Upper")]
    BbUpper,
    #[serde(rename = "BB_Lower")]
    BbLower,
    #[serde(rename = "Vol_SMA_5")]
    VolSma5,
    #[serde(rename = "VWAP")]
    Vwap,
}

impl IndicatorKey {
    pub const ALL: [IndicatorKey; 10] = [
        Self::Sma50,
        Self::Ema50,
        Self::Rsi,
        Self::Supertrend,
        Self::Macd,
        Self::MacdSignal,
        Self::BbUpper,
        Self::BbLower,
        Self::VolSma5,
        Self::Vwap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sma50 => "SMA_50",
            Self::Ema50 => "EMA_50",
            Self::Rsi => "RSI",
            Self::Supertrend => "Supertrend",
            Self::Macd => "MACD",
            Self::MacdSignal => "MACD_Signal",
            Self::BbUpper => "BB_Upper",
            Self::BbLower => "BB_Lower",
            Self::VolSma5 => "Vol_SMA_5",
            Self::Vwap => "VWAP",
        }
    }
}

impl std::fmt::Display for IndicatorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// IndicatorSet
// =============================================================================

/// Indicator columns for one candle series. Every present column has exactly
/// one entry per candle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSet {
    pub sma_50: Option<Series>,
    pub ema_50: Option<Series>,
    pub rsi: Option<Series>,
    pub supertrend: Option<Series>,
    pub macd: Option<MacdSeries>,
    pub bollinger: Option<BollingerSeries>,
    pub vol_sma_5: Option<Series>,
    pub vwap: Option<Series>,
}

impl IndicatorSet {
    /// Column for `key`, or `None` when the indicator is unavailable.
    pub fn get(&self, key: IndicatorKey) -> Option<&Series> {
        match key {
            IndicatorKey::Sma50 => self.sma_50.as_ref(),
            IndicatorKey::Ema50 => self.ema_50.as_ref(),
            IndicatorKey::Rsi => self.rsi.as_ref(),
            IndicatorKey::Supertrend => self.supertrend.as_ref(),
            IndicatorKey::Macd => self.macd.as_ref().map(|m| &m.macd),
            IndicatorKey::MacdSignal => self.macd.as_ref().map(|m| &m.signal),
            IndicatorKey::BbUpper => self.bollinger.as_ref().map(|b| &b.upper),
            IndicatorKey::BbLower => self.bollinger.as_ref().map(|b| &b.lower),
            IndicatorKey::VolSma5 => self.vol_sma_5.as_ref(),
            IndicatorKey::Vwap => self.vwap.as_ref(),
        }
    }

    /// Keys present in this set, in canonical order.
    pub fn keys(&self) -> Vec<IndicatorKey> {
        IndicatorKey::ALL
            .into_iter()
            .filter(|k| self.get(*k).is_some())
            .collect()
    }

    /// Value of `key` at candle `index`; `None` when the column is absent or
    /// still warming up.
    pub fn value_at(&self, key: IndicatorKey, index: usize) -> Option<f64> {
        self.get(key)?.get(index).copied().flatten()
    }
}

// =============================================================================
// Frame and last row
// =============================================================================

/// Candles plus the indicators computed over them.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorFrame {
    pub candles: CandleSeries,
    pub indicators: IndicatorSet,
    pub is_intraday: bool,
}

/// The latest candle together with every indicator value at that index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorRow {
    pub timestamp: DateTime<FixedOffset>,
    pub close: f64,
    pub volume: f64,
    pub sma_50: Option<f64>,
    pub ema_50: Option<f64>,
    pub rsi: Option<f64>,
    pub supertrend: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_lower: Option<f64>,
    pub vol_sma_5: Option<f64>,
    pub vwap: Option<f64>,
}

impl IndicatorFrame {
    /// Row for the most recent candle, or `None` for an empty series.
    pub fn last_row(&self) -> Option<IndicatorRow> {
        let index = self.candles.len().checked_sub(1)?;
        let candle = self.candles.last()?;
        let at = |key| self.indicators.value_at(key, index);

        Some(IndicatorRow {
            timestamp: candle.timestamp,
            close: candle.close,
            volume: candle.volume,
            sma_50: at(IndicatorKey::Sma50),
            ema_50: at(IndicatorKey::Ema50),
            rsi: at(IndicatorKey::Rsi),
            supertrend: at(IndicatorKey::Supertrend),
            macd: at(IndicatorKey::Macd),
            macd_signal: at(IndicatorKey::MacdSignal),
            bb_upper: at(IndicatorKey::BbUpper),
            bb_lower: at(IndicatorKey::BbLower),
            vol_sma_5: at(IndicatorKey::VolSma5),
            vwap: at(IndicatorKey::Vwap),
        })
    }
}

// =============================================================================
// Engine
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct IndicatorEngine {
    pub vwap_anchor: VwapAnchor,
}

impl IndicatorEngine {
    pub fn new(vwap_anchor: VwapAnchor) -> Self {
        Self { vwap_anchor }
    }

    /// Compute the indicator battery over `candles`.
    ///
    /// VWAP is only attempted when `is_intraday` is set; a daily frame never
    /// carries a VWAP column.
    pub fn compute(&self, candles: CandleSeries, is_intraday: bool) -> IndicatorFrame {
        let len = candles.len();
        let closes = candles.closes();
        let volumes = candles.volumes();

        let indicators = IndicatorSet {
            sma_50: aligned(calculate_sma(&closes, TREND_PERIOD), TREND_PERIOD - 1, len),
            ema_50: aligned(calculate_ema(&closes, TREND_PERIOD), TREND_PERIOD - 1, len),
            rsi: aligned(calculate_rsi(&closes, RSI_PERIOD), RSI_PERIOD, len),
            supertrend: calculate_supertrend(candles.candles(), SUPERTREND_PERIOD, SUPERTREND_MULTIPLIER)
                .map(|st| st.line),
            macd: calculate_macd(&closes, macd::FAST, macd::SLOW, macd::SIGNAL),
            bollinger: calculate_bollinger(&closes, BOLLINGER_PERIOD, BOLLINGER_STD),
            vol_sma_5: aligned(calculate_sma(&volumes, VOLUME_SMA_PERIOD), VOLUME_SMA_PERIOD - 1, len),
            vwap: if is_intraday {
                Some(calculate_vwap(candles.candles(), self.vwap_anchor))
                    .filter(|series| series.iter().any(Option::is_some))
            } else {
                None
            },
        };

        debug!(
            candles = len,
            is_intraday,
            keys = ?indicators.keys(),
            "indicators computed"
        );

        IndicatorFrame {
            candles,
            indicators,
            is_intraday,
        }
    }
}

/// Align a compact calculator output, or report the indicator absent when it
/// produced nothing.
fn aligned(values: Vec<f64>, offset: usize, len: usize) -> Option<Series> {
    if values.is_empty() {
        None
    } else {
        Some(align(&values, offset, len))
    }
}
