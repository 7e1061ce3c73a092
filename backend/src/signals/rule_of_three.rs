// =============================================================================
// Rule-of-Three Scorer
// =============================================================================
//
// Three daily checks, each worth one point:
//
//   1. Trend      close > EMA_50
//   2. Momentum   50 < RSI < 70 (both bounds exclusive)
//   3. Volume     volume > Vol_SMA_5
//
// plus one intraday gate, close > VWAP, that only matters at a full score:
//
//   score 3 and gate open  -> STRONG_BUY
//   score <= 1             -> NO_TRADE
//   anything else          -> WATCHLIST
//
// RSI at or above 70 scores the same as RSI at or below 50. The scorer is a
// pure function of the two rows it is handed.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::DashboardError;
use crate::indicators::{IndicatorKey, IndicatorRow};

pub const RSI_LOWER_BOUND: f64 = 50.0;
pub const RSI_UPPER_BOUND: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    StrongBuy,
    Watchlist,
    NoTrade,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StrongBuy => "STRONG_BUY",
            Self::Watchlist => "WATCHLIST",
            Self::NoTrade => "NO_TRADE",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one scoring pass. Recomputed for every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub trend_bullish: bool,
    pub momentum_bullish: bool,
    pub volume_bullish: bool,
    pub intraday_bullish: bool,
    pub score: u8,
    pub classification: Classification,
}

/// Daily values the scorer reads, all guaranteed present.
#[derive(Debug, Clone, Copy)]
struct DailyInputs {
    close: f64,
    ema_50: f64,
    rsi: f64,
    volume: f64,
    vol_sma_5: f64,
}

fn require(value: Option<f64>, timeframe: &'static str, key: IndicatorKey) -> Result<f64, DashboardError> {
    value.ok_or(DashboardError::InsufficientIndicators {
        timeframe,
        field: key.as_str(),
    })
}

/// Score the latest daily and intraday rows.
///
/// Fails with [`DashboardError::InsufficientIndicators`] when EMA_50, RSI or
/// Vol_SMA_5 is missing from the daily row, or VWAP from the intraday row.
/// A missing value is never read as zero or as "not bullish".
pub fn score(daily: &IndicatorRow, intraday: &IndicatorRow) -> Result<Verdict, DashboardError> {
    let inputs = DailyInputs {
        close: daily.close,
        ema_50: require(daily.ema_50, "daily", IndicatorKey::Ema50)?,
        rsi: require(daily.rsi, "daily", IndicatorKey::Rsi)?,
        volume: daily.volume,
        vol_sma_5: require(daily.vol_sma_5, "daily", IndicatorKey::VolSma5)?,
    };
    let vwap = require(intraday.vwap, "intraday", IndicatorKey::Vwap)?;

    let trend_bullish = inputs.close > inputs.ema_50;
    let momentum_bullish = inputs.rsi > RSI_LOWER_BOUND && inputs.rsi < RSI_UPPER_BOUND;
    let volume_bullish = inputs.volume > inputs.vol_sma_5;
    let intraday_bullish = intraday.close > vwap;

    let score = [trend_bullish, momentum_bullish, volume_bullish]
        .into_iter()
        .filter(|bullish| *bullish)
        .count() as u8;

    Ok(Verdict {
        trend_bullish,
        momentum_bullish,
        volume_bullish,
        intraday_bullish,
        score,
        classification: classify(score, intraday_bullish),
    })
}

/// Map a 0–3 score and the intraday gate to a classification.
pub fn classify(score: u8, intraday_bullish: bool) -> Classification {
    match score {
        3 if intraday_bullish => Classification::StrongBuy,
        0 | 1 => Classification::NoTrade,
        _ => Classification::Watchlist,
    }
}
