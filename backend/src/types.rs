// =============================================================================
// Shared types used across the dashboard
// =============================================================================

use serde::{Deserialize, Serialize};

/// Candle interval accepted by the SmartAPI historical endpoint.
///
/// Serialised with the broker's wire names (`ONE_DAY`, `FIFTEEN_MINUTE`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Interval {
    OneMinute,
    ThreeMinute,
    FiveMinute,
    TenMinute,
    FifteenMinute,
    ThirtyMinute,
    OneHour,
    OneDay,
}

impl Interval {
    /// Wire name expected by the `getCandleData` request body.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "ONE_MINUTE",
            Self::ThreeMinute => "THREE_MINUTE",
            Self::FiveMinute => "FIVE_MINUTE",
            Self::TenMinute => "TEN_MINUTE",
            Self::FifteenMinute => "FIFTEEN_MINUTE",
            Self::ThirtyMinute => "THIRTY_MINUTE",
            Self::OneHour => "ONE_HOUR",
            Self::OneDay => "ONE_DAY",
        }
    }

    /// Whether candles of this interval split a trading session into bars.
    pub fn is_intraday(&self) -> bool {
        !matches!(self, Self::OneDay)
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the cumulative VWAP sums restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VwapAnchor {
    /// Reset once, at the first candle of the series.
    Series,
    /// Reset at the first candle of every exchange-local calendar day.
    Session,
}

impl Default for VwapAnchor {
    fn default() -> Self {
        Self::Session
    }
}

impl std::fmt::Display for VwapAnchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Series => write!(f, "series"),
            Self::Session => write!(f, "session"),
        }
    }
}
