use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single OHLCV candle, immutable once normalised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<FixedOffset>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Typical price `(H + L + C) / 3`, the VWAP price input.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// One candle row exactly as the broker returned it.
///
/// SmartAPI sends `[timestamp, open, high, low, close, volume]` arrays; serde
/// maps the positional elements onto these fields. Values stay untyped until
/// the normalizer checks them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCandleRow {
    pub timestamp: serde_json::Value,
    pub open: serde_json::Value,
    pub high: serde_json::Value,
    pub low: serde_json::Value,
    pub close: serde_json::Value,
    pub volume: serde_json::Value,
}

// ---------------------------------------------------------------------------
// CandleSeries -- strictly increasing timestamps, one per fetch request
// ---------------------------------------------------------------------------

/// Time-ordered candle table produced by [`crate::market_data::normalize`].
///
/// Timestamps are strictly increasing. The series is owned by the request
/// that fetched it and dropped once the report is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Wrap candles that are already sorted and de-duplicated.
    pub(super) fn from_sorted(candles: Vec<Candle>) -> Self {
        Self { candles }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.volume).collect()
    }

    /// Serialise back into broker-shaped rows (RFC 3339 timestamps, numeric
    /// JSON values). Normalising the result yields an identical series.
    #[cfg(test)]
    pub fn to_raw_rows(&self) -> Vec<RawCandleRow> {
        self.candles
            .iter()
            .map(|c| RawCandleRow {
                timestamp: serde_json::Value::String(c.timestamp.to_rfc3339()),
                open: serde_json::Value::from(c.open),
                high: serde_json::Value::from(c.high),
                low: serde_json::Value::from(c.low),
                close: serde_json::Value::from(c.close),
                volume: serde_json::Value::from(c.volume),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
