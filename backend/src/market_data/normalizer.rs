// =============================================================================
// Candle Normalizer
// =============================================================================
//
// Turns raw broker rows into a `CandleSeries`:
//   1. Parse the timestamp (RFC 3339, or naive exchange-local time).
//   2. Cast open/high/low/close/volume to f64 (strings or JSON numbers).
//   3. Sort ascending by timestamp; the broker's ordering is not trusted.
//   4. Collapse duplicate timestamps, keeping the last row seen.
// =============================================================================

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use tracing::{debug, warn};

use crate::error::NormalizeError;
use crate::market_data::{Candle, CandleSeries, RawCandleRow};

/// NSE trades in IST (UTC+05:30).
pub const EXCHANGE_UTC_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Naive formats accepted when the broker omits the offset.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Offset applied to naive timestamps.
pub fn exchange_offset() -> FixedOffset {
    FixedOffset::east_opt(EXCHANGE_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Normalise `rows` into a time-ordered candle series.
///
/// Fails on the first row whose timestamp cannot be parsed
/// ([`NormalizeError::MalformedRow`]) or whose price/volume field is not a
/// finite number ([`NormalizeError::NonNumericField`]).
pub fn normalize(rows: &[RawCandleRow]) -> Result<CandleSeries, NormalizeError> {
    let mut candles = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| NormalizeError::MalformedRow {
            index,
            reason: format!("unparseable timestamp {}", row.timestamp),
        })?;

        candles.push(Candle {
            timestamp,
            open: parse_number(&row.open, "open", index)?,
            high: parse_number(&row.high, "high", index)?,
            low: parse_number(&row.low, "low", index)?,
            close: parse_number(&row.close, "close", index)?,
            volume: parse_number(&row.volume, "volume", index)?,
        });
    }

    // Stable sort keeps input order among equal timestamps, so "last wins"
    // below means last in the broker's payload.
    candles.sort_by_key(|c| c.timestamp);

    let mut deduped: Vec<Candle> = Vec::with_capacity(candles.len());
    for candle in candles {
        match deduped.last_mut() {
            Some(prev) if prev.timestamp == candle.timestamp => {
                warn!(timestamp = %candle.timestamp, "duplicate candle timestamp, keeping latest row");
                *prev = candle;
            }
            _ => deduped.push(candle),
        }
    }

    debug!(rows = rows.len(), candles = deduped.len(), "candles normalised");
    Ok(CandleSeries::from_sorted(deduped))
}

/// Parse a broker timestamp. Accepts RFC 3339, naive date-times (assumed
/// exchange-local) and bare dates (midnight exchange-local).
fn parse_timestamp(value: &serde_json::Value) -> Option<DateTime<FixedOffset>> {
    let text = value.as_str()?.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts);
    }

    let offset = exchange_offset();
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    offset.from_local_datetime(&naive).single()
}

/// Cast a JSON string or number into a finite `f64`.
fn parse_number(value: &serde_json::Value, field: &'static str, index: usize) -> Result<f64, NormalizeError> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(NormalizeError::NonNumericField {
            index,
            field,
            value: value.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
