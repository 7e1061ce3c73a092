// =============================================================================
// Supertrend (ATR bands)
// =============================================================================
//
//   hl2          = (H + L) / 2
//   basic upper  = hl2 + multiplier * ATR
//   basic lower  = hl2 - multiplier * ATR
//
// Final bands ratchet: the upper band only moves down (and the lower band only
// up) unless the previous close broke through it. The trend is down while the
// close stays under the upper band and flips up when it closes above it; the
// reverse holds for the lower band. The Supertrend line is the band of the
// active side.
// =============================================================================

use serde::Serialize;

use crate::indicators::atr::calculate_atr;
use crate::indicators::Series;
use crate::market_data::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendDirection {
    Up,
    Down,
}

/// Every column the Supertrend formula produces, aligned with the candles.
///
/// The indicator engine only exposes `line`; the other columns are kept
/// for tests and chart tooling.
#[derive(Debug, Clone, PartialEq)]
pub struct SupertrendResult {
    pub line: Series,
    pub direction: Vec<Option<TrendDirection>>,
    pub upper: Series,
    pub lower: Series,
}

/// Supertrend over `candles` using ATR(`period`) and `multiplier`.
///
/// The first value lands on candle index `period`, where ATR is first
/// defined. Returns `None` when ATR cannot be computed.
pub fn calculate_supertrend(candles: &[Candle], period: usize, multiplier: f64) -> Option<SupertrendResult> {
    let atr = calculate_atr(candles, period);
    if atr.is_empty() {
        return None;
    }

    let len = candles.len();
    let mut result = SupertrendResult {
        line: vec![None; len],
        direction: vec![None; len],
        upper: vec![None; len],
        lower: vec![None; len],
    };

    let mut prev: Option<(f64, f64, TrendDirection)> = None;

    for (k, &atr_value) in atr.iter().enumerate() {
        let i = period + k;
        let bar = &candles[i];
        let hl2 = (bar.high + bar.low) / 2.0;
        let basic_upper = hl2 + multiplier * atr_value;
        let basic_lower = hl2 - multiplier * atr_value;

        let (upper, lower, direction) = match prev {
            None => {
                let direction = if bar.close <= basic_upper {
                    TrendDirection::Down
                } else {
                    TrendDirection::Up
                };
                (basic_upper, basic_lower, direction)
            }
            Some((prev_upper, prev_lower, prev_direction)) => {
                let prev_close = candles[i - 1].close;
                let upper = if basic_upper < prev_upper || prev_close > prev_upper {
                    basic_upper
                } else {
                    prev_upper
                };
                let lower = if basic_lower > prev_lower || prev_close < prev_lower {
                    basic_lower
                } else {
                    prev_lower
                };
                let direction = match prev_direction {
                    TrendDirection::Down if bar.close > upper => TrendDirection::Up,
                    TrendDirection::Up if bar.close < lower => TrendDirection::Down,
                    unchanged => unchanged,
                };
                (upper, lower, direction)
            }
        };

        let line = match direction {
            TrendDirection::Up => lower,
            TrendDirection::Down => upper,
        };

        result.line[i] = Some(line);
        result.direction[i] = Some(direction);
        result.upper[i] = Some(upper);
        result.lower[i] = Some(lower);
        prev = Some((upper, lower, direction));
    }

    Some(result)
}
