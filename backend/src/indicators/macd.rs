// =============================================================================
// MACD (12, 26, 9)
// =============================================================================
//
//   MACD line   = EMA(fast) - EMA(slow)
//   signal line = EMA(signal) of the MACD line
//   histogram   = MACD line - signal line
// =============================================================================

use crate::indicators::ema::calculate_ema;
use crate::indicators::{align, Series};

/// Standard MACD periods.
pub const FAST: usize = 12;
pub const SLOW: usize = 26;
pub const SIGNAL: usize = 9;

/// MACD columns aligned with the input closes.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub macd: Series,
    pub signal: Series,
    pub histogram: Series,
}

/// MACD over `closes`.
///
/// The MACD line starts at index `slow - 1` and the signal line at
/// `slow + signal - 2`. Returns `None` unless both lines have at least one
/// value, so callers never see a MACD without its signal.
pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Option<MacdSeries> {
    if fast == 0 || signal == 0 || fast >= slow {
        return None;
    }

    let ema_fast = calculate_ema(closes, fast);
    let ema_slow = calculate_ema(closes, slow);
    if ema_slow.is_empty() {
        return None;
    }

    // ema_fast[k] sits at index fast-1+k, ema_slow[j] at slow-1+j.
    let lag = slow - fast;
    let line: Vec<f64> = ema_slow
        .iter()
        .zip(ema_fast.iter().skip(lag))
        .map(|(slow_v, fast_v)| fast_v - slow_v)
        .collect();

    let signal_line = calculate_ema(&line, signal);
    if signal_line.is_empty() {
        return None;
    }

    let histogram: Vec<f64> = signal_line
        .iter()
        .zip(line.iter().skip(signal - 1))
        .map(|(s, m)| m - s)
        .collect();

    let line_offset = slow - 1;
    let signal_offset = line_offset + signal - 1;
    let len = closes.len();

    Some(MacdSeries {
        macd: align(&line, line_offset, len),
        signal: align(&signal_line, signal_offset, len),
        histogram: align(&histogram, signal_offset, len),
    })
}
