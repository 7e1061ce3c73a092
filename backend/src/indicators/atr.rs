// =============================================================================
// Average True Range (ATR) — Wilder's Smoothing Method
// =============================================================================
//
// True Range (TR) for each bar after the first:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
//
// ATR is the Wilder-smoothed average of TR:
//   ATR_0   = SMA of the first `period` TR values
//   ATR_t   = (ATR_{t-1} * (period - 1) + TR_t) / period
//
// Feeds the Supertrend band width.
// =============================================================================

use crate::market_data::Candle;

/// True Range for every candle after the first.
///
/// Element `i` belongs to candle index `i + 1`.
pub fn true_ranges(candles: &[Candle]) -> Vec<f64> {
    candles
        .windows(2)
        .map(|pair| {
            let (prev, bar) = (&pair[0], &pair[1]);
            let hl = bar.high - bar.low;
            let hc = (bar.high - prev.close).abs();
            let lc = (bar.low - prev.close).abs();
            hl.max(hc).max(lc)
        })
        .collect()
}

/// ATR series over `candles` (oldest first).
///
/// Output element `i` belongs to candle index `period + i`: the seed needs
/// `period` True Range values and each TR needs a previous close. Empty when
/// `period == 0` or fewer than `period + 1` candles are supplied. The series
/// ends at the first non-finite value.
pub fn calculate_atr(candles: &[Candle], period: usize) -> Vec<f64> {
    if period == 0 || candles.len() < period + 1 {
        return Vec::new();
    }

    let tr_values = true_ranges(candles);

    let seed = tr_values[..period].iter().sum::<f64>() / period as f64;
    if !seed.is_finite() {
        return Vec::new();
    }

    let period_f = period as f64;
    let mut result = Vec::with_capacity(tr_values.len() - period + 1);
    result.push(seed);

    let mut atr = seed;
    for &tr in &tr_values[period..] {
        atr = (atr * (period_f - 1.0) + tr) / period_f;
        if !atr.is_finite() {
            break;
        }
        result.push(atr);
    }

    result
}
