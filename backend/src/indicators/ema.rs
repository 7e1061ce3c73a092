// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA weights recent closes more heavily than the SMA. The dashboard uses
// EMA(50) as the daily trend line and EMA(12)/EMA(26)/EMA(9) inside MACD.
//
// Formula:
//   multiplier = 2 / (period + 1)
//   EMA_t      = close_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// The very first EMA value is seeded with the SMA of the first `period` closes.
// =============================================================================

/// EMA of `closes` over `period`, seeded with the SMA of the first window.
///
/// Output element `i` belongs to input index `period - 1 + i`, so the caller
/// aligns it with [`crate::indicators::align`] at offset `period - 1`.
///
/// Empty when `period == 0` or fewer than `period` values are supplied. The
/// series is cut short at the first non-finite value.
pub fn calculate_ema(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period {
        return Vec::new();
    }

    let multiplier = 2.0 / (period + 1) as f64;

    // Seed: SMA of the first `period` values.
    let sma: f64 = closes[..period].iter().sum::<f64>() / period as f64;
    if !sma.is_finite() {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(closes.len() - period + 1);
    result.push(sma);

    let mut prev_ema = sma;
    for &close in &closes[period..] {
        let ema = close * multiplier + prev_ema * (1.0 - multiplier);
        if !ema.is_finite() {
            break;
        }
        result.push(ema);
        prev_ema = ema;
    }

    result
}
