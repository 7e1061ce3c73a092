// =============================================================================
// Relative Strength Index (RSI) — Wilder's Smoothing
// =============================================================================
//
//   deltas       d_t = close_t - close_{t-1}
//   seed         avg_gain / avg_loss = mean of the first `period` gains / losses
//   smoothing    avg = (prev_avg * (period - 1) + current) / period
//   RSI          100 - 100 / (1 + avg_gain / avg_loss)
//
// The first value lands on close index `period`, so RSI(14) is undefined for
// the first 14 candles.
// =============================================================================

/// RSI series for `closes` with Wilder smoothing over `period`.
///
/// Output element `i` belongs to close index `period + i`. Empty when
/// `period == 0` or fewer than `period + 1` closes are supplied. A non-finite
/// result ends the series.
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period + 1 {
        return Vec::new();
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    let (sum_gain, sum_loss) = deltas[..period].iter().fold((0.0_f64, 0.0_f64), |(g, l), &d| {
        if d > 0.0 {
            (g + d, l)
        } else {
            (g, l - d)
        }
    });

    let period_f = period as f64;
    let mut avg_gain = sum_gain / period_f;
    let mut avg_loss = sum_loss / period_f;

    let mut result = Vec::with_capacity(deltas.len() - period + 1);
    match rsi_from_averages(avg_gain, avg_loss) {
        Some(rsi) => result.push(rsi),
        None => return result,
    }

    for &delta in &deltas[period..] {
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);

        avg_gain = (avg_gain * (period_f - 1.0) + gain) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + loss) / period_f;

        match rsi_from_averages(avg_gain, avg_loss) {
            Some(rsi) => result.push(rsi),
            None => break,
        }
    }

    result
}

/// RSI in [0, 100] from the smoothed averages.
///
/// A flat market (both averages zero) reads 50; a market with no losses
/// reads 100.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    let rsi = if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    };

    rsi.is_finite().then_some(rsi)
}
