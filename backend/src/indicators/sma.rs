// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// SMA_t = (x_{t-n+1} + ... + x_t) / n
//
// Used for the 50-period close SMA and the 5-period volume average.
// =============================================================================

/// Compute the SMA series for `values` over `period`.
///
/// Returns an empty `Vec` when `period == 0` or the input is shorter than
/// `period`. Each output element corresponds to an input starting at index
/// `period - 1`. A non-finite window ends the series.
pub fn calculate_sma(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let period_f = period as f64;
    let mut result = Vec::with_capacity(values.len() - period + 1);
    for window in values.windows(period) {
        let mean = window.iter().sum::<f64>() / period_f;
        if !mean.is_finite() {
            break;
        }
        result.push(mean);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_empty_and_zero_period() {
        assert!(calculate_sma(&[], 5).is_empty());
        assert!(calculate_sma(&[1.0, 2.0], 0).is_empty());
    }

    #[test]
    fn sma_insufficient_data() {
        assert!(calculate_sma(&[1.0, 2.0, 3.0, 4.0], 5).is_empty());
    }

    #[test]
    fn sma_known_values() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let sma = calculate_sma(&values, 3);
        assert_eq!(sma.len(), 4);
        for (got, want) in sma.iter().zip([2.0, 3.0, 4.0, 5.0]) {
            assert!((got - want).abs() < 1e-12, "got {got}, expected {want}");
        }
    }

    #[test]
    fn sma_stops_at_nan() {
        let sma = calculate_sma(&[1.0, 1.0, f64::NAN, 1.0], 2);
        assert_eq!(sma, vec![1.0]);
    }
}
