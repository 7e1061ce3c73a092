// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Middle band = SMA(period); upper / lower = middle ± k·σ, where σ is the
// population standard deviation of the same trailing window. The dashboard
// runs BB(20, 2σ) and exposes the upper and lower bands.

use crate::indicators::{align, Series};

/// Bands for a single trailing window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBand {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Bands aligned with the input closes.
#[derive(Debug, Clone, PartialEq)]
pub struct BollingerSeries {
    pub upper: Series,
    pub middle: Series,
    pub lower: Series,
}

/// Bands for the trailing `period` closes of `window`.
///
/// `None` when the window is shorter than `period`, `period == 0`, or the
/// result is non-finite.
pub fn band_at(window: &[f64], period: usize, num_std: f64) -> Option<BollingerBand> {
    if period == 0 || window.len() < period {
        return None;
    }

    let tail = &window[window.len() - period..];
    let middle = tail.iter().sum::<f64>() / period as f64;
    let variance = tail.iter().map(|x| (x - middle).powi(2)).sum::<f64>() / period as f64;
    let std_dev = variance.sqrt();

    let band = BollingerBand {
        upper: middle + num_std * std_dev,
        middle,
        lower: middle - num_std * std_dev,
    };

    (band.upper.is_finite() && band.lower.is_finite()).then_some(band)
}

/// Rolling Bollinger Bands over `closes`.
///
/// Returns `None` when no window produces a band (fewer than `period`
/// closes). Windows that go non-finite end the series.
pub fn calculate_bollinger(closes: &[f64], period: usize, num_std: f64) -> Option<BollingerSeries> {
    if period == 0 || closes.len() < period {
        return None;
    }

    let mut upper = Vec::with_capacity(closes.len() - period + 1);
    let mut middle = Vec::with_capacity(upper.capacity());
    let mut lower = Vec::with_capacity(upper.capacity());

    for end in period..=closes.len() {
        match band_at(&closes[..end], period, num_std) {
            Some(band) => {
                upper.push(band.upper);
                middle.push(band.middle);
                lower.push(band.lower);
            }
            None => break,
        }
    }

    if middle.is_empty() {
        return None;
    }

    let offset = period - 1;
    Some(BollingerSeries {
        upper: align(&upper, offset, closes.len()),
        middle: align(&middle, offset, closes.len()),
        lower: align(&lower, offset, closes.len()),
    })
}
