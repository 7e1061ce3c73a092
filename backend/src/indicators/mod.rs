// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicator battery behind the
// Rule-of-Three scorer. The primitive calculators return compact vectors that
// start at their first defined index; `align` places them back onto the
// candle index so that every exposed series is index-for-index with its
// `CandleSeries`. Undefined (warm-up) points are `None`, never zero.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod engine;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod supertrend;
pub mod vwap;

pub use engine::{IndicatorEngine, IndicatorFrame, IndicatorKey, IndicatorRow};

/// An indicator series aligned with the candles it was computed from.
pub type Series = Vec<Option<f64>>;

/// Place `values` at candle indices `offset..` of a series of length `len`.
///
/// Indices before `offset`, and any tail the calculator did not reach, stay
/// `None`. Values that would fall beyond `len` are dropped.
pub fn align(values: &[f64], offset: usize, len: usize) -> Series {
    let mut series = vec![None; len];
    for (i, &v) in values.iter().enumerate() {
        match series.get_mut(offset + i) {
            Some(slot) => *slot = Some(v),
            None => break,
        }
    }
    series
}
