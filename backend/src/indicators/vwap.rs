// =============================================================================
// Volume-Weighted Average Price (VWAP)
// =============================================================================
//
//   VWAP_t = Σ (volume_i × typical_price_i) / Σ volume_i
//
// Sums restart at the anchor: once at the start of the series, or at the
// first bar of every exchange-local day. VWAP only means something inside a
// trading session, so the engine computes it for intraday series only.
// =============================================================================

use crate::indicators::Series;
use crate::market_data::Candle;
use crate::types::VwapAnchor;

/// VWAP aligned with `candles`.
///
/// A point is `None` while the cumulative volume since the anchor is zero.
pub fn calculate_vwap(candles: &[Candle], anchor: VwapAnchor) -> Series {
    let mut result = Vec::with_capacity(candles.len());
    let mut cum_pv = 0.0;
    let mut cum_volume = 0.0;
    let mut session = None;

    for candle in candles {
        if anchor == VwapAnchor::Session {
            let day = candle.timestamp.date_naive();
            if session != Some(day) {
                session = Some(day);
                cum_pv = 0.0;
                cum_volume = 0.0;
            }
        }

        cum_pv += candle.typical_price() * candle.volume;
        cum_volume += candle.volume;

        let vwap = cum_pv / cum_volume;
        result.push((cum_volume > 0.0 && vwap.is_finite()).then_some(vwap));
    }

    result
}
