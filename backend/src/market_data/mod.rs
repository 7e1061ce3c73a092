pub mod candle;
pub mod normalizer;

// Re-export the candle types for convenient access (e.g. `use crate::market_data::Candle`).
pub use candle::{Candle, CandleSeries, RawCandleRow};
pub use normalizer::normalize;
