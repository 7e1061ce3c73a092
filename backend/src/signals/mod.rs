// =============================================================================
// Signals Module
// =============================================================================
//
// Turns the latest daily and intraday indicator rows into a verdict.

pub mod rule_of_three;

pub use rule_of_three::{score, Classification, Verdict};
