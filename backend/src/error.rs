//! Dashboard error taxonomy

use thiserror::Error;

/// User-facing message for any failed fetch or analysis.
pub const FETCH_FAILED_MESSAGE: &str = "Could not fetch data. Market closed or invalid symbol.";

/// Failures raised while turning raw broker rows into a candle series.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("row {index} is malformed: {reason}")]
    MalformedRow { index: usize, reason: String },

    #[error("row {index}: field `{field}` is not numeric ({value})")]
    NonNumericField {
        index: usize,
        field: &'static str,
        value: String,
    },
}

/// Application-wide error type
#[derive(Error, Debug)]
pub enum DashboardError {
    /// A required secret or the symbol table is missing. Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The broker session could not be established.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Any failure while fetching candles for one analysis request.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The latest indicator row lacks a value the scorer needs.
    #[error("Insufficient indicators: {timeframe} {field} is unavailable")]
    InsufficientIndicators {
        timeframe: &'static str,
        field: &'static str,
    },

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),
}

impl DashboardError {
    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIG_ERROR",
            Self::Authentication(_) => "AUTH_ERROR",
            Self::Fetch(_) => "FETCH_ERROR",
            Self::InsufficientIndicators { .. } => "INSUFFICIENT_INDICATORS",
            Self::UnknownSymbol(_) => "UNKNOWN_SYMBOL",
        }
    }

    /// Message shown to the dashboard user.
    ///
    /// Fetch and indicator failures collapse into one generic message; the
    /// detailed cause only goes to the log.
    pub fn user_message(&self) -> String {
        match self {
            Self::Fetch(_) | Self::InsufficientIndicators { .. } => FETCH_FAILED_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<NormalizeError> for DashboardError {
    fn from(err: NormalizeError) -> Self {
        Self::Fetch(format!("malformed candle payload: {err}"))
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        Self::Fetch(err.to_string())
    }
}
