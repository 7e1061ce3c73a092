// =============================================================================
// Analysis Report — everything the dashboard renders for one request
// =============================================================================
//
// Built from the two indicator frames and the verdict. Like the verdict it is
// recomputed for every request and never stored.
// =============================================================================

use serde::Serialize;

use crate::indicators::{IndicatorFrame, IndicatorRow, Series};
use crate::market_data::Candle;
use crate::signals::{Classification, Verdict};
use crate::symbols::SymbolReference;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Colour {
    Green,
    Red,
    Orange,
    Cyan,
}

/// Banner severity, mirrored by the frontend's alert styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerLevel {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistItem {
    pub title: &'static str,
    pub label: String,
    pub colour: Colour,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Banner {
    pub classification: Classification,
    pub level: BannerLevel,
    pub text: &'static str,
}

impl Banner {
    pub fn for_classification(classification: Classification) -> Self {
        let (level, text) = match classification {
            Classification::StrongBuy => (BannerLevel::Success, "🚀 STRONG BUY SIGNAL (All Systems Go!)"),
            Classification::NoTrade => (BannerLevel::Error, "🛑 NO TRADE (Waiting for setup)"),
            Classification::Watchlist => (BannerLevel::Warning, "⚠️ Watchlist (Mixed Signals)"),
        };
        Self {
            classification,
            level,
            text,
        }
    }
}

/// A line (or histogram) aligned index-for-index with the panel's candles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSeries {
    pub name: &'static str,
    pub colour: Colour,
    pub dashed: bool,
    pub values: Series,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPanel {
    pub title: &'static str,
    pub candles: Vec<Candle>,
    pub overlays: Vec<LineSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub histogram: Option<LineSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    /// UUID v4.
    pub id: String,
    /// RFC 3339 creation time.
    pub created_at: String,
    pub symbol: SymbolReference,
    pub metrics: Vec<Metric>,
    pub checklist: Vec<ChecklistItem>,
    pub banner: Banner,
    pub verdict: Verdict,
    pub daily_chart: ChartPanel,
    pub intraday_chart: ChartPanel,
}

impl AnalysisReport {
    pub fn build(
        symbol: SymbolReference,
        daily: &IndicatorFrame,
        intraday: &IndicatorFrame,
        daily_row: &IndicatorRow,
        verdict: Verdict,
    ) -> Self {
        let rsi = daily_row
            .rsi
            .map(|v| format!("{v:.1}"))
            .unwrap_or_else(|| "n/a".to_string());
        let trend = if verdict.trend_bullish { "BULLISH" } else { "BEARISH" };
        let intraday_signal = if verdict.intraday_bullish {
            "Price > VWAP"
        } else {
            "Price < VWAP"
        };

        let metrics = vec![
            Metric {
                label: "Current Price",
                value: format!("₹{:.2}", daily_row.close),
            },
            Metric {
                label: "Daily Trend",
                value: trend.to_string(),
            },
            Metric {
                label: "RSI Momentum",
                value: rsi.clone(),
            },
            Metric {
                label: "Intraday Signal",
                value: intraday_signal.to_string(),
            },
        ];

        let checklist = vec![
            ChecklistItem {
                title: "1. Trend (EMA 50)",
                label: trend.to_string(),
                colour: pass_or(verdict.trend_bullish, Colour::Red),
            },
            ChecklistItem {
                title: "2. Momentum (RSI)",
                label: format!("RSI {rsi}"),
                colour: pass_or(verdict.momentum_bullish, Colour::Orange),
            },
            ChecklistItem {
                title: "3. Volume",
                label: if verdict.volume_bullish { "High Vol" } else { "Low Vol" }.to_string(),
                colour: pass_or(verdict.volume_bullish, Colour::Red),
            },
        ];

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            symbol,
            metrics,
            checklist,
            banner: Banner::for_classification(verdict.classification),
            verdict,
            daily_chart: daily_panel(daily),
            intraday_chart: intraday_panel(intraday),
        }
    }
}

fn pass_or(bullish: bool, fail: Colour) -> Colour {
    if bullish {
        Colour::Green
    } else {
        fail
    }
}

/// Candles with EMA 50 and Supertrend overlays, MACD histogram below.
fn daily_panel(frame: &IndicatorFrame) -> ChartPanel {
    let set = &frame.indicators;
    let mut overlays = Vec::new();

    if let Some(ema) = &set.ema_50 {
        overlays.push(LineSeries {
            name: "50 EMA",
            colour: Colour::Orange,
            dashed: false,
            values: ema.clone(),
        });
    }
    if let Some(supertrend) = &set.supertrend {
        overlays.push(LineSeries {
            name: "Supertrend",
            colour: Colour::Green,
            dashed: true,
            values: supertrend.clone(),
        });
    }

    let histogram = set.macd.as_ref().map(|macd| LineSeries {
        name: "MACD Hist",
        colour: Colour::Cyan,
        dashed: false,
        values: macd.histogram.clone(),
    });

    ChartPanel {
        title: "Daily Trend Analysis",
        candles: frame.candles.candles().to_vec(),
        overlays,
        histogram,
    }
}

/// Intraday candles with VWAP.
fn intraday_panel(frame: &IndicatorFrame) -> ChartPanel {
    let overlays = frame
        .indicators
        .vwap
        .as_ref()
        .map(|vwap| LineSeries {
            name: "VWAP",
            colour: Colour::Cyan,
            dashed: false,
            values: vwap.clone(),
        })
        .into_iter()
        .collect();

    ChartPanel {
        title: "Intraday Entry Chart (VWAP)",
        candles: frame.candles.candles().to_vec(),
        overlays,
        histogram: None,
    }
}
