// =============================================================================
// Two-Timeframe Analysis
// =============================================================================
//
// One "Analyze" request, run to completion:
//
//   lookup symbol -> fetch daily -> fetch intraday -> normalize both
//     -> indicators (VWAP on the intraday frame only) -> score -> report
//
// The daily frame drives the three checks; the intraday frame only supplies
// the VWAP gate. Any failure aborts the request: no partial verdict is built.
// =============================================================================

use chrono::{DateTime, Duration, FixedOffset, Utc};
use tracing::{debug, info, warn};

use crate::app_context::AppContext;
use crate::config::TimeframeConfig;
use crate::error::DashboardError;
use crate::market_data::normalizer::exchange_offset;
use crate::market_data::{normalize, CandleSeries};
use crate::report::AnalysisReport;
use crate::signals::score;
use crate::smartapi::{CandleRequest, MarketDataGateway};
use crate::symbols::SymbolReference;

/// Current wall-clock time on the exchange's clock.
pub fn exchange_now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&exchange_offset())
}

/// Run the full pipeline for `symbol_name` as of `now`.
pub async fn analyze(
    ctx: &AppContext,
    symbol_name: &str,
    now: DateTime<FixedOffset>,
) -> Result<AnalysisReport, DashboardError> {
    let symbol = ctx.symbols.lookup(symbol_name)?.clone();
    let gateway = ctx.session.gateway()?;

    let daily = fetch_series(gateway, &ctx.config.exchange, &symbol, ctx.config.daily, now).await?;
    let intraday = fetch_series(gateway, &ctx.config.exchange, &symbol, ctx.config.intraday, now).await?;

    let daily_frame = ctx.engine.compute(daily, ctx.config.daily.interval.is_intraday());
    let intraday_frame = ctx.engine.compute(intraday, ctx.config.intraday.interval.is_intraday());

    let (Some(daily_row), Some(intraday_row)) = (daily_frame.last_row(), intraday_frame.last_row()) else {
        return Err(DashboardError::Fetch("no candles to analyze".to_string()));
    };

    let verdict = score(&daily_row, &intraday_row).map_err(|err| {
        warn!(symbol = %symbol.display_name, error = %err, "analysis aborted");
        err
    })?;

    info!(
        symbol = %symbol.display_name,
        score = verdict.score,
        classification = %verdict.classification,
        trend = verdict.trend_bullish,
        momentum = verdict.momentum_bullish,
        volume = verdict.volume_bullish,
        intraday = verdict.intraday_bullish,
        "analysis complete"
    );

    Ok(AnalysisReport::build(
        symbol,
        &daily_frame,
        &intraday_frame,
        &daily_row,
        verdict,
    ))
}

/// Fetch and normalize one timeframe ending at `now`.
///
/// An empty response is a fetch failure.
async fn fetch_series(
    gateway: &dyn MarketDataGateway,
    exchange: &str,
    symbol: &SymbolReference,
    timeframe: TimeframeConfig,
    now: DateTime<FixedOffset>,
) -> Result<CandleSeries, DashboardError> {
    let to = now.naive_local();
    let from = Duration::try_days(timeframe.lookback_days)
        .and_then(|lookback| to.checked_sub_signed(lookback))
        .filter(|from| *from < to)
        .ok_or_else(|| {
            DashboardError::Configuration(format!(
                "{} lookback of {} days is out of range",
                timeframe.interval, timeframe.lookback_days
            ))
        })?;
    let request = CandleRequest {
        exchange: exchange.to_string(),
        symbol_token: symbol.exchange_token.clone(),
        interval: timeframe.interval,
        from,
        to,
    };

    let rows = gateway.fetch_candles(&request).await?;
    if rows.is_empty() {
        return Err(DashboardError::Fetch(format!(
            "no {} candles returned for {}",
            timeframe.interval, symbol.display_name
        )));
    }

    let series = normalize(&rows)?;
    debug!(
        symbol = %symbol.display_name,
        interval = %timeframe.interval,
        candles = series.len(),
        "series normalized"
    );
    Ok(series)
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_context::GatewaySession;
    use crate::config::DashboardConfig;
    use crate::market_data::RawCandleRow;
    use crate::symbols::SymbolTable;
    use crate::types::{Interval, VwapAnchor};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves canned rows per interval and records every request.
    struct StubGateway {
        daily: Vec<RawCandleRow>,
        intraday: Vec<RawCandleRow>,
        requests: Mutex<Vec<CandleRequest>>,
    }

    #[async_trait]
    impl MarketDataGateway for StubGateway {
        async fn fetch_candles(&self, request: &CandleRequest) -> Result<Vec<RawCandleRow>, DashboardError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(match request.interval {
                Interval::OneDay => self.daily.clone(),
                _ => self.intraday.clone(),
            })
        }
    }

    fn rows(n: usize, step: Duration, start: &str, drift: f64) -> Vec<RawCandleRow> {
        let start = DateTime::parse_from_rfc3339(start).unwrap();
        (0..n)
            .map(|i| {
                let close = 500.0 + i as f64 * drift + if i % 2 == 0 { 1.0 } else { -1.0 };
                RawCandleRow {
                    timestamp: json!((start + step * i as i32).to_rfc3339()),
                    open: json!(close),
                    high: json!(close + 2.0),
                    low: json!(close - 2.0),
                    close: json!(close),
                    volume: json!(if i + 1 == n { 50_000 } else { 10_000 }),
                }
            })
            .collect()
    }

    fn daily_rows(n: usize) -> Vec<RawCandleRow> {
        rows(n, Duration::days(1), "2023-06-01T00:00:00+05:30", 0.25)
    }

    fn intraday_rows(n: usize) -> Vec<RawCandleRow> {
        rows(n, Duration::minutes(15), "2024-05-30T09:15:00+05:30", 0.5)
    }

    /// Consecutive 15-minute bars from `start` with a flat volume.
    fn session_rows(start: &str, closes: &[f64], volume: i64) -> Vec<RawCandleRow> {
        let start = DateTime::parse_from_rfc3339(start).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| RawCandleRow {
                timestamp: json!((start + Duration::minutes(15) * i as i32).to_rfc3339()),
                open: json!(close),
                high: json!(close + 1.0),
                low: json!(close - 1.0),
                close: json!(close),
                volume: json!(volume),
            })
            .collect()
    }

    fn context(gateway: StubGateway) -> AppContext {
        let symbols = SymbolTable::from_reader("name,token,symbol\nTCS,11536,TCS-EQ\n".as_bytes()).unwrap();
        AppContext::new(
            DashboardConfig::default(),
            symbols,
            GatewaySession::Connected(Box::new(gateway)),
            "pw",
        )
    }

    fn stub(daily: Vec<RawCandleRow>, intraday: Vec<RawCandleRow>) -> StubGateway {
        StubGateway {
            daily,
            intraday,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-06-03T15:20:00+05:30").unwrap()
    }

    #[tokio::test]
    async fn full_pipeline_produces_report() {
        let ctx = context(stub(daily_rows(200), intraday_rows(40)));
        let report = analyze(&ctx, "TCS", now()).await.unwrap();

        assert_eq!(report.symbol.exchange_token, "11536");
        assert_eq!(report.metrics.len(), 4);
        assert_eq!(report.checklist.len(), 3);
        assert_eq!(report.daily_chart.candles.len(), 200);
        assert_eq!(report.intraday_chart.candles.len(), 40);
        assert_eq!(report.intraday_chart.overlays[0].name, "VWAP");

        // Rising closes with a volume spike on the last bar.
        assert!(report.verdict.trend_bullish);
        assert!(report.verdict.volume_bullish);
        assert!(report.verdict.intraday_bullish);
    }

    #[tokio::test]
    async fn intraday_gate_resets_vwap_each_session_by_default() {
        // Heavy trade near 200 on the first day, light trade near 100 on the next.
        let mut intraday = session_rows("2024-05-30T09:15:00+05:30", &[200.0; 4], 100_000);
        intraday.extend(session_rows(
            "2024-05-31T09:15:00+05:30",
            &[100.0, 100.0, 100.0, 124.0],
            1_000,
        ));

        let per_session = analyze(&context(stub(daily_rows(200), intraday.clone())), "TCS", now())
            .await
            .unwrap();
        assert!(per_session.verdict.intraday_bullish);

        let symbols = SymbolTable::from_reader("name,token,symbol\nTCS,11536,TCS-EQ\n".as_bytes()).unwrap();
        let whole_series = AppContext::new(
            DashboardConfig {
                vwap_anchor: VwapAnchor::Series,
                ..DashboardConfig::default()
            },
            symbols,
            GatewaySession::Connected(Box::new(stub(daily_rows(200), intraday))),
            "pw",
        );
        let report = analyze(&whole_series, "TCS", now()).await.unwrap();
        assert!(!report.verdict.intraday_bullish);
    }

    #[tokio::test]
    async fn requests_cover_configured_lookbacks() {
        let config = DashboardConfig::default();
        let gateway = stub(daily_rows(200), intraday_rows(40));
        let symbol = SymbolReference {
            display_name: "TCS".to_string(),
            exchange_token: "11536".to_string(),
            exchange_symbol: "TCS-EQ".to_string(),
        };

        fetch_series(&gateway, "NSE", &symbol, config.daily, now()).await.unwrap();
        fetch_series(&gateway, "NSE", &symbol, config.intraday, now()).await.unwrap();

        let requests = gateway.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].interval, Interval::OneDay);
        assert_eq!(requests[0].symbol_token, "11536");
        assert_eq!(requests[0].exchange, "NSE");
        assert_eq!(requests[0].to, now().naive_local());
        assert_eq!(requests[0].to - requests[0].from, Duration::days(365));
        assert_eq!(requests[1].interval, Interval::FifteenMinute);
        assert_eq!(requests[1].to - requests[1].from, Duration::days(10));
    }

    #[tokio::test]
    async fn unusable_lookback_never_reaches_the_gateway() {
        let gateway = stub(daily_rows(200), intraday_rows(40));
        let symbol = SymbolReference {
            display_name: "TCS".to_string(),
            exchange_token: "11536".to_string(),
            exchange_symbol: "TCS-EQ".to_string(),
        };

        for lookback_days in [-3, 0, i64::MAX] {
            let timeframe = TimeframeConfig {
                interval: Interval::OneDay,
                lookback_days,
            };
            let err = fetch_series(&gateway, "NSE", &symbol, timeframe, now()).await.unwrap_err();
            assert!(matches!(err, DashboardError::Configuration(_)));
        }
        assert!(gateway.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn short_daily_history_is_insufficient() {
        let ctx = context(stub(daily_rows(30), intraday_rows(40)));
        let err = analyze(&ctx, "TCS", now()).await.unwrap_err();
        assert!(matches!(
            err,
            DashboardError::InsufficientIndicators { field: "EMA_50", .. }
        ));
    }

    #[tokio::test]
    async fn empty_intraday_is_fetch_error() {
        let ctx = context(stub(daily_rows(200), Vec::new()));
        let err = analyze(&ctx, "TCS", now()).await.unwrap_err();
        assert!(matches!(err, DashboardError::Fetch(_)));
    }

    #[tokio::test]
    async fn malformed_rows_are_fetch_errors() {
        let mut daily = daily_rows(200);
        daily[10].close = json!("not-a-number");
        let ctx = context(stub(daily, intraday_rows(40)));
        assert!(matches!(
            analyze(&ctx, "TCS", now()).await,
            Err(DashboardError::Fetch(_))
        ));
    }

    #[tokio::test]
    async fn failed_session_reports_authentication() {
        let symbols = SymbolTable::from_reader("name,token,symbol\nTCS,11536,TCS-EQ\n".as_bytes()).unwrap();
        let ctx = AppContext::new(
            DashboardConfig::default(),
            symbols,
            GatewaySession::Failed("Invalid totp".to_string()),
            "pw",
        );
        let err = analyze(&ctx, "TCS", now()).await.unwrap_err();
        assert!(matches!(err, DashboardError::Authentication(msg) if msg == "Invalid totp"));
    }

    #[tokio::test]
    async fn unknown_symbol_is_rejected_before_fetching() {
        let ctx = context(stub(daily_rows(200), intraday_rows(40)));
        let err = analyze(&ctx, "WIPRO", now()).await.unwrap_err();
        assert!(matches!(err, DashboardError::UnknownSymbol(_)));
    }

    #[tokio::test]
    async fn verdict_is_stable_across_requests() {
        let ctx = context(stub(daily_rows(200), intraday_rows(40)));
        let first = analyze(&ctx, "TCS", now()).await.unwrap();
        let second = analyze(&ctx, "TCS", now()).await.unwrap();
        assert_eq!(first.verdict, second.verdict);
        assert_ne!(first.id, second.id);
    }
}
