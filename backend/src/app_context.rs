// =============================================================================
// Application Context
// =============================================================================
//
// Everything an analysis request reads, built once at startup and shared via
// `Arc<AppContext>`:
//   - settings and the dashboard password
//   - the symbol table
//   - the broker session, or the reason it could not be established
//
// Nothing here changes after startup, so no locks are needed.
// =============================================================================

use std::fmt;

use crate::config::DashboardConfig;
use crate::error::DashboardError;
use crate::indicators::IndicatorEngine;
use crate::smartapi::MarketDataGateway;
use crate::symbols::SymbolTable;

/// Outcome of the startup login.
///
/// A failed login is kept as-is: every analysis reports it and no retry is
/// attempted for the lifetime of the process.
pub enum GatewaySession {
    Connected(Box<dyn MarketDataGateway>),
    Failed(String),
}

impl GatewaySession {
    /// Build from a login result, keeping the provider's failure message.
    pub fn from_login<G>(result: Result<G, DashboardError>) -> Self
    where
        G: MarketDataGateway + 'static,
    {
        match result {
            Ok(gateway) => Self::Connected(Box::new(gateway)),
            Err(DashboardError::Authentication(message)) => Self::Failed(message),
            Err(other) => Self::Failed(other.to_string()),
        }
    }

    /// The live gateway, or the memoized authentication failure.
    pub fn gateway(&self) -> Result<&dyn MarketDataGateway, DashboardError> {
        match self {
            Self::Connected(gateway) => Ok(gateway.as_ref()),
            Self::Failed(message) => Err(DashboardError::Authentication(message.clone())),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }
}

impl fmt::Debug for GatewaySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected(_) => f.write_str("GatewaySession::Connected"),
            Self::Failed(message) => f.debug_tuple("GatewaySession::Failed").field(message).finish(),
        }
    }
}

pub struct AppContext {
    pub config: DashboardConfig,
    pub symbols: SymbolTable,
    pub session: GatewaySession,
    pub engine: IndicatorEngine,
    app_password: String,
}

impl AppContext {
    pub fn new(
        config: DashboardConfig,
        symbols: SymbolTable,
        session: GatewaySession,
        app_password: impl Into<String>,
    ) -> Self {
        let engine = IndicatorEngine::new(config.vwap_anchor);
        Self {
            config,
            symbols,
            session,
            engine,
            app_password: app_password.into(),
        }
    }

    /// Password every gated route expects as its bearer token.
    pub fn app_password(&self) -> &str {
        &self.app_password
    }
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .field("symbols", &self.symbols.len())
            .field("session", &self.session)
            .field("app_password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::RawCandleRow;
    use crate::smartapi::CandleRequest;
    use async_trait::async_trait;

    struct NoCandles;

    #[async_trait]
    impl MarketDataGateway for NoCandles {
        async fn fetch_candles(&self, _request: &CandleRequest) -> Result<Vec<RawCandleRow>, DashboardError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn failed_login_is_memoized_as_authentication_error() {
        let session = GatewaySession::from_login::<NoCandles>(Err(DashboardError::Authentication(
            "Invalid totp".to_string(),
        )));
        assert!(!session.is_connected());
        for _ in 0..3 {
            match session.gateway() {
                Err(DashboardError::Authentication(msg)) => assert_eq!(msg, "Invalid totp"),
                other => panic!("unexpected: {:?}", other.map(|_| ())),
            }
        }
    }

    #[test]
    fn successful_login_exposes_gateway() {
        let session = GatewaySession::from_login(Ok(NoCandles));
        assert!(session.is_connected());
        assert!(session.gateway().is_ok());
    }

    #[test]
    fn debug_hides_password() {
        let symbols = SymbolTable::from_reader("name,token,symbol\nTCS,11536,TCS-EQ\n".as_bytes()).unwrap();
        let ctx = AppContext::new(
            DashboardConfig::default(),
            symbols,
            GatewaySession::Failed("down".to_string()),
            "hunter2",
        );
        assert_eq!(ctx.app_password(), "hunter2");
        assert!(!format!("{ctx:?}").contains("hunter2"));
    }
}
