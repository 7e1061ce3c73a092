// =============================================================================
// Rule-of-Three Dashboard — Main Entry Point
// =============================================================================
//
// Startup order: secrets -> config -> symbol table -> broker login -> HTTP.
// Missing secrets or an unusable symbol table stop the process. A failed
// broker login does not: the server still starts and every analysis reports
// the login failure.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analysis;
mod api;
mod app_context;
mod config;
mod error;
mod indicators;
mod market_data;
mod report;
mod signals;
mod smartapi;
mod symbols;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_context::{AppContext, GatewaySession};
use crate::config::{DashboardConfig, Secrets, DEFAULT_CONFIG_PATH, ENV_CONFIG_PATH};
use crate::smartapi::SmartApiClient;
use crate::symbols::SymbolTable;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Rule-of-Three Dashboard starting up");

    let secrets = Secrets::from_env().context("dashboard secrets are not configured")?;

    let config_path = std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let mut config = DashboardConfig::load_or_default(&config_path)?;
    config.apply_env_overrides();

    info!(
        exchange = %config.exchange,
        daily = %config.daily.interval,
        intraday = %config.intraday.interval,
        vwap_anchor = %config.vwap_anchor,
        "configuration ready"
    );

    // ── 2. Symbol table (fatal if missing) ───────────────────────────────
    let symbols = SymbolTable::load(&config.symbol_table_path).context("symbol table unavailable")?;

    // ── 3. Broker session (memoized, never retried) ──────────────────────
    let session = GatewaySession::from_login(SmartApiClient::login(&config, &secrets).await);
    match &session {
        GatewaySession::Connected(_) => info!("broker session ready"),
        GatewaySession::Failed(message) => {
            error!(reason = %message, "broker login failed; analyses will report it until restart")
        }
    }

    let bind_addr = config.bind_addr.clone();
    let ctx = Arc::new(AppContext::new(config, symbols, session, secrets.app_password.clone()));

    // ── 4. HTTP server ───────────────────────────────────────────────────
    let app = api::rest::router(ctx);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening. Press Ctrl+C to stop.");

    // ── 5. Graceful shutdown ─────────────────────────────────────────────
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    info!("Rule-of-Three Dashboard shut down complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl+C");
        return;
    }
    warn!("Shutdown signal received — stopping gracefully");
}
