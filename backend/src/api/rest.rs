// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
//   GET  /api/v1/health     public liveness
//   GET  /api/v1/symbols    selectable display names          (gated)
//   POST /api/v1/analyze    { "symbol": name } -> report      (gated)
//
// A malformed analyze body is a 400 in the same error shape.
// Errors are JSON `{ "error": <code>, "message": <text> }`. Fetch and
// indicator failures share one generic message; details stay in the log.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::analysis::{analyze, exchange_now};
use crate::api::auth::AppGate;
use crate::app_context::AppContext;
use crate::error::DashboardError;

/// Build the REST router with CORS and shared context.
pub fn router(ctx: Arc<AppContext>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Public ──────────────────────────────────────────────────
        .route("/api/v1/health", get(health))
        // ── Gated ───────────────────────────────────────────────────
        .route("/api/v1/symbols", get(symbols))
        .route("/api/v1/analyze", post(analyze_symbol))
        .layer(cors)
        .with_state(ctx)
}

// =============================================================================
// Error mapping
// =============================================================================

impl DashboardError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Authentication(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Fetch(_) | Self::InsufficientIndicators { .. } => StatusCode::BAD_GATEWAY,
            Self::UnknownSymbol(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.code(), error = %self, "request failed");
        } else {
            warn!(code = self.code(), error = %self, "request rejected");
        }

        let body = serde_json::json!({
            "error": self.code(),
            "message": self.user_message(),
        });
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Health (public)
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    gateway: &'static str,
    server_time: i64,
}

async fn health(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        gateway: if ctx.session.is_connected() {
            "connected"
        } else {
            "unavailable"
        },
        server_time: chrono::Utc::now().timestamp_millis(),
    };
    Json(resp)
}

// =============================================================================
// Symbols (gated)
// =============================================================================

#[derive(Serialize)]
struct SymbolsResponse<'a> {
    symbols: Vec<&'a str>,
}

async fn symbols(_gate: AppGate, State(ctx): State<Arc<AppContext>>) -> Response {
    Json(SymbolsResponse {
        symbols: ctx.symbols.names(),
    })
    .into_response()
}

// =============================================================================
// Analyze (gated)
// =============================================================================

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    symbol: String,
}

/// A body that is not `{ "symbol": <string> }`.
struct MalformedBody(JsonRejection);

impl IntoResponse for MalformedBody {
    fn into_response(self) -> Response {
        let message = self.0.body_text();
        warn!(error = %message, "malformed analyze body");
        let body = serde_json::json!({
            "error": "BAD_REQUEST",
            "message": message,
        });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

async fn analyze_symbol(
    _gate: AppGate,
    State(ctx): State<Arc<AppContext>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return MalformedBody(rejection).into_response(),
    };

    info!(symbol = %req.symbol, "analysis requested");
    match analyze(&ctx, &req.symbol, exchange_now()).await {
        Ok(report) => Json(report).into_response(),
        Err(err) => err.into_response(),
    }
}
