// =============================================================================
// Access Gate — Bearer password check for every dashboard route
// =============================================================================
//
// The dashboard is single-user. Every route except health expects
//
//   Authorization: Bearer <DASHBOARD_APP_PASSWORD>
//
// The password is compared in constant time. On mismatch the request is
// rejected with 403 before the handler body runs, so no fetch or analysis
// happens.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::app_context::AppContext;

/// Compare two byte slices in constant time.
///
/// Every byte of both slices is examined even after a mismatch. A length
/// difference returns early; the attacker does not control the expected
/// length.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Extractor proving the caller presented the dashboard password.
///
///   async fn handler(_gate: AppGate, ...) { ... }
pub struct AppGate;

pub struct GateRejection {
    message: &'static str,
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": "FORBIDDEN",
            "message": self.message,
        });
        (StatusCode::FORBIDDEN, axum::Json(body)).into_response()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AppGate
where
    Arc<AppContext>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GateRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = Arc::<AppContext>::from_ref(state);

        let presented = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        let Some(password) = presented else {
            warn!("missing or malformed Authorization header");
            return Err(GateRejection {
                message: "Please enter the correct password to access the trading dashboard.",
            });
        };

        if !constant_time_eq(password.as_bytes(), ctx.app_password().as_bytes()) {
            warn!("wrong dashboard password presented");
            return Err(GateRejection {
                message: "Please enter the correct password to access the trading dashboard.",
            });
        }

        Ok(AppGate)
    }
}
