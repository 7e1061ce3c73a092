// =============================================================================
// SmartAPI REST Client — password + TOTP login, historical candles
// =============================================================================
//
// SECURITY: the API key, password, TOTP code and JWT are never logged. Every
// request carries the SmartAPI client headers (user type, source, client
// IP/MAC placeholders and the private API key); secure endpoints add the JWT
// as a bearer token.
// =============================================================================

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::{DashboardConfig, Secrets};
use crate::error::DashboardError;
use crate::market_data::RawCandleRow;
use crate::smartapi::totp::Totp;
use crate::smartapi::{CandleRequest, MarketDataGateway};
use crate::types::Interval;

const LOGIN_PATH: &str = "/rest/auth/angelbroking/user/v1/loginByPassword";
const CANDLE_PATH: &str = "/rest/secure/angelbroking/historical/v1/getCandleData";

/// Date format of the `fromdate` / `todate` request fields.
pub const REQUEST_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

// =============================================================================
// Wire types
// =============================================================================

/// Common SmartAPI response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: String,
    #[serde(default, rename = "errorcode")]
    error_code: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginData {
    jwt_token: String,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    clientcode: &'a str,
    password: &'a str,
    totp: &'a str,
}

#[derive(Debug, Serialize)]
struct CandleBody<'a> {
    exchange: &'a str,
    symboltoken: &'a str,
    interval: Interval,
    fromdate: String,
    todate: String,
}

impl<'a> From<&'a CandleRequest> for CandleBody<'a> {
    fn from(request: &'a CandleRequest) -> Self {
        Self {
            exchange: &request.exchange,
            symboltoken: &request.symbol_token,
            interval: request.interval,
            fromdate: request.from.format(REQUEST_DATE_FORMAT).to_string(),
            todate: request.to.format(REQUEST_DATE_FORMAT).to_string(),
        }
    }
}

// =============================================================================
// Unauthenticated client
// =============================================================================

/// SmartAPI client before login.
#[derive(Clone)]
pub struct SmartApiClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl SmartApiClient {
    /// Build a client against `config.base_url` with the configured timeout.
    pub fn new(config: &DashboardConfig, api_key: impl Into<String>) -> Result<Self, DashboardError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| DashboardError::Configuration(format!("failed to build HTTP client: {e}")))?;

        debug!(base_url = %config.base_url, "SmartApiClient initialised");

        Ok(Self {
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Log in with the environment secrets and a freshly generated TOTP code.
    #[instrument(skip_all, name = "smartapi::login", fields(client_code = %secrets.client_code))]
    pub async fn login(config: &DashboardConfig, secrets: &Secrets) -> Result<SmartApiSession, DashboardError> {
        let totp = Totp::new(&secrets.totp_secret, config.totp_algorithm, config.totp_digits)?;
        let code = totp.now()?;

        let client = Self::new(config, secrets.api_key.clone())?;
        let jwt = client
            .authenticate(&secrets.client_code, &secrets.password, &code)
            .await?;

        info!("SmartAPI session established");
        Ok(SmartApiSession { client, jwt })
    }

    /// POST loginByPassword and return the JWT.
    async fn authenticate(&self, client_code: &str, password: &str, totp: &str) -> Result<String, DashboardError> {
        let url = format!("{}{}", self.base_url, LOGIN_PATH);
        let body = LoginBody {
            clientcode: client_code,
            password,
            totp,
        };

        let resp = self
            .http
            .post(&url)
            .headers(self.headers(None))
            .json(&body)
            .send()
            .await
            .map_err(|e| DashboardError::Authentication(format!("login request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| DashboardError::Authentication(format!("failed to read login response: {e}")))?;

        if !status.is_success() {
            return Err(DashboardError::Authentication(rejection_detail(status, &text, "login")));
        }

        parse_login_response(&text)
    }

    /// Headers SmartAPI expects on every call; `jwt` adds the bearer token.
    fn headers(&self, jwt: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert("X-UserType", HeaderValue::from_static("USER"));
        headers.insert("X-SourceID", HeaderValue::from_static("WEB"));
        headers.insert("X-ClientLocalIP", HeaderValue::from_static("127.0.0.1"));
        headers.insert("X-ClientPublicIP", HeaderValue::from_static("127.0.0.1"));
        headers.insert("X-MACAddress", HeaderValue::from_static("00:00:00:00:00:00"));

        if let Ok(val) = HeaderValue::from_str(&self.api_key) {
            headers.insert("X-PrivateKey", val);
        } else {
            warn!("API key contains characters not allowed in a header");
        }

        if let Some(token) = jwt {
            if let Ok(mut val) = HeaderValue::from_str(&format!("Bearer {token}")) {
                val.set_sensitive(true);
                headers.insert(AUTHORIZATION, val);
            }
        }

        headers
    }
}

impl fmt::Debug for SmartApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmartApiClient")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// =============================================================================
// Authenticated session
// =============================================================================

/// Logged-in SmartAPI session. Created once at startup and shared read-only.
#[derive(Clone)]
pub struct SmartApiSession {
    client: SmartApiClient,
    jwt: String,
}

impl fmt::Debug for SmartApiSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmartApiSession")
            .field("client", &self.client)
            .field("jwt", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl MarketDataGateway for SmartApiSession {
    #[instrument(
        skip(self, request),
        name = "smartapi::fetch_candles",
        fields(token = %request.symbol_token, interval = %request.interval)
    )]
    async fn fetch_candles(&self, request: &CandleRequest) -> Result<Vec<RawCandleRow>, DashboardError> {
        let url = format!("{}{}", self.client.base_url, CANDLE_PATH);
        let body = CandleBody::from(request);

        let resp = self
            .client
            .http
            .post(&url)
            .headers(self.client.headers(Some(&self.jwt)))
            .json(&body)
            .send()
            .await
            .map_err(|e| DashboardError::Fetch(format!("getCandleData request failed: {e}")))?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(DashboardError::Fetch(rejection_detail(status, &text, "getCandleData")));
        }

        let rows = parse_candle_response(&text)?;
        debug!(count = rows.len(), "candles fetched");
        Ok(rows)
    }
}

// =============================================================================
// Response parsing
// =============================================================================

/// Extract the JWT from a loginByPassword body.
fn parse_login_response(body: &str) -> Result<String, DashboardError> {
    let envelope: Envelope<LoginData> = serde_json::from_str(body)
        .map_err(|e| DashboardError::Authentication(format!("unexpected login response: {e}")))?;

    if !envelope.status {
        return Err(DashboardError::Authentication(provider_message(&envelope)));
    }

    let data = envelope
        .data
        .ok_or_else(|| DashboardError::Authentication("no data in login response".to_string()))?;

    let jwt = data.jwt_token.trim();
    let jwt = jwt.strip_prefix("Bearer ").unwrap_or(jwt);
    if jwt.is_empty() {
        return Err(DashboardError::Authentication("login response carried an empty token".to_string()));
    }
    Ok(jwt.to_string())
}

/// Extract the candle rows from a getCandleData body.
///
/// A successful response with `data: null` means "no candles" and yields an
/// empty list.
fn parse_candle_response(body: &str) -> Result<Vec<RawCandleRow>, DashboardError> {
    let envelope: Envelope<Vec<RawCandleRow>> = serde_json::from_str(body)
        .map_err(|e| DashboardError::Fetch(format!("unexpected getCandleData response: {e}")))?;

    if !envelope.status {
        return Err(DashboardError::Fetch(provider_message(&envelope)));
    }

    Ok(envelope.data.unwrap_or_default())
}

/// Provider message of a non-2xx body, or the bare status when the body is
/// not a failed envelope.
fn rejection_detail(status: StatusCode, body: &str, endpoint: &str) -> String {
    match serde_json::from_str::<Envelope<serde_json::Value>>(body) {
        Ok(envelope) if !envelope.status => provider_message(&envelope),
        _ => format!("SmartAPI {endpoint} returned {status}"),
    }
}

fn provider_message<T>(envelope: &Envelope<T>) -> String {
    match (envelope.message.is_empty(), envelope.error_code.is_empty()) {
        (true, true) => "request rejected by SmartAPI".to_string(),
        (false, true) => envelope.message.clone(),
        (true, false) => envelope.error_code.clone(),
        (false, false) => format!("{} ({})", envelope.message, envelope.error_code),
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::Router;
    use chrono::NaiveDate;

    const LOGIN_OK: &str = r#"{"status":true,"message":"SUCCESS","errorcode":"",
        "data":{"jwtToken":"Bearer eyJhbGci","refreshToken":"r","feedToken":"f"}}"#;
    const CANDLES_OK: &str = r#"{"status":true,"message":"SUCCESS","errorcode":"","data":[
        ["2024-03-01T09:15:00+05:30", 100.5, 101.0, 99.75, 100.25, 12000]]}"#;
    const TOKEN_REJECTED: &str = r#"{"status":false,"message":"Invalid Token","errorcode":"AG8001","data":null}"#;

    fn client() -> SmartApiClient {
        SmartApiClient::new(&DashboardConfig::default(), "api-key-123").unwrap()
    }

    fn secrets() -> Secrets {
        Secrets {
            api_key: "api-key-123".to_string(),
            client_code: "A123".to_string(),
            password: "1234".to_string(),
            totp_secret: "GEZDGNBVGY3TQOJQ".to_string(),
            app_password: "pw".to_string(),
        }
    }

    fn candle_request() -> CandleRequest {
        CandleRequest {
            exchange: "NSE".to_string(),
            symbol_token: "2885".to_string(),
            interval: Interval::OneDay,
            from: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(9, 15, 0).unwrap(),
            to: NaiveDate::from_ymd_opt(2024, 3, 11).unwrap().and_hms_opt(15, 30, 0).unwrap(),
        }
    }

    /// Serve `app` on a loopback port and point a config at it.
    async fn local_smartapi(app: Router) -> DashboardConfig {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        DashboardConfig {
            base_url: format!("http://{addr}"),
            ..DashboardConfig::default()
        }
    }

    /// Every path answers `status` with `body`.
    fn canned(status: StatusCode, body: &'static str) -> Router {
        Router::new().fallback(move || async move { (status, body) })
    }

    async fn login_error(status: StatusCode, body: &'static str) -> String {
        let config = local_smartapi(canned(status, body)).await;
        match SmartApiClient::login(&config, &secrets()).await {
            Err(DashboardError::Authentication(msg)) => msg,
            other => panic!("expected authentication error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_and_fetch_over_http() {
        let app = Router::new()
            .route(LOGIN_PATH, post(|| async { LOGIN_OK }))
            .route(
                CANDLE_PATH,
                post(|headers: HeaderMap| async move {
                    match headers.get(AUTHORIZATION) {
                        Some(value) if value == "Bearer eyJhbGci" => (StatusCode::OK, CANDLES_OK),
                        _ => (StatusCode::UNAUTHORIZED, TOKEN_REJECTED),
                    }
                }),
            );
        let config = local_smartapi(app).await;

        let session = SmartApiClient::login(&config, &secrets()).await.unwrap();
        assert_eq!(session.jwt, "eyJhbGci");

        let rows = session.fetch_candles(&candle_request()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].volume, serde_json::json!(12000));
    }

    #[tokio::test]
    async fn rejected_login_status_keeps_provider_message() {
        let msg = login_error(
            StatusCode::FORBIDDEN,
            r#"{"status":false,"message":"Invalid API Key","errorcode":"AG8004"}"#,
        )
        .await;
        assert_eq!(msg, "Invalid API Key (AG8004)");
    }

    #[tokio::test]
    async fn failed_envelope_on_ok_status_is_authentication_error() {
        let msg = login_error(
            StatusCode::OK,
            r#"{"status":false,"message":"Invalid totp","errorcode":"AB1050","data":null}"#,
        )
        .await;
        assert_eq!(msg, "Invalid totp (AB1050)");
    }

    #[tokio::test]
    async fn non_envelope_error_body_reports_status() {
        let msg = login_error(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>").await;
        assert!(msg.contains("502"), "{msg}");
    }

    #[tokio::test]
    async fn rejected_candle_status_keeps_provider_message() {
        let config = local_smartapi(canned(StatusCode::UNAUTHORIZED, TOKEN_REJECTED)).await;
        let session = SmartApiSession {
            client: SmartApiClient::new(&config, "api-key-123").unwrap(),
            jwt: "expired".to_string(),
        };
        match session.fetch_candles(&candle_request()).await {
            Err(DashboardError::Fetch(msg)) => assert_eq!(msg, "Invalid Token (AG8001)"),
            other => panic!("expected fetch error, got {other:?}"),
        }
    }

    #[test]
    fn login_success_yields_bare_jwt() {
        let body = r#"{"status":true,"message":"SUCCESS","errorcode":"",
            "data":{"jwtToken":"Bearer eyJhbGci","refreshToken":"r","feedToken":"f"}}"#;
        assert_eq!(parse_login_response(body).unwrap(), "eyJhbGci");

        let plain = r#"{"status":true,"message":"SUCCESS","data":{"jwtToken":"eyJhbGci"}}"#;
        assert_eq!(parse_login_response(plain).unwrap(), "eyJhbGci");
    }

    #[test]
    fn login_failure_carries_provider_message() {
        let body = r#"{"status":false,"message":"Invalid totp","errorcode":"AB1050","data":null}"#;
        let err = parse_login_response(body).unwrap_err();
        match err {
            DashboardError::Authentication(msg) => assert_eq!(msg, "Invalid totp (AB1050)"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn login_garbage_is_authentication_error() {
        assert!(matches!(
            parse_login_response("<html>"),
            Err(DashboardError::Authentication(_))
        ));
        assert!(matches!(
            parse_login_response(r#"{"status":true,"message":"SUCCESS","data":null}"#),
            Err(DashboardError::Authentication(_))
        ));
    }

    #[test]
    fn candle_rows_parse_positionally() {
        let body = r#"{"status":true,"message":"SUCCESS","errorcode":"","data":[
            ["2024-03-01T09:15:00+05:30", 100.5, 101.0, 99.75, 100.25, 12000],
            ["2024-03-01T09:30:00+05:30", 100.25, 102.0, 100.0, 101.5, 8000]
        ]}"#;
        let rows = parse_candle_response(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp, serde_json::json!("2024-03-01T09:15:00+05:30"));
        assert_eq!(rows[1].close, serde_json::json!(101.5));
        assert_eq!(rows[1].volume, serde_json::json!(8000));
    }

    #[test]
    fn null_candle_data_is_empty() {
        let body = r#"{"status":true,"message":"SUCCESS","data":null}"#;
        assert!(parse_candle_response(body).unwrap().is_empty());
    }

    #[test]
    fn candle_failures_are_fetch_errors() {
        let rejected = r#"{"status":false,"message":"Invalid Token","errorcode":"AG8001","data":null}"#;
        assert!(matches!(parse_candle_response(rejected), Err(DashboardError::Fetch(_))));

        let short_row = r#"{"status":true,"data":[["2024-03-01T09:15:00+05:30", 1, 2, 3]]}"#;
        assert!(matches!(parse_candle_response(short_row), Err(DashboardError::Fetch(_))));
    }

    #[test]
    fn candle_body_uses_wire_names_and_minute_dates() {
        let request = CandleRequest {
            exchange: "NSE".to_string(),
            symbol_token: "2885".to_string(),
            interval: Interval::FifteenMinute,
            from: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(9, 15, 42).unwrap(),
            to: NaiveDate::from_ymd_opt(2024, 3, 11).unwrap().and_hms_opt(15, 30, 0).unwrap(),
        };
        let json = serde_json::to_value(CandleBody::from(&request)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "exchange": "NSE",
                "symboltoken": "2885",
                "interval": "FIFTEEN_MINUTE",
                "fromdate": "2024-03-01 09:15",
                "todate": "2024-03-11 15:30",
            })
        );
    }

    #[test]
    fn headers_carry_key_and_bearer() {
        let headers = client().headers(Some("jwt-abc"));
        assert_eq!(headers["X-PrivateKey"], "api-key-123");
        assert_eq!(headers["X-UserType"], "USER");
        assert_eq!(headers[AUTHORIZATION], "Bearer jwt-abc");
        assert!(headers[AUTHORIZATION].is_sensitive());

        assert!(client().headers(None).get(AUTHORIZATION).is_none());
    }

    #[test]
    fn debug_output_is_redacted() {
        let session = SmartApiSession {
            client: client(),
            jwt: "super-secret-jwt".to_string(),
        };
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("super-secret-jwt"));
        assert!(!rendered.contains("api-key-123"));
        assert!(rendered.contains("apiconnect.angelone.in"));
    }
}
