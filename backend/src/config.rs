// =============================================================================
// Dashboard Configuration — JSON settings plus environment secrets
// =============================================================================
//
// Non-secret settings live in `dashboard_config.json`. Every field carries a
// serde default, so a partial file (or no file at all) still yields a usable
// configuration.
//
// Broker credentials and the dashboard password only ever come from the
// environment (optionally seeded from `.env`). They are never serialised and
// their `Debug` output is redacted.
// =============================================================================

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::DashboardError;
use crate::smartapi::totp::TotpAlgorithm;
use crate::types::{Interval, VwapAnchor};

pub const DEFAULT_CONFIG_PATH: &str = "dashboard_config.json";

pub const ENV_CONFIG_PATH: &str = "DASHBOARD_CONFIG";
pub const ENV_BIND_ADDR: &str = "DASHBOARD_BIND_ADDR";
pub const ENV_SYMBOL_TABLE: &str = "DASHBOARD_SYMBOL_TABLE";

pub const ENV_API_KEY: &str = "SMARTAPI_API_KEY";
pub const ENV_CLIENT_CODE: &str = "SMARTAPI_CLIENT_CODE";
pub const ENV_PASSWORD: &str = "SMARTAPI_PASSWORD";
pub const ENV_TOTP_SECRET: &str = "SMARTAPI_TOTP_SECRET";
pub const ENV_APP_PASSWORD: &str = "DASHBOARD_APP_PASSWORD";

// =============================================================================
// Default-value helpers
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_symbol_table_path() -> PathBuf {
    PathBuf::from("angel_tokens.csv")
}

fn default_exchange() -> String {
    "NSE".to_string()
}

fn default_base_url() -> String {
    "https://apiconnect.angelone.in".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_daily() -> TimeframeConfig {
    TimeframeConfig {
        interval: Interval::OneDay,
        lookback_days: 365,
    }
}

fn default_intraday() -> TimeframeConfig {
    TimeframeConfig {
        interval: Interval::FifteenMinute,
        lookback_days: 10,
    }
}

fn default_totp_digits() -> u32 {
    6
}

/// Accepted range for `lookback_days`.
pub const LOOKBACK_DAYS_RANGE: std::ops::RangeInclusive<i64> = 1..=2000;

// =============================================================================
// TimeframeConfig
// =============================================================================

/// Candle interval plus how many calendar days of history to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeframeConfig {
    pub interval: Interval,
    pub lookback_days: i64,
}

impl TimeframeConfig {
    fn validate(&self, name: &str) -> Result<()> {
        if !LOOKBACK_DAYS_RANGE.contains(&self.lookback_days) {
            bail!(
                "{name}.lookback_days must be within {}..={}, got {}",
                LOOKBACK_DAYS_RANGE.start(),
                LOOKBACK_DAYS_RANGE.end(),
                self.lookback_days
            );
        }
        Ok(())
    }
}

// =============================================================================
// DashboardConfig
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Socket address the HTTP server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// CSV file mapping display names to exchange tokens.
    #[serde(default = "default_symbol_table_path")]
    pub symbol_table_path: PathBuf,

    #[serde(default = "default_exchange")]
    pub exchange: String,

    /// SmartAPI REST root.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Long-horizon series that drives the three checks.
    #[serde(default = "default_daily")]
    pub daily: TimeframeConfig,

    /// Short-horizon series for the VWAP gate.
    #[serde(default = "default_intraday")]
    pub intraday: TimeframeConfig,

    #[serde(default)]
    pub vwap_anchor: VwapAnchor,

    #[serde(default)]
    pub totp_algorithm: TotpAlgorithm,

    #[serde(default = "default_totp_digits")]
    pub totp_digits: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            symbol_table_path: default_symbol_table_path(),
            exchange: default_exchange(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            daily: default_daily(),
            intraday: default_intraday(),
            vwap_anchor: VwapAnchor::default(),
            totp_algorithm: TotpAlgorithm::default(),
            totp_digits: default_totp_digits(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing file is an error; [`DashboardConfig::load_or_default`] turns
    /// it into a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dashboard config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse dashboard config from {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid dashboard config in {}", path.display()))?;

        info!(
            path = %path.display(),
            exchange = %config.exchange,
            daily = %config.daily.interval,
            intraday = %config.intraday.interval,
            vwap_anchor = %config.vwap_anchor,
            "dashboard config loaded"
        );

        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file is absent.
    ///
    /// A file that exists but does not parse is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "dashboard config not found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Reject settings that would produce an unusable broker request.
    pub fn validate(&self) -> Result<()> {
        self.daily.validate("daily")?;
        self.intraday.validate("intraday")
    }

    /// Apply `DASHBOARD_BIND_ADDR` / `DASHBOARD_SYMBOL_TABLE` overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup(ENV_BIND_ADDR).filter(|v| !v.trim().is_empty()) {
            self.bind_addr = addr;
        }
        if let Some(path) = lookup(ENV_SYMBOL_TABLE).filter(|v| !v.trim().is_empty()) {
            self.symbol_table_path = PathBuf::from(path);
        }
    }
}

// =============================================================================
// Secrets
// =============================================================================

/// Credentials read from the environment at startup.
#[derive(Clone)]
pub struct Secrets {
    pub api_key: String,
    pub client_code: String,
    pub password: String,
    pub totp_secret: String,
    pub app_password: String,
}

impl Secrets {
    /// Read every secret from the process environment.
    ///
    /// A missing or blank variable is a configuration error naming it.
    pub fn from_env() -> Result<Self, DashboardError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DashboardError> {
        let require = |name: &str| -> Result<String, DashboardError> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    DashboardError::Configuration(format!("missing required environment variable {name}"))
                })
        };

        Ok(Self {
            api_key: require(ENV_API_KEY)?,
            client_code: require(ENV_CLIENT_CODE)?,
            password: require(ENV_PASSWORD)?,
            totp_secret: require(ENV_TOTP_SECRET)?,
            app_password: require(ENV_APP_PASSWORD)?,
        })
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("api_key", &"<redacted>")
            .field("client_code", &self.client_code)
            .field("password", &"<redacted>")
            .field("totp_secret", &"<redacted>")
            .field("app_password", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn full_env() -> HashMap<String, String> {
        env(&[
            (ENV_API_KEY, "key"),
            (ENV_CLIENT_CODE, "A123"),
            (ENV_PASSWORD, "1234"),
            (ENV_TOTP_SECRET, "GEZDGNBVGY3TQOJQ"),
            (ENV_APP_PASSWORD, "open-sesame"),
        ])
    }

    #[test]
    fn default_config_has_expected_values() {
        let cfg = DashboardConfig::default();
        assert_eq!(cfg.bind_addr, "0.0.0.0:3001");
        assert_eq!(cfg.exchange, "NSE");
        assert_eq!(cfg.daily.interval, Interval::OneDay);
        assert_eq!(cfg.daily.lookback_days, 365);
        assert_eq!(cfg.intraday.interval, Interval::FifteenMinute);
        assert_eq!(cfg.intraday.lookback_days, 10);
        assert_eq!(cfg.vwap_anchor, VwapAnchor::Session);
        assert_eq!(cfg.totp_algorithm, TotpAlgorithm::Sha1);
        assert_eq!(cfg.totp_digits, 6);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: DashboardConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, DashboardConfig::default());
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{
            "exchange": "BSE",
            "intraday": { "interval": "FIVE_MINUTE", "lookback_days": 3 },
            "vwap_anchor": "series"
        }"#;
        let cfg: DashboardConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.exchange, "BSE");
        assert_eq!(cfg.intraday.interval, Interval::FiveMinute);
        assert_eq!(cfg.intraday.lookback_days, 3);
        assert_eq!(cfg.vwap_anchor, VwapAnchor::Series);
        assert_eq!(cfg.daily, default_daily());
        assert_eq!(cfg.request_timeout_secs, 10);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join(format!("no-such-config-{}.json", uuid::Uuid::new_v4()));
        let cfg = DashboardConfig::load_or_default(&path).unwrap();
        assert_eq!(cfg, DashboardConfig::default());
    }

    #[test]
    fn load_reads_file_from_disk() {
        let path = std::env::temp_dir().join(format!("dashboard-config-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{"totp_algorithm": "sha256", "totp_digits": 8}"#).unwrap();
        let cfg = DashboardConfig::load_or_default(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(cfg.totp_algorithm, TotpAlgorithm::Sha256);
        assert_eq!(cfg.totp_digits, 8);
    }

    #[test]
    fn lookback_outside_range_is_rejected() {
        for days in [0, -5, 100_000_000] {
            let path = std::env::temp_dir().join(format!("dashboard-config-{}.json", uuid::Uuid::new_v4()));
            let body = format!(r#"{{"intraday": {{"interval": "FIFTEEN_MINUTE", "lookback_days": {days}}}}}"#);
            std::fs::write(&path, body).unwrap();
            let result = DashboardConfig::load(&path);
            std::fs::remove_file(&path).ok();
            let err = result.unwrap_err();
            assert!(format!("{err:#}").contains("intraday.lookback_days"), "{err:#}");
        }
        assert!(DashboardConfig::default().validate().is_ok());
    }

    #[test]
    fn env_overrides_replace_paths() {
        let vars = env(&[(ENV_BIND_ADDR, "127.0.0.1:9000"), (ENV_SYMBOL_TABLE, "  ")]);
        let mut cfg = DashboardConfig::default();
        cfg.apply_overrides(|name| vars.get(name).cloned());
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
        // Blank values are ignored.
        assert_eq!(cfg.symbol_table_path, PathBuf::from("angel_tokens.csv"));
    }

    #[test]
    fn secrets_load_when_all_present() {
        let vars = full_env();
        let secrets = Secrets::from_lookup(|name| vars.get(name).cloned()).unwrap();
        assert_eq!(secrets.client_code, "A123");
        assert_eq!(secrets.app_password, "open-sesame");
    }

    #[test]
    fn missing_secret_names_the_variable() {
        let mut vars = full_env();
        vars.insert(ENV_TOTP_SECRET.to_string(), "   ".to_string());
        let err = Secrets::from_lookup(|name| vars.get(name).cloned()).unwrap_err();
        assert!(matches!(err, DashboardError::Configuration(_)));
        assert!(err.to_string().contains(ENV_TOTP_SECRET));
    }

    #[test]
    fn secrets_debug_is_redacted() {
        let vars = full_env();
        let secrets = Secrets::from_lookup(|name| vars.get(name).cloned()).unwrap();
        let rendered = format!("{secrets:?}");
        assert!(!rendered.contains("open-sesame"));
        assert!(!rendered.contains("GEZDGNBVGY3TQOJQ"));
        assert!(rendered.contains("<redacted>"));
    }
}
