// =============================================================================
// TOTP — RFC 6238 time-based one-time passwords
// =============================================================================
//
//   counter = floor(unix_time / 30)
//   digest  = HMAC(secret, counter as 8 big-endian bytes)
//   offset  = digest[last] & 0x0f
//   code    = (u32 at digest[offset..offset+4] & 0x7fff_ffff) mod 10^digits
//
// SmartAPI requires a fresh code on every login.
// =============================================================================

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::Sha256;

use crate::error::DashboardError;

pub const TIME_STEP_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotpAlgorithm {
    #[default]
    Sha1,
    Sha256,
}

/// A decoded TOTP generator.
#[derive(Clone)]
pub struct Totp {
    key: Vec<u8>,
    algorithm: TotpAlgorithm,
    digits: u32,
}

impl Totp {
    /// Decode a base32 `secret`. Padding, spaces and lowercase are tolerated.
    pub fn new(secret: &str, algorithm: TotpAlgorithm, digits: u32) -> Result<Self, DashboardError> {
        if !(6..=8).contains(&digits) {
            return Err(DashboardError::Configuration(format!(
                "TOTP digits must be between 6 and 8, got {digits}"
            )));
        }

        let cleaned: String = secret
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '=')
            .map(|c| c.to_ascii_uppercase())
            .collect();

        let key = data_encoding::BASE32_NOPAD
            .decode(cleaned.as_bytes())
            .map_err(|e| DashboardError::Configuration(format!("TOTP secret is not valid base32: {e}")))?;

        if key.is_empty() {
            return Err(DashboardError::Configuration("TOTP secret is empty".to_string()));
        }

        Ok(Self { key, algorithm, digits })
    }

    /// Code for the 30 s step containing `unix_secs`.
    pub fn code_at(&self, unix_secs: u64) -> Result<String, DashboardError> {
        let counter = (unix_secs / TIME_STEP_SECS).to_be_bytes();
        let digest = self.hmac(&counter)?;

        let offset = usize::from(digest[digest.len() - 1] & 0x0f);
        let binary = u32::from_be_bytes([
            digest[offset],
            digest[offset + 1],
            digest[offset + 2],
            digest[offset + 3],
        ]) & 0x7fff_ffff;

        let code = binary % 10u32.pow(self.digits);
        Ok(format!("{:0width$}", code, width = self.digits as usize))
    }

    /// Code for the current wall-clock time.
    pub fn now(&self) -> Result<String, DashboardError> {
        let unix_secs = u64::try_from(Utc::now().timestamp())
            .map_err(|_| DashboardError::Configuration("system clock is before the UNIX epoch".to_string()))?;
        self.code_at(unix_secs)
    }

    fn hmac(&self, message: &[u8]) -> Result<Vec<u8>, DashboardError> {
        let digest = match self.algorithm {
            TotpAlgorithm::Sha1 => {
                let mut mac = Hmac::<Sha1>::new_from_slice(&self.key).map_err(invalid_key)?;
                mac.update(message);
                mac.finalize().into_bytes().to_vec()
            }
            TotpAlgorithm::Sha256 => {
                let mut mac = Hmac::<Sha256>::new_from_slice(&self.key).map_err(invalid_key)?;
                mac.update(message);
                mac.finalize().into_bytes().to_vec()
            }
        };
        Ok(digest)
    }
}

fn invalid_key(err: impl std::fmt::Display) -> DashboardError {
    DashboardError::Configuration(format!("TOTP key rejected: {err}"))
}

impl std::fmt::Debug for Totp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Totp")
            .field("key", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("digits", &self.digits)
            .finish()
    }
}
