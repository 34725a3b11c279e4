//! Library configuration
//!
//! Every field has a default so a partial TOML/JSON document (or none at all)
//! yields a usable configuration.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::constants::{
    BROKER_ACCOUNT_TYPE, DEFAULT_BROKER_EXPIRY_SECS, DEFAULT_BROKER_TIMEOUT_SECS,
    DEFAULT_EXPIRY_BUFFER_SECS, MAX_BROKER_EXPIRY_SECS, MAX_BROKER_TIMEOUT_SECS,
    MAX_EXPIRY_BUFFER_SECS,
};
use crate::errors::{AuthError, Result};
use crate::impl_domain_status_conversions;

/// Order in which a transient refresh failure is handled when the cached
/// access token is still inside its extended-expiry window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtendedLifetimePrecedence {
    /// Try every remaining tier and the broker first; the stale token is the
    /// last resort
    #[default]
    EscalateFirst,
    /// Return the stale token as soon as its tier fails transiently
    StaleFirst,
}

impl_domain_status_conversions!(ExtendedLifetimePrecedence {
    EscalateFirst => "escalate_first",
    StaleFirst => "stale_first",
});

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Seconds before `expires_on` at which an access token counts as expired
    pub expiry_buffer_secs: u64,
    pub extended_lifetime_enabled: bool,
    pub extended_lifetime_precedence: ExtendedLifetimePrecedence,
    /// Client family applied when a request carries none
    pub family_client_id: Option<String>,
    pub broker: BrokerConfig,
    pub telemetry: TelemetryConfig,
    pub logging: LoggingConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            expiry_buffer_secs: DEFAULT_EXPIRY_BUFFER_SECS,
            extended_lifetime_enabled: false,
            extended_lifetime_precedence: ExtendedLifetimePrecedence::default(),
            family_client_id: None,
            broker: BrokerConfig::default(),
            telemetry: TelemetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AuthConfig {
    /// Reject values the components cannot operate with
    ///
    /// # Errors
    /// Returns `AuthError::Configuration` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.expiry_buffer_secs > MAX_EXPIRY_BUFFER_SECS {
            return Err(AuthError::Configuration(format!(
                "expiry_buffer_secs must be at most {MAX_EXPIRY_BUFFER_SECS}"
            )));
        }
        if self.broker.timeout_secs == 0 {
            return Err(AuthError::Configuration("broker.timeout_secs must be positive".into()));
        }
        if self.broker.timeout_secs > MAX_BROKER_TIMEOUT_SECS {
            return Err(AuthError::Configuration(format!(
                "broker.timeout_secs must be at most {MAX_BROKER_TIMEOUT_SECS}"
            )));
        }
        if self.broker.default_expiry_secs > MAX_BROKER_EXPIRY_SECS {
            return Err(AuthError::Configuration(format!(
                "broker.default_expiry_secs must be at most {MAX_BROKER_EXPIRY_SECS}"
            )));
        }
        if self.broker.account_type.trim().is_empty() {
            return Err(AuthError::Configuration("broker.account_type must not be empty".into()));
        }
        if let Some(signature) = &self.broker.trusted_signature {
            let digest = STANDARD.decode(signature).map_err(|e| {
                AuthError::Configuration(format!("broker.trusted_signature is not base64: {e}"))
            })?;
            if digest.len() != 20 {
                return Err(AuthError::Configuration(format!(
                    "broker.trusted_signature must encode a 20-byte SHA-1 digest, got {} bytes",
                    digest.len()
                )));
            }
        }
        if let Some(family) = &self.family_client_id {
            if family.trim().is_empty() {
                return Err(AuthError::Configuration("family_client_id must not be empty".into()));
            }
        }
        Ok(())
    }
}

/// Broker delegation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub enabled: bool,
    pub account_type: String,
    /// Operator supplied base64 SHA-1 digest of an additional trusted broker
    /// signing certificate
    pub trusted_signature: Option<String>,
    pub timeout_secs: u64,
    /// Lifetime assumed for broker tokens returned without an expiry
    pub default_expiry_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            account_type: BROKER_ACCOUNT_TYPE.to_string(),
            trusted_signature: None,
            timeout_secs: DEFAULT_BROKER_TIMEOUT_SECS,
            default_expiry_secs: DEFAULT_BROKER_EXPIRY_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    /// Buffer events per request and dispatch one merged record on flush
    pub aggregate: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { enabled: true, aggregate: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}
