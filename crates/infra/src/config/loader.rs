//! Configuration loader
//!
//! Loads [`AuthConfig`] from environment variables or files.
//!
//! ## Loading Strategy
//! 1. If any `AUTHLINK_*` variable is set, the configuration is built from
//!    the environment (unset variables keep their defaults)
//! 2. Otherwise probes the standard paths for a config file
//! 3. With no file either, the defaults are used
//!
//! ## Environment Variables
//! - `AUTHLINK_EXPIRY_BUFFER_SECS`: seconds before expiry a token counts as expired
//! - `AUTHLINK_EXTENDED_LIFETIME_ENABLED`: serve stale tokens on outages (true/false)
//! - `AUTHLINK_EXTENDED_LIFETIME_PRECEDENCE`: `escalate_first` or `stale_first`
//! - `AUTHLINK_FAMILY_CLIENT_ID`: client family applied to requests without one
//! - `AUTHLINK_BROKER_ENABLED`: whether broker delegation is attempted
//! - `AUTHLINK_BROKER_ACCOUNT_TYPE`: account type registered by the broker
//! - `AUTHLINK_BROKER_TRUSTED_SIGNATURE`: extra trusted broker certificate digest
//! - `AUTHLINK_BROKER_TIMEOUT_SECS`: broker call timeout
//! - `AUTHLINK_BROKER_DEFAULT_EXPIRY_SECS`: lifetime of broker tokens without expiry
//! - `AUTHLINK_TELEMETRY_ENABLED`, `AUTHLINK_TELEMETRY_AGGREGATE`
//! - `AUTHLINK_LOG_LEVEL`, `AUTHLINK_LOG_JSON`
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./authlink.toml`, `./authlink.json`, `./config.toml`, `./config.json`
//! 2. The same names in the parent and grandparent directories
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use authlink_domain::{AuthConfig, AuthError, ExtendedLifetimePrecedence, Result};

const ENV_PREFIX: &str = "AUTHLINK_";
const FILE_NAMES: [&str; 4] = ["authlink.toml", "authlink.json", "config.toml", "config.json"];
const PARENT_DIRS: [&str; 3] = [".", "..", "../.."];

/// Load configuration with automatic fallback strategy
///
/// The result is validated before it is returned.
///
/// # Errors
/// Returns `AuthError::Configuration` if:
/// - An environment variable has an invalid value
/// - A probed file cannot be read or parsed
/// - The loaded configuration fails validation
pub fn load() -> Result<AuthConfig> {
    let config = if env_present() {
        tracing::info!("Configuration loaded from environment variables");
        load_from_env()?
    } else {
        match probe_config_paths() {
            Some(path) => load_from_file(Some(path))?,
            None => {
                tracing::debug!("No configuration file found, using defaults");
                AuthConfig::default()
            }
        }
    };
    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// Variables that are not set keep their default values.
///
/// # Errors
/// Returns `AuthError::Configuration` if a variable has an invalid value.
pub fn load_from_env() -> Result<AuthConfig> {
    let mut config = AuthConfig::default();

    if let Some(secs) = env_parse::<u64>("AUTHLINK_EXPIRY_BUFFER_SECS")? {
        config.expiry_buffer_secs = secs;
    }
    config.extended_lifetime_enabled =
        env_bool("AUTHLINK_EXTENDED_LIFETIME_ENABLED", config.extended_lifetime_enabled);
    if let Some(precedence) =
        env_parse::<ExtendedLifetimePrecedence>("AUTHLINK_EXTENDED_LIFETIME_PRECEDENCE")?
    {
        config.extended_lifetime_precedence = precedence;
    }
    if let Some(family) = env_string("AUTHLINK_FAMILY_CLIENT_ID") {
        config.family_client_id = Some(family);
    }

    config.broker.enabled = env_bool("AUTHLINK_BROKER_ENABLED", config.broker.enabled);
    if let Some(account_type) = env_string("AUTHLINK_BROKER_ACCOUNT_TYPE") {
        config.broker.account_type = account_type;
    }
    if let Some(signature) = env_string("AUTHLINK_BROKER_TRUSTED_SIGNATURE") {
        config.broker.trusted_signature = Some(signature);
    }
    if let Some(secs) = env_parse::<u64>("AUTHLINK_BROKER_TIMEOUT_SECS")? {
        config.broker.timeout_secs = secs;
    }
    if let Some(secs) = env_parse::<u64>("AUTHLINK_BROKER_DEFAULT_EXPIRY_SECS")? {
        config.broker.default_expiry_secs = secs;
    }

    config.telemetry.enabled = env_bool("AUTHLINK_TELEMETRY_ENABLED", config.telemetry.enabled);
    config.telemetry.aggregate =
        env_bool("AUTHLINK_TELEMETRY_AGGREGATE", config.telemetry.aggregate);

    if let Some(level) = env_string("AUTHLINK_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("AUTHLINK_LOG_JSON", config.logging.json);

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Format is detected
/// by file extension.
///
/// # Errors
/// Returns `AuthError::Configuration` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<AuthConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(AuthError::Configuration(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            AuthError::Configuration(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| AuthError::Configuration(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// # Errors
/// Returns `AuthError::Configuration` if the format is unsupported or
/// parsing fails.
pub fn parse_config(contents: &str, path: &Path) -> Result<AuthConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| AuthError::Configuration(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| AuthError::Configuration(format!("Invalid JSON format: {e}"))),
        _ => Err(AuthError::Configuration(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard paths for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf))
    {
        roots.push(exe_dir);
    }

    roots
        .iter()
        .flat_map(|root| {
            PARENT_DIRS
                .iter()
                .flat_map(move |dir| FILE_NAMES.iter().map(move |name| root.join(dir).join(name)))
        })
        .find(|path| path.exists())
}

/// Whether any `AUTHLINK_*` variable is set
fn env_present() -> bool {
    std::env::vars_os().any(|(key, _)| key.to_str().is_some_and(|k| k.starts_with(ENV_PREFIX)))
}

/// Non-empty environment variable
fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse an optional environment variable
///
/// # Errors
/// Returns `AuthError::Configuration` naming the variable when the value
/// does not parse.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_string(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| AuthError::Configuration(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
