//! Tracing subscriber installation
//!
//! `RUST_LOG` wins over the configured level so operators can raise
//! verbosity without touching configuration files.

use authlink_common::{CommonError, CommonResult};
use authlink_domain::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Build the filter for `config`, preferring `RUST_LOG` when set
///
/// # Errors
/// `CommonError::Config` when the configured level is not a valid directive.
pub fn env_filter(config: &LoggingConfig) -> CommonResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| {
        CommonError::config_field("logging.level", format!("invalid log directive: {e}"))
    })
}

/// Install the global `fmt` subscriber
///
/// # Errors
/// `CommonError::Config` for an invalid level or when a global subscriber
/// is already installed.
pub fn init_tracing(config: &LoggingConfig) -> CommonResult<()> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = if config.json {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.try_init()
    };

    installed
        .map_err(|e| CommonError::config(format!("tracing subscriber already installed: {e}")))?;
    tracing::debug!(level = %config.level, json = config.json, "Tracing initialized");
    Ok(())
}
