//! Configuration loading
//!
//! Builds an `AuthConfig` from `AUTHLINK_*` environment variables or a TOML/JSON
//! file.

pub mod loader;

pub use loader::{load, load_from_env, load_from_file, parse_config, probe_config_paths};
