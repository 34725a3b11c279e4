//! Logging setup

pub mod logging;

pub use logging::{env_filter, init_tracing};
