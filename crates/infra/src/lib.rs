//! # Authlink Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The keychain-backed token cache store
//! - The HTTP refresh-token exchanger (with device challenge round trip)
//! - The JWS device assertion signer
//! - The tracing telemetry sink
//! - Configuration loading and logging setup
//!
//! ## Architecture
//! - Implements traits defined in `authlink-core`
//! - Contains all "impure" code (network, keychain, filesystem)

pub mod cache;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;
pub mod signing;
pub mod telemetry;

// Re-export commonly used items
pub use cache::KeychainTokenStore;
pub use errors::InfraError;
pub use http::HttpTokenExchanger;
pub use observability::init_tracing;
pub use signing::JwsAssertionSigner;
pub use telemetry::TracingTelemetrySink;
