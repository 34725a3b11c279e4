//! # Authlink Core
//!
//! Token acquisition logic with no infrastructure dependencies.
//!
//! This crate contains:
//! - Cache key derivation and the token cache
//! - The silent acquisition engine (RT, MRRT, FRT, broker)
//! - The broker delegation protocol
//! - The device-certificate challenge handler
//! - The per-request telemetry aggregator
//!
//! ## Architecture Principles
//! - Only depends on `authlink-common` and `authlink-domain`
//! - No network, keychain or platform code
//! - All external capabilities via traits
//! - Pure, testable logic

pub mod acquisition;
pub mod broker;
pub mod cache;
pub mod challenge;
pub mod context;
pub mod telemetry;

pub use acquisition::{BrokerDelegate, RefreshRequest, RefreshTokenExchanger, SilentAcquisitionEngine};
pub use broker::{AccountService, BrokerProxy, PlatformEnvironment, PlatformError};
pub use cache::{InMemoryTokenStore, TokenCache, TokenCacheStore};
pub use challenge::{AssertionSigner, ChallengeHandler, DeviceCertificateProvider};
pub use context::{AuthenticationContext, AuthenticationContextBuilder};
pub use telemetry::{TelemetryAggregator, TelemetryEvent, TelemetrySink};
