//! Broker delegation protocol

pub mod params;
pub mod ports;
pub mod proxy;
pub mod signature;

pub use params::{negotiate_prompt, BrokerOutcome};
pub use ports::{AccountService, PlatformEnvironment, PlatformError};
pub use proxy::BrokerProxy;
pub use signature::{certificate_digest, is_broker_package, SignatureVerifier};
