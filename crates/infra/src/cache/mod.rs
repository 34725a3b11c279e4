//! Persistent token cache stores

pub mod keychain_store;

pub use keychain_store::{KeychainTokenStore, DEFAULT_SERVICE_NAME};
