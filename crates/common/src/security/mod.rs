//! Secret storage primitives
//!
//! Token caches that outlive the process persist their entries through a
//! [`SecretStore`]. Production code uses the platform keychain
//! ([`KeychainProvider`]); tests use the in-memory double from
//! `testing::MockSecretStore`.

pub mod keychain;

pub use keychain::{KeychainError, KeychainProvider};

/// Key/value secret persistence
///
/// Keys are opaque strings chosen by the caller. Implementations must make
/// `delete_secret` idempotent.
pub trait SecretStore: Send + Sync {
    /// Store or overwrite a secret
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError>;

    /// Fetch a secret, `KeychainError::NotFound` when absent
    fn get_secret(&self, key: &str) -> Result<String, KeychainError>;

    /// Remove a secret; removing a missing secret succeeds
    fn delete_secret(&self, key: &str) -> Result<(), KeychainError>;

    /// Whether a secret is present
    fn secret_exists(&self, key: &str) -> bool {
        self.get_secret(key).is_ok()
    }
}
