//! Token cache persisted in a secret store
//!
//! The platform keychain cannot list its entries, so the store keeps a JSON
//! index of cache keys under a reserved secret. Every operation takes the
//! store lock, which keeps the index and the entries consistent with each
//! other within a process.

use std::collections::BTreeSet;
use std::sync::Arc;

use authlink_common::security::{KeychainError, KeychainProvider, SecretStore};
use authlink_core::cache::TokenCacheStore;
use authlink_domain::{AuthError, CachedToken, Result};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::errors::InfraError;

/// Keychain service used by [`KeychainTokenStore::keychain`]
pub const DEFAULT_SERVICE_NAME: &str = "Authlink.tokens";

const INDEX_KEY: &str = "authlink.cache.index";
const ENTRY_PREFIX: &str = "authlink.cache.entry:";

/// [`TokenCacheStore`] over a [`SecretStore`]
pub struct KeychainTokenStore {
    secrets: Arc<dyn SecretStore>,
    lock: Mutex<()>,
}

impl KeychainTokenStore {
    pub fn new(secrets: Arc<dyn SecretStore>) -> Self {
        Self { secrets, lock: Mutex::new(()) }
    }

    /// Store in the platform keychain under `service_name`
    pub fn keychain(service_name: impl Into<String>) -> Self {
        Self::new(Arc::new(KeychainProvider::new(service_name)))
    }

    fn entry_key(key: &str) -> String {
        format!("{ENTRY_PREFIX}{key}")
    }

    fn read_index(&self) -> Result<BTreeSet<String>> {
        match self.secrets.get_secret(INDEX_KEY) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| InfraError::from(e).into()),
            Err(KeychainError::NotFound) => Ok(BTreeSet::new()),
            Err(e) => Err(InfraError::from(e).into()),
        }
    }

    fn write_index(&self, index: &BTreeSet<String>) -> Result<()> {
        if index.is_empty() {
            return self.secrets.delete_secret(INDEX_KEY).map_err(|e| InfraError::from(e).into());
        }
        let raw = serde_json::to_string(index).map_err(InfraError::from)?;
        self.secrets.set_secret(INDEX_KEY, &raw).map_err(|e| InfraError::from(e).into())
    }

    fn read_entry(&self, key: &str) -> Result<Option<CachedToken>> {
        let raw = match self.secrets.get_secret(&Self::entry_key(key)) {
            Ok(raw) => raw,
            Err(KeychainError::NotFound) => return Ok(None),
            Err(e) => return Err(InfraError::from(e).into()),
        };
        serde_json::from_str(&raw).map(Some).map_err(|e| InfraError::from(e).into())
    }
}

impl TokenCacheStore for KeychainTokenStore {
    fn get(&self, key: &str) -> Result<Option<CachedToken>> {
        let _guard = self.lock.lock();
        self.read_entry(key)
    }

    fn put(&self, key: &str, token: &CachedToken) -> Result<()> {
        let _guard = self.lock.lock();
        let raw = serde_json::to_string(token).map_err(InfraError::from)?;

        // Every stored entry must be reachable from the index.
        let mut index = self.read_index()?;
        if index.insert(key.to_string()) {
            self.write_index(&index)?;
        }
        self.secrets
            .set_secret(&Self::entry_key(key), &raw)
            .map_err(|e| AuthError::from(InfraError::from(e)))?;
        debug!(entries = index.len(), "Persisted cache entry");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock();
        self.secrets
            .delete_secret(&Self::entry_key(key))
            .map_err(|e| AuthError::from(InfraError::from(e)))?;

        let mut index = self.read_index()?;
        if index.remove(key) {
            self.write_index(&index)?;
        }
        Ok(())
    }

    fn remove_all(&self) -> Result<()> {
        let _guard = self.lock.lock();
        let index = self.read_index()?;
        for key in &index {
            self.secrets
                .delete_secret(&Self::entry_key(key))
                .map_err(|e| AuthError::from(InfraError::from(e)))?;
        }
        self.write_index(&BTreeSet::new())?;
        debug!(removed = index.len(), "Cleared persisted cache");
        Ok(())
    }

    fn enumerate(&self) -> Result<Vec<CachedToken>> {
        let _guard = self.lock.lock();
        let index = self.read_index()?;
        let mut tokens = Vec::with_capacity(index.len());
        for key in &index {
            match self.read_entry(key) {
                Ok(Some(token)) => tokens.push(token),
                Ok(None) => warn!("Cache index names an entry that no longer exists"),
                Err(e) => warn!(error = %e, "Skipping unreadable cache entry"),
            }
        }
        Ok(tokens)
    }
}
