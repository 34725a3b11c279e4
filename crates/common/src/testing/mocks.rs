//! Mock implementations of common traits

// Test doubles; a poisoned lock is not possible with parking_lot and
// errors are conveyed through the return types.
#![allow(clippy::missing_errors_doc)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::security::{KeychainError, SecretStore};

type StorageData = Arc<Mutex<HashMap<String, String>>>;

/// In-memory [`SecretStore`] with failure injection
///
/// Clones share storage, which lets a test inspect what a cache persisted.
#[derive(Debug, Clone)]
pub struct MockSecretStore {
    storage: StorageData,
    service_name: String,
    fail_writes: Arc<Mutex<bool>>,
    rejected_keys: Arc<Mutex<HashSet<String>>>,
}

impl MockSecretStore {
    /// Create an empty store namespaced by `service_name`
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            storage: Arc::new(Mutex::new(HashMap::new())),
            service_name: service_name.into(),
            fail_writes: Arc::new(Mutex::new(false)),
            rejected_keys: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Make subsequent `set_secret`/`delete_secret` calls fail
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    /// Make subsequent writes to `key` alone fail
    pub fn reject_writes_to(&self, key: impl Into<String>) {
        self.rejected_keys.lock().insert(key.into());
    }

    /// Number of stored secrets
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.lock().len()
    }

    /// Whether no secrets are stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.lock().is_empty()
    }

    /// Snapshot of stored keys, sorted
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.storage.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn check_writable(&self, key: &str) -> Result<(), KeychainError> {
        if *self.fail_writes.lock() || self.rejected_keys.lock().contains(key) {
            return Err(KeychainError::AccessFailed(format!(
                "{}: write to {} rejected",
                self.service_name, key
            )));
        }
        Ok(())
    }
}

impl Default for MockSecretStore {
    fn default() -> Self {
        Self::new("authlink-test")
    }
}

impl SecretStore for MockSecretStore {
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        self.check_writable(key)?;
        self.storage.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_secret(&self, key: &str) -> Result<String, KeychainError> {
        self.storage.lock().get(key).cloned().ok_or(KeychainError::NotFound)
    }

    fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
        self.check_writable(key)?;
        self.storage.lock().remove(key);
        Ok(())
    }

    fn secret_exists(&self, key: &str) -> bool {
        self.storage.lock().contains_key(key)
    }
}
