//! Default in-memory cache store

use std::collections::HashMap;

use authlink_domain::{CachedToken, Result};
use parking_lot::Mutex;

use super::ports::TokenCacheStore;

/// `HashMap` behind a single lock
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    entries: Mutex<HashMap<String, CachedToken>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Sorted snapshot of the stored keys
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl TokenCacheStore for InMemoryTokenStore {
    fn get(&self, key: &str) -> Result<Option<CachedToken>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn put(&self, key: &str, token: &CachedToken) -> Result<()> {
        self.entries.lock().insert(key.to_string(), token.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn remove_all(&self) -> Result<()> {
        self.entries.lock().clear();
        Ok(())
    }

    fn enumerate(&self) -> Result<Vec<CachedToken>> {
        Ok(self.entries.lock().values().cloned().collect())
    }
}
