//! Port interface for cache persistence

use authlink_domain::{CachedToken, Result};

/// Keyed credential store beneath the token cache
///
/// Implementations serialize all access; `enumerate` returns a point-in-time
/// snapshot that stays valid while other callers keep writing.
pub trait TokenCacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<CachedToken>>;

    /// Insert or overwrite
    fn put(&self, key: &str, token: &CachedToken) -> Result<()>;

    /// Remove one entry; removing a missing key succeeds
    fn remove(&self, key: &str) -> Result<()>;

    fn remove_all(&self) -> Result<()>;

    fn enumerate(&self) -> Result<Vec<CachedToken>>;
}
