//! Token cache
//!
//! A dumb keyed store: it never judges freshness. The acquisition engine
//! decides what is expired; the cache only knows how to address entries and
//! how to fan a fresh token out to every key that should find it.

use std::sync::Arc;

use authlink_domain::{AuthenticationRequest, CachedToken, Result, TokenEntryType};
use tracing::debug;

use super::keys;
use super::memory::InMemoryTokenStore;
use super::ports::TokenCacheStore;

/// Token cache over a pluggable store
#[derive(Clone)]
pub struct TokenCache {
    store: Arc<dyn TokenCacheStore>,
}

impl TokenCache {
    pub fn new(store: Arc<dyn TokenCacheStore>) -> Self {
        Self { store }
    }

    /// Cache backed by [`InMemoryTokenStore`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryTokenStore::new()))
    }

    pub fn get(&self, key: &str) -> Result<Option<CachedToken>> {
        self.store.get(key)
    }

    pub fn put(&self, key: &str, token: &CachedToken) -> Result<()> {
        debug!(cache_key_kind = ?keys::key_kind(key), "Writing token cache entry");
        self.store.put(key, token)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        debug!(cache_key_kind = ?keys::key_kind(key), "Removing token cache entry");
        self.store.remove(key)
    }

    pub fn remove_all(&self) -> Result<()> {
        debug!("Clearing token cache");
        self.store.remove_all()
    }

    /// Snapshot of every entry
    pub fn enumerate(&self) -> Result<Vec<CachedToken>> {
        self.store.enumerate()
    }

    /// Persist a freshly obtained token for `request`
    ///
    /// The token is written under the request's user component (empty for
    /// `Any`), its unique id and its displayable id. For each of those the RT
    /// key is always written, the MRRT key when the token is multi-resource,
    /// and the FRT key when it carries a family id.
    pub fn store_token(&self, request: &AuthenticationRequest, token: &CachedToken) -> Result<()> {
        for user in write_back_users(request, token) {
            let user = user.as_deref();

            let rt = keys::rt_key(&request.authority, &request.resource, &request.client_id, user)?;
            self.store.put(&rt, token)?;

            if token.is_multi_resource_refresh_token {
                let mrrt = keys::mrrt_key(&request.authority, &request.client_id, user)?;
                self.store.put(&mrrt, token)?;
            }

            if let Some(family) = token.family_client_id.as_deref() {
                let frt = keys::frt_key(&request.authority, family, user)?;
                self.store.put(&frt, token)?;
            }
        }

        debug!(
            correlation_id = %request.correlation_id,
            mrrt = token.is_multi_resource_refresh_token,
            family = token.family_client_id.is_some(),
            "Token cached"
        );
        Ok(())
    }

    /// Remove the RT, MRRT and FRT entries a request would read
    pub fn remove_for_request(&self, request: &AuthenticationRequest) -> Result<()> {
        let user = request.user.cache_user_id();
        let rt = keys::rt_key(&request.authority, &request.resource, &request.client_id, user)?;
        let mrrt = keys::mrrt_key(&request.authority, &request.client_id, user)?;

        let family = match request.family_client_id.clone() {
            Some(family) => Some(family),
            None => self.get(&mrrt)?.and_then(|entry| entry.family_client_id),
        };

        self.remove(&rt)?;
        self.remove(&mrrt)?;
        if let Some(family) = family {
            self.remove(&keys::frt_key(&request.authority, &family, user)?)?;
        }
        Ok(())
    }

    /// Key a request would read for the given tier
    pub fn key_for(
        request: &AuthenticationRequest,
        kind: TokenEntryType,
        family_client_id: Option<&str>,
    ) -> Result<Option<String>> {
        let user = request.user.cache_user_id();
        let key = match kind {
            TokenEntryType::Rt => {
                Some(keys::rt_key(&request.authority, &request.resource, &request.client_id, user)?)
            }
            TokenEntryType::Mrrt => Some(keys::mrrt_key(&request.authority, &request.client_id, user)?),
            TokenEntryType::Frt => match family_client_id {
                Some(family) => Some(keys::frt_key(&request.authority, family, user)?),
                None => None,
            },
        };
        Ok(key)
    }
}

fn write_back_users(request: &AuthenticationRequest, token: &CachedToken) -> Vec<Option<String>> {
    let mut users: Vec<Option<String>> =
        vec![request.user.cache_user_id().map(str::to_lowercase)];
    for id in [token.unique_id(), token.displayable_id()].into_iter().flatten() {
        let id = id.to_lowercase();
        if !users.iter().any(|u| u.as_deref() == Some(id.as_str())) {
            users.push(Some(id));
        }
    }
    users
}

#[cfg(test)]
mod tests {
    use authlink_domain::{UserIdentifier, UserInfo};
    use chrono::{Duration, Utc};

    use super::*;

    const AUTHORITY: &str = "https://login.example.com/common";

    fn token(mrrt: bool, family: Option<&str>) -> CachedToken {
        let now = Utc::now();
        CachedToken {
            authority: AUTHORITY.into(),
            resource: "resource".into(),
            client_id: "client".into(),
            family_client_id: family.map(str::to_string),
            user_info: Some(UserInfo::new(Some("oid".into()), Some("User@Contoso.com".into()))),
            access_token: "at".into(),
            refresh_token: Some("rt".into()),
            id_token: None,
            token_type: "Bearer".into(),
            issued_on: now,
            expires_on: now + Duration::hours(1),
            extended_expires_on: None,
            is_multi_resource_refresh_token: mrrt,
            tenant_id: None,
        }
    }

    /// Validates `TokenCache::store_token` behavior for the multi-user write
    /// back scenario.
    ///
    /// Assertions:
    /// - Confirms RT, MRRT and FRT entries exist for the empty user, the unique
    ///   id and the displayable id (9 keys).
    #[test]
    fn store_token_fans_out_to_every_user_and_kind() {
        let store = Arc::new(InMemoryTokenStore::new());
        let cache = TokenCache::new(store.clone());
        let request = AuthenticationRequest::new(AUTHORITY, "resource", "client");

        cache.store_token(&request, &token(true, Some("1"))).unwrap();

        assert_eq!(store.len(), 9);
        for user in [None, Some("oid"), Some("user@contoso.com")] {
            assert!(cache
                .get(&keys::rt_key(AUTHORITY, "resource", "client", user).unwrap())
                .unwrap()
                .is_some());
            assert!(cache.get(&keys::mrrt_key(AUTHORITY, "client", user).unwrap()).unwrap().is_some());
            assert!(cache.get(&keys::frt_key(AUTHORITY, "1", user).unwrap()).unwrap().is_some());
        }
    }

    #[test]
    fn plain_rt_writes_only_rt_keys() {
        let store = Arc::new(InMemoryTokenStore::new());
        let cache = TokenCache::new(store.clone());
        let request = AuthenticationRequest::new(AUTHORITY, "resource", "client")
            .with_user(UserIdentifier::UniqueId("OID".into()));

        cache.store_token(&request, &token(false, None)).unwrap();

        // request user and unique id collapse into one entry
        assert_eq!(store.len(), 2);
        assert!(store.keys().iter().all(|k| keys::key_kind(k) == Some(TokenEntryType::Rt)));
    }

    #[test]
    fn remove_for_request_uses_family_from_mrrt_entry() {
        let store = Arc::new(InMemoryTokenStore::new());
        let cache = TokenCache::new(store.clone());
        let request = AuthenticationRequest::new(AUTHORITY, "resource", "client");
        cache.store_token(&request, &token(true, Some("1"))).unwrap();

        cache.remove_for_request(&request).unwrap();

        assert!(cache.get(&keys::frt_key(AUTHORITY, "1", None).unwrap()).unwrap().is_none());
        assert!(cache.get(&keys::mrrt_key(AUTHORITY, "client", None).unwrap()).unwrap().is_none());
        // entries for the concrete user ids remain
        assert_eq!(store.len(), 6);
    }

    #[test]
    fn enumerate_is_a_snapshot() {
        let cache = TokenCache::in_memory();
        let request = AuthenticationRequest::new(AUTHORITY, "resource", "client");
        cache.store_token(&request, &token(false, None)).unwrap();

        let snapshot = cache.enumerate().unwrap();
        cache.remove_all().unwrap();

        assert_eq!(snapshot.len(), 3);
        assert!(cache.enumerate().unwrap().is_empty());
    }
}
