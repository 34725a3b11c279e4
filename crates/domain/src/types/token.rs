//! Cached credential records and token endpoint grants

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{ServerDiagnostics, UserInfo};
use crate::impl_domain_status_conversions;

/// Key shape under which a [`CachedToken`] is addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenEntryType {
    /// Resource-specific refresh token
    Rt,
    /// Multi-resource refresh token
    Mrrt,
    /// Family refresh token
    Frt,
}

impl_domain_status_conversions!(TokenEntryType {
    Rt => "rt",
    Mrrt => "mrrt",
    Frt => "frt",
});

/// Successful token endpoint (or broker) response
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub token_type: String,
    pub expires_on: DateTime<Utc>,
    pub extended_expires_on: Option<DateTime<Utc>>,
    pub is_multi_resource_refresh_token: bool,
    pub family_client_id: Option<String>,
    pub tenant_id: Option<String>,
    pub user_info: Option<UserInfo>,
    pub server_diagnostics: Option<ServerDiagnostics>,
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"***")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("token_type", &self.token_type)
            .field("expires_on", &self.expires_on)
            .field("is_multi_resource_refresh_token", &self.is_multi_resource_refresh_token)
            .field("family_client_id", &self.family_client_id)
            .field("tenant_id", &self.tenant_id)
            .finish_non_exhaustive()
    }
}

/// A credential record stored in the token cache
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    /// Normalized authority (lower-cased, no trailing separator)
    pub authority: String,
    pub resource: String,
    pub client_id: String,
    pub family_client_id: Option<String>,
    pub user_info: Option<UserInfo>,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub token_type: String,
    pub issued_on: DateTime<Utc>,
    pub expires_on: DateTime<Utc>,
    /// Resilience window usable only when refresh fails transiently
    pub extended_expires_on: Option<DateTime<Utc>>,
    pub is_multi_resource_refresh_token: bool,
    pub tenant_id: Option<String>,
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("authority", &self.authority)
            .field("resource", &self.resource)
            .field("client_id", &self.client_id)
            .field("family_client_id", &self.family_client_id)
            .field("access_token", &"***")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_on", &self.expires_on)
            .field("extended_expires_on", &self.extended_expires_on)
            .field("is_multi_resource_refresh_token", &self.is_multi_resource_refresh_token)
            .finish_non_exhaustive()
    }
}

impl CachedToken {
    /// Build a cache record from a grant obtained for `resource`/`client_id`
    pub fn from_grant(
        authority: &str,
        resource: &str,
        client_id: &str,
        grant: &TokenGrant,
        issued_on: DateTime<Utc>,
    ) -> Self {
        Self {
            authority: authority.to_string(),
            resource: resource.to_string(),
            client_id: client_id.to_string(),
            family_client_id: grant.family_client_id.clone(),
            user_info: grant.user_info.clone(),
            access_token: grant.access_token.clone(),
            refresh_token: grant.refresh_token.clone(),
            id_token: grant.id_token.clone(),
            token_type: grant.token_type.clone(),
            issued_on,
            expires_on: grant.expires_on,
            extended_expires_on: grant.extended_expires_on,
            is_multi_resource_refresh_token: grant.is_multi_resource_refresh_token,
            tenant_id: grant.tenant_id.clone(),
        }
    }

    /// Whether the access token is expired, or expires within `buffer`
    pub fn is_access_token_expired(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        now.checked_add_signed(buffer).map_or(true, |deadline| self.expires_on <= deadline)
    }

    /// Whether the extended-expiry window is still open
    pub fn is_extended_lifetime_valid(&self, now: DateTime<Utc>) -> bool {
        self.extended_expires_on.is_some_and(|ext| ext > now)
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|rt| !rt.is_empty())
    }

    pub fn unique_id(&self) -> Option<&str> {
        self.user_info.as_ref().and_then(|u| u.unique_id.as_deref())
    }

    pub fn displayable_id(&self) -> Option<&str> {
        self.user_info.as_ref().and_then(|u| u.displayable_id.as_deref())
    }
}
