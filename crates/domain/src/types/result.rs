//! Results of a token acquisition attempt

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CachedToken, ServerDiagnostics, TokenGrant, UserInfo};
use crate::errors::{AuthError, ErrorCode};
use crate::impl_domain_status_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Succeeded,
    Failed,
    Cancelled,
}

impl_domain_status_conversions!(ResultStatus {
    Succeeded => "succeeded",
    Failed => "failed",
    Cancelled => "cancelled",
});

/// Outcome of one request attempt; never mutated after it is handed out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationResult {
    pub status: ResultStatus,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_on: Option<DateTime<Utc>>,
    pub extended_expires_on: Option<DateTime<Utc>>,
    pub tenant_id: Option<String>,
    pub user_info: Option<UserInfo>,
    pub correlation_id: Option<Uuid>,
    pub broker_used: bool,
    /// Served from the extended-expiry window after a transient failure
    pub is_extended_lifetime_token: bool,
    pub is_multi_resource_refresh_token: bool,
    pub family_client_id: Option<String>,
    pub server_diagnostics: Option<ServerDiagnostics>,
    pub error_code: Option<ErrorCode>,
    pub error_description: Option<String>,
}

impl AuthenticationResult {
    fn empty(status: ResultStatus, correlation_id: Uuid) -> Self {
        Self {
            status,
            access_token: None,
            refresh_token: None,
            id_token: None,
            token_type: None,
            expires_on: None,
            extended_expires_on: None,
            tenant_id: None,
            user_info: None,
            correlation_id: Some(correlation_id),
            broker_used: false,
            is_extended_lifetime_token: false,
            is_multi_resource_refresh_token: false,
            family_client_id: None,
            server_diagnostics: None,
            error_code: None,
            error_description: None,
        }
    }

    /// Succeeded result served from a cache entry
    pub fn from_cached(token: &CachedToken, correlation_id: Uuid) -> Self {
        Self {
            access_token: Some(token.access_token.clone()),
            refresh_token: token.refresh_token.clone(),
            id_token: token.id_token.clone(),
            token_type: Some(token.token_type.clone()),
            expires_on: Some(token.expires_on),
            extended_expires_on: token.extended_expires_on,
            tenant_id: token.tenant_id.clone(),
            user_info: token.user_info.clone(),
            is_multi_resource_refresh_token: token.is_multi_resource_refresh_token,
            family_client_id: token.family_client_id.clone(),
            ..Self::empty(ResultStatus::Succeeded, correlation_id)
        }
    }

    /// Succeeded result for a fresh grant
    pub fn from_grant(grant: &TokenGrant, correlation_id: Uuid) -> Self {
        Self {
            access_token: Some(grant.access_token.clone()),
            refresh_token: grant.refresh_token.clone(),
            id_token: grant.id_token.clone(),
            token_type: Some(grant.token_type.clone()),
            expires_on: Some(grant.expires_on),
            extended_expires_on: grant.extended_expires_on,
            tenant_id: grant.tenant_id.clone(),
            user_info: grant.user_info.clone(),
            is_multi_resource_refresh_token: grant.is_multi_resource_refresh_token,
            family_client_id: grant.family_client_id.clone(),
            server_diagnostics: grant.server_diagnostics.clone(),
            ..Self::empty(ResultStatus::Succeeded, correlation_id)
        }
    }

    /// Failed (or cancelled) status view of an error
    pub fn from_error(error: &AuthError, correlation_id: Uuid) -> Self {
        let status = if matches!(error, AuthError::Cancelled) {
            ResultStatus::Cancelled
        } else {
            ResultStatus::Failed
        };
        Self {
            error_code: Some(error.code()),
            error_description: Some(error.to_string()),
            server_diagnostics: error.server_diagnostics().cloned(),
            ..Self::empty(status, correlation_id)
        }
    }

    #[must_use]
    pub fn with_broker_used(mut self) -> Self {
        self.broker_used = true;
        self
    }

    #[must_use]
    pub fn with_extended_lifetime(mut self) -> Self {
        self.is_extended_lifetime_token = true;
        self
    }

    pub fn is_succeeded(&self) -> bool {
        self.status == ResultStatus::Succeeded
    }
}
