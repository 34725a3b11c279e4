//! Port interfaces for silent acquisition

use async_trait::async_trait;
use authlink_domain::{AuthenticationRequest, AuthenticationResult, Result, TokenEntryType, TokenGrant};
use uuid::Uuid;

use crate::telemetry::BrokerEvent;

/// A `grant_type=refresh_token` exchange
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshRequest {
    pub authority: String,
    pub resource: String,
    pub client_id: String,
    pub refresh_token: String,
    pub correlation_id: Uuid,
    pub claims: Option<String>,
    /// Cache tier the refresh token came from
    pub tier: TokenEntryType,
}

impl std::fmt::Debug for RefreshRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshRequest")
            .field("authority", &self.authority)
            .field("resource", &self.resource)
            .field("client_id", &self.client_id)
            .field("correlation_id", &self.correlation_id)
            .field("tier", &self.tier)
            .finish_non_exhaustive()
    }
}

/// Token endpoint client used to redeem refresh tokens
///
/// Implementations map a rejected refresh token (`invalid_grant`,
/// `interaction_required`) to `AuthError::InvalidGrant` and server or
/// connectivity failures to transient errors.
#[async_trait]
pub trait RefreshTokenExchanger: Send + Sync {
    async fn exchange(&self, request: &RefreshRequest) -> Result<TokenGrant>;
}

/// Platform broker as seen by the acquisition engine
#[async_trait]
pub trait BrokerDelegate: Send + Sync {
    /// Whether this request may be handed to the broker at all
    fn can_delegate(&self, request: &AuthenticationRequest) -> bool;

    /// Acquire a token through the broker without prompting
    ///
    /// An initial request (the broker holds no token for the user) surfaces
    /// as `AuthError::InteractionRequired` carrying the launch descriptor.
    async fn acquire_token_silent(
        &self,
        request: &AuthenticationRequest,
    ) -> Result<AuthenticationResult>;

    /// Broker identity reported with telemetry
    fn telemetry_event(&self) -> BrokerEvent {
        BrokerEvent::default()
    }
}
