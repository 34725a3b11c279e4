//! Silent acquisition engine
//!
//! Walks the cache tiers from most to least specific and falls back to the
//! platform broker:
//!
//! 1. RT: a valid access token is returned without any network call; an
//!    expired one with a refresh token is refreshed.
//! 2. MRRT: when the entry also carries a family id the FRT is tried first.
//! 3. FRT: family from the MRRT entry, the request, or the configuration.
//! 4. Broker, when the request allows it and the broker can take it.
//!
//! A rejected refresh token (invalid grant) is evicted and the next tier is
//! tried. Transient failures also escalate; the last one is reported if
//! nothing else succeeds. Any other error stops the walk and bubbles up.

use std::sync::Arc;

use authlink_common::time::Clock;
use authlink_domain::{
    AuthConfig, AuthError, AuthenticationRequest, AuthenticationResult, CachedToken,
    ExtendedLifetimePrecedence, Result, TokenEntryType, TokenGrant,
};
use chrono::Duration;
use tracing::{debug, info, warn};

use super::ports::{BrokerDelegate, RefreshRequest, RefreshTokenExchanger};
use crate::cache::{keys, TokenCache};
use crate::telemetry::events::{EVENT_BROKER, EVENT_HTTP};
use crate::telemetry::{
    BrokerEvent, CacheEvent, CacheLookupStatus, HttpEvent, TelemetryAggregator, TelemetryEvent,
};

/// Mutable state of one acquisition walk
struct Attempt<'a> {
    request: &'a AuthenticationRequest,
    request_id: &'a str,
    authority: String,
    /// Expired RT entry whose extended-expiry window is still open
    stale: Option<CachedToken>,
    /// Most recent transient failure
    transient: Option<AuthError>,
}

/// Silent acquisition state machine
pub struct SilentAcquisitionEngine {
    cache: TokenCache,
    exchanger: Arc<dyn RefreshTokenExchanger>,
    broker: Option<Arc<dyn BrokerDelegate>>,
    telemetry: Option<Arc<TelemetryAggregator>>,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
}

impl SilentAcquisitionEngine {
    pub fn new(
        cache: TokenCache,
        exchanger: Arc<dyn RefreshTokenExchanger>,
        clock: Arc<dyn Clock>,
        config: AuthConfig,
    ) -> Self {
        Self { cache, exchanger, broker: None, telemetry: None, clock, config }
    }

    pub fn with_broker(mut self, broker: Arc<dyn BrokerDelegate>) -> Self {
        self.broker = Some(broker);
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<TelemetryAggregator>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Acquire a token without user interaction
    ///
    /// `request_id` groups the telemetry events of this call.
    ///
    /// # Errors
    /// - `AuthError::InvalidArgument` for an empty authority, resource or
    ///   client id
    /// - `AuthError::InteractionRequired` when every tier is exhausted
    /// - the last transient error when a tier failed for a server or network
    ///   reason and no later tier succeeded
    /// - any other tier or broker error unchanged
    pub async fn acquire_token_silent(
        &self,
        request: &AuthenticationRequest,
        request_id: &str,
    ) -> Result<AuthenticationResult> {
        let mut attempt = Attempt {
            request,
            request_id,
            authority: keys::normalize_authority(&request.authority)?,
            stale: None,
            transient: None,
        };

        debug!(
            correlation_id = %request.correlation_id,
            force_broker = request.force_broker,
            "Starting silent token acquisition"
        );

        if request.force_broker {
            debug!(correlation_id = %request.correlation_id, "Skipping cache tiers, broker forced");
        } else if let Some(result) = self.try_local_tiers(&mut attempt).await? {
            return Ok(result);
        }

        if let Some(result) = self.try_broker(&mut attempt).await? {
            return Ok(result);
        }

        self.exhausted(attempt)
    }

    async fn try_local_tiers(
        &self,
        attempt: &mut Attempt<'_>,
    ) -> Result<Option<AuthenticationResult>> {
        let request = attempt.request;
        let user = request.user.cache_user_id();

        let rt_key = keys::rt_key(&request.authority, &request.resource, &request.client_id, user)?;
        if let Some(entry) = self.lookup(attempt, TokenEntryType::Rt, &rt_key)? {
            let now = self.clock.utc_now();
            if !entry.is_access_token_expired(now, self.expiry_buffer()) {
                info!(correlation_id = %request.correlation_id, tier = "rt", "Returning cached access token");
                return Ok(Some(AuthenticationResult::from_cached(&entry, request.correlation_id)));
            }
            if self.config.extended_lifetime_enabled && entry.is_extended_lifetime_valid(now) {
                attempt.stale = Some(entry.clone());
            }
            // An MRRT-backed RT entry is redeemed by the MRRT tier.
            if !entry.is_multi_resource_refresh_token {
                if let Some(refresh_token) = entry.refresh_token() {
                    if let Some(result) =
                        self.refresh(attempt, TokenEntryType::Rt, &rt_key, refresh_token, None).await?
                    {
                        return Ok(Some(result));
                    }
                }
            }
        }

        let mrrt_key = keys::mrrt_key(&request.authority, &request.client_id, user)?;
        let mut family = None;
        let mut frt_attempted = false;
        if let Some(entry) = self.lookup(attempt, TokenEntryType::Mrrt, &mrrt_key)? {
            family = entry.family_client_id.clone();
            if let Some(family_id) = family.as_deref() {
                frt_attempted = true;
                if let Some(result) = self.try_family(attempt, family_id).await? {
                    return Ok(Some(result));
                }
            }
            if let Some(refresh_token) = entry.refresh_token() {
                if let Some(result) = self
                    .refresh(attempt, TokenEntryType::Mrrt, &mrrt_key, refresh_token, family.as_deref())
                    .await?
                {
                    return Ok(Some(result));
                }
            }
        }

        if !frt_attempted {
            let family = family
                .or_else(|| request.family_client_id.clone())
                .or_else(|| self.config.family_client_id.clone());
            if let Some(family_id) = family {
                if let Some(result) = self.try_family(attempt, &family_id).await? {
                    return Ok(Some(result));
                }
            }
        }

        Ok(None)
    }

    async fn try_family(
        &self,
        attempt: &mut Attempt<'_>,
        family_id: &str,
    ) -> Result<Option<AuthenticationResult>> {
        let request = attempt.request;
        let frt_key = keys::frt_key(&request.authority, family_id, request.user.cache_user_id())?;
        let Some(entry) = self.lookup(attempt, TokenEntryType::Frt, &frt_key)? else {
            return Ok(None);
        };
        match entry.refresh_token() {
            Some(refresh_token) => {
                self.refresh(attempt, TokenEntryType::Frt, &frt_key, refresh_token, Some(family_id))
                    .await
            }
            None => Ok(None),
        }
    }

    /// Redeem one refresh token; `Ok(None)` means escalate
    async fn refresh(
        &self,
        attempt: &mut Attempt<'_>,
        tier: TokenEntryType,
        key: &str,
        refresh_token: &str,
        family_id: Option<&str>,
    ) -> Result<Option<AuthenticationResult>> {
        let request = attempt.request;
        let refresh = RefreshRequest {
            authority: attempt.authority.clone(),
            resource: request.resource.clone(),
            client_id: request.client_id.clone(),
            refresh_token: refresh_token.to_string(),
            correlation_id: request.correlation_id,
            claims: request.claims.clone(),
            tier,
        };

        debug!(correlation_id = %request.correlation_id, tier = %tier, "Redeeming refresh token");
        self.start_event(attempt.request_id, EVENT_HTTP);
        let outcome = self.exchanger.exchange(&refresh).await;

        match outcome {
            Ok(mut grant) => {
                self.stop_event(
                    attempt.request_id,
                    TelemetryEvent::Http(HttpEvent {
                        status_code: Some(200),
                        oauth_error: None,
                        server_diagnostics: grant.server_diagnostics.clone(),
                    }),
                );
                normalize_grant(&mut grant, tier, family_id);
                let token = CachedToken::from_grant(
                    &attempt.authority,
                    &request.resource,
                    &request.client_id,
                    &grant,
                    self.clock.utc_now(),
                );
                self.cache.store_token(request, &token)?;
                info!(correlation_id = %request.correlation_id, tier = %tier, "Refresh succeeded");
                Ok(Some(AuthenticationResult::from_grant(&grant, request.correlation_id)))
            }
            Err(err) => {
                self.stop_event(attempt.request_id, TelemetryEvent::Http(http_event_for(&err)));
                self.handle_refresh_failure(attempt, tier, key, err)
            }
        }
    }

    fn handle_refresh_failure(
        &self,
        attempt: &mut Attempt<'_>,
        tier: TokenEntryType,
        key: &str,
        err: AuthError,
    ) -> Result<Option<AuthenticationResult>> {
        let correlation_id = attempt.request.correlation_id;

        if err.is_invalid_grant() {
            warn!(%correlation_id, tier = %tier, error_code = %err.code(), "Refresh token rejected, evicting entry");
            self.cache.remove(key)?;
            return Ok(None);
        }

        if err.is_transient() {
            warn!(%correlation_id, tier = %tier, error_code = %err.code(), error = %err, "Transient refresh failure");
            attempt.transient = Some(err);
            if self.config.extended_lifetime_precedence == ExtendedLifetimePrecedence::StaleFirst {
                if let Some(stale) = attempt.stale.as_ref() {
                    info!(%correlation_id, "Returning extended lifetime token");
                    return Ok(Some(
                        AuthenticationResult::from_cached(stale, correlation_id).with_extended_lifetime(),
                    ));
                }
            }
            return Ok(None);
        }

        Err(err)
    }

    async fn try_broker(&self, attempt: &mut Attempt<'_>) -> Result<Option<AuthenticationResult>> {
        let request = attempt.request;
        let Some(broker) = self.broker.as_ref() else {
            return Ok(None);
        };
        if !(request.broker_allowed || request.force_broker) {
            return Ok(None);
        }
        if !broker.can_delegate(request) {
            debug!(correlation_id = %request.correlation_id, "Broker cannot take this request");
            return Ok(None);
        }

        info!(correlation_id = %request.correlation_id, "Delegating to broker");
        self.start_event(attempt.request_id, EVENT_BROKER);
        let outcome = broker.acquire_token_silent(request).await;

        match outcome {
            Ok(result) => {
                self.stop_event(attempt.request_id, TelemetryEvent::Broker(broker.telemetry_event()));
                Ok(Some(result.with_broker_used()))
            }
            Err(err) => {
                self.stop_event(
                    attempt.request_id,
                    TelemetryEvent::Broker(BrokerEvent {
                        error_code: Some(err.code()),
                        ..broker.telemetry_event()
                    }),
                );
                if err.is_transient() {
                    attempt.transient = Some(err);
                    Ok(None)
                } else if matches!(err, AuthError::InteractionRequired { launch: None, .. }) {
                    // Broker holds no account for the user; settle like the local tiers.
                    debug!(correlation_id = %request.correlation_id, "Broker has no matching account");
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }

    fn exhausted(&self, attempt: Attempt<'_>) -> Result<AuthenticationResult> {
        let correlation_id = attempt.request.correlation_id;

        if let (Some(stale), Some(_)) = (attempt.stale.as_ref(), attempt.transient.as_ref()) {
            info!(%correlation_id, "All tiers failed transiently, returning extended lifetime token");
            return Ok(AuthenticationResult::from_cached(stale, correlation_id).with_extended_lifetime());
        }

        if let Some(err) = attempt.transient {
            return Err(err);
        }

        info!(%correlation_id, "No usable refresh token, interaction required");
        Err(AuthError::interaction_required(
            "Refresh token is missing or rejected and the broker is unavailable; prompt required",
        ))
    }

    fn lookup(
        &self,
        attempt: &Attempt<'_>,
        tier: TokenEntryType,
        key: &str,
    ) -> Result<Option<CachedToken>> {
        let entry = self.cache.get(key)?;
        let status = match &entry {
            None => CacheLookupStatus::NotFound,
            Some(token) if token.is_access_token_expired(self.clock.utc_now(), self.expiry_buffer()) => {
                CacheLookupStatus::Expired
            }
            Some(_) => CacheLookupStatus::Valid,
        };
        debug!(
            correlation_id = %attempt.request.correlation_id,
            cache_key_kind = %tier,
            status = status.as_str(),
            "Cache lookup"
        );
        if let Some(telemetry) = &self.telemetry {
            telemetry.record(attempt.request_id, TelemetryEvent::Cache(CacheEvent { tier, status }));
        }
        Ok(entry)
    }

    fn expiry_buffer(&self) -> Duration {
        i64::try_from(self.config.expiry_buffer_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }

    fn start_event(&self, request_id: &str, name: &str) {
        if let Some(telemetry) = &self.telemetry {
            telemetry.start_event(request_id, name);
        }
    }

    fn stop_event(&self, request_id: &str, event: TelemetryEvent) {
        if let Some(telemetry) = &self.telemetry {
            let name = event.name();
            telemetry.stop_event(request_id, event, name);
        }
    }
}

/// A token redeemed from an MRRT or FRT is itself multi-resource, and an FRT
/// redemption keeps its family
fn normalize_grant(grant: &mut TokenGrant, tier: TokenEntryType, family_id: Option<&str>) {
    if matches!(tier, TokenEntryType::Mrrt | TokenEntryType::Frt) {
        grant.is_multi_resource_refresh_token = true;
    }
    if tier == TokenEntryType::Frt && grant.family_client_id.is_none() {
        grant.family_client_id = family_id.map(str::to_string);
    }
}

fn http_event_for(err: &AuthError) -> HttpEvent {
    match err {
        AuthError::Server { status, diagnostics, .. } => HttpEvent {
            status_code: *status,
            oauth_error: None,
            server_diagnostics: diagnostics.clone(),
        },
        AuthError::InvalidGrant { oauth_error, .. } => HttpEvent {
            status_code: Some(400),
            oauth_error: oauth_error.clone(),
            server_diagnostics: None,
        },
        _ => HttpEvent::default(),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use authlink_common::time::SystemClock;
    use chrono::Utc;

    use super::*;

    struct UnreachableExchanger;

    #[async_trait]
    impl RefreshTokenExchanger for UnreachableExchanger {
        async fn exchange(&self, _request: &RefreshRequest) -> Result<TokenGrant> {
            Err(AuthError::Internal("exchange must not be called".into()))
        }
    }

    fn grant() -> TokenGrant {
        TokenGrant {
            access_token: "at".into(),
            refresh_token: Some("rt".into()),
            id_token: None,
            token_type: "Bearer".into(),
            expires_on: Utc::now(),
            extended_expires_on: None,
            is_multi_resource_refresh_token: false,
            family_client_id: None,
            tenant_id: None,
            user_info: None,
            server_diagnostics: None,
        }
    }

    #[test]
    fn mrrt_redemption_marks_grant_multi_resource() {
        let mut g = grant();
        normalize_grant(&mut g, TokenEntryType::Mrrt, None);
        assert!(g.is_multi_resource_refresh_token);
        assert!(g.family_client_id.is_none());
    }

    #[test]
    fn frt_redemption_keeps_family() {
        let mut g = grant();
        normalize_grant(&mut g, TokenEntryType::Frt, Some("1"));
        assert_eq!(g.family_client_id.as_deref(), Some("1"));

        let mut rt = grant();
        normalize_grant(&mut rt, TokenEntryType::Rt, Some("1"));
        assert!(!rt.is_multi_resource_refresh_token);
        assert!(rt.family_client_id.is_none());
    }

    #[test]
    fn http_event_reflects_error_shape() {
        let event = http_event_for(&AuthError::server(Some(503), "unavailable"));
        assert_eq!(event.status_code, Some(503));

        let event = http_event_for(&AuthError::invalid_grant("revoked", Some("invalid_grant".into())));
        assert_eq!(event.oauth_error.as_deref(), Some("invalid_grant"));
    }

    #[test]
    fn valid_access_token_is_served_from_cache() {
        let engine = SilentAcquisitionEngine::new(
            TokenCache::in_memory(),
            Arc::new(UnreachableExchanger),
            Arc::new(SystemClock),
            AuthConfig::default(),
        );
        let request = AuthenticationRequest::new(
            "https://login.example.com/common",
            "https://graph.example.com",
            "client",
        );
        let mut g = grant();
        g.access_token = "cached-at".into();
        g.expires_on = Utc::now() + Duration::hours(1);
        let token = CachedToken::from_grant(
            &request.authority,
            &request.resource,
            &request.client_id,
            &g,
            Utc::now(),
        );
        engine.cache().store_token(&request, &token).unwrap();

        let result =
            tokio_test::block_on(engine.acquire_token_silent(&request, "req-1")).unwrap();
        assert_eq!(result.access_token.as_deref(), Some("cached-at"));
        assert!(!result.broker_used);
    }
}
