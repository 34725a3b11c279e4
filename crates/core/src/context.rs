//! Authentication context
//!
//! Owns one token cache, one telemetry aggregator and the acquisition engine
//! over them. Callers construct it explicitly and pass it around; nothing in
//! the library is a process-wide singleton.

use std::sync::Arc;

use authlink_common::time::{Clock, SystemClock};
use authlink_domain::{
    AuthConfig, AuthError, AuthenticationRequest, AuthenticationResult, ChallengeResponse,
    ChallengeSource, Result, ResultStatus,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::acquisition::{BrokerDelegate, RefreshTokenExchanger, SilentAcquisitionEngine};
use crate::cache::{TokenCache, TokenCacheStore};
use crate::challenge::ChallengeHandler;
use crate::telemetry::events::EVENT_API;
use crate::telemetry::{ApiEvent, ChallengeEvent, TelemetryAggregator, TelemetryEvent, TelemetrySink};

pub const API_ACQUIRE_TOKEN_SILENT: &str = "acquire_token_silent";

/// Builder for [`AuthenticationContext`]
pub struct AuthenticationContextBuilder {
    config: AuthConfig,
    exchanger: Arc<dyn RefreshTokenExchanger>,
    store: Option<Arc<dyn TokenCacheStore>>,
    broker: Option<Arc<dyn BrokerDelegate>>,
    challenge_handler: ChallengeHandler,
    sink: Option<Arc<dyn TelemetrySink>>,
    clock: Arc<dyn Clock>,
}

impl AuthenticationContextBuilder {
    /// Persistent cache store; defaults to the in-memory store
    #[must_use]
    pub fn cache_store(mut self, store: Arc<dyn TokenCacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn broker(mut self, broker: Arc<dyn BrokerDelegate>) -> Self {
        self.broker = Some(broker);
        self
    }

    #[must_use]
    pub fn challenge_handler(mut self, handler: ChallengeHandler) -> Self {
        self.challenge_handler = handler;
        self
    }

    #[must_use]
    pub fn telemetry_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// # Errors
    /// `AuthError::Configuration` when the configuration does not validate.
    pub fn build(self) -> Result<AuthenticationContext> {
        self.config.validate()?;

        let cache = match self.store {
            Some(store) => TokenCache::new(store),
            None => TokenCache::in_memory(),
        };
        let telemetry = self.sink.map(|sink| {
            Arc::new(TelemetryAggregator::with_clock(
                sink,
                self.config.telemetry.clone(),
                self.clock.clone(),
            ))
        });

        let mut engine =
            SilentAcquisitionEngine::new(cache.clone(), self.exchanger, self.clock, self.config.clone());
        if let Some(broker) = self.broker {
            engine = engine.with_broker(broker);
        }
        if let Some(telemetry) = &telemetry {
            engine = engine.with_telemetry(telemetry.clone());
        }

        Ok(AuthenticationContext {
            cache,
            engine,
            challenge_handler: self.challenge_handler,
            telemetry,
            config: self.config,
        })
    }
}

/// Entry point for token acquisition
pub struct AuthenticationContext {
    cache: TokenCache,
    engine: SilentAcquisitionEngine,
    challenge_handler: ChallengeHandler,
    telemetry: Option<Arc<TelemetryAggregator>>,
    config: AuthConfig,
}

impl AuthenticationContext {
    pub fn builder(
        config: AuthConfig,
        exchanger: Arc<dyn RefreshTokenExchanger>,
    ) -> AuthenticationContextBuilder {
        AuthenticationContextBuilder {
            config,
            exchanger,
            store: None,
            broker: None,
            challenge_handler: ChallengeHandler::new(),
            sink: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    pub fn challenge_handler(&self) -> &ChallengeHandler {
        &self.challenge_handler
    }

    /// Acquire a token without prompting
    ///
    /// Emits one aggregated telemetry record for the call.
    pub async fn acquire_token_silent(
        &self,
        request: &AuthenticationRequest,
    ) -> Result<AuthenticationResult> {
        let request_id = Uuid::new_v4().to_string();
        if let Some(telemetry) = &self.telemetry {
            telemetry.start_event(&request_id, EVENT_API);
        }

        let outcome = self.engine.acquire_token_silent(request, &request_id).await;

        match &outcome {
            Ok(result) => info!(
                correlation_id = %request.correlation_id,
                broker_used = result.broker_used,
                extended_lifetime = result.is_extended_lifetime_token,
                "Silent acquisition succeeded"
            ),
            Err(err) => warn!(
                correlation_id = %request.correlation_id,
                error_code = %err.code(),
                "Silent acquisition failed"
            ),
        }

        if let Some(telemetry) = &self.telemetry {
            let mut event = ApiEvent::new(API_ACQUIRE_TOKEN_SILENT, &request.authority);
            event.correlation_id = Some(request.correlation_id);
            match &outcome {
                Ok(result) => {
                    event.status = Some(result.status);
                    event.is_extended_lifetime_token = result.is_extended_lifetime_token;
                }
                Err(err) => {
                    event.status = Some(if matches!(err, AuthError::Cancelled) {
                        ResultStatus::Cancelled
                    } else {
                        ResultStatus::Failed
                    });
                    event.error_code = Some(err.code());
                }
            }
            telemetry.stop_event(&request_id, TelemetryEvent::Api(event), EVENT_API);
            telemetry.flush(&request_id);
        }

        outcome
    }

    /// Drop every cached token
    pub fn sign_out(&self) -> Result<()> {
        info!("Clearing all cached tokens");
        self.cache.remove_all()
    }

    /// Drop the RT, MRRT and FRT entries `request` would read
    pub fn invalidate(&self, request: &AuthenticationRequest) -> Result<()> {
        info!(correlation_id = %request.correlation_id, "Invalidating cached tokens for request");
        self.cache.remove_for_request(request)
    }

    /// Answer a `WWW-Authenticate: PKeyAuth` challenge from `submit_url`
    pub fn respond_to_challenge_header(
        &self,
        header: &str,
        submit_url: &str,
    ) -> Result<ChallengeResponse> {
        let outcome = self.challenge_handler.respond_to_header(header, submit_url);
        self.record_challenge(ChallengeSource::Header, &outcome);
        outcome
    }

    /// Answer a PKeyAuth challenge delivered as a redirect URI
    pub fn respond_to_challenge_redirect(&self, uri: &str) -> Result<ChallengeResponse> {
        let outcome = self.challenge_handler.respond_to_redirect(uri);
        self.record_challenge(ChallengeSource::Redirect, &outcome);
        outcome
    }

    fn record_challenge(&self, source: ChallengeSource, outcome: &Result<ChallengeResponse>) {
        let Some(telemetry) = &self.telemetry else {
            return;
        };
        let request_id = Uuid::new_v4().to_string();
        let signed = outcome.as_ref().is_ok_and(|response| response.signed);
        telemetry.record(&request_id, TelemetryEvent::Challenge(ChallengeEvent { source, signed }));
        telemetry.flush(&request_id);
    }
}
