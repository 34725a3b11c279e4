//! Broker proxy
//!
//! Decides whether a request may be delegated, resolves the broker account
//! and drives the blocking account service call. The async entry point runs
//! the blocking work on a worker thread under a timeout.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use authlink_common::time::{Clock, SystemClock};
use authlink_domain::constants::BROKER_REQUIRED_PERMISSIONS;
use authlink_domain::{
    AuthError, AuthenticationRequest, AuthenticationResult, BrokerConfig, BrokerErrorKind,
    DeveloperErrorKind, Result, UserIdentifier,
};
use tracing::{debug, info, warn};

use super::params::{parse_result, request_bundle, BrokerOutcome};
use super::ports::{AccountService, PlatformEnvironment, PlatformError};
use super::signature::{is_broker_package, SignatureVerifier};
use crate::acquisition::BrokerDelegate;
use crate::telemetry::BrokerEvent;

/// Broker delegation over the platform account service
#[derive(Clone)]
pub struct BrokerProxy {
    accounts: Arc<dyn AccountService>,
    platform: Arc<dyn PlatformEnvironment>,
    config: BrokerConfig,
    verifier: SignatureVerifier,
    clock: Arc<dyn Clock>,
    /// Protocol version seen by the last blocking call
    protocol_version: Arc<Mutex<Option<String>>>,
}

impl BrokerProxy {
    pub fn new(
        accounts: Arc<dyn AccountService>,
        platform: Arc<dyn PlatformEnvironment>,
        config: BrokerConfig,
    ) -> Self {
        let verifier = SignatureVerifier::new(config.trusted_signature.as_deref());
        Self {
            accounts,
            platform,
            config,
            verifier,
            clock: Arc::new(SystemClock),
            protocol_version: Arc::new(Mutex::new(None)),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Whether the broker may serve requests from this caller at all
    ///
    /// Only consults the platform environment and never the account service,
    /// so it is safe on an async executor. Account presence is settled by
    /// [`Self::resolve_account`] on the blocking worker.
    pub fn is_broker_usable(&self) -> bool {
        if !self.config.enabled {
            return false;
        }

        if let Some(missing) = self.missing_permission() {
            debug!(permission = missing, "Broker unavailable, capability grant missing");
            return false;
        }

        let caller = self.platform.caller_package();
        if is_broker_package(&caller) {
            debug!(caller = %caller, "Caller is itself a broker");
            return false;
        }

        let Some(package) = self.platform.authenticator_package(&self.config.account_type) else {
            debug!(account_type = %self.config.account_type, "No account handler registered");
            return false;
        };
        if package == caller {
            return false;
        }

        let certificates = self.platform.signing_certificates(&package);
        self.verifier.verify(&package, &certificates).is_ok()
    }

    /// Broker account that should serve `request`
    ///
    /// Blocking. `Ok(None)` means no account matches and the request falls
    /// through to initial-request handling.
    pub fn resolve_account(&self, request: &AuthenticationRequest) -> Result<Option<String>> {
        let accounts = self.accounts.list_accounts(&self.config.account_type).map_err(|err| {
            warn!(correlation_id = %request.correlation_id, error = %err, "Failed to enumerate broker accounts");
            platform_error(err)
        })?;

        if let Some(name) = request.broker_account_name.as_deref() {
            return Ok(accounts.into_iter().find(|account| account.eq_ignore_ascii_case(name)));
        }

        if let UserIdentifier::DisplayableId(id) = &request.user {
            if let Some(account) = accounts.iter().find(|account| account.eq_ignore_ascii_case(id)) {
                return Ok(Some(account.clone()));
            }
        }

        if request.user == UserIdentifier::Any {
            // Without a user hint only an unambiguous single account is used.
            return Ok((accounts.len() == 1).then(|| accounts[0].clone()));
        }

        for account in &accounts {
            let identity = self.accounts.query_extended_identity(account).map_err(platform_error)?;
            if identity.is_some_and(|info| request.user.matches(&info)) {
                debug!(correlation_id = %request.correlation_id, "Broker account matched by identity");
                return Ok(Some(account.clone()));
            }
        }

        Ok(None)
    }

    /// Blocking token call through the account service
    ///
    /// # Errors
    /// - `DEVELOPER_CALLING_ON_MAIN_THREAD` on the foreground thread
    /// - `DEVELOPER_BROKER_PERMISSIONS_MISSING` without the capability grants
    /// - broker errors mapped from the platform or the result bundle
    pub fn get_auth_token(
        &self,
        account: Option<&str>,
        request: &AuthenticationRequest,
    ) -> Result<BrokerOutcome> {
        if self.platform.is_foreground_thread() {
            return Err(AuthError::developer(
                DeveloperErrorKind::CallingOnMainThread,
                "Broker token call must not run on the foreground thread",
            ));
        }
        if let Some(missing) = self.missing_permission() {
            return Err(AuthError::developer(
                DeveloperErrorKind::BrokerPermissionsMissing,
                format!("Missing capability grant {missing}"),
            ));
        }

        let protocol_version = self.accounts.broker_protocol_version();
        let bundle = request_bundle(request, account, protocol_version.as_deref());
        *self.protocol_version.lock() = protocol_version;

        let Some(account) = account else {
            if self.accounts.supports_add_account_flow() {
                info!(correlation_id = %request.correlation_id, "No broker account, requesting add-account flow");
                let launch =
                    self.accounts.request_add_account_flow(&bundle).map_err(platform_error)?;
                return Ok(BrokerOutcome::InitialRequest(launch));
            }
            return Err(AuthError::interaction_required("No broker account matches the request"));
        };

        debug!(correlation_id = %request.correlation_id, "Calling account service");
        let result = self.accounts.get_auth_token(account, &bundle).map_err(platform_error)?;
        parse_result(&result, request.correlation_id, self.clock.utc_now(), self.config.default_expiry_secs)
    }

    fn missing_permission(&self) -> Option<&'static str> {
        BROKER_REQUIRED_PERMISSIONS
            .into_iter()
            .find(|permission| !self.platform.has_permission(permission))
    }

    fn acquire_blocking(&self, request: &AuthenticationRequest) -> Result<AuthenticationResult> {
        let account = self.resolve_account(request)?;
        match self.get_auth_token(account.as_deref(), request)? {
            BrokerOutcome::Token(result) => Ok(result),
            BrokerOutcome::InitialRequest(launch) => Err(AuthError::InteractionRequired {
                message: "Broker requires an interactive sign-in".to_string(),
                launch: Some(launch),
            }),
        }
    }
}

fn platform_error(err: PlatformError) -> AuthError {
    AuthError::broker(err.kind(), err.to_string())
}

#[async_trait]
impl BrokerDelegate for BrokerProxy {
    fn can_delegate(&self, _request: &AuthenticationRequest) -> bool {
        self.is_broker_usable()
    }

    async fn acquire_token_silent(
        &self,
        request: &AuthenticationRequest,
    ) -> Result<AuthenticationResult> {
        let proxy = self.clone();
        let owned = request.clone();
        let timeout = Duration::from_secs(self.config.timeout_secs);

        let task = tokio::task::spawn_blocking(move || proxy.acquire_blocking(&owned));
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(AuthError::Internal(format!("Broker worker failed: {join_err}"))),
            Err(_) => {
                warn!(
                    correlation_id = %request.correlation_id,
                    timeout_secs = self.config.timeout_secs,
                    "Broker call timed out"
                );
                Err(AuthError::broker(
                    BrokerErrorKind::NotResponding,
                    format!("Broker did not respond within {}s", self.config.timeout_secs),
                ))
            }
        }
    }

    fn telemetry_event(&self) -> BrokerEvent {
        BrokerEvent {
            broker_app: self.platform.authenticator_package(&self.config.account_type),
            broker_version: self.protocol_version.lock().clone(),
            error_code: None,
        }
    }
}
