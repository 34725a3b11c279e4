//! Shared test helpers for `authlink-core` integration tests.
//!
//! Lightweight fakes for every port so the tests can focus on behaviour
//! instead of boilerplate.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use authlink_core::broker::{AccountService, PlatformEnvironment, PlatformError};
use authlink_core::challenge::{AssertionSigner, DeviceCertificateProvider};
use authlink_core::{RefreshRequest, RefreshTokenExchanger, TelemetrySink};
use authlink_domain::constants::{BROKER_REQUIRED_PERMISSIONS, COMPANY_PORTAL_APP_PACKAGE};
use authlink_domain::{
    AuthError, BrokerBundle, CachedToken, LaunchDescriptor, Result, TokenEntryType, TokenGrant,
    UserInfo,
};
use chrono::{Duration, Utc};
use parking_lot::Mutex;

pub const AUTHORITY: &str = "https://login.example.com/contoso.onmicrosoft.com";
pub const RESOURCE: &str = "https://graph.example.com";
pub const CLIENT_ID: &str = "client-a";
pub const UNIQUE_ID: &str = "oid-1";
pub const DISPLAYABLE_ID: &str = "user@contoso.com";

/// Grant valid for an hour, with user info
pub fn grant(access_token: &str, mrrt: bool, family: Option<&str>) -> TokenGrant {
    TokenGrant {
        access_token: access_token.to_string(),
        refresh_token: Some(format!("{access_token}-rt")),
        id_token: None,
        token_type: "Bearer".to_string(),
        expires_on: Utc::now() + Duration::hours(1),
        extended_expires_on: None,
        is_multi_resource_refresh_token: mrrt,
        family_client_id: family.map(str::to_string),
        tenant_id: Some("tenant".to_string()),
        user_info: Some(UserInfo::new(
            Some(UNIQUE_ID.to_string()),
            Some(DISPLAYABLE_ID.to_string()),
        )),
        server_diagnostics: None,
    }
}

/// Cache entry expiring `expires_in` from now
pub fn cached(
    access_token: &str,
    expires_in: Duration,
    refresh_token: Option<&str>,
    mrrt: bool,
    family: Option<&str>,
) -> CachedToken {
    let now = Utc::now();
    CachedToken {
        authority: AUTHORITY.to_string(),
        resource: RESOURCE.to_string(),
        client_id: CLIENT_ID.to_string(),
        family_client_id: family.map(str::to_string),
        user_info: Some(UserInfo::new(
            Some(UNIQUE_ID.to_string()),
            Some(DISPLAYABLE_ID.to_string()),
        )),
        access_token: access_token.to_string(),
        refresh_token: refresh_token.map(str::to_string),
        id_token: None,
        token_type: "Bearer".to_string(),
        issued_on: now - Duration::hours(1),
        expires_on: now + expires_in,
        extended_expires_on: None,
        is_multi_resource_refresh_token: mrrt,
        tenant_id: None,
    }
}

/// Refresh exchanger answering from per-tier scripts
///
/// An unscripted call fails with an internal error so unexpected refreshes
/// show up in assertions.
#[derive(Default)]
pub struct FakeExchanger {
    scripts: Mutex<HashMap<TokenEntryType, VecDeque<Result<TokenGrant>>>>,
    calls: Mutex<Vec<RefreshRequest>>,
}

impl FakeExchanger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, tier: TokenEntryType, result: Result<TokenGrant>) {
        self.scripts.lock().entry(tier).or_default().push_back(result);
    }

    pub fn calls(&self) -> Vec<RefreshRequest> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl RefreshTokenExchanger for FakeExchanger {
    async fn exchange(&self, request: &RefreshRequest) -> Result<TokenGrant> {
        self.calls.lock().push(request.clone());
        self.scripts
            .lock()
            .get_mut(&request.tier)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(AuthError::Internal(format!("unscripted {} refresh", request.tier))))
    }
}

/// Account service with fixed accounts and a scripted token answer
pub struct FakeAccountService {
    pub accounts: Vec<String>,
    pub identities: HashMap<String, UserInfo>,
    pub token_result: Mutex<std::result::Result<BrokerBundle, PlatformError>>,
    pub protocol_version: Option<String>,
    pub add_account_supported: bool,
    pub delay: Option<std::time::Duration>,
    pub list_delay: Option<std::time::Duration>,
    pub list_error: Option<PlatformError>,
    pub received: Mutex<Vec<(String, BrokerBundle)>>,
}

impl Default for FakeAccountService {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            identities: HashMap::new(),
            token_result: Mutex::new(Ok(BrokerBundle::new())),
            protocol_version: Some("v2".to_string()),
            add_account_supported: false,
            delay: None,
            list_delay: None,
            list_error: None,
            received: Mutex::new(Vec::new()),
        }
    }
}

impl FakeAccountService {
    pub fn with_account(mut self, name: &str, identity: UserInfo) -> Self {
        self.accounts.push(name.to_string());
        self.identities.insert(name.to_string(), identity);
        self
    }

    pub fn answering(self, bundle: BrokerBundle) -> Self {
        *self.token_result.lock() = Ok(bundle);
        self
    }

    pub fn received(&self) -> Vec<(String, BrokerBundle)> {
        self.received.lock().clone()
    }
}

impl AccountService for FakeAccountService {
    fn list_accounts(&self, _account_type: &str) -> std::result::Result<Vec<String>, PlatformError> {
        if let Some(delay) = self.list_delay {
            std::thread::sleep(delay);
        }
        if let Some(err) = &self.list_error {
            return Err(err.clone());
        }
        Ok(self.accounts.clone())
    }

    fn query_extended_identity(
        &self,
        account_name: &str,
    ) -> std::result::Result<Option<UserInfo>, PlatformError> {
        Ok(self.identities.get(account_name).cloned())
    }

    fn get_auth_token(
        &self,
        account_name: &str,
        params: &BrokerBundle,
    ) -> std::result::Result<BrokerBundle, PlatformError> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.received.lock().push((account_name.to_string(), params.clone()));
        self.token_result.lock().clone()
    }

    fn request_add_account_flow(
        &self,
        params: &BrokerBundle,
    ) -> std::result::Result<LaunchDescriptor, PlatformError> {
        Ok(LaunchDescriptor { target: "broker.AddAccount".to_string(), parameters: params.clone() })
    }

    fn broker_protocol_version(&self) -> Option<String> {
        self.protocol_version.clone()
    }

    fn supports_add_account_flow(&self) -> bool {
        self.add_account_supported
    }
}

/// Platform facts for a trusted broker install
pub struct FakePlatform {
    pub caller: String,
    pub permissions: Vec<String>,
    pub broker_package: Option<String>,
    pub certificates: Vec<Vec<u8>>,
    pub foreground: bool,
}

impl FakePlatform {
    /// Broker installed and signed with `certificate`, all grants held
    pub fn trusted(certificate: &[u8]) -> Self {
        Self {
            caller: "com.contoso.app".to_string(),
            permissions: BROKER_REQUIRED_PERMISSIONS.iter().map(|p| (*p).to_string()).collect(),
            broker_package: Some(COMPANY_PORTAL_APP_PACKAGE.to_string()),
            certificates: vec![certificate.to_vec()],
            foreground: false,
        }
    }
}

impl PlatformEnvironment for FakePlatform {
    fn caller_package(&self) -> String {
        self.caller.clone()
    }

    fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    fn authenticator_package(&self, _account_type: &str) -> Option<String> {
        self.broker_package.clone()
    }

    fn signing_certificates(&self, _package: &str) -> Vec<Vec<u8>> {
        self.certificates.clone()
    }

    fn is_foreground_thread(&self) -> bool {
        self.foreground
    }
}

/// Enrolled device with a fixed thumbprint
pub struct FakeDeviceCertificate {
    pub thumbprint: String,
    pub issuer_recognized: bool,
}

impl DeviceCertificateProvider for FakeDeviceCertificate {
    fn certificate(&self) -> Result<Vec<u8>> {
        Ok(b"device-cert".to_vec())
    }

    fn private_key(&self) -> Result<Vec<u8>> {
        Ok(b"device-private-key".to_vec())
    }

    fn public_key(&self) -> Result<Vec<u8>> {
        Ok(b"device-public-key".to_vec())
    }

    fn thumbprint(&self) -> String {
        self.thumbprint.clone()
    }

    fn is_valid_issuer(&self, _authorities: &[String]) -> bool {
        self.issuer_recognized
    }
}

/// Signer returning a fixed assertion and recording what it signed
#[derive(Default)]
pub struct FixedSigner {
    pub signed: Mutex<Vec<(String, String)>>,
}

impl AssertionSigner for FixedSigner {
    fn sign(
        &self,
        nonce: &str,
        submit_url: &str,
        _private_key: &[u8],
        _public_key: &[u8],
        _certificate: &[u8],
    ) -> Result<String> {
        self.signed.lock().push((nonce.to_string(), submit_url.to_string()));
        Ok("signedJwtHere".to_string())
    }
}

/// Telemetry sink keeping every dispatched record
#[derive(Default)]
pub struct RecordingSink {
    records: Mutex<Vec<HashMap<String, String>>>,
}

impl RecordingSink {
    pub fn records(&self) -> Vec<HashMap<String, String>> {
        self.records.lock().clone()
    }
}

impl TelemetrySink for RecordingSink {
    fn dispatch(&self, record: HashMap<String, String>) {
        self.records.lock().push(record);
    }
}
