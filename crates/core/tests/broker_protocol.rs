//! Integration tests for broker delegation.

mod support;

use std::sync::Arc;
use std::time::{Duration, Instant};

use authlink_common::time::SystemClock;
use authlink_core::broker::{certificate_digest, BrokerOutcome, BrokerProxy, PlatformError};
use authlink_core::{BrokerDelegate, SilentAcquisitionEngine, TokenCache};
use authlink_domain::constants::{
    BROKER_KEY_LOGIN_HINT, BROKER_KEY_PROMPT, BROKER_RESULT_AUTHTOKEN, BROKER_RESULT_ERROR_CODE,
    BROKER_RESULT_EXPIRES, COMPANY_PORTAL_APP_PACKAGE, PERMISSION_GET_ACCOUNTS,
};
use authlink_domain::{
    AuthConfig, AuthError, AuthenticationRequest, BrokerBundle, BrokerConfig, ErrorCode,
    PromptBehavior, UserIdentifier, UserInfo,
};
use support::{FakeAccountService, FakeExchanger, FakePlatform, AUTHORITY, CLIENT_ID, RESOURCE};

const BROKER_CERT: &[u8] = b"trusted-broker-certificate";

fn config() -> BrokerConfig {
    BrokerConfig {
        enabled: true,
        trusted_signature: Some(certificate_digest(BROKER_CERT)),
        ..BrokerConfig::default()
    }
}

fn identity(unique_id: &str, upn: &str) -> UserInfo {
    UserInfo::new(Some(unique_id.to_string()), Some(upn.to_string()))
}

fn token_bundle() -> BrokerBundle {
    BrokerBundle::from([
        (BROKER_RESULT_AUTHTOKEN.to_string(), "broker-at".to_string()),
        (BROKER_RESULT_EXPIRES.to_string(), "4102444800000".to_string()),
    ])
}

fn proxy(accounts: FakeAccountService, platform: FakePlatform) -> BrokerProxy {
    BrokerProxy::new(Arc::new(accounts), Arc::new(platform), config())
}

fn request() -> AuthenticationRequest {
    AuthenticationRequest::new(AUTHORITY, RESOURCE, CLIENT_ID)
}

/// Validates `BrokerProxy::can_delegate` behavior for the trust checks
/// scenario.
///
/// Assertions:
/// - Confirms delegation is allowed for a trusted broker with an account.
/// - Confirms each failed precondition disables delegation.
#[test]
fn can_delegate_requires_every_precondition() {
    let accounts = || FakeAccountService::default().with_account("a@contoso.com", identity("1", "a@contoso.com"));
    assert!(proxy(accounts(), FakePlatform::trusted(BROKER_CERT)).can_delegate(&request()));

    let disabled = BrokerProxy::new(
        Arc::new(accounts()),
        Arc::new(FakePlatform::trusted(BROKER_CERT)),
        BrokerConfig { enabled: false, ..config() },
    );
    assert!(!disabled.can_delegate(&request()));

    let mut missing_grant = FakePlatform::trusted(BROKER_CERT);
    missing_grant.permissions.retain(|p| *p != PERMISSION_GET_ACCOUNTS);
    assert!(!proxy(accounts(), missing_grant).can_delegate(&request()));

    let mut caller_is_broker = FakePlatform::trusted(BROKER_CERT);
    caller_is_broker.caller = COMPANY_PORTAL_APP_PACKAGE.to_string();
    assert!(!proxy(accounts(), caller_is_broker).can_delegate(&request()));

    assert!(!proxy(accounts(), FakePlatform::trusted(b"impostor")).can_delegate(&request()));

    let add_flow = FakeAccountService { add_account_supported: true, ..FakeAccountService::default() };
    assert!(proxy(add_flow, FakePlatform::trusted(BROKER_CERT)).can_delegate(&request()));
}

#[test]
fn can_delegate_does_not_touch_the_account_service() {
    let failing = FakeAccountService {
        list_error: Some(PlatformError::Io("account store locked".into())),
        list_delay: Some(Duration::from_secs(5)),
        ..FakeAccountService::default()
    };
    let started = Instant::now();
    assert!(proxy(failing, FakePlatform::trusted(BROKER_CERT)).can_delegate(&request()));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn any_user_with_several_accounts_is_unresolved() {
    let accounts = FakeAccountService::default()
        .with_account("a@contoso.com", identity("oid-a", "a@contoso.com"))
        .with_account("b@contoso.com", identity("oid-b", "b@contoso.com"));
    let proxy = proxy(accounts, FakePlatform::trusted(BROKER_CERT));

    let any = request().with_user(UserIdentifier::Any);
    assert_eq!(proxy.resolve_account(&any).unwrap(), None);
}

#[tokio::test]
async fn any_user_with_several_accounts_requires_interaction() {
    let accounts = FakeAccountService::default()
        .with_account("a@contoso.com", identity("oid-a", "a@contoso.com"))
        .with_account("b@contoso.com", identity("oid-b", "b@contoso.com"))
        .answering(token_bundle());
    let proxy = proxy(accounts, FakePlatform::trusted(BROKER_CERT));

    let err = proxy.acquire_token_silent(&request().with_user(UserIdentifier::Any)).await.unwrap_err();
    assert!(matches!(err, AuthError::InteractionRequired { launch: None, .. }), "got {err:?}");
}

#[tokio::test]
async fn account_listing_failure_is_a_broker_error() {
    let accounts = FakeAccountService {
        list_error: Some(PlatformError::Io("account store locked".into())),
        ..FakeAccountService::default()
    };
    let proxy = proxy(accounts, FakePlatform::trusted(BROKER_CERT));

    let err = proxy.acquire_token_silent(&request()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::BrokerAuthenticatorIoException);
}

/// Validates `SilentAcquisitionEngine::acquire_token_silent` behavior for
/// the hung account listing scenario.
///
/// Assertions:
/// - Confirms the configured broker timeout bounds the account lookup.
/// - Confirms the failure is `BROKER_AUTHENTICATOR_NOT_RESPONDING`.
#[tokio::test]
async fn hung_account_listing_is_bounded_by_timeout() {
    let accounts = FakeAccountService {
        list_delay: Some(Duration::from_millis(2500)),
        ..FakeAccountService::default().with_account("a@contoso.com", identity("oid-a", "a@contoso.com"))
    };
    let broker = BrokerProxy::new(
        Arc::new(accounts),
        Arc::new(FakePlatform::trusted(BROKER_CERT)),
        BrokerConfig { timeout_secs: 1, ..config() },
    );
    let engine = SilentAcquisitionEngine::new(
        TokenCache::in_memory(),
        FakeExchanger::new(),
        Arc::new(SystemClock),
        AuthConfig::default(),
    )
    .with_broker(Arc::new(broker));

    let started = Instant::now();
    let err = engine
        .acquire_token_silent(&request().with_broker_allowed(true), "req")
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
    assert_eq!(err.code(), ErrorCode::BrokerAuthenticatorNotResponding);
}

#[tokio::test]
async fn engine_settles_when_broker_has_no_account() {
    let broker = proxy(FakeAccountService::default(), FakePlatform::trusted(BROKER_CERT));
    let engine = SilentAcquisitionEngine::new(
        TokenCache::in_memory(),
        FakeExchanger::new(),
        Arc::new(SystemClock),
        AuthConfig::default(),
    )
    .with_broker(Arc::new(broker));

    let err = engine
        .acquire_token_silent(&request().with_broker_allowed(true), "req")
        .await
        .unwrap_err();
    assert!(err.is_interaction_required());
}

#[test]
fn resolve_account_matches_name_then_identity() {
    let accounts = FakeAccountService::default()
        .with_account("a@contoso.com", identity("oid-a", "a@contoso.com"))
        .with_account("b@contoso.com", identity("oid-b", "b@contoso.com"));
    let proxy = proxy(accounts, FakePlatform::trusted(BROKER_CERT));

    let explicit = request().with_broker_account_name("B@contoso.com");
    assert_eq!(proxy.resolve_account(&explicit).unwrap().as_deref(), Some("b@contoso.com"));

    let by_upn = request().with_user(UserIdentifier::DisplayableId("A@Contoso.com".into()));
    assert_eq!(proxy.resolve_account(&by_upn).unwrap().as_deref(), Some("a@contoso.com"));

    let by_oid = request().with_user(UserIdentifier::UniqueId("oid-b".into()));
    assert_eq!(proxy.resolve_account(&by_oid).unwrap().as_deref(), Some("b@contoso.com"));

    let unknown = request().with_user(UserIdentifier::UniqueId("oid-z".into()));
    assert_eq!(proxy.resolve_account(&unknown).unwrap(), None);

    // two accounts and no hint is ambiguous
    assert_eq!(proxy.resolve_account(&request()).unwrap(), None);
}

#[test]
fn foreground_thread_is_a_developer_error() {
    let mut platform = FakePlatform::trusted(BROKER_CERT);
    platform.foreground = true;
    let proxy = proxy(FakeAccountService::default(), platform);

    let err = proxy.get_auth_token(Some("a@contoso.com"), &request()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::DeveloperCallingOnMainThread);
    assert!(err.is_developer_error());
}

#[test]
fn missing_grant_at_call_time_is_a_developer_error() {
    let mut platform = FakePlatform::trusted(BROKER_CERT);
    platform.permissions.clear();
    let proxy = proxy(FakeAccountService::default(), platform);

    let err = proxy.get_auth_token(Some("a@contoso.com"), &request()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::DeveloperBrokerPermissionsMissing);
}

/// Validates `BrokerProxy::get_auth_token` behavior for the legacy broker
/// prompt scenario.
///
/// Assertions:
/// - Confirms `FORCE_PROMPT` is sent as `Always` when the broker does not
///   advertise `v2`.
/// - Confirms the login hint is the displayable id.
#[test]
fn force_prompt_is_downgraded_for_legacy_broker() {
    let accounts = Arc::new(FakeAccountService {
        protocol_version: None,
        ..FakeAccountService::default()
            .with_account("a@contoso.com", identity("oid-a", "a@contoso.com"))
            .answering(token_bundle())
    });
    let proxy = BrokerProxy::new(accounts.clone(), Arc::new(FakePlatform::trusted(BROKER_CERT)), config());
    let request = request()
        .with_prompt(PromptBehavior::ForcePrompt)
        .with_user(UserIdentifier::DisplayableId("a@contoso.com".into()));

    let outcome = proxy.get_auth_token(Some("a@contoso.com"), &request).unwrap();
    assert!(matches!(outcome, BrokerOutcome::Token(_)));

    let received = accounts.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].1[BROKER_KEY_PROMPT], "Always");
    assert_eq!(received[0].1[BROKER_KEY_LOGIN_HINT], "a@contoso.com");
}

#[tokio::test]
async fn acquire_returns_broker_token() {
    let accounts = FakeAccountService::default()
        .with_account("a@contoso.com", identity("oid-a", "a@contoso.com"))
        .answering(token_bundle());
    let proxy = proxy(accounts, FakePlatform::trusted(BROKER_CERT));

    let result = proxy.acquire_token_silent(&request()).await.unwrap();
    assert_eq!(result.access_token.as_deref(), Some("broker-at"));
    assert!(result.broker_used);
    assert_eq!(result.expires_on.unwrap().timestamp(), 4_102_444_800);
}

#[tokio::test]
async fn provider_error_code_is_mapped() {
    let accounts = FakeAccountService::default()
        .with_account("a@contoso.com", identity("oid-a", "a@contoso.com"))
        .answering(BrokerBundle::from([(BROKER_RESULT_ERROR_CODE.to_string(), "7".to_string())]));
    let proxy = proxy(accounts, FakePlatform::trusted(BROKER_CERT));

    let err = proxy.acquire_token_silent(&request()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::BrokerAuthenticatorBadArguments);
}

#[tokio::test]
async fn no_account_surfaces_launch_descriptor() {
    let accounts = FakeAccountService { add_account_supported: true, ..FakeAccountService::default() };
    let proxy = proxy(accounts, FakePlatform::trusted(BROKER_CERT));

    let err = proxy.acquire_token_silent(&request()).await.unwrap_err();
    let AuthError::InteractionRequired { launch: Some(launch), .. } = err else {
        panic!("expected interaction required with launch descriptor, got {err:?}");
    };
    assert_eq!(launch.target, "broker.AddAccount");
}

/// Validates `BrokerProxy::acquire_token_silent` behavior for the hung
/// account service scenario.
///
/// Assertions:
/// - Confirms the call fails with `BROKER_AUTHENTICATOR_NOT_RESPONDING` once
///   the configured timeout elapses.
#[tokio::test]
async fn hung_account_service_times_out() {
    let accounts = FakeAccountService {
        delay: Some(Duration::from_millis(1500)),
        ..FakeAccountService::default()
            .with_account("a@contoso.com", identity("oid-a", "a@contoso.com"))
            .answering(token_bundle())
    };
    let proxy = BrokerProxy::new(
        Arc::new(accounts),
        Arc::new(FakePlatform::trusted(BROKER_CERT)),
        BrokerConfig { timeout_secs: 1, ..config() },
    );

    let err = proxy.acquire_token_silent(&request()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::BrokerAuthenticatorNotResponding);
}
