//! Broker parameter and result bundles

use authlink_domain::constants::{
    BROKER_ERROR_CODE_BAD_ARGUMENTS, BROKER_ERROR_CODE_BAD_AUTHENTICATION,
    BROKER_ERROR_CODE_UNSUPPORTED_OPERATION, BROKER_KEY_ACCOUNT_NAME, BROKER_KEY_AUTHORITY,
    BROKER_KEY_CAPABILITIES, BROKER_KEY_CLAIMS, BROKER_KEY_CLIENT_ID, BROKER_KEY_CORRELATION_ID,
    BROKER_KEY_EXTRA_QUERY_PARAM, BROKER_KEY_LOGIN_HINT, BROKER_KEY_PROMPT,
    BROKER_KEY_PROTOCOL_VERSION, BROKER_KEY_REDIRECT, BROKER_KEY_RESOURCE,
    BROKER_PROTOCOL_VERSION, BROKER_RESULT_AUTHTOKEN, BROKER_RESULT_ERROR_CODE,
    BROKER_RESULT_ERROR_MESSAGE, BROKER_RESULT_EXPIRES, BROKER_RESULT_ID_TOKEN,
    BROKER_RESULT_INITIAL_REQUEST, BROKER_RESULT_INTENT, BROKER_RESULT_USERINFO_DISPLAYABLE,
    BROKER_RESULT_USERINFO_FAMILY_NAME, BROKER_RESULT_USERINFO_GIVEN_NAME,
    BROKER_RESULT_USERINFO_IDENTITY_PROVIDER, BROKER_RESULT_USERINFO_TENANT_ID,
    BROKER_RESULT_USERINFO_USERID, DEFAULT_TOKEN_TYPE,
};
use authlink_domain::{
    AuthError, AuthenticationRequest, AuthenticationResult, BrokerBundle, BrokerErrorKind,
    LaunchDescriptor, PromptBehavior, Result, ResultStatus, UserInfo,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::warn;
use uuid::Uuid;

/// What the broker answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerOutcome {
    Token(AuthenticationResult),
    /// The broker holds no token for the user yet; the caller must launch an
    /// interactive flow
    InitialRequest(LaunchDescriptor),
}

/// Prompt value sent to a broker advertising `protocol_version`
///
/// `FORCE_PROMPT` is only understood by `v2` brokers; older ones get
/// `Always`.
pub fn negotiate_prompt(prompt: PromptBehavior, protocol_version: Option<&str>) -> PromptBehavior {
    match prompt {
        PromptBehavior::ForcePrompt if protocol_version != Some(BROKER_PROTOCOL_VERSION) => {
            PromptBehavior::Always
        }
        other => other,
    }
}

/// Marshal a request into the account service parameter bundle
pub fn request_bundle(
    request: &AuthenticationRequest,
    account_name: Option<&str>,
    protocol_version: Option<&str>,
) -> BrokerBundle {
    let mut bundle = BrokerBundle::new();
    bundle.insert(BROKER_KEY_AUTHORITY.into(), request.authority.clone());
    bundle.insert(BROKER_KEY_RESOURCE.into(), request.resource.clone());
    bundle.insert(BROKER_KEY_CLIENT_ID.into(), request.client_id.clone());
    bundle.insert(BROKER_KEY_PROTOCOL_VERSION.into(), BROKER_PROTOCOL_VERSION.into());
    bundle.insert(BROKER_KEY_CORRELATION_ID.into(), request.correlation_id.to_string());
    bundle.insert(
        BROKER_KEY_PROMPT.into(),
        negotiate_prompt(request.prompt, protocol_version).protocol_name().into(),
    );

    if let Some(redirect) = &request.redirect_uri {
        bundle.insert(BROKER_KEY_REDIRECT.into(), redirect.clone());
    }
    if let Some(extra) = &request.extra_query_parameters {
        bundle.insert(BROKER_KEY_EXTRA_QUERY_PARAM.into(), extra.clone());
    }
    if let Some(hint) = request.user.login_hint() {
        bundle.insert(BROKER_KEY_LOGIN_HINT.into(), hint.into());
    }
    if let Some(name) = account_name {
        bundle.insert(BROKER_KEY_ACCOUNT_NAME.into(), name.into());
    }
    if let Some(claims) = &request.claims {
        bundle.insert(BROKER_KEY_CLAIMS.into(), claims.clone());
    }
    if !request.client_capabilities.is_empty() {
        bundle.insert(BROKER_KEY_CAPABILITIES.into(), request.client_capabilities.join(","));
    }
    bundle
}

/// Map a provider error code to a broker error kind
pub fn error_kind_for_code(code: i32) -> BrokerErrorKind {
    match code {
        BROKER_ERROR_CODE_BAD_ARGUMENTS => BrokerErrorKind::BadArguments,
        BROKER_ERROR_CODE_BAD_AUTHENTICATION => BrokerErrorKind::BadAuthentication,
        BROKER_ERROR_CODE_UNSUPPORTED_OPERATION => BrokerErrorKind::UnsupportedOperation,
        _ => BrokerErrorKind::GetAuthToken,
    }
}

/// Interpret the bundle returned by the account service
///
/// A result without an expiry is given `now + default_expiry_secs`.
///
/// # Errors
/// A broker error for a provider error code or a bundle without a token.
pub fn parse_result(
    bundle: &BrokerBundle,
    correlation_id: Uuid,
    now: DateTime<Utc>,
    default_expiry_secs: u64,
) -> Result<BrokerOutcome> {
    if let Some(raw_code) = bundle.get(BROKER_RESULT_ERROR_CODE) {
        let message = bundle
            .get(BROKER_RESULT_ERROR_MESSAGE)
            .cloned()
            .unwrap_or_else(|| format!("Account service returned error code {raw_code}"));
        let kind = raw_code
            .trim()
            .parse::<i32>()
            .map_or(BrokerErrorKind::GetAuthToken, error_kind_for_code);
        return Err(AuthError::broker(kind, message));
    }

    if bundle
        .get(BROKER_RESULT_INITIAL_REQUEST)
        .is_some_and(|flag| flag.eq_ignore_ascii_case("true"))
    {
        let target = bundle.get(BROKER_RESULT_INTENT).cloned().unwrap_or_default();
        let parameters = bundle
            .iter()
            .filter(|(key, _)| key.as_str() != BROKER_RESULT_INITIAL_REQUEST)
            .filter(|(key, _)| key.as_str() != BROKER_RESULT_INTENT)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        return Ok(BrokerOutcome::InitialRequest(LaunchDescriptor { target, parameters }));
    }

    let access_token = bundle
        .get(BROKER_RESULT_AUTHTOKEN)
        .filter(|token| !token.is_empty())
        .cloned()
        .ok_or_else(|| {
            AuthError::broker(BrokerErrorKind::GetAuthToken, "Broker result carries no token")
        })?;

    let expires_on = match bundle.get(BROKER_RESULT_EXPIRES) {
        Some(raw) => parse_expiry(raw).unwrap_or_else(|| {
            warn!(value = %raw, "Unparseable broker expiry, using default lifetime");
            default_expiry(now, default_expiry_secs)
        }),
        None => default_expiry(now, default_expiry_secs),
    };

    let user_info = user_info_from(bundle);
    let tenant_id = bundle.get(BROKER_RESULT_USERINFO_TENANT_ID).cloned();

    Ok(BrokerOutcome::Token(AuthenticationResult {
        status: ResultStatus::Succeeded,
        access_token: Some(access_token),
        refresh_token: None,
        id_token: bundle.get(BROKER_RESULT_ID_TOKEN).cloned(),
        token_type: Some(DEFAULT_TOKEN_TYPE.to_string()),
        expires_on: Some(expires_on),
        extended_expires_on: None,
        tenant_id,
        user_info,
        correlation_id: Some(correlation_id),
        broker_used: true,
        is_extended_lifetime_token: false,
        is_multi_resource_refresh_token: false,
        family_client_id: None,
        server_diagnostics: None,
        error_code: None,
        error_description: None,
    }))
}

fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    let millis = raw.trim().parse::<i64>().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}

fn default_expiry(now: DateTime<Utc>, default_expiry_secs: u64) -> DateTime<Utc> {
    i64::try_from(default_expiry_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn user_info_from(bundle: &BrokerBundle) -> Option<UserInfo> {
    let user = UserInfo {
        unique_id: bundle.get(BROKER_RESULT_USERINFO_USERID).cloned(),
        displayable_id: bundle.get(BROKER_RESULT_USERINFO_DISPLAYABLE).cloned(),
        given_name: bundle.get(BROKER_RESULT_USERINFO_GIVEN_NAME).cloned(),
        family_name: bundle.get(BROKER_RESULT_USERINFO_FAMILY_NAME).cloned(),
        identity_provider: bundle.get(BROKER_RESULT_USERINFO_IDENTITY_PROVIDER).cloned(),
    };
    (user != UserInfo::default()).then_some(user)
}

#[cfg(test)]
mod tests {
    use authlink_domain::{ErrorCode, UserIdentifier};

    use super::*;

    fn request() -> AuthenticationRequest {
        AuthenticationRequest::new("https://login.example.com/common", "https://graph", "client")
            .with_user(UserIdentifier::DisplayableId("user@contoso.com".into()))
            .with_redirect_uri("msauth://app")
            .with_prompt(PromptBehavior::ForcePrompt)
    }

    /// Validates `request_bundle` behavior for the legacy broker scenario.
    ///
    /// Assertions:
    /// - Confirms `FORCE_PROMPT` is downgraded to `Always` without `v2`.
    /// - Confirms the login hint comes from the displayable id.
    #[test]
    fn force_prompt_downgrades_for_legacy_broker() {
        let bundle = request_bundle(&request(), None, None);
        assert_eq!(bundle[BROKER_KEY_PROMPT], "Always");
        assert_eq!(bundle[BROKER_KEY_LOGIN_HINT], "user@contoso.com");
        assert_eq!(bundle[BROKER_KEY_REDIRECT], "msauth://app");

        let bundle = request_bundle(&request(), Some("user@contoso.com"), Some("v2"));
        assert_eq!(bundle[BROKER_KEY_PROMPT], "FORCE_PROMPT");
        assert_eq!(bundle[BROKER_KEY_ACCOUNT_NAME], "user@contoso.com");
    }

    #[test]
    fn provider_error_codes_map_to_kinds() {
        let now = Utc::now();
        for (code, expected) in [
            ("7", ErrorCode::BrokerAuthenticatorBadArguments),
            ("9", ErrorCode::BrokerAuthenticatorBadAuthentication),
            ("6", ErrorCode::BrokerAuthenticatorUnsupportedOperation),
            ("3", ErrorCode::BrokerAuthenticatorErrorGetauthtoken),
            ("garbage", ErrorCode::BrokerAuthenticatorErrorGetauthtoken),
        ] {
            let bundle = BrokerBundle::from([(BROKER_RESULT_ERROR_CODE.to_string(), code.to_string())]);
            let err = parse_result(&bundle, Uuid::nil(), now, 3600).unwrap_err();
            assert_eq!(err.code(), expected, "code {code}");
        }
    }

    #[test]
    fn missing_expiry_uses_default_lifetime() {
        let now = Utc::now();
        let bundle = BrokerBundle::from([
            (BROKER_RESULT_AUTHTOKEN.to_string(), "broker-at".to_string()),
            (BROKER_RESULT_USERINFO_USERID.to_string(), "oid".to_string()),
        ]);

        let BrokerOutcome::Token(result) = parse_result(&bundle, Uuid::nil(), now, 3600).unwrap() else {
            panic!("expected token");
        };
        assert_eq!(result.expires_on, Some(now + Duration::seconds(3600)));
        assert_eq!(result.user_info.unwrap().unique_id.as_deref(), Some("oid"));
        assert!(result.broker_used);
    }

    #[test]
    fn oversized_default_lifetime_saturates() {
        let now = Utc::now();
        let bundle = BrokerBundle::from([(BROKER_RESULT_AUTHTOKEN.to_string(), "broker-at".to_string())]);

        let BrokerOutcome::Token(result) = parse_result(&bundle, Uuid::nil(), now, u64::MAX).unwrap() else {
            panic!("expected token");
        };
        assert_eq!(result.expires_on, Some(DateTime::<Utc>::MAX_UTC));
    }

    #[test]
    fn expiry_is_read_as_epoch_millis() {
        let bundle = BrokerBundle::from([
            (BROKER_RESULT_AUTHTOKEN.to_string(), "broker-at".to_string()),
            (BROKER_RESULT_EXPIRES.to_string(), "1700000000000".to_string()),
        ]);
        let BrokerOutcome::Token(result) =
            parse_result(&bundle, Uuid::nil(), Utc::now(), 3600).unwrap()
        else {
            panic!("expected token");
        };
        assert_eq!(result.expires_on.unwrap().timestamp(), 1_700_000_000);
        assert!(result.user_info.is_none());
    }

    #[test]
    fn initial_request_is_a_launch_signal() {
        let bundle = BrokerBundle::from([
            (BROKER_RESULT_INITIAL_REQUEST.to_string(), "true".to_string()),
            (BROKER_RESULT_INTENT.to_string(), "broker.AddAccount".to_string()),
            (BROKER_KEY_AUTHORITY.to_string(), "https://login.example.com/common".to_string()),
        ]);
        let outcome = parse_result(&bundle, Uuid::nil(), Utc::now(), 3600).unwrap();
        let BrokerOutcome::InitialRequest(launch) = outcome else {
            panic!("expected initial request");
        };
        assert_eq!(launch.target, "broker.AddAccount");
        assert_eq!(launch.parameters.len(), 1);
    }

    #[test]
    fn result_without_token_is_an_error() {
        let err = parse_result(&BrokerBundle::new(), Uuid::nil(), Utc::now(), 3600).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BrokerAuthenticatorErrorGetauthtoken);
    }
}
