//! Integration tests for the public domain model
//!
//! Covers the serialized shapes that cross crate boundaries: persisted cache
//! records, configuration documents and the status view of failures.

use authlink_domain::{
    AuthConfig, AuthError, AuthenticationResult, CachedToken, ErrorCode, ResultStatus,
    TokenGrant, UserInfo,
};
use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

fn grant() -> TokenGrant {
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).single().unwrap();
    TokenGrant {
        access_token: "access".into(),
        refresh_token: Some("refresh".into()),
        id_token: None,
        token_type: "Bearer".into(),
        expires_on: now + Duration::hours(1),
        extended_expires_on: Some(now + Duration::hours(3)),
        is_multi_resource_refresh_token: true,
        family_client_id: Some("1".into()),
        tenant_id: Some("tenant".into()),
        user_info: Some(UserInfo::new(Some("oid".into()), Some("user@contoso.com".into()))),
        server_diagnostics: None,
    }
}

/// Validates `CachedToken::from_grant` behavior for the persisted record
/// scenario.
///
/// Assertions:
/// - Confirms the JSON form deserializes back to an equal record.
/// - Confirms grant flags are carried onto the record.
#[test]
fn cached_token_survives_json_persistence() {
    let issued = Utc::now();
    let token = CachedToken::from_grant(
        "https://login.example.com/common",
        "https://graph.example.com",
        "client",
        &grant(),
        issued,
    );
    assert!(token.is_multi_resource_refresh_token);
    assert_eq!(token.family_client_id.as_deref(), Some("1"));

    let json = serde_json::to_string(&token).unwrap();
    let restored: CachedToken = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, token);
}

#[test]
fn result_from_grant_is_succeeded() {
    let id = Uuid::new_v4();
    let result = AuthenticationResult::from_grant(&grant(), id).with_broker_used();
    assert_eq!(result.status, ResultStatus::Succeeded);
    assert!(result.broker_used);
    assert!(!result.is_extended_lifetime_token);
    assert_eq!(result.access_token.as_deref(), Some("access"));
}

#[test]
fn toml_config_document_parses() {
    let config: AuthConfig = toml::from_str(
        r#"
        expiry_buffer_secs = 120
        extended_lifetime_enabled = true

        [broker]
        enabled = true
        timeout_secs = 5
        "#,
    )
    .unwrap();
    assert_eq!(config.expiry_buffer_secs, 120);
    assert!(config.extended_lifetime_enabled);
    assert_eq!(config.broker.timeout_secs, 5);
    assert_eq!(config.broker.default_expiry_secs, 3600);
    config.validate().unwrap();
}

#[test]
fn error_status_view_uses_stable_code() {
    let err = AuthError::missing_field("Nonce");
    let result = AuthenticationResult::from_error(&err, Uuid::new_v4());
    assert_eq!(result.error_code, Some(ErrorCode::ArgumentException));
    assert!(result.error_description.unwrap().contains("Nonce"));
}
