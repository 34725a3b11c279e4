//! Error types used throughout the library
//!
//! Every failure that reaches a caller is an [`AuthError`] carrying a stable
//! [`ErrorCode`]. Codes are part of the public contract and never change
//! spelling; messages are free-form detail.

use std::fmt;
use std::time::Duration;

use authlink_common::{CommonError, ErrorClassification, ErrorSeverity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{LaunchDescriptor, ServerDiagnostics};

/// Stable, machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ArgumentException,
    DeviceCertificateRequestInvalid,
    DeviceCertificateApiException,
    AuthFailedInvalidGrant,
    AuthRefreshFailedPromptNotAllowed,
    AuthFailedCancelled,
    ServerError,
    NetworkError,
    BrokerAuthenticatorBadArguments,
    BrokerAuthenticatorBadAuthentication,
    BrokerAuthenticatorUnsupportedOperation,
    BrokerAuthenticatorErrorGetauthtoken,
    BrokerAuthenticatorNotResponding,
    BrokerAuthenticatorIoException,
    BrokerVerificationFailed,
    DeveloperCallingOnMainThread,
    DeveloperBrokerPermissionsMissing,
    TokenCacheError,
    ConfigurationError,
    InternalError,
}

impl ErrorCode {
    /// Wire spelling of the code
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ArgumentException => "ARGUMENT_EXCEPTION",
            Self::DeviceCertificateRequestInvalid => "DEVICE_CERTIFICATE_REQUEST_INVALID",
            Self::DeviceCertificateApiException => "DEVICE_CERTIFICATE_API_EXCEPTION",
            Self::AuthFailedInvalidGrant => "AUTH_FAILED_INVALID_GRANT",
            Self::AuthRefreshFailedPromptNotAllowed => "AUTH_REFRESH_FAILED_PROMPT_NOT_ALLOWED",
            Self::AuthFailedCancelled => "AUTH_FAILED_CANCELLED",
            Self::ServerError => "SERVER_ERROR",
            Self::NetworkError => "NETWORK_ERROR",
            Self::BrokerAuthenticatorBadArguments => "BROKER_AUTHENTICATOR_BAD_ARGUMENTS",
            Self::BrokerAuthenticatorBadAuthentication => "BROKER_AUTHENTICATOR_BAD_AUTHENTICATION",
            Self::BrokerAuthenticatorUnsupportedOperation => {
                "BROKER_AUTHENTICATOR_UNSUPPORTED_OPERATION"
            }
            Self::BrokerAuthenticatorErrorGetauthtoken => "BROKER_AUTHENTICATOR_ERROR_GETAUTHTOKEN",
            Self::BrokerAuthenticatorNotResponding => "BROKER_AUTHENTICATOR_NOT_RESPONDING",
            Self::BrokerAuthenticatorIoException => "BROKER_AUTHENTICATOR_IO_EXCEPTION",
            Self::BrokerVerificationFailed => "BROKER_VERIFICATION_FAILED",
            Self::DeveloperCallingOnMainThread => "DEVELOPER_CALLING_ON_MAIN_THREAD",
            Self::DeveloperBrokerPermissionsMissing => "DEVELOPER_BROKER_PERMISSIONS_MISSING",
            Self::TokenCacheError => "TOKEN_CACHE_ERROR",
            Self::ConfigurationError => "CONFIGURATION_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure modes reported by the platform account service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerErrorKind {
    BadArguments,
    BadAuthentication,
    UnsupportedOperation,
    GetAuthToken,
    NotResponding,
    IoException,
    VerificationFailed,
}

impl BrokerErrorKind {
    pub const fn code(self) -> ErrorCode {
        match self {
            Self::BadArguments => ErrorCode::BrokerAuthenticatorBadArguments,
            Self::BadAuthentication => ErrorCode::BrokerAuthenticatorBadAuthentication,
            Self::UnsupportedOperation => ErrorCode::BrokerAuthenticatorUnsupportedOperation,
            Self::GetAuthToken => ErrorCode::BrokerAuthenticatorErrorGetauthtoken,
            Self::NotResponding => ErrorCode::BrokerAuthenticatorNotResponding,
            Self::IoException => ErrorCode::BrokerAuthenticatorIoException,
            Self::VerificationFailed => ErrorCode::BrokerVerificationFailed,
        }
    }
}

/// Misuse of the library that should be caught during development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeveloperErrorKind {
    CallingOnMainThread,
    BrokerPermissionsMissing,
}

impl DeveloperErrorKind {
    pub const fn code(self) -> ErrorCode {
        match self {
            Self::CallingOnMainThread => ErrorCode::DeveloperCallingOnMainThread,
            Self::BrokerPermissionsMissing => ErrorCode::DeveloperBrokerPermissionsMissing,
        }
    }
}

/// Main error type for Authlink
#[derive(Error, Debug, Clone)]
pub enum AuthError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { field: Option<String>, message: String },

    #[error("Device certificate request is invalid: {0}")]
    ChallengeInvalid(String),

    #[error("Device certificate provider failed: {0}")]
    DeviceCertificate(String),

    #[error("Refresh token rejected: {message}")]
    InvalidGrant { message: String, oauth_error: Option<String> },

    #[error("Interaction required: {message}")]
    InteractionRequired { message: String, launch: Option<LaunchDescriptor> },

    #[error("Server error (status {status:?}): {message}")]
    Server { status: Option<u16>, message: String, diagnostics: Option<ServerDiagnostics> },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Broker error ({}): {message}", kind.code())]
    Broker { kind: BrokerErrorKind, message: String },

    #[error("Developer error ({}): {message}", kind.code())]
    Developer { kind: DeveloperErrorKind, message: String },

    #[error("Token cache error: {0}")]
    TokenCache(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Authlink operations
pub type Result<T> = std::result::Result<T, AuthError>;

impl AuthError {
    /// Argument error naming the offending field
    pub fn argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument { field: Some(field.into()), message: message.into() }
    }

    /// Missing mandatory field; the message names the field
    pub fn missing_field(field: &str) -> Self {
        Self::InvalidArgument {
            field: Some(field.to_string()),
            message: format!("{field} is missing or empty"),
        }
    }

    pub fn invalid_grant(message: impl Into<String>, oauth_error: Option<String>) -> Self {
        Self::InvalidGrant { message: message.into(), oauth_error }
    }

    pub fn interaction_required(message: impl Into<String>) -> Self {
        Self::InteractionRequired { message: message.into(), launch: None }
    }

    pub fn broker(kind: BrokerErrorKind, message: impl Into<String>) -> Self {
        Self::Broker { kind, message: message.into() }
    }

    pub fn developer(kind: DeveloperErrorKind, message: impl Into<String>) -> Self {
        Self::Developer { kind, message: message.into() }
    }

    pub fn server(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Server { status, message: message.into(), diagnostics: None }
    }

    /// Stable error code for this failure
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument { .. } => ErrorCode::ArgumentException,
            Self::ChallengeInvalid(_) => ErrorCode::DeviceCertificateRequestInvalid,
            Self::DeviceCertificate(_) => ErrorCode::DeviceCertificateApiException,
            Self::InvalidGrant { .. } => ErrorCode::AuthFailedInvalidGrant,
            Self::InteractionRequired { .. } => ErrorCode::AuthRefreshFailedPromptNotAllowed,
            Self::Server { .. } => ErrorCode::ServerError,
            Self::Network(_) => ErrorCode::NetworkError,
            Self::Broker { kind, .. } => kind.code(),
            Self::Developer { kind, .. } => kind.code(),
            Self::TokenCache(_) => ErrorCode::TokenCacheError,
            Self::Configuration(_) => ErrorCode::ConfigurationError,
            Self::Cancelled => ErrorCode::AuthFailedCancelled,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// The refresh token was rejected; evict it and try the next tier
    pub fn is_invalid_grant(&self) -> bool {
        matches!(self, Self::InvalidGrant { .. })
    }

    /// Server or network failure that a later attempt may not hit
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Server { status, .. } => match status {
                None => true,
                Some(code) => *code >= 500 || *code == 429,
            },
            _ => false,
        }
    }

    pub fn is_interaction_required(&self) -> bool {
        matches!(self, Self::InteractionRequired { .. })
    }

    pub fn is_developer_error(&self) -> bool {
        matches!(self, Self::Developer { .. })
    }

    /// Server diagnostics attached to a token endpoint failure
    pub fn server_diagnostics(&self) -> Option<&ServerDiagnostics> {
        match self {
            Self::Server { diagnostics, .. } => diagnostics.as_ref(),
            _ => None,
        }
    }
}

impl ErrorClassification for AuthError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Developer { .. } | Self::Internal(_) => ErrorSeverity::Critical,
            Self::InteractionRequired { .. } | Self::Cancelled => ErrorSeverity::Info,
            Self::Network(_) | Self::Server { .. } if self.is_transient() => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Developer { .. } | Self::Internal(_))
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl From<CommonError> for AuthError {
    fn from(err: CommonError) -> Self {
        match err {
            CommonError::Config { .. } => Self::Configuration(err.to_string()),
            CommonError::Serialization { .. } | CommonError::Persistence { .. } => {
                Self::TokenCache(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_have_stable_spelling() {
        assert_eq!(
            AuthError::ChallengeInvalid("bad pair".into()).code().as_str(),
            "DEVICE_CERTIFICATE_REQUEST_INVALID"
        );
        assert_eq!(
            AuthError::interaction_required("no tiers left").code().to_string(),
            "AUTH_REFRESH_FAILED_PROMPT_NOT_ALLOWED"
        );
        assert_eq!(
            AuthError::broker(BrokerErrorKind::NotResponding, "timeout").code().as_str(),
            "BROKER_AUTHENTICATOR_NOT_RESPONDING"
        );
    }

    #[test]
    fn error_code_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::DeveloperCallingOnMainThread).unwrap();
        assert_eq!(json, "\"DEVELOPER_CALLING_ON_MAIN_THREAD\"");
    }

    /// Validates `AuthError::is_transient` behavior for the status code
    /// classification scenario.
    ///
    /// Assertions:
    /// - Ensures 5xx, 429 and network failures are transient.
    /// - Ensures 400 and invalid grant are not transient.
    #[test]
    fn transient_classification_follows_status() {
        assert!(AuthError::server(Some(503), "unavailable").is_transient());
        assert!(AuthError::server(Some(429), "throttled").is_transient());
        assert!(AuthError::Network("reset".into()).is_transient());
        assert!(!AuthError::server(Some(400), "invalid_request").is_transient());
        assert!(!AuthError::invalid_grant("revoked", None).is_transient());
    }

    #[test]
    fn missing_field_message_names_field() {
        let err = AuthError::missing_field("SubmitUrl");
        assert!(err.to_string().contains("SubmitUrl"));
        assert_eq!(err.code(), ErrorCode::ArgumentException);
    }

    #[test]
    fn developer_errors_are_critical() {
        let err = AuthError::developer(DeveloperErrorKind::CallingOnMainThread, "ui thread");
        assert!(err.is_developer_error());
        assert!(err.is_critical());
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(AuthError::interaction_required("x").severity(), ErrorSeverity::Info);
    }

    #[test]
    fn common_error_conversion() {
        let err: AuthError = CommonError::persistence("keychain locked").into();
        assert_eq!(err.code(), ErrorCode::TokenCacheError);

        let err: AuthError = CommonError::config_field("broker.timeout_secs", "zero").into();
        assert_eq!(err.code(), ErrorCode::ConfigurationError);

        let err: AuthError = CommonError::serialization_format("json", "eof").into();
        assert_eq!(err.code(), ErrorCode::TokenCacheError);
    }
}
