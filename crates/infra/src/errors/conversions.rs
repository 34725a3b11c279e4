//! Conversions from external infrastructure errors into `AuthError`.

use authlink_common::security::KeychainError;
use authlink_common::CommonError;
use authlink_domain::AuthError;
use reqwest::Error as HttpError;
use thiserror::Error;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct InfraError(#[from] pub AuthError);

impl From<InfraError> for AuthError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

trait IntoAuthError {
    fn into_auth(self) -> AuthError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → AuthError */
/* -------------------------------------------------------------------------- */

impl IntoAuthError for HttpError {
    fn into_auth(self) -> AuthError {
        if self.is_timeout() {
            return AuthError::Network(format!("http request timed out: {self}"));
        }
        if self.is_connect() || self.is_request() {
            return AuthError::Network(format!("http connection failed: {self}"));
        }
        if self.is_decode() || self.is_body() {
            return AuthError::server(
                self.status().map(|s| s.as_u16()),
                format!("malformed token endpoint response: {self}"),
            );
        }
        if self.is_builder() {
            return AuthError::Internal(format!("invalid http request: {self}"));
        }
        match self.status() {
            Some(status) => AuthError::server(Some(status.as_u16()), self.to_string()),
            None => AuthError::Network(format!("http error: {self}")),
        }
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_auth())
    }
}

/* -------------------------------------------------------------------------- */
/* KeychainError → AuthError */
/* -------------------------------------------------------------------------- */

impl IntoAuthError for KeychainError {
    fn into_auth(self) -> AuthError {
        let message = match self {
            KeychainError::NotFound => "keychain entry not found".to_string(),
            KeychainError::AccessFailed(message) => message,
        };
        CommonError::persistence_op("keychain", message).into()
    }
}

impl From<KeychainError> for InfraError {
    fn from(value: KeychainError) -> Self {
        InfraError(value.into_auth())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → AuthError */
/* -------------------------------------------------------------------------- */

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(CommonError::serialization_format("json", value.to_string()).into())
    }
}

/* -------------------------------------------------------------------------- */
/* jsonwebtoken::errors::Error → AuthError */
/* -------------------------------------------------------------------------- */

impl From<jsonwebtoken::errors::Error> for InfraError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        InfraError(AuthError::DeviceCertificate(format!("failed to sign device assertion: {value}")))
    }
}
