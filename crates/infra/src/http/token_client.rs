//! Token endpoint client
//!
//! Redeems refresh tokens against `<authority>/oauth2/token`. Every request
//! announces PKeyAuth support; a `401` carrying a PKeyAuth challenge is
//! answered once through the [`ChallengeHandler`] and the request replayed
//! with the resulting `Authorization` header. A `5xx`, a timeout or a refused
//! connection is retried once after [`RETRY_DELAY`].

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use authlink_common::time::{Clock, SystemClock};
use authlink_core::acquisition::{RefreshRequest, RefreshTokenExchanger};
use authlink_core::challenge::{is_challenge_header, ChallengeHandler};
use authlink_domain::constants::{
    CLIENT_TELEMETRY_HEADER, DEFAULT_TOKEN_TYPE, PKEYAUTH_HEADER, PKEYAUTH_HEADER_VERSION,
    WWW_AUTHENTICATE_HEADER,
};
use authlink_domain::{AuthError, Result, ServerDiagnostics, TokenGrant, UserInfo};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::InfraError;

/// Per-request timeout of the default client
pub const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);
/// Pause before the single retry of a failed token request
pub const RETRY_DELAY: StdDuration = StdDuration::from_secs(1);

const TOKEN_PATH: &str = "oauth2/token";
const CLIENT_REQUEST_ID_HEADER: &str = "client-request-id";
const RETURN_CLIENT_REQUEST_ID_HEADER: &str = "return-client-request-id";
const OAUTH_INVALID_GRANT: &str = "invalid_grant";
const OAUTH_INTERACTION_REQUIRED: &str = "interaction_required";

/// Successful token endpoint body
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    resource: Option<String>,
    #[serde(default)]
    expires_in: Option<Value>,
    #[serde(default)]
    ext_expires_in: Option<Value>,
    #[serde(default)]
    foci: Option<String>,
}

/// OAuth2 error body
#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Claims read from an unverified id token
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IdTokenClaims {
    oid: Option<String>,
    sub: Option<String>,
    upn: Option<String>,
    email: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    idp: Option<String>,
    iss: Option<String>,
    tid: Option<String>,
}

/// [`RefreshTokenExchanger`] over HTTPS
pub struct HttpTokenExchanger {
    client: Client,
    challenge_handler: ChallengeHandler,
    clock: Arc<dyn Clock>,
    retry_delay: StdDuration,
}

impl HttpTokenExchanger {
    /// Exchanger with its own client using [`REQUEST_TIMEOUT`]
    ///
    /// # Errors
    /// Returns `AuthError::Internal` when the TLS backend cannot be set up.
    pub fn new(challenge_handler: ChallengeHandler) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| AuthError::from(InfraError::from(err)))?;
        Ok(Self::with_client(client, challenge_handler))
    }

    /// Exchanger over a caller-configured client (proxies, timeouts, TLS roots)
    pub fn with_client(client: Client, challenge_handler: ChallengeHandler) -> Self {
        Self { client, challenge_handler, clock: Arc::new(SystemClock), retry_delay: RETRY_DELAY }
    }

    #[must_use]
    pub fn with_retry_delay(mut self, delay: StdDuration) -> Self {
        self.retry_delay = delay;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn token_endpoint(authority: &str) -> String {
        format!("{}/{TOKEN_PATH}", authority.trim().trim_end_matches('/'))
    }

    fn form(request: &RefreshRequest) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", request.refresh_token.clone()),
            ("client_id", request.client_id.clone()),
        ];
        if !request.resource.is_empty() {
            form.push(("resource", request.resource.clone()));
        }
        if let Some(claims) = request.claims.as_ref().filter(|c| !c.is_empty()) {
            form.push(("claims", claims.clone()));
        }
        form
    }

    async fn send(
        &self,
        endpoint: &str,
        request: &RefreshRequest,
        authorization: Option<&str>,
    ) -> std::result::Result<Response, reqwest::Error> {
        let mut builder = self
            .client
            .post(endpoint)
            .header(PKEYAUTH_HEADER, PKEYAUTH_HEADER_VERSION)
            .header(CLIENT_REQUEST_ID_HEADER, request.correlation_id.to_string())
            .header(RETURN_CLIENT_REQUEST_ID_HEADER, "true")
            .form(&Self::form(request));
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.send().await
    }

    /// Send the form, retrying once on a server error or an unreachable host
    ///
    /// The second response is returned as-is so callers still see its status
    /// and body.
    async fn post(
        &self,
        endpoint: &str,
        request: &RefreshRequest,
        authorization: Option<&str>,
    ) -> Result<Response> {
        let correlation_id = request.correlation_id;
        match self.send(endpoint, request, authorization).await {
            Ok(response) if !response.status().is_server_error() => return Ok(response),
            Err(err) if !is_retryable(&err) => return Err(InfraError::from(err).into()),
            Ok(response) => warn!(
                correlation_id = %correlation_id,
                status = response.status().as_u16(),
                "Token endpoint returned a server error, retrying once"
            ),
            Err(err) => warn!(
                correlation_id = %correlation_id,
                error = %err,
                "Token endpoint unreachable, retrying once"
            ),
        }

        if !self.retry_delay.is_zero() {
            tokio::time::sleep(self.retry_delay).await;
        }
        self.send(endpoint, request, authorization)
            .await
            .map_err(|err| InfraError::from(err).into())
    }

    /// `WWW-Authenticate` value of a PKeyAuth `401`
    fn challenge_header(response: &Response) -> Option<String> {
        if response.status() != StatusCode::UNAUTHORIZED {
            return None;
        }
        response
            .headers()
            .get(WWW_AUTHENTICATE_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| is_challenge_header(v))
            .map(str::to_string)
    }

    async fn into_grant(&self, response: Response, correlation_id: &str) -> Result<TokenGrant> {
        let status = response.status();
        let diagnostics = server_diagnostics(response.headers());
        let body = response.text().await.map_err(|err| AuthError::from(InfraError::from(err)))?;

        if !status.is_success() {
            return Err(error_for_status(status, &body, diagnostics, correlation_id));
        }

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            AuthError::server(Some(status.as_u16()), format!("malformed token response: {e}"))
        })?;
        grant_from_response(parsed, diagnostics, self.clock.utc_now())
    }
}

#[async_trait]
impl RefreshTokenExchanger for HttpTokenExchanger {
    async fn exchange(&self, request: &RefreshRequest) -> Result<TokenGrant> {
        let endpoint = Self::token_endpoint(&request.authority);
        let correlation_id = request.correlation_id.to_string();
        debug!(correlation_id = %correlation_id, tier = %request.tier, "Redeeming refresh token");

        let response = self.post(&endpoint, request, None).await?;

        let response = match Self::challenge_header(&response) {
            Some(header) => {
                info!(correlation_id = %correlation_id, "Token endpoint issued a device challenge");
                let answer = self.challenge_handler.respond_to_header(&header, &endpoint)?;
                self.post(&endpoint, request, Some(&answer.authorization_header)).await?
            }
            None => response,
        };

        self.into_grant(response, &correlation_id).await
    }
}

fn is_retryable(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

fn server_diagnostics(headers: &HeaderMap) -> Option<ServerDiagnostics> {
    let raw = headers.get(CLIENT_TELEMETRY_HEADER)?.to_str().ok()?;
    let parsed = ServerDiagnostics::parse(raw);
    if parsed.is_none() {
        warn!(header = raw, "Ignoring unrecognized client telemetry header");
    }
    parsed
}

fn error_for_status(
    status: StatusCode,
    body: &str,
    diagnostics: Option<ServerDiagnostics>,
    correlation_id: &str,
) -> AuthError {
    let error: ErrorResponse = serde_json::from_str(body).unwrap_or_default();
    let description = error
        .error_description
        .clone()
        .unwrap_or_else(|| format!("token endpoint returned {status}"));

    match error.error.as_deref() {
        Some(code @ (OAUTH_INVALID_GRANT | OAUTH_INTERACTION_REQUIRED)) => {
            info!(correlation_id, oauth_error = code, "Refresh token rejected");
            AuthError::invalid_grant(description, Some(code.to_string()))
        }
        oauth_error => {
            warn!(
                correlation_id,
                status = status.as_u16(),
                oauth_error = oauth_error.unwrap_or_default(),
                "Token endpoint request failed"
            );
            let message = match oauth_error {
                Some(code) => format!("{code}: {description}"),
                None => description,
            };
            AuthError::Server { status: Some(status.as_u16()), message, diagnostics }
        }
    }
}

fn grant_from_response(
    response: TokenResponse,
    diagnostics: Option<ServerDiagnostics>,
    now: DateTime<Utc>,
) -> Result<TokenGrant> {
    let expires_in = response.expires_in.as_ref().and_then(seconds).unwrap_or(0);
    let expires_on = expiry_after(now, expires_in, "expires_in")?;
    let extended_expires_on = response
        .ext_expires_in
        .as_ref()
        .and_then(seconds)
        .map(|s| expiry_after(now, s, "ext_expires_in"))
        .transpose()?;
    let claims = response.id_token.as_deref().and_then(decode_id_token);

    Ok(TokenGrant {
        access_token: response.access_token,
        refresh_token: response.refresh_token,
        token_type: response.token_type.unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
        expires_on,
        extended_expires_on,
        is_multi_resource_refresh_token: response.resource.is_some_and(|r| !r.is_empty()),
        family_client_id: response.foci.filter(|f| !f.is_empty()),
        tenant_id: claims.as_ref().and_then(|c| c.tid.clone()),
        user_info: claims.map(user_info),
        id_token: response.id_token,
        server_diagnostics: diagnostics,
    })
}

fn expiry_after(now: DateTime<Utc>, seconds: i64, field: &str) -> Result<DateTime<Utc>> {
    Duration::try_seconds(seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| {
            AuthError::server(
                Some(StatusCode::OK.as_u16()),
                format!("token response {field} out of range: {seconds}"),
            )
        })
}

/// `expires_in` arrives as a number or a numeric string
fn seconds(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn decode_id_token(id_token: &str) -> Option<IdTokenClaims> {
    let payload = id_token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(claims) => Some(claims),
        Err(e) => {
            warn!(error = %e, "Ignoring undecodable id token");
            None
        }
    }
}

fn user_info(claims: IdTokenClaims) -> UserInfo {
    UserInfo {
        unique_id: claims.oid.or(claims.sub),
        displayable_id: claims.upn.or(claims.email),
        given_name: claims.given_name,
        family_name: claims.family_name,
        identity_provider: claims.idp.or(claims.iss),
    }
}
