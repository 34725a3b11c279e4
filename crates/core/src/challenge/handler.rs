//! Challenge resolution
//!
//! A device without a certificate provider, or whose certificate was not
//! issued by a requested authority, answers with the context alone. That
//! response is valid and lets the gateway continue without device identity.

use std::sync::Arc;

use authlink_domain::constants::PKEYAUTH_CHALLENGE_TYPE;
use authlink_domain::{AuthError, Challenge, ChallengeResponse, Result};
use tracing::{debug, info};

use super::parser;
use super::ports::{AssertionSigner, DeviceCertificateProvider};

/// Answers PKeyAuth challenges
#[derive(Clone, Default)]
pub struct ChallengeHandler {
    provider: Option<Arc<dyn DeviceCertificateProvider>>,
    signer: Option<Arc<dyn AssertionSigner>>,
}

impl ChallengeHandler {
    /// Handler for a device that is not enrolled
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn DeviceCertificateProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn with_signer(mut self, signer: Arc<dyn AssertionSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Answer a `WWW-Authenticate` challenge issued by `submit_url`
    pub fn respond_to_header(&self, header: &str, submit_url: &str) -> Result<ChallengeResponse> {
        let challenge = parser::parse_header(header, Some(submit_url))?;
        self.respond(&challenge)
    }

    /// Answer a challenge delivered as a redirect URI
    pub fn respond_to_redirect(&self, uri: &str) -> Result<ChallengeResponse> {
        let challenge = parser::parse_redirect(uri)?;
        self.respond(&challenge)
    }

    /// Build the `Authorization` value for a parsed challenge
    ///
    /// # Errors
    /// - `DEVICE_CERTIFICATE_REQUEST_INVALID` when a provider is configured
    ///   and the challenge names neither a thumbprint nor authorities
    /// - `DEVICE_CERTIFICATE_API_EXCEPTION` when key material or signing fails
    pub fn respond(&self, challenge: &Challenge) -> Result<ChallengeResponse> {
        let Some(provider) = self.provider.as_ref() else {
            debug!(source = ?challenge.source, "No device certificate provider, answering with context only");
            return Ok(context_only(challenge));
        };

        if challenge.cert_thumbprint.is_none() && challenge.cert_authorities.is_empty() {
            return Err(AuthError::ChallengeInvalid(
                "Both certThumbprint and certauthorities are not present".to_string(),
            ));
        }

        let recognized = match challenge.cert_thumbprint.as_deref() {
            Some(thumbprint) => provider.thumbprint().eq_ignore_ascii_case(thumbprint),
            None => provider.is_valid_issuer(&challenge.cert_authorities),
        };
        if !recognized {
            info!(source = ?challenge.source, "Device certificate not issued for this challenge");
            return Ok(context_only(challenge));
        }

        let submit_url = challenge
            .submit_url
            .as_deref()
            .ok_or_else(|| AuthError::missing_field("SubmitUrl"))?;
        let signer = self.signer.as_ref().ok_or_else(|| {
            AuthError::DeviceCertificate("No assertion signer configured".to_string())
        })?;

        let certificate = provider.certificate()?;
        let private_key = provider.private_key()?;
        let public_key = provider.public_key()?;
        let assertion =
            signer.sign(&challenge.nonce, submit_url, &private_key, &public_key, &certificate)?;

        debug!(source = ?challenge.source, "Signed device challenge response");
        Ok(ChallengeResponse {
            authorization_header: format!(
                r#"{PKEYAUTH_CHALLENGE_TYPE} AuthToken="{assertion}",Context="{}",Version="{}""#,
                challenge.context, challenge.version
            ),
            submit_url: challenge.submit_url.clone(),
            signed: true,
        })
    }
}

fn context_only(challenge: &Challenge) -> ChallengeResponse {
    ChallengeResponse {
        authorization_header: format!(
            r#"{PKEYAUTH_CHALLENGE_TYPE} Context="{}",Version="{}""#,
            challenge.context, challenge.version
        ),
        submit_url: challenge.submit_url.clone(),
        signed: false,
    }
}
