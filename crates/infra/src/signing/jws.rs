//! RS256 device assertions
//!
//! The assertion is a compact JWS whose `x5c` header carries the device
//! certificate and whose claims bind the challenge nonce to the endpoint the
//! response is submitted to.

use std::sync::Arc;

use authlink_common::time::{Clock, SystemClock};
use authlink_core::challenge::AssertionSigner;
use authlink_domain::{AuthError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use tracing::debug;

use crate::errors::InfraError;

const PEM_PREFIX: &[u8] = b"-----BEGIN";

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    aud: &'a str,
    nonce: &'a str,
    iat: i64,
}

/// [`AssertionSigner`] built on `jsonwebtoken`
pub struct JwsAssertionSigner {
    clock: Arc<dyn Clock>,
}

impl Default for JwsAssertionSigner {
    fn default() -> Self {
        Self::new()
    }
}

impl JwsAssertionSigner {
    pub fn new() -> Self {
        Self { clock: Arc::new(SystemClock) }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// PKCS#1 key, PEM or DER
fn encoding_key(private_key: &[u8]) -> Result<EncodingKey> {
    if private_key.is_empty() {
        return Err(AuthError::DeviceCertificate("device private key is empty".into()));
    }
    if private_key.starts_with(PEM_PREFIX) {
        EncodingKey::from_rsa_pem(private_key).map_err(|e| InfraError::from(e).into())
    } else {
        Ok(EncodingKey::from_rsa_der(private_key))
    }
}

impl AssertionSigner for JwsAssertionSigner {
    fn sign(
        &self,
        nonce: &str,
        submit_url: &str,
        private_key: &[u8],
        _public_key: &[u8],
        certificate: &[u8],
    ) -> Result<String> {
        if certificate.is_empty() {
            return Err(AuthError::DeviceCertificate("device certificate is empty".into()));
        }

        let key = encoding_key(private_key)?;
        let mut header = Header::new(Algorithm::RS256);
        header.x5c = Some(vec![STANDARD.encode(certificate)]);

        let claims = AssertionClaims { aud: submit_url, nonce, iat: self.clock.utc_now().timestamp() };
        let assertion = encode(&header, &claims, &key).map_err(InfraError::from)?;

        debug!(audience = submit_url, "Signed device assertion");
        Ok(assertion)
    }
}
