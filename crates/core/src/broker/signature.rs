//! Broker package trust verification
//!
//! A package is trusted when the base64 SHA-1 digest of one of its signing
//! certificates is in the allow-list: the built-in broker apps plus one
//! operator-configured signature.

use authlink_domain::constants::{
    AUTHENTICATOR_APP_PACKAGE, AUTHENTICATOR_APP_SIGNATURE, COMPANY_PORTAL_APP_PACKAGE,
    COMPANY_PORTAL_APP_SIGNATURE,
};
use authlink_domain::{AuthError, BrokerErrorKind, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha1::{Digest, Sha1};
use tracing::{debug, warn};

/// Base64 SHA-1 digest of a DER certificate
pub fn certificate_digest(certificate: &[u8]) -> String {
    STANDARD.encode(Sha1::digest(certificate))
}

/// Whether `package` is one of the built-in broker apps
pub fn is_broker_package(package: &str) -> bool {
    package == AUTHENTICATOR_APP_PACKAGE || package == COMPANY_PORTAL_APP_PACKAGE
}

/// Verifies broker signing certificates against the allow-list
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    allowed: Vec<String>,
}

impl SignatureVerifier {
    pub fn new(trusted_signature: Option<&str>) -> Self {
        let mut allowed =
            vec![AUTHENTICATOR_APP_SIGNATURE.to_string(), COMPANY_PORTAL_APP_SIGNATURE.to_string()];
        if let Some(extra) = trusted_signature.map(str::trim).filter(|s| !s.is_empty()) {
            allowed.push(extra.to_string());
        }
        Self { allowed }
    }

    pub fn is_trusted_digest(&self, digest: &str) -> bool {
        self.allowed.iter().any(|allowed| allowed == digest)
    }

    /// Accept `package` only if one of its certificates matches exactly
    ///
    /// # Errors
    /// `BROKER_VERIFICATION_FAILED` when no certificate is present or none
    /// matches.
    pub fn verify(&self, package: &str, certificates: &[Vec<u8>]) -> Result<()> {
        if certificates.is_empty() {
            warn!(package, "Broker package has no signing certificates");
            return Err(AuthError::broker(
                BrokerErrorKind::VerificationFailed,
                format!("No signing certificate found for {package}"),
            ));
        }

        for certificate in certificates {
            let digest = certificate_digest(certificate);
            if self.is_trusted_digest(&digest) {
                debug!(package, "Broker signature verified");
                return Ok(());
            }
        }

        warn!(package, "Broker signature does not match any trusted digest");
        Err(AuthError::broker(
            BrokerErrorKind::VerificationFailed,
            format!("Signing certificate of {package} is not trusted"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use authlink_domain::ErrorCode;

    use super::*;

    const CERT: &[u8] = b"test-broker-certificate";

    #[test]
    fn configured_signature_is_accepted() {
        let digest = certificate_digest(CERT);
        let verifier = SignatureVerifier::new(Some(&digest));
        assert!(verifier.verify("com.contoso.broker", &[b"other".to_vec(), CERT.to_vec()]).is_ok());
    }

    #[test]
    fn unknown_signature_fails_verification() {
        let verifier = SignatureVerifier::new(None);
        let err = verifier.verify("com.contoso.broker", &[CERT.to_vec()]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BrokerVerificationFailed);

        let err = verifier.verify("com.contoso.broker", &[]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BrokerVerificationFailed);
    }

    #[test]
    fn digest_is_base64_sha1() {
        // SHA-1 of the empty string
        assert_eq!(certificate_digest(b""), "2jmj7l5rSw0yVb/vlWAYkK/YBwk=");
        assert_eq!(certificate_digest(CERT).len(), 28);
    }

    #[test]
    fn built_in_broker_packages() {
        assert!(is_broker_package(AUTHENTICATOR_APP_PACKAGE));
        assert!(is_broker_package(COMPANY_PORTAL_APP_PACKAGE));
        assert!(!is_broker_package("com.contoso.app"));
    }
}
