//! Device identity capabilities used to answer challenges

use authlink_domain::Result;

/// Access to the device certificate issued at enrollment
pub trait DeviceCertificateProvider: Send + Sync {
    /// DER-encoded device certificate
    fn certificate(&self) -> Result<Vec<u8>>;

    /// PEM-encoded private key
    fn private_key(&self) -> Result<Vec<u8>>;

    /// PEM-encoded public key
    fn public_key(&self) -> Result<Vec<u8>>;

    /// Hex thumbprint of the certificate
    fn thumbprint(&self) -> String;

    /// Whether the certificate was issued by one of `authorities`
    fn is_valid_issuer(&self, authorities: &[String]) -> bool;
}

/// Produces the signed assertion binding a nonce to the submit URL
pub trait AssertionSigner: Send + Sync {
    fn sign(
        &self,
        nonce: &str,
        submit_url: &str,
        private_key: &[u8],
        public_key: &[u8],
        certificate: &[u8],
    ) -> Result<String>;
}
