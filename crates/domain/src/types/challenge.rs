//! Device-certificate (PKeyAuth) challenge types

use serde::{Deserialize, Serialize};

/// Where a challenge was delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeSource {
    /// `WWW-Authenticate: PKeyAuth ...` on a token endpoint response
    Header,
    /// `urn:http-auth:PKeyAuth?...` redirect during a browser flow
    Redirect,
}

/// A parsed proof-of-possession challenge
///
/// Exists only for one challenge/response round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub nonce: String,
    pub version: String,
    pub context: String,
    pub cert_thumbprint: Option<String>,
    pub cert_authorities: Vec<String>,
    /// Endpoint the response is posted to; always present for redirects
    pub submit_url: Option<String>,
    pub source: ChallengeSource,
}

/// Answer to a challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeResponse {
    /// Value for the `Authorization` header
    pub authorization_header: String,
    pub submit_url: Option<String>,
    /// Whether a signed assertion was included
    pub signed: bool,
}
