//! PKeyAuth challenge parsing
//!
//! Header form:
//!
//! ```text
//! PKeyAuth Nonce="...", CertAuthorities="...", Version="1.0", Context="..."
//! ```
//!
//! Redirect form:
//!
//! ```text
//! urn:http-auth:PKeyAuth?Nonce=...&CertAuthorities=...&Version=1.0&Context=...&SubmitUrl=...
//! ```

use std::collections::HashMap;

use authlink_domain::constants::{PKEYAUTH_CHALLENGE_TYPE, PKEYAUTH_REDIRECT_PREFIX};
use authlink_domain::{AuthError, Challenge, ChallengeSource, Result};
use url::Url;

const NONCE: &str = "Nonce";
const VERSION: &str = "Version";
const CONTEXT: &str = "Context";
const CERT_THUMBPRINT: &str = "CertThumbprint";
const CERT_AUTHORITIES: &str = "CertAuthorities";
const SUBMIT_URL: &str = "SubmitUrl";

/// Whether a `WWW-Authenticate` value is a PKeyAuth challenge
pub fn is_challenge_header(value: &str) -> bool {
    strip_scheme(value.trim_start()).is_some()
}

/// Whether a redirect URI carries a PKeyAuth challenge
pub fn is_challenge_redirect(uri: &str) -> bool {
    uri.trim_start().to_ascii_lowercase().starts_with(&PKEYAUTH_REDIRECT_PREFIX.to_ascii_lowercase())
}

/// Parse a challenge header value
///
/// `submit_url` is the endpoint that issued the challenge.
///
/// # Errors
/// `DEVICE_CERTIFICATE_REQUEST_INVALID` for a malformed pair or a missing
/// nonce, version or context.
pub fn parse_header(value: &str, submit_url: Option<&str>) -> Result<Challenge> {
    let body = value.trim();
    let body = strip_scheme(body).unwrap_or(body);

    let mut fields = HashMap::new();
    for pair in split_unquoted(body, ',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let parts = split_unquoted(pair, '=');
        let [key, raw_value] = parts.as_slice() else {
            return Err(AuthError::ChallengeInvalid(format!("Malformed challenge pair '{pair}'")));
        };
        let key = key.trim();
        let value = unquote(raw_value.trim());
        if key.is_empty() || value.is_empty() {
            return Err(AuthError::ChallengeInvalid(format!(
                "Challenge pair '{pair}' has an empty key or value"
            )));
        }
        fields.insert(key.to_ascii_lowercase(), value.to_string());
    }

    let require = |name: &str| {
        fields
            .get(&name.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| AuthError::ChallengeInvalid(format!("{name} is missing")))
    };

    Ok(Challenge {
        nonce: require(NONCE)?,
        version: require(VERSION)?,
        context: require(CONTEXT)?,
        cert_thumbprint: fields.get(&CERT_THUMBPRINT.to_ascii_lowercase()).cloned(),
        cert_authorities: fields
            .get(&CERT_AUTHORITIES.to_ascii_lowercase())
            .map(|value| split_authorities(value))
            .unwrap_or_default(),
        submit_url: submit_url.map(str::to_string),
        source: ChallengeSource::Header,
    })
}

/// Parse a challenge redirect URI
///
/// # Errors
/// - `DEVICE_CERTIFICATE_REQUEST_INVALID` when the URI is not a PKeyAuth
///   redirect
/// - an argument error naming the field when any of `Nonce`,
///   `CertAuthorities`, `SubmitUrl`, `Version` or `Context` is missing
pub fn parse_redirect(uri: &str) -> Result<Challenge> {
    if !is_challenge_redirect(uri) {
        return Err(AuthError::ChallengeInvalid("Redirect is not a PKeyAuth challenge".into()));
    }
    let url = Url::parse(uri.trim())
        .map_err(|err| AuthError::ChallengeInvalid(format!("Unparseable challenge redirect: {err}")))?;

    let mut fields = HashMap::new();
    for (key, value) in url.query_pairs() {
        fields.insert(key.to_ascii_lowercase(), value.trim().to_string());
    }

    let require = |name: &str| {
        fields
            .get(&name.to_ascii_lowercase())
            .filter(|value| !value.is_empty())
            .cloned()
            .ok_or_else(|| AuthError::missing_field(name))
    };

    let nonce = require(NONCE)?;
    let authorities = require(CERT_AUTHORITIES)?;
    let submit_url = require(SUBMIT_URL)?;
    let version = require(VERSION)?;
    let context = require(CONTEXT)?;

    Ok(Challenge {
        nonce,
        version,
        context,
        cert_thumbprint: None,
        cert_authorities: split_authorities(&authorities),
        submit_url: Some(submit_url),
        source: ChallengeSource::Redirect,
    })
}

fn strip_scheme(value: &str) -> Option<&str> {
    let scheme_len = PKEYAUTH_CHALLENGE_TYPE.len();
    let head = value.get(..scheme_len)?;
    if !head.eq_ignore_ascii_case(PKEYAUTH_CHALLENGE_TYPE) {
        return None;
    }
    let rest = &value[scheme_len..];
    (rest.is_empty() || rest.starts_with(char::is_whitespace)).then_some(rest)
}

/// Split on `delimiter` outside double quotes
fn split_unquoted(body: &str, delimiter: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (idx, ch) in body.char_indices() {
        if ch == '"' {
            in_quotes = !in_quotes;
        } else if ch == delimiter && !in_quotes {
            parts.push(&body[start..idx]);
            start = idx + ch.len_utf8();
        }
    }
    parts.push(&body[start..]);
    parts
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .trim()
}

fn split_authorities(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|authority| !authority.is_empty())
        .map(str::to_string)
        .collect()
}
