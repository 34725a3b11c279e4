//! Cache key derivation
//!
//! Every key has six `$`-separated fields:
//!
//! ```text
//! authority $ resource $ client_id $ mrrt_flag $ user_id $ family_tag
//! ```
//!
//! | kind | shape |
//! |------|-------|
//! | RT   | `a$r$c$n$u$` |
//! | MRRT | `a$$c$y$u$` |
//! | FRT  | `a$$$y$u$foci-<family>` |
//!
//! An absent user id is an empty field, never a dropped one, so all keys of a
//! kind have the same arity. Pure functions; the only failure is an argument
//! error for an empty or delimiter-bearing component.

use authlink_domain::constants::{
    CACHE_KEY_DELIMITER, CACHE_KEY_MRRT_FLAG_NO, CACHE_KEY_MRRT_FLAG_YES, FAMILY_CLIENT_ID_PREFIX,
};
use authlink_domain::{AuthError, Result, TokenEntryType};

/// Lower-case, trim, and strip trailing `/` from an authority
///
/// # Errors
/// Argument error when the authority is empty after trimming.
pub fn normalize_authority(authority: &str) -> Result<String> {
    let normalized = authority.trim().trim_end_matches('/').to_lowercase();
    if normalized.is_empty() {
        return Err(AuthError::argument("authority", "authority must not be empty"));
    }
    ensure_no_delimiter("authority", &normalized)?;
    Ok(normalized)
}

/// Key for a resource-specific refresh token
pub fn rt_key(
    authority: &str,
    resource: &str,
    client_id: &str,
    user_id: Option<&str>,
) -> Result<String> {
    let authority = normalize_authority(authority)?;
    let resource = required("resource", resource)?;
    let client_id = required("client_id", client_id)?.to_lowercase();
    let user = user_segment(user_id)?;
    Ok(compose(&[&authority, resource, &client_id, CACHE_KEY_MRRT_FLAG_NO, &user, ""]))
}

/// Key for a multi-resource refresh token (no resource component)
pub fn mrrt_key(authority: &str, client_id: &str, user_id: Option<&str>) -> Result<String> {
    let authority = normalize_authority(authority)?;
    let client_id = required("client_id", client_id)?.to_lowercase();
    let user = user_segment(user_id)?;
    Ok(compose(&[&authority, "", &client_id, CACHE_KEY_MRRT_FLAG_YES, &user, ""]))
}

/// Key for a family refresh token (no resource, no ordinary client id)
pub fn frt_key(authority: &str, family_client_id: &str, user_id: Option<&str>) -> Result<String> {
    let authority = normalize_authority(authority)?;
    let family = required("family_client_id", family_client_id)?;
    let user = user_segment(user_id)?;
    let tag = format!("{FAMILY_CLIENT_ID_PREFIX}{family}");
    Ok(compose(&[&authority, "", "", CACHE_KEY_MRRT_FLAG_YES, &user, &tag]))
}

/// Classify a key by its shape
pub fn key_kind(key: &str) -> Option<TokenEntryType> {
    let fields: Vec<&str> = key.split(CACHE_KEY_DELIMITER).collect();
    if fields.len() != 6 {
        return None;
    }
    match (fields[1].is_empty(), fields[2].is_empty(), fields[3], fields[5].is_empty()) {
        (false, false, CACHE_KEY_MRRT_FLAG_NO, true) => Some(TokenEntryType::Rt),
        (true, false, CACHE_KEY_MRRT_FLAG_YES, true) => Some(TokenEntryType::Mrrt),
        (true, true, CACHE_KEY_MRRT_FLAG_YES, false) => Some(TokenEntryType::Frt),
        _ => None,
    }
}

fn compose(fields: &[&str]) -> String {
    let mut key = String::with_capacity(fields.iter().map(|f| f.len() + 1).sum());
    for (idx, field) in fields.iter().enumerate() {
        if idx > 0 {
            key.push(CACHE_KEY_DELIMITER);
        }
        key.push_str(field);
    }
    key
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::argument(field, format!("{field} must not be empty")));
    }
    ensure_no_delimiter(field, value)?;
    Ok(value)
}

fn user_segment(user_id: Option<&str>) -> Result<String> {
    match user_id.map(str::trim) {
        None | Some("") => Ok(String::new()),
        Some(user) => {
            ensure_no_delimiter("user_id", user)?;
            Ok(user.to_lowercase())
        }
    }
}

fn ensure_no_delimiter(field: &str, value: &str) -> Result<()> {
    if value.contains(CACHE_KEY_DELIMITER) {
        return Err(AuthError::argument(
            field,
            format!("{field} must not contain '{CACHE_KEY_DELIMITER}'"),
        ));
    }
    Ok(())
}
