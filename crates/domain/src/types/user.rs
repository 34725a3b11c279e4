//! User identity returned by the token endpoint or the broker

use serde::{Deserialize, Serialize};

/// Identity of the signed-in user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserInfo {
    /// Immutable object id of the user
    pub unique_id: Option<String>,
    /// UPN or email the user signs in with
    pub displayable_id: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub identity_provider: Option<String>,
}

impl UserInfo {
    pub fn new(unique_id: Option<String>, displayable_id: Option<String>) -> Self {
        Self { unique_id, displayable_id, ..Self::default() }
    }

    /// Case-insensitive match against either identifier
    pub fn matches_id(&self, id: &str) -> bool {
        self.unique_id.as_deref().is_some_and(|u| u.eq_ignore_ascii_case(id))
            || self.displayable_id.as_deref().is_some_and(|d| d.eq_ignore_ascii_case(id))
    }
}
