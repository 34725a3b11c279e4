//! Token requests

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserInfo;
use crate::impl_domain_status_conversions;

/// Which user a request is for
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum UserIdentifier {
    /// Whoever is signed in
    #[default]
    Any,
    /// Immutable object id
    UniqueId(String),
    /// UPN or email
    DisplayableId(String),
}

impl UserIdentifier {
    /// User component for cache keys; `None` for [`UserIdentifier::Any`]
    pub fn cache_user_id(&self) -> Option<&str> {
        match self {
            Self::Any => None,
            Self::UniqueId(id) | Self::DisplayableId(id) => Some(id.as_str()),
        }
    }

    /// Login hint forwarded to the broker
    pub fn login_hint(&self) -> Option<&str> {
        match self {
            Self::DisplayableId(id) => Some(id.as_str()),
            _ => None,
        }
    }

    /// Whether `user` satisfies this identifier
    pub fn matches(&self, user: &UserInfo) -> bool {
        match self {
            Self::Any => true,
            Self::UniqueId(id) => {
                user.unique_id.as_deref().is_some_and(|u| u.eq_ignore_ascii_case(id))
            }
            Self::DisplayableId(id) => {
                user.displayable_id.as_deref().is_some_and(|d| d.eq_ignore_ascii_case(id))
            }
        }
    }
}

/// Prompt policy for interactive and broker flows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptBehavior {
    #[default]
    Auto,
    Always,
    ForcePrompt,
    RefreshSession,
}

impl_domain_status_conversions!(PromptBehavior {
    Auto => "auto",
    Always => "always",
    ForcePrompt => "force_prompt",
    RefreshSession => "refresh_session",
});

impl PromptBehavior {
    /// Name used in the broker parameter bundle
    pub const fn protocol_name(self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::Always => "Always",
            Self::ForcePrompt => "FORCE_PROMPT",
            Self::RefreshSession => "REFRESH_SESSION",
        }
    }
}

/// A token request; immutable once dispatched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationRequest {
    pub authority: String,
    pub resource: String,
    pub client_id: String,
    pub redirect_uri: Option<String>,
    pub user: UserIdentifier,
    pub prompt: PromptBehavior,
    pub extra_query_parameters: Option<String>,
    pub claims: Option<String>,
    pub correlation_id: Uuid,
    pub client_capabilities: Vec<String>,
    pub broker_allowed: bool,
    /// Skip local cache tiers and go straight to the broker
    pub force_broker: bool,
    /// Client family the caller belongs to
    pub family_client_id: Option<String>,
    /// Explicit broker account to use
    pub broker_account_name: Option<String>,
}

impl AuthenticationRequest {
    pub fn new(
        authority: impl Into<String>,
        resource: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            authority: authority.into(),
            resource: resource.into(),
            client_id: client_id.into(),
            redirect_uri: None,
            user: UserIdentifier::Any,
            prompt: PromptBehavior::Auto,
            extra_query_parameters: None,
            claims: None,
            correlation_id: Uuid::new_v4(),
            client_capabilities: Vec::new(),
            broker_allowed: false,
            force_broker: false,
            family_client_id: None,
            broker_account_name: None,
        }
    }

    #[must_use]
    pub fn with_user(mut self, user: UserIdentifier) -> Self {
        self.user = user;
        self
    }

    #[must_use]
    pub fn with_prompt(mut self, prompt: PromptBehavior) -> Self {
        self.prompt = prompt;
        self
    }

    #[must_use]
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    #[must_use]
    pub fn with_extra_query_parameters(mut self, params: impl Into<String>) -> Self {
        self.extra_query_parameters = Some(params.into());
        self
    }

    #[must_use]
    pub fn with_claims(mut self, claims: impl Into<String>) -> Self {
        self.claims = Some(claims.into());
        self
    }

    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    #[must_use]
    pub fn with_client_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.client_capabilities = capabilities;
        self
    }

    #[must_use]
    pub fn with_broker_allowed(mut self, allowed: bool) -> Self {
        self.broker_allowed = allowed;
        self
    }

    #[must_use]
    pub fn with_force_broker(mut self, force: bool) -> Self {
        self.force_broker = force;
        self
    }

    #[must_use]
    pub fn with_family_client_id(mut self, family: impl Into<String>) -> Self {
        self.family_client_id = Some(family.into());
        self
    }

    #[must_use]
    pub fn with_broker_account_name(mut self, name: impl Into<String>) -> Self {
        self.broker_account_name = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let request = AuthenticationRequest::new("https://login/common", "res", "client")
            .with_user(UserIdentifier::DisplayableId("user@contoso.com".into()))
            .with_prompt(PromptBehavior::ForcePrompt)
            .with_broker_allowed(true);

        assert_eq!(request.user.cache_user_id(), Some("user@contoso.com"));
        assert_eq!(request.user.login_hint(), Some("user@contoso.com"));
        assert_eq!(request.prompt.protocol_name(), "FORCE_PROMPT");
        assert!(request.broker_allowed);
        assert!(!request.force_broker);
    }

    #[test]
    fn identifier_matching_is_case_insensitive() {
        let user = UserInfo::new(Some("OID-1".into()), Some("User@Contoso.com".into()));
        assert!(UserIdentifier::UniqueId("oid-1".into()).matches(&user));
        assert!(UserIdentifier::DisplayableId("user@contoso.com".into()).matches(&user));
        assert!(!UserIdentifier::UniqueId("user@contoso.com".into()).matches(&user));
        assert!(UserIdentifier::Any.matches(&user));
        assert_eq!(UserIdentifier::Any.cache_user_id(), None);
    }

    #[test]
    fn prompt_round_trips_through_strings() {
        assert_eq!("refresh_session".parse::<PromptBehavior>().unwrap(), PromptBehavior::RefreshSession);
        assert_eq!(PromptBehavior::Always.to_string(), "always");
    }
}
