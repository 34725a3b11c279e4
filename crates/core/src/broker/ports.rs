//! Platform capabilities consumed by the broker proxy

use authlink_domain::{BrokerBundle, BrokerErrorKind, LaunchDescriptor, UserInfo};
use thiserror::Error;

/// Failure raised by the platform account service itself
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Authenticator error: {0}")]
    Authenticator(String),

    #[error("I/O error talking to the account service: {0}")]
    Io(String),

    #[error("Account service operation canceled: {0}")]
    OperationCanceled(String),
}

impl PlatformError {
    /// Broker error kind reported to the caller
    pub const fn kind(&self) -> BrokerErrorKind {
        match self {
            Self::Authenticator(_) | Self::OperationCanceled(_) => BrokerErrorKind::NotResponding,
            Self::Io(_) => BrokerErrorKind::IoException,
        }
    }
}

/// Platform account service the broker is registered with
///
/// Every method may block; the proxy calls them from a blocking worker.
pub trait AccountService: Send + Sync {
    /// Account names registered for `account_type`
    fn list_accounts(&self, account_type: &str) -> Result<Vec<String>, PlatformError>;

    /// Extended identity of one broker account
    fn query_extended_identity(&self, account_name: &str)
        -> Result<Option<UserInfo>, PlatformError>;

    /// Blocking token call; the returned bundle may carry a provider error
    fn get_auth_token(
        &self,
        account_name: &str,
        params: &BrokerBundle,
    ) -> Result<BrokerBundle, PlatformError>;

    /// Launch descriptor for the broker's add-account flow
    fn request_add_account_flow(
        &self,
        params: &BrokerBundle,
    ) -> Result<LaunchDescriptor, PlatformError>;

    /// Prompt protocol version the installed broker advertises
    fn broker_protocol_version(&self) -> Option<String>;

    /// Whether the broker runtime can add accounts through this flow
    fn supports_add_account_flow(&self) -> bool;
}

/// Facts about the calling process and the installed packages
pub trait PlatformEnvironment: Send + Sync {
    fn caller_package(&self) -> String;

    fn has_permission(&self, permission: &str) -> bool;

    /// Package registered as the account handler for `account_type`
    fn authenticator_package(&self, account_type: &str) -> Option<String>;

    /// DER signing certificates of `package`
    fn signing_certificates(&self, package: &str) -> Vec<Vec<u8>>;

    fn is_foreground_thread(&self) -> bool;
}
