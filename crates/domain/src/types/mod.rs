//! Domain types and models

pub mod broker;
pub mod challenge;
pub mod diagnostics;
pub mod request;
pub mod result;
pub mod token;
pub mod user;

pub use broker::{BrokerBundle, LaunchDescriptor};
pub use challenge::{Challenge, ChallengeResponse, ChallengeSource};
pub use diagnostics::ServerDiagnostics;
pub use request::{AuthenticationRequest, PromptBehavior, UserIdentifier};
pub use result::{AuthenticationResult, ResultStatus};
pub use token::{CachedToken, TokenEntryType, TokenGrant};
pub use user::UserInfo;
