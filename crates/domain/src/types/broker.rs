//! Broker protocol value types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// String key/value bundle exchanged with the platform account service
pub type BrokerBundle = BTreeMap<String, String>;

/// Interactive flow the caller must launch to finish authentication
///
/// Produced when the broker reports an initial request (it holds no token for
/// the user yet). It is a signal, not a failure of the broker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchDescriptor {
    /// Platform-specific activity or intent identifier
    pub target: String,
    pub parameters: BrokerBundle,
}
