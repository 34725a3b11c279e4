//! Testing utilities and helpers
//!
//! - **[`mocks`]**: in-memory doubles for the platform tier
//!
//! The deterministic clock lives in [`crate::time`] and is re-exported here
//! so test code can pull everything from one place.
//!
//! ```rust
//! use authlink_common::security::SecretStore;
//! use authlink_common::testing::MockSecretStore;
//!
//! let store = MockSecretStore::new("Authlink.test");
//! store.set_secret("k", "v").unwrap();
//! assert_eq!(store.get_secret("k").unwrap(), "v");
//! ```

pub mod mocks;

pub use mocks::MockSecretStore;

pub use crate::time::{Clock, MockClock, SystemClock};
