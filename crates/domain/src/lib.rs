//! # Authlink Domain
//!
//! Data model and error taxonomy for the Authlink token acquisition library.
//!
//! This crate contains:
//! - Token, request and result types (`CachedToken`, `AuthenticationRequest`,
//!   `AuthenticationResult`)
//! - Device-certificate challenge types
//! - The `AuthError` taxonomy with stable error codes
//! - Configuration structures
//! - Protocol constants (cache key layout, broker bundle keys, header names)
//!
//! ## Architecture
//! - Depends only on `authlink-common` foundation utilities
//! - No I/O; pure data structures and validation

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
