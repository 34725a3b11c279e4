//! Device assertion signing

pub mod jws;

pub use jws::JwsAssertionSigner;
