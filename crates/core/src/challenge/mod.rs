//! Device-certificate (PKeyAuth) challenge handling

pub mod handler;
pub mod parser;
pub mod ports;

pub use handler::ChallengeHandler;
pub use parser::{is_challenge_header, is_challenge_redirect, parse_header, parse_redirect};
pub use ports::{AssertionSigner, DeviceCertificateProvider};
