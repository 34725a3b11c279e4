//! Silent token acquisition

pub mod engine;
pub mod ports;

pub use engine::SilentAcquisitionEngine;
pub use ports::{BrokerDelegate, RefreshRequest, RefreshTokenExchanger};
