//! Per-request diagnostic telemetry

pub mod aggregator;
pub mod events;
pub mod ports;

pub use aggregator::TelemetryAggregator;
pub use events::{
    ApiEvent, BrokerEvent, CacheEvent, CacheLookupStatus, ChallengeEvent, HttpEvent,
    TelemetryEvent,
};
pub use ports::TelemetrySink;
