//! Telemetry records emitted as tracing events

use std::collections::{BTreeMap, HashMap};

use authlink_core::telemetry::events::PROP_REQUEST_ID;
use authlink_core::telemetry::TelemetrySink;
use parking_lot::Mutex;
use tracing::info;

/// Target of the emitted events, filterable with `RUST_LOG`
pub const TELEMETRY_TARGET: &str = "authlink::telemetry";

/// Writes each record as one `info` event under [`TELEMETRY_TARGET`]
///
/// Records are also counted so hosts can report how many were produced.
#[derive(Debug, Default)]
pub struct TracingTelemetrySink {
    dispatched: Mutex<u64>,
}

impl TracingTelemetrySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatched(&self) -> u64 {
        *self.dispatched.lock()
    }
}

impl TelemetrySink for TracingTelemetrySink {
    fn dispatch(&self, record: HashMap<String, String>) {
        // Sorted so records diff cleanly in log output.
        let ordered: BTreeMap<_, _> = record.into_iter().collect();
        let request_id = ordered.get(PROP_REQUEST_ID).cloned().unwrap_or_default();
        let properties = serde_json::to_string(&ordered).unwrap_or_default();

        info!(target: TELEMETRY_TARGET, request_id = %request_id, properties = %properties, "telemetry");
        *self.dispatched.lock() += 1;
    }
}
