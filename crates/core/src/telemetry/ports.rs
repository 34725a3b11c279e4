//! Port interface for telemetry transport

use std::collections::HashMap;

/// Receives flattened telemetry records
pub trait TelemetrySink: Send + Sync {
    fn dispatch(&self, record: HashMap<String, String>);
}
