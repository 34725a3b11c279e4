//! Server diagnostics carried by the `x-ms-clitelem` response header

use serde::{Deserialize, Serialize};

use crate::constants::CLIENT_TELEMETRY_VERSION;

const FIELD_COUNT_V1: usize = 5;

/// Parsed `x-ms-clitelem` header
///
/// Format: `<version>,<error>,<sub_error>,<token_age>,<spe_ring>`. Only
/// version `1` is understood.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDiagnostics {
    pub error_code: String,
    pub sub_error_code: String,
    pub refresh_token_age: String,
    pub spe_ring: String,
}

impl ServerDiagnostics {
    /// Parse the header value; `None` for unknown versions or a wrong field
    /// count
    pub fn parse(header: &str) -> Option<Self> {
        let fields: Vec<&str> = header.split(',').map(str::trim).collect();
        if fields.first().copied() != Some(CLIENT_TELEMETRY_VERSION) {
            return None;
        }
        if fields.len() != FIELD_COUNT_V1 {
            return None;
        }
        Some(Self {
            error_code: fields[1].to_string(),
            sub_error_code: fields[2].to_string(),
            refresh_token_age: fields[3].to_string(),
            spe_ring: fields[4].to_string(),
        })
    }
}
