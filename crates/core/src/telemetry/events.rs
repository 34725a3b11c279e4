//! Telemetry event variants and their merge rules
//!
//! Each variant knows two things: the flat properties it reports on its own
//! (non-aggregated mode) and how it folds into the per-request record
//! (aggregated mode).

use std::collections::HashMap;

use authlink_domain::{
    ChallengeSource, ErrorCode, ResultStatus, ServerDiagnostics, TokenEntryType,
};
use uuid::Uuid;

pub const EVENT_API: &str = "api_event";
pub const EVENT_CACHE: &str = "cache_lookup";
pub const EVENT_HTTP: &str = "http_request";
pub const EVENT_BROKER: &str = "broker_request";
pub const EVENT_CHALLENGE: &str = "device_challenge";

pub const PROP_REQUEST_ID: &str = "request_id";
pub const PROP_EVENT_NAME: &str = "event_name";
pub const PROP_ELAPSED_MS: &str = "elapsed_ms";
pub const PROP_API_ID: &str = "api_id";
pub const PROP_AUTHORITY_TYPE: &str = "authority_type";
pub const PROP_API_STATUS: &str = "api_status";
pub const PROP_API_ERROR_CODE: &str = "api_error_code";
pub const PROP_API_ELAPSED_MS: &str = "api_elapsed_ms";
pub const PROP_CORRELATION_ID: &str = "correlation_id";
pub const PROP_EXTENDED_LIFETIME: &str = "is_extended_lifetime_token";
pub const PROP_CACHE_EVENT_COUNT: &str = "cache_event_count";
pub const PROP_TOKEN_RT_STATUS: &str = "token_rt_status";
pub const PROP_TOKEN_MRRT_STATUS: &str = "token_mrrt_status";
pub const PROP_TOKEN_FRT_STATUS: &str = "token_frt_status";
pub const PROP_HTTP_EVENT_COUNT: &str = "http_event_count";
pub const PROP_HTTP_STATUS: &str = "http_response_code";
pub const PROP_OAUTH_ERROR: &str = "oauth_error_code";
pub const PROP_SERVER_ERROR: &str = "server_error_code";
pub const PROP_SERVER_SUB_ERROR: &str = "server_sub_error_code";
pub const PROP_RT_AGE: &str = "rt_age";
pub const PROP_SPE_RING: &str = "spe_ring";
pub const PROP_BROKER_APP: &str = "broker_app";
pub const PROP_BROKER_VERSION: &str = "broker_version";
pub const PROP_BROKER_APP_USED: &str = "broker_app_used";
pub const PROP_BROKER_ELAPSED_MS: &str = "broker_elapsed_ms";
pub const PROP_CHALLENGE_EVENT_COUNT: &str = "challenge_event_count";
pub const PROP_CHALLENGE_SOURCE: &str = "challenge_source";
pub const PROP_CHALLENGE_SIGNED: &str = "challenge_signed";

/// Outcome of one cache lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookupStatus {
    NotFound,
    Valid,
    Expired,
}

impl CacheLookupStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Valid => "valid",
            Self::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEvent {
    pub api_id: String,
    pub authority_type: String,
    pub status: Option<ResultStatus>,
    pub correlation_id: Option<Uuid>,
    pub is_extended_lifetime_token: bool,
    pub error_code: Option<ErrorCode>,
}

impl ApiEvent {
    pub fn new(api_id: impl Into<String>, authority: &str) -> Self {
        Self {
            api_id: api_id.into(),
            authority_type: authority_type(authority).to_string(),
            status: None,
            correlation_id: None,
            is_extended_lifetime_token: false,
            error_code: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEvent {
    pub tier: TokenEntryType,
    pub status: CacheLookupStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpEvent {
    pub status_code: Option<u16>,
    pub oauth_error: Option<String>,
    pub server_diagnostics: Option<ServerDiagnostics>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrokerEvent {
    pub broker_app: Option<String>,
    pub broker_version: Option<String>,
    pub error_code: Option<ErrorCode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeEvent {
    pub source: ChallengeSource,
    pub signed: bool,
}

/// A diagnostic event recorded during one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryEvent {
    Api(ApiEvent),
    Cache(CacheEvent),
    Http(HttpEvent),
    Broker(BrokerEvent),
    Challenge(ChallengeEvent),
}

impl TelemetryEvent {
    /// Event name used to pair `start_event`/`stop_event`
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Api(_) => EVENT_API,
            Self::Cache(_) => EVENT_CACHE,
            Self::Http(_) => EVENT_HTTP,
            Self::Broker(_) => EVENT_BROKER,
            Self::Challenge(_) => EVENT_CHALLENGE,
        }
    }

    /// Properties reported when the event is dispatched on its own
    pub fn properties(&self, elapsed_ms: u64) -> HashMap<String, String> {
        let mut props = HashMap::new();
        props.insert(PROP_EVENT_NAME.to_string(), self.name().to_string());
        props.insert(PROP_ELAPSED_MS.to_string(), elapsed_ms.to_string());
        match self {
            Self::Api(event) => api_properties(event, &mut props),
            Self::Cache(event) => {
                props.insert(status_property(event.tier).to_string(), event.status.as_str().into());
            }
            Self::Http(event) => http_properties(event, &mut props),
            Self::Broker(event) => broker_properties(event, &mut props),
            Self::Challenge(event) => challenge_properties(event, &mut props),
        }
        props
    }

    /// Fold this event into an aggregated per-request record
    pub fn merge_into(&self, record: &mut HashMap<String, String>, elapsed_ms: u64) {
        match self {
            Self::Api(event) => {
                api_properties(event, record);
                record.insert(PROP_API_ELAPSED_MS.to_string(), elapsed_ms.to_string());
            }
            Self::Cache(event) => {
                increment(record, PROP_CACHE_EVENT_COUNT);
                record.insert(status_property(event.tier).to_string(), event.status.as_str().into());
            }
            Self::Http(event) => {
                increment(record, PROP_HTTP_EVENT_COUNT);
                http_properties(event, record);
            }
            Self::Broker(event) => {
                broker_properties(event, record);
                record.insert(PROP_BROKER_APP_USED.to_string(), "true".to_string());
                record.insert(PROP_BROKER_ELAPSED_MS.to_string(), elapsed_ms.to_string());
            }
            Self::Challenge(event) => {
                increment(record, PROP_CHALLENGE_EVENT_COUNT);
                challenge_properties(event, record);
            }
        }
    }
}

fn authority_type(authority: &str) -> &'static str {
    if authority.trim_end_matches('/').to_lowercase().ends_with("/adfs") {
        "adfs"
    } else {
        "aad"
    }
}

const fn status_property(tier: TokenEntryType) -> &'static str {
    match tier {
        TokenEntryType::Rt => PROP_TOKEN_RT_STATUS,
        TokenEntryType::Mrrt => PROP_TOKEN_MRRT_STATUS,
        TokenEntryType::Frt => PROP_TOKEN_FRT_STATUS,
    }
}

fn increment(record: &mut HashMap<String, String>, key: &str) {
    let count = record.get(key).and_then(|v| v.parse::<u64>().ok()).unwrap_or(0) + 1;
    record.insert(key.to_string(), count.to_string());
}

fn api_properties(event: &ApiEvent, props: &mut HashMap<String, String>) {
    props.insert(PROP_API_ID.to_string(), event.api_id.clone());
    props.insert(PROP_AUTHORITY_TYPE.to_string(), event.authority_type.clone());
    props.insert(PROP_EXTENDED_LIFETIME.to_string(), event.is_extended_lifetime_token.to_string());
    if let Some(status) = event.status {
        props.insert(PROP_API_STATUS.to_string(), status.to_string());
    }
    if let Some(id) = event.correlation_id {
        props.insert(PROP_CORRELATION_ID.to_string(), id.to_string());
    }
    if let Some(code) = event.error_code {
        props.insert(PROP_API_ERROR_CODE.to_string(), code.as_str().to_string());
    }
}

fn http_properties(event: &HttpEvent, props: &mut HashMap<String, String>) {
    if let Some(status) = event.status_code {
        props.insert(PROP_HTTP_STATUS.to_string(), status.to_string());
    }
    if let Some(error) = &event.oauth_error {
        props.insert(PROP_OAUTH_ERROR.to_string(), error.clone());
    }
    if let Some(diag) = &event.server_diagnostics {
        props.insert(PROP_SERVER_ERROR.to_string(), diag.error_code.clone());
        props.insert(PROP_SERVER_SUB_ERROR.to_string(), diag.sub_error_code.clone());
        props.insert(PROP_RT_AGE.to_string(), diag.refresh_token_age.clone());
        props.insert(PROP_SPE_RING.to_string(), diag.spe_ring.clone());
    }
}

fn broker_properties(event: &BrokerEvent, props: &mut HashMap<String, String>) {
    if let Some(app) = &event.broker_app {
        props.insert(PROP_BROKER_APP.to_string(), app.clone());
    }
    if let Some(version) = &event.broker_version {
        props.insert(PROP_BROKER_VERSION.to_string(), version.clone());
    }
    if let Some(code) = event.error_code {
        props.insert(PROP_API_ERROR_CODE.to_string(), code.as_str().to_string());
    }
}

fn challenge_properties(event: &ChallengeEvent, props: &mut HashMap<String, String>) {
    let source = match event.source {
        ChallengeSource::Header => "header",
        ChallengeSource::Redirect => "redirect",
    };
    props.insert(PROP_CHALLENGE_SOURCE.to_string(), source.to_string());
    props.insert(PROP_CHALLENGE_SIGNED.to_string(), event.signed.to_string());
}
