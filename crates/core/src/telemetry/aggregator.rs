//! Telemetry aggregator
//!
//! Events are bracketed by `start_event`/`stop_event` under a request id. In
//! aggregated mode stopped events are buffered per request and flattened
//! into one record on `flush`; otherwise each event is dispatched as soon as
//! it stops.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use authlink_common::time::{Clock, SystemClock};
use authlink_domain::TelemetryConfig;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::events::{TelemetryEvent, PROP_REQUEST_ID};
use super::ports::TelemetrySink;

type EventKey = (String, String);

#[derive(Debug, Clone)]
struct StoppedEvent {
    event: TelemetryEvent,
    elapsed_ms: u64,
}

/// Per-request telemetry buffer
pub struct TelemetryAggregator {
    sink: Arc<dyn TelemetrySink>,
    clock: Arc<dyn Clock>,
    config: TelemetryConfig,
    started: Mutex<HashMap<EventKey, Instant>>,
    buffered: Mutex<HashMap<String, Vec<StoppedEvent>>>,
}

impl TelemetryAggregator {
    pub fn new(sink: Arc<dyn TelemetrySink>, config: TelemetryConfig) -> Self {
        Self::with_clock(sink, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        sink: Arc<dyn TelemetrySink>,
        config: TelemetryConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sink,
            clock,
            config,
            started: Mutex::new(HashMap::new()),
            buffered: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Mark the start of `event_name` for `request_id`
    pub fn start_event(&self, request_id: &str, event_name: &str) {
        if !self.config.enabled {
            return;
        }
        self.started
            .lock()
            .insert((request_id.to_string(), event_name.to_string()), self.clock.now());
    }

    /// Complete an event started with [`start_event`](Self::start_event)
    ///
    /// A stop without a matching start is logged and dropped.
    pub fn stop_event(&self, request_id: &str, event: TelemetryEvent, event_name: &str) {
        if !self.config.enabled {
            return;
        }

        let started =
            self.started.lock().remove(&(request_id.to_string(), event_name.to_string()));
        let Some(started_at) = started else {
            warn!(request_id, event_name, "Telemetry stop_event without matching start_event");
            return;
        };

        let elapsed = self.clock.now().saturating_duration_since(started_at);
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        if self.config.aggregate {
            self.buffered
                .lock()
                .entry(request_id.to_string())
                .or_default()
                .push(StoppedEvent { event, elapsed_ms });
        } else {
            let mut props = event.properties(elapsed_ms);
            props.insert(PROP_REQUEST_ID.to_string(), request_id.to_string());
            self.sink.dispatch(props);
        }
    }

    /// Start and immediately stop an event that has no meaningful duration
    pub fn record(&self, request_id: &str, event: TelemetryEvent) {
        let name = event.name();
        self.start_event(request_id, name);
        self.stop_event(request_id, event, name);
    }

    /// Merge every buffered event of `request_id` into one record and
    /// dispatch it
    pub fn flush(&self, request_id: &str) {
        if !self.config.enabled {
            return;
        }

        // Drop start markers whose stop never arrived.
        self.started.lock().retain(|(id, _), _| id != request_id);

        let events = self.buffered.lock().remove(request_id);
        let Some(events) = events else {
            debug!(request_id, "Nothing to flush for request");
            return;
        };

        let mut record = HashMap::new();
        record.insert(PROP_REQUEST_ID.to_string(), request_id.to_string());
        for stopped in &events {
            stopped.event.merge_into(&mut record, stopped.elapsed_ms);
        }

        debug!(request_id, events = events.len(), "Flushing telemetry record");
        self.sink.dispatch(record);
    }

    /// Requests with buffered events
    pub fn pending_requests(&self) -> usize {
        self.buffered.lock().len()
    }
}
