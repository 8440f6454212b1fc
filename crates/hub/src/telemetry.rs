use {
    gamebridge_common::{EventFilter, EventObserver, GameEvent},
    tracing::{info, info_span},
};

#[cfg(feature = "metrics")]
use gamebridge_metrics::{counter, events as event_metrics, labels};

/// Target of the structured event records, for routing by log shippers.
pub const TARGET: &str = "gamebridge::events";

/// Emits each allowed event as a structured log record inside a `game_event`
/// span, so span exporters carry it as well.
#[derive(Debug, Clone, Default)]
pub struct TelemetryObserver {
    filter: EventFilter,
}

impl TelemetryObserver {
    pub fn new(filter: EventFilter) -> Self {
        Self { filter }
    }

    /// Record `event` if allowed. Returns whether a record was emitted.
    pub fn record(&self, event: &GameEvent) -> bool {
        if !self.filter.allows(&event.kind) {
            return false;
        }
        let attributes = serde_json::to_string(&event.attributes()).unwrap_or_default();
        let _span = info_span!(target: TARGET, "game_event", kind = %event.kind).entered();
        info!(
            target: TARGET,
            kind = %event.kind,
            player = event.player.as_deref(),
            message = event.message.as_deref(),
            attributes = %attributes,
            timestamp = %event.timestamp.to_rfc3339(),
            "game event"
        );
        #[cfg(feature = "metrics")]
        counter!(event_metrics::TELEMETRY_TOTAL, labels::KIND => event.kind.clone()).increment(1);
        true
    }
}

impl EventObserver for TelemetryObserver {
    fn on_event(&self, event: &GameEvent) {
        self.record(event);
    }
}
