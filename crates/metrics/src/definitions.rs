//! Metric name and label definitions.
//!
//! Centralizing these definitions keeps names consistent across the crates
//! that record them and documents what is exported.

/// RCON link metrics
pub mod rcon {
    /// Total number of commands executed (successful or not)
    pub const COMMANDS_TOTAL: &str = "gamebridge_rcon_commands_total";
    /// Commands that failed after the reconnect attempt
    pub const ERRORS_TOTAL: &str = "gamebridge_rcon_errors_total";
    /// Connections dialed (first connect and every reconnect)
    pub const DIALS_TOTAL: &str = "gamebridge_rcon_dials_total";
    /// Command round-trip duration in seconds
    pub const COMMAND_DURATION_SECONDS: &str = "gamebridge_rcon_command_duration_seconds";
}

/// Log watcher metrics
pub mod log_watcher {
    /// Lines read from the instance log stream
    pub const LINES_TOTAL: &str = "gamebridge_log_lines_total";
    /// Stream cycles that ended in an error and were retried
    pub const RETRIES_TOTAL: &str = "gamebridge_log_retries_total";
    /// Instance changes observed
    pub const INSTANCE_CHANGES_TOTAL: &str = "gamebridge_log_instance_changes_total";
}

/// State poller metrics
pub mod poller {
    /// Registration sequences attempted
    pub const REGISTRATIONS_TOTAL: &str = "gamebridge_poller_registrations_total";
    /// Registration sequences that failed at some step
    pub const REGISTRATION_FAILURES_TOTAL: &str = "gamebridge_poller_registration_failures_total";
    /// 1 when hooks are installed server-side, 0 otherwise
    pub const REGISTERED: &str = "gamebridge_poller_registered";
    /// Poll responses that could not be parsed
    pub const PARSE_ERRORS_TOTAL: &str = "gamebridge_poller_parse_errors_total";
}

/// Event pipeline metrics
pub mod events {
    /// Events produced, labelled by `source` and `kind`
    pub const PRODUCED_TOTAL: &str = "gamebridge_events_produced_total";
    /// Events dropped because the bridge queue was full
    pub const DROPPED_TOTAL: &str = "gamebridge_events_dropped_total";
    /// Events emitted as telemetry records
    pub const TELEMETRY_TOTAL: &str = "gamebridge_events_telemetry_total";
}

/// Channel metrics
pub mod channels {
    /// Number of registered channels
    pub const ACTIVE: &str = "gamebridge_channels_active";
    /// Events delivered to a channel, labelled by `channel`
    pub const DELIVERIES_TOTAL: &str = "gamebridge_channel_deliveries_total";
    /// Failed deliveries, labelled by `channel`
    pub const DELIVERY_ERRORS_TOTAL: &str = "gamebridge_channel_delivery_errors_total";
    /// Inbound messages relayed into the game, labelled by `channel`
    pub const INBOUND_RELAYED_TOTAL: &str = "gamebridge_channel_inbound_relayed_total";
    /// Inbound messages that failed to relay, labelled by `channel`
    pub const INBOUND_ERRORS_TOTAL: &str = "gamebridge_channel_inbound_errors_total";
}

/// Common label keys
pub mod labels {
    pub const SOURCE: &str = "source";
    pub const KIND: &str = "kind";
    pub const CHANNEL: &str = "channel";
}

/// Histogram bucket boundaries
pub mod buckets {
    /// RCON command durations, 1ms to 10s
    pub const RCON_DURATION: &[f64] = &[
        0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];
}
