//! The event hub: fans game events out to every channel and relays what
//! channel users type back into the game.

pub mod bridge;
pub mod sanitize;
pub mod telemetry;

pub use {
    bridge::{EventBridge, EventSender, QUEUE_CAPACITY},
    sanitize::{relay_command, sanitize},
    telemetry::TelemetryObserver,
};
