//! Shared types, error definitions, and the observer contract used across all
//! gamebridge crates.

pub mod error;
pub mod filter;
pub mod observer;
pub mod types;

pub use {
    error::FromMessage,
    filter::EventFilter,
    observer::{EventObserver, Observers},
    types::{GameEvent, InboundMessage},
};
