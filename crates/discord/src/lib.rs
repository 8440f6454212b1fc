//! Discord channel for gamebridge.
//!
//! Posts game events to a single text channel through the bot HTTP API and
//! relays what users type in that channel back to the hub.

pub mod channel;
pub mod config;
pub mod format;
pub mod handler;

pub use {
    channel::DiscordChannel,
    config::DiscordConfig,
    format::format_game_event,
};
