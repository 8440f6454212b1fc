//! Channel abstraction.
//!
//! Each external chat surface (Discord, etc.) implements the [`Channel`] trait:
//! it receives game events for outbound delivery and exposes the messages its
//! users type so the hub can relay them into the game.

pub mod error;
pub mod plugin;
pub mod registry;

pub use {
    error::{Error, Result},
    plugin::{Channel, InboundMessages, InboundSender},
    registry::ChannelRegistry,
};
