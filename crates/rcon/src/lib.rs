//! RCON access to the game server's administrative command interface.
//!
//! [`RemoteCommandLink`] owns at most one connection, serializes every command
//! through it, and transparently redials once when a command fails on a stale
//! connection. Consumers depend on the [`CommandExecutor`] trait so they can be
//! driven by a scripted executor in tests.

pub mod error;
pub mod link;
pub mod packet;
pub mod tcp;

pub use {
    error::{Error, Result},
    link::{CommandConnection, CommandExecutor, Dialer, RemoteCommandLink},
    tcp::{RconConnection, TcpDialer},
};
