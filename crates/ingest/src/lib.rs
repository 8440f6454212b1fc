//! Event ingestion: the two paths that turn server activity into
//! [`GameEvent`](gamebridge_common::GameEvent)s.
//!
//! - [`LogWatcher`] follows the game server's console output through a
//!   [`LogSource`] and matches each line against a fixed grammar.
//! - [`StatePoller`] installs event hooks over the remote command link and
//!   drains the queued records on a timer.

pub mod error;
pub mod kube;
pub mod patterns;
pub mod poller;
pub mod record;
pub mod source;
pub mod watcher;

pub use {
    error::{Error, Result},
    kube::KubeLogSource,
    patterns::LineParser,
    poller::{PollerConfig, Registration, StatePoller},
    record::PolledRecord,
    source::{LineStream, LogSource},
    watcher::LogWatcher,
};
