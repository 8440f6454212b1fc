use std::sync::Arc;

#[cfg(feature = "metrics")]
use gamebridge_metrics::{channels as ch_metrics, gauge};

use crate::plugin::Channel;

/// The channels wired into the hub, fixed at startup and kept in registration
/// order.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    channels: Vec<Arc<dyn Channel>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, channel: Arc<dyn Channel>) {
        self.channels.push(channel);
        #[cfg(feature = "metrics")]
        gauge!(ch_metrics::ACTIVE).set(self.channels.len() as f64);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Channel>> {
        self.channels.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
