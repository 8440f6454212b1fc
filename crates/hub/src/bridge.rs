use std::sync::Arc;

use {
    gamebridge_channels::{Channel, ChannelRegistry},
    gamebridge_common::{EventObserver, GameEvent},
    gamebridge_rcon::CommandExecutor,
    tokio::sync::{
        Mutex,
        mpsc::{self, error::TrySendError},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use gamebridge_metrics::{
    channels as ch_metrics, counter, events as event_metrics, labels,
};

use crate::sanitize::relay_command;

/// Events buffered between the ingestion paths and the broadcaster.
pub const QUEUE_CAPACITY: usize = 100;

/// Non-blocking write endpoint into the bridge queue.
///
/// A full queue drops the event so a slow channel never stalls ingestion.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<GameEvent>,
}

impl EventSender {
    /// Enqueue `event`. Returns `false` if it was dropped.
    pub fn offer(&self, event: GameEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                debug!(kind = %event.kind, "event queue full, dropping event");
                #[cfg(feature = "metrics")]
                counter!(event_metrics::DROPPED_TOTAL).increment(1);
                false
            },
            Err(TrySendError::Closed(event)) => {
                debug!(kind = %event.kind, "event queue closed, dropping event");
                false
            },
        }
    }
}

impl EventObserver for EventSender {
    fn on_event(&self, event: &GameEvent) {
        self.offer(event.clone());
    }
}

/// Fans events out to every channel and relays inbound messages into the
/// game over the shared command link.
pub struct EventBridge {
    link: Arc<dyn CommandExecutor>,
    channels: ChannelRegistry,
    tx: mpsc::Sender<GameEvent>,
    rx: Mutex<mpsc::Receiver<GameEvent>>,
}

impl EventBridge {
    pub fn new(link: Arc<dyn CommandExecutor>, channels: ChannelRegistry) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        Self {
            link,
            channels,
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Write endpoint for observers.
    pub fn events(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    /// Drain the queue until `cancel` fires, delivering each event to every
    /// channel in registration order.
    pub async fn broadcast(&self, cancel: CancellationToken) {
        let mut rx = self.rx.lock().await;
        loop {
            let event = tokio::select! {
                () = cancel.cancelled() => return,
                event = rx.recv() => match event {
                    Some(event) => event,
                    None => return,
                },
            };
            self.deliver(&event).await;
        }
    }

    async fn deliver(&self, event: &GameEvent) {
        for channel in self.channels.iter() {
            match channel.send(event).await {
                Ok(()) => {
                    #[cfg(feature = "metrics")]
                    counter!(ch_metrics::DELIVERIES_TOTAL, labels::CHANNEL => channel.name().to_string())
                        .increment(1);
                },
                Err(e) => {
                    warn!(channel = channel.name(), kind = %event.kind, error = %e, "event delivery failed");
                    #[cfg(feature = "metrics")]
                    counter!(ch_metrics::DELIVERY_ERRORS_TOTAL, labels::CHANNEL => channel.name().to_string())
                        .increment(1);
                },
            }
        }
    }

    /// Relay messages typed in `channel` into the game until `cancel` fires
    /// or the channel's inbound stream ends.
    pub async fn relay_inbound(&self, cancel: CancellationToken, channel: Arc<dyn Channel>) {
        loop {
            let message = tokio::select! {
                () = cancel.cancelled() => return,
                message = channel.messages().recv() => match message {
                    Some(message) => message,
                    None => {
                        info!(channel = channel.name(), "inbound stream closed");
                        return;
                    },
                },
            };

            let command = relay_command(&message);
            match self.link.execute(&command).await {
                Ok(_) => {
                    debug!(channel = channel.name(), author = %message.author, "relayed message");
                    #[cfg(feature = "metrics")]
                    counter!(ch_metrics::INBOUND_RELAYED_TOTAL, labels::CHANNEL => channel.name().to_string())
                        .increment(1);
                },
                Err(e) => {
                    warn!(channel = channel.name(), error = %e, "relay into game failed");
                    #[cfg(feature = "metrics")]
                    counter!(ch_metrics::INBOUND_ERRORS_TOTAL, labels::CHANNEL => channel.name().to_string())
                        .increment(1);
                },
            }
        }
    }
}
