use {
    async_trait::async_trait,
    gamebridge_common::{GameEvent, InboundMessage},
    tokio::sync::{Mutex, mpsc},
    tokio_util::sync::CancellationToken,
};

use crate::Result;

/// Sending half of a channel's inbound queue, held by the platform handler.
pub type InboundSender = mpsc::Sender<InboundMessage>;

/// Continuous stream of messages typed by users of a channel.
pub struct InboundMessages {
    rx: Mutex<mpsc::Receiver<InboundMessage>>,
}

impl InboundMessages {
    /// Create a bounded inbound queue.
    pub fn channel(capacity: usize) -> (InboundSender, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx: Mutex::new(rx) })
    }

    /// Wait for the next message. Returns `None` once every sender is gone.
    pub async fn recv(&self) -> Option<InboundMessage> {
        self.rx.lock().await.recv().await
    }
}

/// Core channel trait. Each chat platform implements this once.
///
/// Implementations must:
/// - apply their own per-kind filter in [`Channel::send`], returning `Ok(())`
///   without side effects for filtered kinds;
/// - never surface their own messages, or messages from any automated
///   identity, on [`Channel::messages`];
/// - ignore messages from rooms other than their configured target.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name, also used as the in-game source tag.
    fn name(&self) -> &str;

    /// Deliver one game event.
    async fn send(&self, event: &GameEvent) -> Result<()>;

    /// Messages typed by users, destined for the game.
    fn messages(&self) -> &InboundMessages;

    /// Establish the platform session and block until `cancel` fires, then
    /// tear the session down.
    async fn start(&self, cancel: CancellationToken) -> Result<()>;

    /// Release platform resources.
    async fn close(&self) -> Result<()>;
}
