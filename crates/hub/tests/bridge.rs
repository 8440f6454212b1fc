#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end tests for the hub with in-memory channels and command link.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    async_trait::async_trait,
    gamebridge_channels::{
        Channel, ChannelRegistry, Error, InboundMessages, InboundSender, Result,
    },
    gamebridge_common::{EventFilter, EventObserver, GameEvent, InboundMessage, types::kind},
    gamebridge_discord::format_game_event,
    gamebridge_hub::{EventBridge, QUEUE_CAPACITY},
    gamebridge_ingest::LineParser,
    gamebridge_rcon::CommandExecutor,
    tokio_util::sync::CancellationToken,
};

/// Renders events the way the Discord channel does and keeps the output.
struct RecordingChannel {
    name: &'static str,
    filter: EventFilter,
    sent: Mutex<Vec<String>>,
    inbound_tx: InboundSender,
    inbound: InboundMessages,
}

impl RecordingChannel {
    fn new(name: &'static str, filter: EventFilter) -> Arc<Self> {
        let (inbound_tx, inbound) = InboundMessages::channel(16);
        Arc::new(Self {
            name,
            filter,
            sent: Mutex::new(Vec::new()),
            inbound_tx,
            inbound,
        })
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    async fn type_message(&self, author: &str, content: &str) {
        self.inbound_tx
            .send(InboundMessage {
                source: self.name.to_string(),
                author: author.to_string(),
                content: content.to_string(),
            })
            .await
            .unwrap();
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        self.name
    }

    async fn send(&self, event: &GameEvent) -> Result<()> {
        if !self.filter.allows(&event.kind) {
            return Ok(());
        }
        let rendered = format_game_event(event).unwrap_or_else(|| event.kind.clone());
        self.sent.lock().unwrap().push(rendered);
        Ok(())
    }

    fn messages(&self) -> &InboundMessages {
        &self.inbound
    }

    async fn start(&self, cancel: CancellationToken) -> Result<()> {
        cancel.cancelled().await;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Fails every delivery but still produces inbound messages.
struct FailingChannel {
    attempts: Mutex<usize>,
    inbound_tx: InboundSender,
    inbound: InboundMessages,
}

impl FailingChannel {
    fn new() -> Arc<Self> {
        let (inbound_tx, inbound) = InboundMessages::channel(16);
        Arc::new(Self {
            attempts: Mutex::new(0),
            inbound_tx,
            inbound,
        })
    }
}

#[async_trait]
impl Channel for FailingChannel {
    fn name(&self) -> &str {
        "Broken"
    }

    async fn send(&self, _event: &GameEvent) -> Result<()> {
        *self.attempts.lock().unwrap() += 1;
        Err(Error::unavailable("platform down"))
    }

    fn messages(&self) -> &InboundMessages {
        &self.inbound
    }

    async fn start(&self, cancel: CancellationToken) -> Result<()> {
        cancel.cancelled().await;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Records executed commands; fails the first `fail_first` of them.
struct RecordingLink {
    commands: Mutex<Vec<String>>,
    fail_first: Mutex<usize>,
}

impl RecordingLink {
    fn failing_first(n: usize) -> Arc<Self> {
        Arc::new(Self {
            commands: Mutex::new(Vec::new()),
            fail_first: Mutex::new(n),
        })
    }

    fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandExecutor for RecordingLink {
    async fn execute(&self, command: &str) -> gamebridge_rcon::Result<String> {
        self.commands.lock().unwrap().push(command.to_string());
        let mut remaining = self.fail_first.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(gamebridge_rcon::Error::protocol("link down"));
        }
        Ok(String::new())
    }
}

fn registry(channels: &[Arc<dyn Channel>]) -> ChannelRegistry {
    let mut registry = ChannelRegistry::new();
    for channel in channels {
        registry.register(Arc::clone(channel));
    }
    registry
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn chat_line_reaches_channels_that_allow_chat() {
    let chatty = RecordingChannel::new("Chatty", EventFilter::from_kinds([kind::CHAT]));
    let quiet = RecordingChannel::new("Quiet", EventFilter::from_kinds([kind::JOIN]));
    let bridge = Arc::new(EventBridge::new(
        RecordingLink::failing_first(0),
        registry(&[chatty.clone() as Arc<dyn Channel>, quiet.clone() as Arc<dyn Channel>]),
    ));

    let cancel = CancellationToken::new();
    let task = tokio::spawn({
        let bridge = Arc::clone(&bridge);
        let cancel = cancel.clone();
        async move { bridge.broadcast(cancel).await }
    });

    let event = LineParser::new().unwrap().parse("[CHAT] Alice: hello").unwrap();
    bridge.events().on_event(&event);
    settle().await;
    cancel.cancel();
    task.await.unwrap();

    assert_eq!(chatty.sent(), vec!["💬 **Alice**: hello"]);
    assert!(quiet.sent().is_empty());
}

#[tokio::test]
async fn delivers_in_queue_order() {
    let channel = RecordingChannel::new("Ordered", EventFilter::All);
    let bridge = Arc::new(EventBridge::new(
        RecordingLink::failing_first(0),
        registry(&[channel.clone() as Arc<dyn Channel>]),
    ));
    let sender = bridge.events();
    for player in ["a", "b", "c"] {
        assert!(sender.offer(GameEvent::new(kind::JOIN).with_player(player)));
    }

    let cancel = CancellationToken::new();
    let task = tokio::spawn({
        let bridge = Arc::clone(&bridge);
        let cancel = cancel.clone();
        async move { bridge.broadcast(cancel).await }
    });
    settle().await;
    cancel.cancel();
    task.await.unwrap();

    assert_eq!(channel.sent(), vec![
        "➡️ **a** joined the game",
        "➡️ **b** joined the game",
        "➡️ **c** joined the game",
    ]);
}

#[tokio::test]
async fn overflow_is_dropped_without_blocking() {
    let channel = RecordingChannel::new("Slow", EventFilter::All);
    let bridge = Arc::new(EventBridge::new(
        RecordingLink::failing_first(0),
        registry(&[channel.clone() as Arc<dyn Channel>]),
    ));
    let sender = bridge.events();

    let accepted = (0..QUEUE_CAPACITY + 50)
        .filter(|_| sender.offer(GameEvent::new(kind::ROCKET)))
        .count();
    assert_eq!(accepted, QUEUE_CAPACITY);

    let cancel = CancellationToken::new();
    let task = tokio::spawn({
        let bridge = Arc::clone(&bridge);
        let cancel = cancel.clone();
        async move { bridge.broadcast(cancel).await }
    });
    settle().await;
    cancel.cancel();
    task.await.unwrap();

    assert_eq!(channel.sent().len(), QUEUE_CAPACITY);
}

#[tokio::test]
async fn failing_channel_does_not_affect_others() {
    let broken = FailingChannel::new();
    let healthy = RecordingChannel::new("Healthy", EventFilter::All);
    let link = RecordingLink::failing_first(0);
    let bridge = Arc::new(EventBridge::new(
        link.clone(),
        registry(&[broken.clone() as Arc<dyn Channel>, healthy.clone() as Arc<dyn Channel>]),
    ));

    let cancel = CancellationToken::new();
    let mut tasks = Vec::new();
    tasks.push(tokio::spawn({
        let bridge = Arc::clone(&bridge);
        let cancel = cancel.clone();
        async move { bridge.broadcast(cancel).await }
    }));
    for channel in [broken.clone() as Arc<dyn Channel>, healthy.clone() as Arc<dyn Channel>] {
        let bridge = Arc::clone(&bridge);
        let cancel = cancel.clone();
        tasks.push(tokio::spawn(async move {
            bridge.relay_inbound(cancel, channel).await
        }));
    }

    let sender = bridge.events();
    sender.offer(GameEvent::new(kind::LEAVE).with_player("Alice"));
    sender.offer(GameEvent::new(kind::ROCKET));
    healthy.type_message("bob", "hi from healthy").await;
    broken
        .inbound_tx
        .send(InboundMessage {
            source: "Broken".into(),
            author: "carol".into(),
            content: "hi from broken".into(),
        })
        .await
        .unwrap();
    settle().await;
    cancel.cancel();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(*broken.attempts.lock().unwrap(), 2);
    assert_eq!(healthy.sent(), vec![
        "⬅️ **Alice** left the game",
        "🚀 **Rocket launched!**"
    ]);

    let mut commands = link.commands();
    commands.sort();
    assert_eq!(commands, vec![
        r#"/sc game.print("[color=purple][Broken][/color] carol: hi from broken")"#,
        r#"/sc game.print("[color=purple][Healthy][/color] bob: hi from healthy")"#,
    ]);
}

#[tokio::test]
async fn relay_continues_after_a_failed_command() {
    let channel = RecordingChannel::new("Discord", EventFilter::All);
    let link = RecordingLink::failing_first(1);
    let bridge = Arc::new(EventBridge::new(link.clone(), registry(&[channel.clone() as Arc<dyn Channel>])));

    let cancel = CancellationToken::new();
    let task = tokio::spawn({
        let bridge = Arc::clone(&bridge);
        let cancel = cancel.clone();
        let channel = channel.clone() as Arc<dyn Channel>;
        async move { bridge.relay_inbound(cancel, channel).await }
    });

    channel.type_message("alice", "first").await;
    channel.type_message("alice", "second \"quoted\"\nline").await;
    settle().await;
    cancel.cancel();
    task.await.unwrap();

    assert_eq!(link.commands(), vec![
        r#"/sc game.print("[color=purple][Discord][/color] alice: first")"#,
        r#"/sc game.print("[color=purple][Discord][/color] alice: second \"quoted\" line")"#,
    ]);
}

#[tokio::test]
async fn broadcast_stops_on_cancel() {
    let bridge = EventBridge::new(RecordingLink::failing_first(0), ChannelRegistry::new());
    let cancel = CancellationToken::new();
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), bridge.broadcast(cancel))
        .await
        .expect("broadcast should return once cancelled");
}
