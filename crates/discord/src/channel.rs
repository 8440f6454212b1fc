use std::sync::Arc;

use {
    async_trait::async_trait,
    gamebridge_channels::{Channel, Error, InboundMessages, InboundSender, Result},
    gamebridge_common::GameEvent,
    secrecy::ExposeSecret,
    serenity::{Client, all::ChannelId, gateway::ShardManager, http::Http},
    tokio::sync::Mutex,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    config::DiscordConfig,
    format::format_game_event,
    handler::{DiscordHandler, InboundFilter, SOURCE},
};

/// Inbound messages buffered for the hub before the gateway handler waits.
pub const INBOUND_CAPACITY: usize = 100;

/// A [`Channel`] backed by one Discord text channel.
pub struct DiscordChannel {
    config: DiscordConfig,
    target: ChannelId,
    http: Arc<Http>,
    inbound_tx: InboundSender,
    inbound: InboundMessages,
    shards: Mutex<Option<Arc<ShardManager>>>,
}

impl DiscordChannel {
    pub fn new(config: DiscordConfig) -> Result<Self> {
        if config.channel_id == 0 {
            return Err(Error::invalid_input("discord channel id must be non-zero"));
        }
        if config.token.expose_secret().is_empty() {
            return Err(Error::invalid_input("discord bot token is empty"));
        }
        let (inbound_tx, inbound) = InboundMessages::channel(INBOUND_CAPACITY);
        Ok(Self {
            target: ChannelId::new(config.channel_id),
            http: Arc::new(Http::new(config.token.expose_secret())),
            config,
            inbound_tx,
            inbound,
            shards: Mutex::new(None),
        })
    }

    async fn shutdown(&self) {
        if let Some(shards) = self.shards.lock().await.take() {
            shards.shutdown_all().await;
        }
    }
}

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &str {
        SOURCE
    }

    async fn send(&self, event: &GameEvent) -> Result<()> {
        if !self.config.events.allows(&event.kind) {
            return Ok(());
        }
        let Some(text) = format_game_event(event) else {
            debug!(kind = %event.kind, "no discord rendering for event kind");
            return Ok(());
        };
        self.target
            .say(&self.http, text)
            .await
            .map_err(|e| Error::external("send to discord", e))?;
        Ok(())
    }

    fn messages(&self) -> &InboundMessages {
        &self.inbound
    }

    async fn start(&self, cancel: CancellationToken) -> Result<()> {
        let handler = DiscordHandler {
            filter: InboundFilter::new(self.target),
            inbound: self.inbound_tx.clone(),
        };
        let token = self.config.token.expose_secret();
        let mut client = Client::builder(token, DiscordHandler::intents())
            .event_handler(handler)
            .await
            .map_err(|e| Error::connect("discord client", e))?;
        *self.shards.lock().await = Some(Arc::clone(&client.shard_manager));

        info!(channel_id = %self.target, "starting discord gateway");
        let outcome = tokio::select! {
            result = client.start() => result.map_err(|e| Error::connect("discord gateway", e)),
            () = cancel.cancelled() => Ok(()),
        };

        self.shutdown().await;
        if let Err(e) = &outcome {
            warn!(error = %e, "discord gateway stopped");
        } else {
            info!("discord gateway stopped");
        }
        outcome
    }

    async fn close(&self) -> Result<()> {
        self.shutdown().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_channel_id() {
        assert!(matches!(
            DiscordChannel::new(DiscordConfig::new("token", 0)),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn rejects_empty_token() {
        assert!(matches!(
            DiscordChannel::new(DiscordConfig::new("", 1)),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[tokio::test]
    async fn filtered_kind_is_a_no_op() {
        let cfg = DiscordConfig::new("token", 1)
            .with_events(gamebridge_common::EventFilter::from_kinds(["join"]));
        let Ok(channel) = DiscordChannel::new(cfg) else {
            panic!("channel should build");
        };
        let event = GameEvent::new("chat")
            .with_player("Alice")
            .with_message("hello");
        assert!(channel.send(&event).await.is_ok());
    }

    #[tokio::test]
    async fn unrenderable_kind_is_a_no_op() {
        let Ok(channel) = DiscordChannel::new(DiscordConfig::new("token", 1)) else {
            panic!("channel should build");
        };
        assert!(channel.send(&GameEvent::new("save")).await.is_ok());
    }
}
