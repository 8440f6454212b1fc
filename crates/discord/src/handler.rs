//! Discord event handler for serenity.

use std::sync::OnceLock;

use {
    gamebridge_channels::InboundSender,
    gamebridge_common::InboundMessage,
    serenity::{
        all::{ChannelId, Context, EventHandler, GatewayIntents, Message, Ready, UserId},
        async_trait,
    },
    tracing::{debug, info, warn},
};

/// Source tag stamped on relayed messages.
pub const SOURCE: &str = "Discord";

/// Decides which gateway messages are relayed into the game.
#[derive(Debug)]
pub struct InboundFilter {
    target: ChannelId,
    bot_user_id: OnceLock<UserId>,
}

impl InboundFilter {
    pub fn new(target: ChannelId) -> Self {
        Self {
            target,
            bot_user_id: OnceLock::new(),
        }
    }

    /// Remember the bot's own identity. Later calls are ignored.
    pub fn set_bot_user(&self, id: UserId) {
        let _ = self.bot_user_id.set(id);
    }

    pub fn admits(&self, is_bot: bool, author: UserId, channel: ChannelId, content: &str) -> bool {
        if is_bot || self.bot_user_id.get() == Some(&author) {
            return false;
        }
        channel == self.target && !content.is_empty()
    }
}

/// Global display name when set, else the account username.
pub fn display_name(global_name: Option<&str>, username: &str) -> String {
    global_name
        .filter(|name| !name.is_empty())
        .unwrap_or(username)
        .to_string()
}

/// Handler for Discord gateway events.
pub struct DiscordHandler {
    pub filter: InboundFilter,
    pub inbound: InboundSender,
}

impl DiscordHandler {
    /// Required gateway intents for the bot.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
    }
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            "discord bot connected"
        );
        self.filter.set_bot_user(ready.user.id);
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        if !self
            .filter
            .admits(msg.author.bot, msg.author.id, msg.channel_id, &msg.content)
        {
            return;
        }

        let author = display_name(msg.author.global_name.as_deref(), &msg.author.name);
        debug!(author = %author, "discord message queued for relay");

        let message = InboundMessage {
            source: SOURCE.to_string(),
            author,
            content: msg.content,
        };
        if self.inbound.send(message).await.is_err() {
            warn!("discord inbound queue closed, dropping message");
        }
    }
}
