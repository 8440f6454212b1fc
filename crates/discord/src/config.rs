use {gamebridge_common::EventFilter, secrecy::Secret};

/// Connection settings for the Discord bot.
#[derive(Clone)]
pub struct DiscordConfig {
    /// Bot token.
    pub token: Secret<String>,
    /// Target text channel. Messages elsewhere are ignored.
    pub channel_id: u64,
    /// Event kinds forwarded to the channel.
    pub events: EventFilter,
}

impl DiscordConfig {
    pub fn new(token: impl Into<String>, channel_id: u64) -> Self {
        Self {
            token: Secret::new(token.into()),
            channel_id,
            events: EventFilter::All,
        }
    }

    #[must_use]
    pub fn with_events(mut self, events: EventFilter) -> Self {
        self.events = events;
        self
    }
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"[REDACTED]")
            .field("channel_id", &self.channel_id)
            .field("events", &self.events)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_token() {
        let cfg = DiscordConfig::new("super-secret-token", 42);
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("super-secret-token"));
        assert!(rendered.contains("[REDACTED]"));
        assert!(rendered.contains("42"));
    }
}
