//! Event and message shapes passed between the ingestion paths, the hub, and
//! the channels.

use std::collections::BTreeMap;

use {
    chrono::{DateTime, Utc},
    serde::Serialize,
};

/// Recognized event kind tags.
///
/// The first group is produced by the log watcher, the rest by the state
/// poller. Poll records may carry kinds outside this list; they flow through
/// the pipeline but render to nothing on format-dependent channels.
pub mod kind {
    pub const CHAT: &str = "chat";
    pub const JOIN: &str = "join";
    pub const LEAVE: &str = "leave";
    pub const RESEARCH: &str = "research";
    pub const ROCKET: &str = "rocket";
    pub const SAVE: &str = "save";

    pub const RESEARCH_STARTED: &str = "research_started";
    pub const RESEARCH_CANCELLED: &str = "research_cancelled";
    pub const PLAYER_DIED: &str = "player_died";
    pub const PLAYER_RESPAWNED: &str = "player_respawned";
    pub const PLAYER_CHANGED_SURFACE: &str = "player_changed_surface";
    pub const PLAYER_PROMOTED: &str = "player_promoted";
    pub const PLAYER_DEMOTED: &str = "player_demoted";
    pub const ROCKET_LAUNCH_ORDERED: &str = "rocket_launch_ordered";
    pub const PLATFORM_STATE_CHANGED: &str = "platform_state_changed";
    pub const CARGO_ASCENDED: &str = "cargo_ascended";
    pub const CARGO_DESCENDED: &str = "cargo_descended";
    pub const SPAWNER_DESTROYED: &str = "spawner_destroyed";
    pub const SURFACE_CREATED: &str = "surface_created";
    pub const TAG_ADDED: &str = "tag_added";
}

/// Keys allowed in [`GameEvent::extra`].
pub mod extra {
    pub const TECH: &str = "tech";
    pub const NAME: &str = "name";
    pub const CAUSE: &str = "cause";
    pub const SURFACE: &str = "surface";
    pub const STATE: &str = "state";
    pub const TEXT: &str = "text";
}

/// A single event observed on the game server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameEvent {
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl GameEvent {
    /// Create an event of the given kind stamped with the current time.
    pub fn new(kind: impl Into<String>) -> Self {
        Self::at(kind, Utc::now())
    }

    pub fn at(kind: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: kind.into(),
            player: None,
            message: None,
            extra: BTreeMap::new(),
            timestamp,
        }
    }

    #[must_use]
    pub fn with_player(mut self, player: impl Into<String>) -> Self {
        self.player = Some(player.into());
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_extra(mut self, key: &str, value: impl Into<String>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    /// Look up a kind-specific field, empty when absent.
    pub fn extra(&self, key: &str) -> &str {
        self.extra.get(key).map(String::as_str).unwrap_or_default()
    }

    /// Player name, empty for non-player events.
    pub fn player(&self) -> &str {
        self.player.as_deref().unwrap_or_default()
    }

    /// Flatten player, message and extra fields into one attribute map.
    pub fn attributes(&self) -> BTreeMap<&str, &str> {
        let mut attrs = BTreeMap::new();
        if let Some(player) = self.player.as_deref().filter(|p| !p.is_empty()) {
            attrs.insert("player", player);
        }
        if let Some(message) = self.message.as_deref().filter(|m| !m.is_empty()) {
            attrs.insert("message", message);
        }
        for (k, v) in &self.extra {
            attrs.insert(k.as_str(), v.as_str());
        }
        attrs
    }
}

/// A message typed in an external channel, destined for the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Channel name, e.g. "Discord".
    pub source: String,
    pub author: String,
    pub content: String,
}
