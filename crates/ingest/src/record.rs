use {
    chrono::{DateTime, Utc},
    gamebridge_common::{GameEvent, types::extra},
    serde::Deserialize,
};

/// One queued record drained from the server-side hooks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PolledRecord {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub player: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cause: Option<String>,
    #[serde(default)]
    pub surface: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    /// Game tick the record was queued at.
    #[serde(default)]
    pub tick: i64,
}

impl PolledRecord {
    /// Parse a poll response body: a JSON array of records.
    pub fn parse_batch(body: &str) -> serde_json::Result<Vec<Self>> {
        serde_json::from_str(body)
    }

    /// Convert into an event. Absent or empty fields are left out.
    pub fn into_event(self, at: DateTime<Utc>) -> GameEvent {
        let mut event = GameEvent::at(self.kind, at);
        if let Some(player) = non_empty(self.player) {
            event = event.with_player(player);
        }
        for (key, value) in [
            (extra::NAME, self.name),
            (extra::CAUSE, self.cause),
            (extra::SURFACE, self.surface),
            (extra::STATE, self.state),
            (extra::TEXT, self.text),
        ] {
            if let Some(value) = non_empty(value) {
                event = event.with_extra(key, value);
            }
        }
        event
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
