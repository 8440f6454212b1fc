//! Console line grammar.

use {
    chrono::{DateTime, Utc},
    gamebridge_common::{
        GameEvent,
        types::{extra, kind},
    },
    regex::Regex,
};

use crate::Result;

/// Matches console lines against the known event patterns.
///
/// Patterns are unanchored and tried in a fixed order: chat, join, leave,
/// research finished, rocket launched, save started. The first match wins.
#[derive(Debug, Clone)]
pub struct LineParser {
    chat: Regex,
    join: Regex,
    leave: Regex,
    research: Regex,
    rocket: Regex,
    save: Regex,
}

impl LineParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            chat: Regex::new(r"\[CHAT\]\s+(.+?):\s+(.+)")?,
            join: Regex::new(r"(.+?)\s+joined the game")?,
            leave: Regex::new(r"(.+?)\s+left the game")?,
            research: Regex::new(r"Research finished:\s+(.+)")?,
            rocket: Regex::new(r"Rocket launched")?,
            save: Regex::new(r"Saving game as\s+(.+)")?,
        })
    }

    /// Parse one line, stamping the event with the current time.
    pub fn parse(&self, line: &str) -> Option<GameEvent> {
        self.parse_at(line, Utc::now())
    }

    pub fn parse_at(&self, line: &str, at: DateTime<Utc>) -> Option<GameEvent> {
        let line = line.trim_end_matches('\r');

        if let Some(caps) = self.chat.captures(line) {
            return Some(
                GameEvent::at(kind::CHAT, at)
                    .with_player(&caps[1])
                    .with_message(&caps[2]),
            );
        }
        if let Some(caps) = self.join.captures(line) {
            return Some(GameEvent::at(kind::JOIN, at).with_player(&caps[1]));
        }
        if let Some(caps) = self.leave.captures(line) {
            return Some(GameEvent::at(kind::LEAVE, at).with_player(&caps[1]));
        }
        if let Some(caps) = self.research.captures(line) {
            return Some(GameEvent::at(kind::RESEARCH, at).with_extra(extra::TECH, &caps[1]));
        }
        if self.rocket.is_match(line) {
            return Some(GameEvent::at(kind::ROCKET, at));
        }
        self.save
            .captures(line)
            .map(|caps| GameEvent::at(kind::SAVE, at).with_extra(extra::NAME, &caps[1]))
    }
}
