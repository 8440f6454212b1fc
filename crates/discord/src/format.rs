//! Discord markdown rendering of game events.

use gamebridge_common::{
    GameEvent,
    types::{extra, kind},
};

/// Render an event as a Discord message.
///
/// Returns `None` for kinds without a Discord rendering; callers skip those.
pub fn format_game_event(event: &GameEvent) -> Option<String> {
    let player = event.player();
    let text = match event.kind.as_str() {
        kind::CHAT => format!(
            "💬 **{player}**: {}",
            event.message.as_deref().unwrap_or_default()
        ),
        kind::JOIN => format!("➡️ **{player}** joined the game"),
        kind::LEAVE => format!("⬅️ **{player}** left the game"),
        kind::RESEARCH => format!("🔬 Research completed: **{}**", event.extra(extra::TECH)),
        kind::ROCKET => "🚀 **Rocket launched!**".to_string(),

        kind::RESEARCH_STARTED => format!("🔬 Research started: **{}**", event.extra(extra::NAME)),
        kind::RESEARCH_CANCELLED => {
            format!("🔬 Research cancelled: **{}**", event.extra(extra::NAME))
        },
        kind::PLAYER_DIED => format!("💀 **{player}** died ({})", event.extra(extra::CAUSE)),
        kind::PLAYER_RESPAWNED => format!("🔄 **{player}** respawned"),
        kind::PLAYER_CHANGED_SURFACE => format!(
            "🌍 **{player}** traveled to **{}**",
            event.extra(extra::SURFACE)
        ),
        kind::PLAYER_PROMOTED => format!("⬆️ **{player}** promoted to admin"),
        kind::PLAYER_DEMOTED => format!("⬇️ **{player}** demoted from admin"),
        kind::ROCKET_LAUNCH_ORDERED => "🚀 Rocket launch ordered".to_string(),
        kind::PLATFORM_STATE_CHANGED => format!(
            "🛸 Platform **{}** state changed",
            event.extra(extra::NAME)
        ),
        kind::CARGO_ASCENDED => "📦 Cargo pod reached orbit".to_string(),
        kind::CARGO_DESCENDED => "📦 Cargo pod landed".to_string(),
        kind::SPAWNER_DESTROYED => {
            format!("🕳️ Spawner destroyed: **{}**", event.extra(extra::NAME))
        },
        kind::SURFACE_CREATED => format!(
            "🌍 New surface discovered: **{}**",
            event.extra(extra::NAME)
        ),
        kind::TAG_ADDED => format!("📍 Map tag added: **{}**", event.extra(extra::TEXT)),
        _ => return None,
    };
    Some(text)
}
