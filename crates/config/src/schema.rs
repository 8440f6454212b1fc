//! Config schema types.

use std::path::PathBuf;

use {
    gamebridge_common::EventFilter,
    secrecy::Secret,
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameBridgeConfig {
    pub rcon: RconConfig,
    pub instance: InstanceConfig,
    pub log_watcher: LogWatcherConfig,
    pub events: EventsConfig,
    pub bridge: BridgeConfig,
    pub discord: DiscordSection,
    pub telemetry: TelemetryConfig,
    pub metrics: MetricsConfig,
}

impl GameBridgeConfig {
    /// Discord runs only when enabled and a bot token is present.
    pub fn discord_active(&self) -> bool {
        self.discord.enabled && self.discord.token.is_some()
    }
}

/// Remote command endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RconConfig {
    pub host: String,
    pub port: u16,
    /// Read from `RCON_PASSWORD` only.
    #[serde(skip)]
    pub password: Option<Secret<String>>,
    pub dial_timeout_secs: u64,
    pub command_timeout_secs: u64,
}

impl RconConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for RconConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 27015,
            password: None,
            dial_timeout_secs: 5,
            command_timeout_secs: 10,
        }
    }
}

/// Where the game server runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    pub namespace: String,
    /// Label selector identifying the server pod.
    pub selector: String,
    /// API base override. Defaults to the in-cluster service address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Service account token override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_path: Option<PathBuf>,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            namespace: "factorio".into(),
            selector: "app=factorio-factorio-server-charts".into(),
            api_base: None,
            token_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogWatcherConfig {
    pub enabled: bool,
    pub retry_delay_secs: u64,
}

impl Default for LogWatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retry_delay_secs: 10,
        }
    }
}

/// Server-side event hooks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub enabled: bool,
    pub poll_interval_secs: u64,
    pub health_interval_secs: u64,
    pub retry_delay_secs: u64,
    /// Polled kinds delivered downstream: `"all"` or a list.
    pub types: EventFilter,
    /// Scripts run in order to install the hooks.
    pub register_scripts: Vec<PathBuf>,
    /// Script that returns and clears queued records.
    pub poll_script: PathBuf,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: 2,
            health_interval_secs: 60,
            retry_delay_secs: 15,
            types: EventFilter::All,
            register_scripts: vec![PathBuf::from("/lua/register_events.lua")],
            poll_script: PathBuf::from("/lua/poll_events.lua"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Relay channel messages into the game.
    pub relay_inbound: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            relay_inbound: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordSection {
    pub enabled: bool,
    /// Kinds posted to the channel: `"all"` or a list.
    pub events: EventFilter,
    /// Read from `DISCORD_BOT_TOKEN` only.
    #[serde(skip)]
    pub token: Option<Secret<String>>,
    /// Target channel, overridable with `DISCORD_CHANNEL_ID`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<u64>,
}

impl Default for DiscordSection {
    fn default() -> Self {
        Self {
            enabled: true,
            events: EventFilter::All,
            token: None,
            channel_id: None,
        }
    }
}

/// Structured event records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub events: EventFilter,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            events: EventFilter::All,
        }
    }
}

/// Prometheus exporter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Listen address, e.g. `0.0.0.0:9100`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen: Option<String>,
}
