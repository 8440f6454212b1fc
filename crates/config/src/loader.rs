use std::path::Path;

use {secrecy::Secret, tracing::debug};

use crate::{
    Error, Result,
    env_subst::substitute_env,
    schema::GameBridgeConfig,
};

/// Default config location inside the container image.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/gamebridge/config.yaml";

/// Load config from `path` and apply environment overrides.
///
/// A missing file yields the defaults.
pub fn load(path: &Path) -> Result<GameBridgeConfig> {
    let mut config = load_config(path)?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    Ok(config)
}

/// Load config from the given path (any supported format), without env
/// overrides.
pub fn load_config(path: &Path) -> Result<GameBridgeConfig> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(GameBridgeConfig::default());
        },
        Err(source) => {
            return Err(Error::Read {
                path: path.to_path_buf(),
                source,
            });
        },
    };
    debug!(path = %path.display(), "loading config");
    parse_config(&substitute_env(&raw), path)
}

/// Parse config text, choosing the format from the file extension.
pub fn parse_config(raw: &str, path: &Path) -> Result<GameBridgeConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("yaml");
    let parse_err = |message: String| Error::Parse {
        path: path.to_path_buf(),
        message,
    };

    match ext {
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| parse_err(e.to_string())),
        "toml" => toml::from_str(raw).map_err(|e| parse_err(e.to_string())),
        "json" => serde_json::from_str(raw).map_err(|e| parse_err(e.to_string())),
        _ => Err(Error::UnsupportedFormat {
            ext: ext.to_string(),
        }),
    }
}

/// Apply environment overrides using a custom lookup function.
///
/// Secrets come from the environment only. Empty values count as unset.
pub fn apply_env_overrides(
    config: &mut GameBridgeConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(password) = var("RCON_PASSWORD") {
        config.rcon.password = Some(Secret::new(password));
    }
    if let Some(host) = var("RCON_HOST") {
        config.rcon.host = host;
    }
    if let Some(port) = var("RCON_PORT") {
        config.rcon.port = port.parse().map_err(|e| Error::InvalidEnv {
            name: "RCON_PORT",
            message: format!("{e}"),
        })?;
    }
    if let Some(token) = var("DISCORD_BOT_TOKEN") {
        config.discord.token = Some(Secret::new(token));
    }
    if let Some(channel_id) = var("DISCORD_CHANNEL_ID") {
        config.discord.channel_id = Some(channel_id.parse().map_err(|e| Error::InvalidEnv {
            name: "DISCORD_CHANNEL_ID",
            message: format!("{e}"),
        })?);
    }
    Ok(())
}
