//! Configuration validation.
//!
//! Checks a loaded configuration for missing secrets and inconsistent
//! settings before anything is started.

use crate::schema::GameBridgeConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "rcon.password"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.path, self.message)
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(&mut self, severity: Severity, path: &str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path: path.to_string(),
            message: message.into(),
        });
    }
}

/// Validate a configuration with environment overrides already applied.
pub fn validate(config: &GameBridgeConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    if config.rcon.password.is_none() {
        result.push(Severity::Error, "rcon.password", "RCON_PASSWORD is required");
    }
    if config.rcon.host.is_empty() {
        result.push(Severity::Error, "rcon.host", "host must not be empty");
    }
    for (path, secs) in [
        ("rcon.dial_timeout_secs", config.rcon.dial_timeout_secs),
        ("rcon.command_timeout_secs", config.rcon.command_timeout_secs),
    ] {
        if secs == 0 {
            result.push(Severity::Error, path, "timeout must be positive");
        }
    }

    if config.log_watcher.enabled && config.instance.selector.is_empty() {
        result.push(
            Severity::Error,
            "instance.selector",
            "selector is required when the log watcher is enabled",
        );
    }

    if config.events.enabled {
        for (path, secs) in [
            ("events.poll_interval_secs", config.events.poll_interval_secs),
            ("events.health_interval_secs", config.events.health_interval_secs),
        ] {
            if secs == 0 {
                result.push(Severity::Error, path, "interval must be positive");
            }
        }
        if config.events.register_scripts.is_empty() {
            result.push(
                Severity::Warning,
                "events.register_scripts",
                "no registration scripts; hooks must already be installed",
            );
        }
    }

    if config.discord.token.is_some() && config.discord.channel_id.is_none() {
        result.push(
            Severity::Error,
            "discord.channel_id",
            "DISCORD_CHANNEL_ID is required when a bot token is set",
        );
    }
    if config.discord.channel_id == Some(0) {
        result.push(Severity::Error, "discord.channel_id", "channel id must be non-zero");
    }
    if config.discord.enabled && config.discord.token.is_none() {
        result.push(
            Severity::Info,
            "discord.token",
            "DISCORD_BOT_TOKEN not set, Discord is disabled",
        );
    }

    if config.metrics.enabled
        && config
            .metrics
            .listen
            .as_deref()
            .is_some_and(|listen| listen.parse::<std::net::SocketAddr>().is_err())
    {
        result.push(
            Severity::Error,
            "metrics.listen",
            "listen address must be host:port",
        );
    }

    result
}
