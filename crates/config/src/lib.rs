//! Configuration loading, validation, and env substitution.
//!
//! Config files may be YAML, TOML or JSON, chosen by extension. A missing
//! file means defaults. Secrets come from the environment only.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{DEFAULT_CONFIG_PATH, apply_env_overrides, load, load_config, parse_config},
    schema::{
        BridgeConfig, DiscordSection, EventsConfig, GameBridgeConfig, InstanceConfig,
        LogWatcherConfig, MetricsConfig, RconConfig, TelemetryConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
