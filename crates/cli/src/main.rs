mod config_commands;
#[cfg(feature = "otel")]
mod otel;
mod run_command;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "gamebridge",
    about = "Relay game server events to chat and chat back into the game",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (YAML, TOML or JSON). A missing file means defaults.
    #[arg(long, global = true, env = "CONFIG_PATH", default_value = gamebridge_config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Export spans over OTLP/gRPC to this endpoint.
    #[arg(long, global = true, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bridge (default when no subcommand is provided).
    Run,
    /// Validate the configuration and report errors/warnings.
    CheckConfig {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
}

/// Keeps the span exporter alive until shutdown.
struct TelemetryGuard {
    #[cfg(feature = "otel")]
    tracer_provider: Option<opentelemetry_sdk::trace::SdkTracerProvider>,
}

impl TelemetryGuard {
    fn shutdown(self) {
        #[cfg(feature = "otel")]
        if let Some(provider) = self.tracer_provider
            && let Err(e) = provider.shutdown()
        {
            tracing::warn!(error = %e, "failed to flush spans");
        }
    }
}

fn init_telemetry(cli: &Cli) -> anyhow::Result<TelemetryGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    #[cfg(feature = "otel")]
    let tracer_provider = cli
        .otlp_endpoint
        .as_deref()
        .map(otel::tracer_provider)
        .transpose()?;
    #[cfg(feature = "otel")]
    let otel_layer = tracer_provider.as_ref().map(otel::layer::<tracing_subscriber::Registry>);
    #[cfg(not(feature = "otel"))]
    let otel_layer: Option<tracing_subscriber::layer::Identity> = None;

    let registry = tracing_subscriber::registry()
        .with(otel_layer)
        .with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }

    #[cfg(not(feature = "otel"))]
    if cli.otlp_endpoint.is_some() {
        tracing::warn!("built without the otel feature, ignoring --otlp-endpoint");
    }

    Ok(TelemetryGuard {
        #[cfg(feature = "otel")]
        tracer_provider,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let telemetry = init_telemetry(&cli)?;

    let result = match cli.command {
        None | Some(Commands::Run) => {
            info!(version = env!("CARGO_PKG_VERSION"), "gamebridge starting");
            match gamebridge_config::load(&cli.config) {
                Ok(config) => run_command::run(config).await,
                Err(e) => Err(e.into()),
            }
        },
        Some(Commands::CheckConfig { verbose }) => config_commands::check(&cli.config, verbose),
    };

    telemetry.shutdown();
    result
}
