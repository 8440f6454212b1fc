use std::{path::Path, sync::Arc, time::Duration};

use {
    anyhow::{Context, Result},
    gamebridge_channels::{Channel, ChannelRegistry},
    gamebridge_common::EventObserver,
    gamebridge_config::{GameBridgeConfig, Severity, validate},
    gamebridge_discord::{DiscordChannel, DiscordConfig},
    gamebridge_hub::{EventBridge, TelemetryObserver},
    gamebridge_ingest::{KubeLogSource, LogSource, LogWatcher, PollerConfig, StatePoller, kube},
    gamebridge_metrics::{MetricsRecorderConfig, init_metrics},
    gamebridge_rcon::{RemoteCommandLink, TcpDialer},
    secrecy::ExposeSecret,
    tokio::task::JoinSet,
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
};

/// Wire every component from `config` and run until SIGINT/SIGTERM.
pub async fn run(config: GameBridgeConfig) -> Result<()> {
    let result = validate(&config);
    for d in &result.diagnostics {
        match d.severity {
            Severity::Error => error!(path = %d.path, "{}", d.message),
            Severity::Warning => warn!(path = %d.path, "{}", d.message),
            Severity::Info => info!(path = %d.path, "{}", d.message),
        }
    }
    if result.has_errors() {
        anyhow::bail!(
            "invalid configuration ({} error(s))",
            result.count(Severity::Error)
        );
    }

    init_metrics(MetricsRecorderConfig {
        enabled: config.metrics.enabled,
        listen: config.metrics.listen.clone(),
        global_labels: Vec::new(),
    })
    .context("metrics exporter")?;

    let (register_scripts, poll_script) = if config.events.enabled {
        let mut register = Vec::with_capacity(config.events.register_scripts.len());
        for path in &config.events.register_scripts {
            register.push(read_script(path).await?);
        }
        (register, read_script(&config.events.poll_script).await?)
    } else {
        (Vec::new(), String::new())
    };

    let password = config
        .rcon
        .password
        .clone()
        .context("RCON_PASSWORD is required")?;
    let dialer = TcpDialer::new(config.rcon.address(), password).with_timeouts(
        Duration::from_secs(config.rcon.dial_timeout_secs),
        Duration::from_secs(config.rcon.command_timeout_secs),
    );
    let link = Arc::new(RemoteCommandLink::new(dialer));

    let mut channels = ChannelRegistry::new();
    if config.discord_active()
        && let (Some(token), Some(channel_id)) = (&config.discord.token, config.discord.channel_id)
    {
        let discord = DiscordChannel::new(
            DiscordConfig::new(token.expose_secret().as_str(), channel_id)
                .with_events(config.discord.events.clone()),
        )
        .context("discord channel")?;
        channels.register(Arc::new(discord));
    }

    let bridge = Arc::new(EventBridge::new(link.clone(), channels.clone()));
    let mut observers: Vec<Arc<dyn EventObserver>> = Vec::new();
    if config.telemetry.enabled {
        observers.push(Arc::new(TelemetryObserver::new(
            config.telemetry.events.clone(),
        )));
    }
    observers.push(Arc::new(bridge.events()));

    let cancel = CancellationToken::new();
    let mut tasks = JoinSet::new();
    tasks.spawn(shutdown_on_signal(cancel.clone()));

    if config.log_watcher.enabled {
        let source: Arc<dyn LogSource> = match &config.instance.api_base {
            Some(api_base) => Arc::new(KubeLogSource::new(
                api_base.as_str(),
                config.instance.namespace.as_str(),
                config
                    .instance
                    .token_path
                    .clone()
                    .unwrap_or_else(|| kube::TOKEN_PATH.into()),
            )?),
            None => Arc::new(KubeLogSource::in_cluster(config.instance.namespace.as_str())?),
        };
        let mut watcher = LogWatcher::new(source, config.instance.selector.as_str())?
            .with_retry_delay(Duration::from_secs(config.log_watcher.retry_delay_secs));
        for observer in &observers {
            watcher.subscribe(Arc::clone(observer));
        }
        tasks.spawn(watcher.run(cancel.clone()));
    }

    if config.events.enabled {
        let mut poller = StatePoller::new(
            link.clone(),
            register_scripts,
            &poll_script,
            PollerConfig {
                poll_interval: Duration::from_secs(config.events.poll_interval_secs),
                health_interval: Duration::from_secs(config.events.health_interval_secs),
                retry_delay: Duration::from_secs(config.events.retry_delay_secs),
                kinds: config.events.types.clone(),
            },
        );
        for observer in &observers {
            poller.subscribe(Arc::clone(observer));
        }
        tasks.spawn(poller.run(cancel.clone()));
    }

    tasks.spawn({
        let bridge = Arc::clone(&bridge);
        let cancel = cancel.clone();
        async move { bridge.broadcast(cancel).await }
    });

    for channel in channels.iter() {
        tasks.spawn(start_channel(Arc::clone(channel), cancel.clone()));
        if config.bridge.relay_inbound {
            let bridge = Arc::clone(&bridge);
            let channel = Arc::clone(channel);
            let cancel = cancel.clone();
            tasks.spawn(async move { bridge.relay_inbound(cancel, channel).await });
        }
    }

    info!(
        rcon = %link.endpoint(),
        log_watcher = config.log_watcher.enabled,
        events = config.events.enabled,
        channels = ?channels.names(),
        "gamebridge started"
    );

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "task panicked");
            cancel.cancel();
        }
    }

    info!("shutting down");
    for channel in channels.iter() {
        if let Err(e) = channel.close().await {
            warn!(channel = channel.name(), error = %e, "channel close failed");
        }
    }
    if let Err(e) = link.close().await {
        warn!(error = %e, "rcon close failed");
    }
    Ok(())
}

async fn read_script(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read script {}", path.display()))
}

async fn start_channel(channel: Arc<dyn Channel>, cancel: CancellationToken) {
    if let Err(e) = channel.start(cancel).await {
        error!(channel = channel.name(), error = %e, "channel stopped with error");
    }
}

async fn shutdown_on_signal(cancel: CancellationToken) {
    tokio::select! {
        () = cancel.cancelled() => return,
        () = wait_for_signal() => {},
    }
    info!("shutdown signal received");
    cancel.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            warn!(error = %e, "cannot listen for SIGTERM");
            let _ = tokio::signal::ctrl_c().await;
            return;
        },
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = term.recv() => {},
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
