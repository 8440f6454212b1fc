//! Metrics recorder initialization and configuration.

use std::net::SocketAddr;

use tracing::info;

use crate::{Error, Result};

/// Default address for the Prometheus scrape endpoint.
pub const DEFAULT_LISTEN: &str = "0.0.0.0:9100";

/// Configuration for the metrics system.
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorderConfig {
    /// Whether metrics collection is enabled
    pub enabled: bool,
    /// Scrape endpoint address (default: `0.0.0.0:9100`)
    pub listen: Option<String>,
    /// Global labels to add to all metrics
    pub global_labels: Vec<(String, String)>,
}

/// Initialize the metrics system.
///
/// Call once at startup, from inside the tokio runtime. With the `prometheus`
/// feature this installs the global recorder and starts the HTTP scrape
/// listener; otherwise the `metrics` facade stays a no-op.
///
/// # Errors
///
/// Returns an error if the listen address is invalid or the exporter fails to
/// install.
pub fn init_metrics(config: MetricsRecorderConfig) -> Result<()> {
    if !config.enabled {
        info!("metrics collection is disabled");
        return Ok(());
    }

    #[cfg(feature = "prometheus")]
    {
        let addr = init_prometheus(config)?;
        info!(%addr, "prometheus metrics exporter listening");
        Ok(())
    }

    #[cfg(not(feature = "prometheus"))]
    {
        let _ = config;
        info!("prometheus exporter not enabled at compile time");
        Ok(())
    }
}

#[cfg(feature = "prometheus")]
fn init_prometheus(config: MetricsRecorderConfig) -> Result<SocketAddr> {
    use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

    let addr = parse_listen(config.listen.as_deref().unwrap_or(DEFAULT_LISTEN))?;

    let mut builder = PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(crate::rcon::COMMAND_DURATION_SECONDS.to_string()),
            crate::buckets::RCON_DURATION,
        )?;

    for (key, value) in config.global_labels {
        builder = builder.add_global_label(key, value);
    }

    builder.install()?;
    Ok(addr)
}

#[cfg_attr(not(feature = "prometheus"), allow(dead_code))]
fn parse_listen(addr: &str) -> Result<SocketAddr> {
    addr.parse().map_err(|source| Error::InvalidListenAddr {
        addr: addr.to_string(),
        source,
    })
}
