use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::settings::{LoggingSettings, MetricsSettings};

/// Initialize logging
pub fn init_logging(settings: &LoggingSettings) -> Result<()> {
    let level: Level = settings
        .level
        .parse()
        .with_context(|| format!("Invalid log level {:?}", settings.level))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let installed = if settings.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    installed.context("Failed to set tracing subscriber")
}

/// Install the Prometheus exporter when a listen address is configured
pub fn init_metrics(settings: &MetricsSettings) -> Result<()> {
    let Some(addr) = settings.listen else {
        return Ok(());
    };
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    info!("Prometheus metrics exporter listening on {}/metrics", addr);
    Ok(())
}
