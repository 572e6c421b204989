//! Boot — config load and logging init.

use std::path::Path;

use anyhow::Context;
use engine::conf::{AnalyzerConfig, LogOutput, LoggingConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Load configuration: env vars > config file > defaults. An explicit
/// `--config` path replaces `ANALYZER_CONFIG_FILE`.
pub fn load_config(config_path: Option<&Path>) -> anyhow::Result<AnalyzerConfig> {
    let explicit = config_path.map(|p| p.to_string_lossy().into_owned());

    if let Some(path) = &explicit {
        if !Path::new(path).exists() {
            anyhow::bail!("config file not found: {}", path);
        }
    }

    AnalyzerConfig::load_with(|key| match (key, &explicit) {
        ("ANALYZER_CONFIG_FILE", Some(path)) => Some(path.clone()),
        _ => std::env::var(key).ok(),
    })
    .context("failed to load configuration")
}

/// Initialise the tracing / logging subsystem. `RUST_LOG` wins over the
/// configured level. Logs go to stderr so stdout stays machine-readable.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.level)));

    match config.format {
        LogOutput::Json => {
            let layer = fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        LogOutput::Pretty => {
            let layer = fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    }
}

/// A bare level such as `debug` applies to this workspace's crates only.
fn default_directive(level: &str) -> String {
    let level = level.trim();
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("engine={level},cli={level}")
    }
}
