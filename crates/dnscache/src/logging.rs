use std::fs::File;
use std::path::Path;

use anyhow::Context;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    filter::filter_fn, fmt::layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

pub const LOGGING_ENV: &str = "DNSCACHE_LOG";
pub const LOGGING_FILE_ENV: &str = "DNSCACHE_LOG_FILE";

/// `debug` lowers the default stdout level from INFO to DEBUG.
pub fn setup_logging(debug: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let default_level = if debug { LevelFilter::DEBUG } else { LevelFilter::INFO };

    let file_layer = match log_file {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open the log file {:?}", path))?;
            Some(
                layer()
                    .pretty()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_filter(
                        EnvFilter::builder()
                            .with_env_var(LOGGING_FILE_ENV)
                            .with_default_directive(LevelFilter::TRACE.into())
                            .from_env_lossy(),
                    ),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            layer()
                .with_filter(LevelFilter::INFO)
                .and_then(
                    layer()
                        .with_line_number(true)
                        .with_file(true)
                        .with_filter(filter_fn(|metadata| metadata.level() > &LevelFilter::INFO)),
                )
                .with_filter(
                    EnvFilter::builder()
                        .with_env_var(LOGGING_ENV)
                        .with_default_directive(default_level.into())
                        .from_env_lossy(),
                ),
        )
        .with(file_layer)
        .try_init()
        .context("failed to initialize tracing_subscriber")
}
