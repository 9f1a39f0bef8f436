//! ---
//! mosaic_section: "01-core-functionality"
//! mosaic_subsection: "module"
//! mosaic_type: "source"
//! mosaic_scope: "code"
//! mosaic_description: "Tracing initialisation for hosts embedding the engine."
//! mosaic_version: "v0.1.0-alpha"
//! mosaic_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

const LOG_ENV: &str = "MOSAIC_LOG";

static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();
static STDOUT_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// Available log formats for hosts embedding the engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// Structured JSON on stdout, suitable for container logs.
    #[default]
    StructuredJson,
    /// Human-readable output for local development.
    Pretty,
}

/// Logging configuration supplied by the hosting application shell.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Output format for the stdout layer.
    #[serde(default)]
    pub format: LogFormat,
    /// Optional directory for a rolling daily JSON log file. When unset no
    /// file layer is installed.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Optional file name prefix; defaults to the service name.
    #[serde(default)]
    pub file_prefix: Option<String>,
}

/// Initialize the tracing subscriber based on configuration and environment variables.
///
/// * `MOSAIC_LOG` can be set to override the log filter (e.g. `info`,
///   `debug,mosaic_container=trace`). When unset the standard `RUST_LOG`
///   variable is honoured, finally defaulting to `info`.
/// * Calling this more than once is harmless; only the first call installs
///   a subscriber.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(directive).unwrap_or_else(|err| {
            eprintln!(
                "invalid {} directive ({}); defaulting to info logging",
                LOG_ENV, err
            );
            EnvFilter::new("info")
        }),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let _ = STDOUT_GUARD.set(stdout_guard);

    let fmt_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(false)
            .json()
            .with_writer(stdout_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_writer(stdout_writer)
            .boxed(),
    };

    let file_layer = match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)?;
            let prefix = config
                .file_prefix
                .clone()
                .unwrap_or_else(|| service_name.to_owned());
            let appender = daily(directory, format!("{}.log", prefix));
            let (file_writer, file_guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(file_guard);
            Some(
                fmt::layer()
                    .with_target(true)
                    .json()
                    .with_writer(file_writer)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(file_layer)
        .try_init()
        .ok();

    info!(service = %service_name, format = ?config.format, "tracing initialised");
    Ok(())
}
