//! Shared logging setup for Ledgerline binaries.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

const DEFAULT_LOG_FILTER: &str =
    "ledgerline=info,ledgerline_worker=info,ledgerline_sinks=info,ledgerline_schema=info";
const VERBOSE_LOG_FILTER: &str =
    "ledgerline=debug,ledgerline_worker=debug,ledgerline_sinks=debug,ledgerline_schema=debug";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logging configuration shared by Ledgerline binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
    /// Emit JSON lines on every layer instead of text.
    pub json: bool,
    /// When set, also write a daily-rolling file here.
    pub log_dir: Option<PathBuf>,
}

/// Initialize tracing with stderr output and an optional rolling file.
///
/// The returned guard flushes the file writer on drop; hold it for the life
/// of the process.
pub fn init_logging(config: LogConfig<'_>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(config.verbose)));

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let console = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    layers.push(if config.json {
        console.json().with_filter(filter.clone()).boxed()
    } else {
        console.with_filter(filter.clone()).boxed()
    });

    let mut guard = None;
    if let Some(dir) = &config.log_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
        let appender = tracing_appender::rolling::daily(dir, log_file_name(config.app_name));
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        guard = Some(file_guard);
        let file = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false);
        layers.push(if config.json {
            file.json().with_filter(filter).boxed()
        } else {
            file.with_filter(filter).boxed()
        });
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    }
}

fn log_file_name(app_name: &str) -> String {
    format!("{}.log", sanitize_name(app_name))
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_sanitized() {
        assert_eq!(log_file_name("ledgerline"), "ledgerline.log");
        assert_eq!(log_file_name("ledger line/run"), "ledger_line_run.log");
    }

    #[test]
    fn verbose_raises_every_crate_to_debug() {
        assert!(default_filter(true)
            .split(',')
            .all(|directive| directive.ends_with("=debug")));
        assert!(default_filter(false).contains("ledgerline_worker=info"));
    }
}
