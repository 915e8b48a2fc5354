//! Structured logging and tracing for FlexPrice
//!
//! Console output (plain or JSON) plus an optional daily-rolled log file, all
//! wired through `tracing-subscriber`. `RUST_LOG` overrides the computed filter.

use crate::config::LoggingConfig;
use crate::error::{FlexPriceError, Result};
use std::path::Path;
use tracing::{Level, info};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod level;
mod state;
mod structured;

pub use level::{level_rank, min_level, parse_log_level};
pub use structured::{LogContext, StructuredLogger, get_logger, get_logger_with_context, mask_secret};

use state::{INIT_ERROR, INIT_ONCE, LOG_GUARD};

/// Boxed layer type shared by the console and file outputs
type BoxedLayer = Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>;

/// Initialize logging system based on configuration
///
/// Safe to call more than once; only the first call installs the subscriber.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    INIT_ONCE.call_once(|| {
        if let Err(e) = install(config) {
            let _ = INIT_ERROR.set(e.to_string());
        }
    });

    if let Some(err) = INIT_ERROR.get() {
        return Err(FlexPriceError::config(err.clone()));
    }
    Ok(())
}

fn install(config: &LoggingConfig) -> Result<()> {
    let level = parse_log_level(&config.level)?;
    let http_level = parse_log_level(&config.http_level)?;

    // Per-layer ceiling; the env filter below narrows each target further
    let most_verbose = min_level(level, http_level);
    let mut layers: Vec<BoxedLayer> = Vec::new();

    if config.console_output {
        layers.push(fmt_layer(std::io::stdout, config.json_format, most_verbose));
    }

    let file = config.file.trim();
    if !file.is_empty() && !should_use_console_only() {
        let (dir, prefix) = split_log_path(Path::new(file));
        let appender = rolling::Builder::new()
            .rotation(rolling::Rotation::DAILY)
            .filename_prefix(prefix)
            .filename_suffix("log")
            .max_log_files(config.backup_count.max(1) as usize)
            .build(dir)
            .map_err(|e| FlexPriceError::io(format!("Failed to create log file appender: {}", e)))?;
        let (writer, guard) = non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        layers.push(fmt_layer(writer, config.json_format, most_verbose));
    }

    let filter = build_env_filter(level, http_level);

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| FlexPriceError::config(format!("Failed to install logger: {}", e)))?;

    info!(
        "Logging initialized - level: {:?}, http_level: {:?}, file: {}",
        level,
        http_level,
        if file.is_empty() { "<none>" } else { file }
    );
    Ok(())
}

fn fmt_layer<W>(writer: W, json: bool, level: Level) -> BoxedLayer
where
    W: for<'a> fmt::MakeWriter<'a> + Send + Sync + 'static,
{
    let base = fmt::layer()
        .with_writer(writer)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);
    if json {
        base.json()
            .with_filter(LevelFilter::from_level(level))
            .boxed()
    } else {
        base.with_filter(LevelFilter::from_level(level)).boxed()
    }
}

fn build_env_filter(level: Level, http_level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "flexprice={},tower_http={},reqwest=warn,hyper=warn",
            level, http_level
        )
        .into()
    })
}

fn should_use_console_only() -> bool {
    cfg!(test) || std::env::var_os("FLEXPRICE_DISABLE_FILE_LOG").is_some()
}

/// Split a configured log path into (directory, file prefix)
///
/// `/var/log/flexprice.log` becomes (`/var/log`, `flexprice`); a path without
/// an extension is treated as a directory.
fn split_log_path(p: &Path) -> (&Path, String) {
    if p.extension().is_some() {
        let dir = p
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let prefix = p
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "flexprice".to_string());
        (dir, prefix)
    } else {
        (p, "flexprice".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_log_path() {
        let (dir, prefix) = split_log_path(Path::new("/var/log/tariffs.log"));
        assert_eq!(dir, Path::new("/var/log"));
        assert_eq!(prefix, "tariffs");

        let (dir, prefix) = split_log_path(Path::new("/var/log/flexprice"));
        assert_eq!(dir, Path::new("/var/log/flexprice"));
        assert_eq!(prefix, "flexprice");

        let (dir, _) = split_log_path(Path::new("local.log"));
        assert_eq!(dir, Path::new("."));
    }

    #[test]
    fn init_twice_is_harmless() {
        let config = LoggingConfig::default();
        init_logging(&config).ok();
        init_logging(&config).ok();
    }
}
