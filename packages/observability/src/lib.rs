//! # Observability
//!
//! Centralized tracing setup for the coffeeshop back-office crates.
//!
//! Library crates are **log producers** only. They use the standard `tracing`
//! macros and never install a subscriber themselves. The host application calls
//! `observability::init()` (or `init_with_config`) once at startup and decides
//! where the events go:
//!
//! - [`LogFormat::Compact`]: human-readable lines on stderr (default).
//! - [`LogFormat::Json`]: JSONL appended to `~/.coffeeshop/logs/client.jsonl`
//!   (or a custom path), one event per line, flushed per write so
//!   `tail -f ... | jq` works while the process runs.
//!
//! `RUST_LOG` always wins over the configured default level.
//!
//! ```rust,ignore
//! observability::init("backoffice")?;
//! tracing::info!("ready");
//! ```

mod file_writer;

use std::io;
use std::path::PathBuf;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub use file_writer::{default_log_path, FileLogWriter};

/// Output format for the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Compact text on stderr.
    #[default]
    Compact,
    /// JSONL written to the log file.
    Json,
}

impl LogFormat {
    /// Parse a format name as used in environment variables.
    ///
    /// Unknown values fall back to [`LogFormat::Compact`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" | "jsonl" => Self::Json,
            _ => Self::Compact,
        }
    }
}

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, attached to every JSON line as the `service` span.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Overridden by `RUST_LOG` when set.
    pub default_level: String,

    /// Output format.
    pub format: LogFormat,

    /// Custom JSONL path. Defaults to `~/.coffeeshop/logs/client.jsonl`.
    pub log_path: Option<PathBuf>,

    /// In JSON mode, also emit compact lines on stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            format: LogFormat::Compact,
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Initialize with default settings and the given service name.
pub fn init(service_name: &str) -> io::Result<()> {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    })
}

/// Initialize the global subscriber.
///
/// Installing twice is not an error: the first subscriber stays in place and
/// later calls return `Ok(())`. Fails only when the JSONL file cannot be opened.
pub fn init_with_config(config: LogConfig) -> io::Result<()> {
    let filter = build_filter(&config.default_level);

    let installed = match config.format {
        LogFormat::Compact => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .with_writer(io::stderr)
            .try_init()
            .is_ok(),
        LogFormat::Json => {
            let log_path = match config.log_path.clone() {
                Some(path) => path,
                None => default_log_path().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::NotFound, "home directory not found")
                })?,
            };
            let writer = FileLogWriter::open(&log_path)?;

            let json_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(writer)
                .with_filter(filter);

            let stderr_layer = config.also_stderr.then(|| {
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(true)
                    .with_writer(io::stderr)
                    .with_filter(build_filter(&config.default_level))
            });

            let installed = tracing_subscriber::registry()
                .with(json_layer)
                .with(stderr_layer)
                .try_init()
                .is_ok();

            if installed {
                tracing::info!(
                    service = %config.service_name,
                    log_path = %log_path.display(),
                    "observability initialized"
                );
            }
            installed
        }
    };

    if !installed {
        tracing::debug!("global subscriber already installed, keeping it");
    }
    Ok(())
}

fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Re-export tracing macros so callers can use `observability::info!()`.
pub use tracing::{debug, error, info, instrument, trace, warn};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "unknown");
        assert_eq!(config.default_level, "info");
        assert_eq!(config.format, LogFormat::Compact);
        assert!(config.log_path.is_none());
        assert!(!config.also_stderr);
    }

    #[test]
    fn test_log_format_from_name() {
        assert_eq!(LogFormat::from_name("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_name(" JSONL "), LogFormat::Json);
        assert_eq!(LogFormat::from_name("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::from_name("whatever"), LogFormat::Compact);
    }

    #[test]
    fn test_init_twice_is_ok() {
        assert!(init("first").is_ok());
        assert!(init("second").is_ok());
    }
}
