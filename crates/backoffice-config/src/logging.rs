//! Logging initialization for hosts embedding the back-office client.
//!
//! Thin wrapper over the observability package so every host configures
//! tracing the same way.

use crate::ConfigResult;
use observability::{LogConfig, LogFormat};

const SERVICE_NAME: &str = "backoffice";
const ENV_LOG_FORMAT: &str = "COFFEESHOP_LOG_FORMAT";
const ENV_LOG_PATH: &str = "COFFEESHOP_LOG_PATH";

/// Install the global tracing subscriber.
///
/// - Level comes from `RUST_LOG`, falling back to `level`.
/// - `COFFEESHOP_LOG_FORMAT=json` switches to JSONL output in
///   `~/.coffeeshop/logs/client.jsonl` (or `COFFEESHOP_LOG_PATH`), with compact
///   lines mirrored on stderr.
///
/// Calling it more than once keeps the first subscriber.
pub fn init_logging(level: &str) -> ConfigResult<()> {
    let format = std::env::var(ENV_LOG_FORMAT)
        .map(|raw| LogFormat::from_name(&raw))
        .unwrap_or_default();

    let log_path = std::env::var(ENV_LOG_PATH)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(Into::into);

    observability::init_with_config(LogConfig {
        service_name: SERVICE_NAME.into(),
        default_level: level.into(),
        format,
        log_path,
        also_stderr: format == LogFormat::Json,
    })?;

    Ok(())
}
