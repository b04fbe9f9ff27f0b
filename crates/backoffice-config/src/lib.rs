//! Configuration, paths, and logging setup for the coffeeshop back-office client.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, Endpoints, DEFAULT_API_BASE_URL, DEFAULT_LOG_LEVEL, DEFAULT_PROACTIVE_REFRESH_SECS,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};
pub use error::{ConfigError, ConfigResult};
pub use logging::init_logging;
pub use paths::Paths;
