//! # Logging
//!
//! The library logs through the `log` facade. Wire traffic goes to the
//! `fastmeter::wire` target at debug (hex) and trace (text) level, session
//! milestones at info, and tolerated failures at warn. Passwords are never
//! logged.

use log::{debug, error, info, log_enabled, warn, Level, LevelFilter};

/// Initializes the logger with the `env_logger` crate, honouring `RUST_LOG`.
pub fn init_logger() {
    env_logger::init();
}

/// Initializes `env_logger` with `default` as the level when `RUST_LOG` is unset.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logger_with_default(default: LevelFilter) {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default.to_string()),
    )
    .format_timestamp_millis()
    .try_init();
}

/// Logs an error message.
pub fn log_error(message: &str) {
    if log_enabled!(Level::Error) {
        error!("{message}");
    }
}

/// Logs a warning message.
pub fn log_warn(message: &str) {
    if log_enabled!(Level::Warn) {
        warn!("{message}");
    }
}

/// Logs an informational message.
pub fn log_info(message: &str) {
    if log_enabled!(Level::Info) {
        info!("{message}");
    }
}

/// Logs a debug message.
pub fn log_debug(message: &str) {
    if log_enabled!(Level::Debug) {
        debug!("{message}");
    }
}
