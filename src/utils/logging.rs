//! Switchable logging macros over the `log` facade.
//!
//! Each module that uses them declares its own flag, so a chatty module can
//! be silenced without touching `RUST_LOG`:
//!
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//! use crate::{log_info, log_warn};
//!
//! log_info!("chunk {} closed", iteration);
//! ```
//!
//! Everything ends up on stderr via `env_logger`; stdout is reserved for the
//! JSON-lines protocol.

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Errors are always worth seeing, but still honour the module flag so
/// tests can run quietly.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}

/// Initialise `env_logger` on stderr. `RUST_LOG` wins over `default_level`.
pub fn init(default_level: log::LevelFilter) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(default_level)
        .parse_default_env()
        .target(env_logger::Target::Stderr);
    // A second init (tests, embedding) is harmless.
    let _ = builder.try_init();
}
