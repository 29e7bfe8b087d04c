//! Environment-driven logging setup.
//!
//! The engine emits `tracing` events when descriptors are built and
//! mutations execute. By default those events go nowhere; calling
//! [`init`] installs a subscriber for them, configured through
//! environment variables:
//!
//! - `QUILL_DEBUG=true|1|yes` enables debug-level output
//! - `QUILL_LOG_LEVEL=trace|debug|info|warn|error` picks an exact level
//! - `QUILL_LOG_FORMAT=json|pretty|compact` picks the output format
//!
//! The subscriber itself is behind the `tracing-subscriber` feature.
//! Without it [`init`] is a no-op and the host application is free to
//! install its own subscriber; the events fire either way.
//!
//! ```rust,no_run
//! quill_query::logging::init();
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Whether `QUILL_DEBUG` is set to "true", "1", or "yes" (case-insensitive).
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("QUILL_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// The level selected by `QUILL_LOG_LEVEL`.
///
/// An unset or unrecognized value falls back to "debug" when
/// `QUILL_DEBUG` is enabled and "warn" otherwise.
pub fn get_log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var("QUILL_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// The output format selected by `QUILL_LOG_FORMAT`, defaulting to "json".
pub fn get_log_format() -> &'static str {
    env::var("QUILL_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Install the logging subscriber.
///
/// Call once at startup; later calls are no-ops, as are calls made while
/// neither `QUILL_DEBUG` nor `QUILL_LOG_LEVEL` is set.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("QUILL_LOG_LEVEL").is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(format!("quill_query={}", level))
                .unwrap_or_else(|_| EnvFilter::new("warn"));

            match get_log_format() {
                "json" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().json())
                        .init();
                }
                "compact" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().compact())
                        .init();
                }
                _ => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().pretty())
                        .init();
                }
            }

            tracing::info!(level, format = get_log_format(), "logging initialized");
        }
    });
}

/// Install the subscriber at a specific level, overriding `QUILL_LOG_LEVEL`.
///
/// # Safety
///
/// Writes an environment variable, which is unsound while other threads
/// are running. Call before spawning threads.
pub fn init_with_level(level: &str) {
    // SAFETY: callers invoke this at startup before any thread exists.
    unsafe {
        env::set_var("QUILL_LOG_LEVEL", level);
    }
    init();
}

/// Install the subscriber at debug level, as if `QUILL_DEBUG=true` were set.
///
/// # Safety
///
/// Writes an environment variable, which is unsound while other threads
/// are running. Call before spawning threads.
pub fn init_debug() {
    // SAFETY: callers invoke this at startup before any thread exists.
    unsafe {
        env::set_var("QUILL_DEBUG", "true");
    }
    init();
}

/// Emit a debug event only when `QUILL_DEBUG` is enabled at runtime.
#[macro_export]
macro_rules! quill_debug {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::debug!($($arg)*);
        }
    };
}

/// Emit a trace event only when `QUILL_DEBUG` is enabled at runtime.
#[macro_export]
macro_rules! quill_trace {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::trace!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_disabled_by_default() {
        // SAFETY: tests here do not race on this variable
        unsafe {
            env::remove_var("QUILL_DEBUG");
        }
        assert!(!is_debug_enabled());
    }

    #[test]
    fn test_log_level_default() {
        // SAFETY: tests here do not race on this variable
        unsafe {
            env::remove_var("QUILL_DEBUG");
            env::remove_var("QUILL_LOG_LEVEL");
        }
        assert_eq!(get_log_level(), "warn");
    }

    #[test]
    fn test_conditional_macros_expand() {
        // Gated on the env var at runtime; both branches must compile
        // and the disabled path must be a no-op.
        crate::quill_debug!(step = "expand", "combo evaluated");
        crate::quill_trace!("row {} materialized", 1);
    }
}
