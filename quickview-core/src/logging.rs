//! Logging setup for quickview.
//!
//! Output is controlled by environment variables:
//!
//! - `QUICKVIEW_DEBUG=true|1|yes` - Enable debug logging
//! - `QUICKVIEW_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific level
//! - `QUICKVIEW_LOG_FORMAT=json|pretty|compact` - Output format (default: json)
//!
//! ```rust,no_run
//! use quickview_core::logging;
//!
//! // Call once at startup; later calls are no-ops.
//! logging::init();
//! ```
//!
//! Installing a subscriber requires the `tracing-subscriber` feature.
//! Without it, events go to whatever subscriber the host application sets.

use std::sync::Once;

use crate::config::{EnvSource, StdEnvSource};

static INIT: Once = Once::new();

const DEBUG_VAR: &str = "QUICKVIEW_DEBUG";
const LEVEL_VAR: &str = "QUICKVIEW_LOG_LEVEL";
const FORMAT_VAR: &str = "QUICKVIEW_LOG_FORMAT";

/// Check if debug logging is enabled via `QUICKVIEW_DEBUG`.
#[inline]
pub fn is_debug_enabled() -> bool {
    debug_enabled_in(&StdEnvSource)
}

/// The log level from `QUICKVIEW_LOG_LEVEL`.
///
/// Defaults to "debug" if `QUICKVIEW_DEBUG` is enabled, otherwise "warn".
pub fn log_level() -> &'static str {
    level_in(&StdEnvSource)
}

/// The log format from `QUICKVIEW_LOG_FORMAT`; "json" by default.
pub fn log_format() -> &'static str {
    format_in(&StdEnvSource)
}

fn debug_enabled_in<S: EnvSource>(env: &S) -> bool {
    env.get(DEBUG_VAR)
        .is_some_and(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
}

fn level_in<S: EnvSource>(env: &S) -> &'static str {
    let fallback = if debug_enabled_in(env) { "debug" } else { "warn" };
    match env.get(LEVEL_VAR).map(|l| l.to_lowercase()).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ => fallback,
    }
}

fn format_in<S: EnvSource>(env: &S) -> &'static str {
    match env.get(FORMAT_VAR).map(|f| f.to_lowercase()).as_deref() {
        Some("pretty") => "pretty",
        Some("compact") => "compact",
        _ => "json",
    }
}

/// Initialize logging from the environment.
///
/// Does nothing unless `QUICKVIEW_DEBUG` or `QUICKVIEW_LOG_LEVEL` is set.
pub fn init() {
    let env = StdEnvSource;
    if !debug_enabled_in(&env) && env.get(LEVEL_VAR).is_none() {
        return;
    }
    init_with(level_in(&env), format_in(&env));
}

/// Initialize logging at `level`, with the format taken from the environment.
pub fn init_with_level(level: &str) {
    init_with(level, log_format());
}

/// Initialize debug-level logging.
pub fn init_debug() {
    init_with("debug", log_format());
}

#[cfg_attr(not(feature = "tracing-subscriber"), allow(unused_variables))]
fn init_with(level: &str, format: &str) {
    INIT.call_once(|| {
        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter = EnvFilter::try_new(format!(
                "quickview={},quickview_core={},quickview_axum={}",
                level, level, level
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            match format {
                "pretty" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().pretty())
                    .init(),
                "compact" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().compact())
                    .init(),
                _ => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json())
                    .init(),
            }

            tracing::info!(level, format, "Quickview logging initialized");
        }
    });
}
