//! Deciding, once per request, whether quick mode applies.

use tracing::{trace, warn};

use crate::config::QuickConfig;
use crate::request::QuickRequest;

/// Read the quick-mode toggle from the request.
///
/// The parameter named by [`QuickConfig::quick_param`] is lowercased and
/// parsed as a JSON boolean literal; a missing parameter reads as `false`.
/// A value that fails to parse is reported as a warning and treated as
/// `false`. `always_quick` wins over the parameter.
///
/// Write handlers still consult this to shape their responses; only reads
/// also require the method to be `GET` (see [`QuickMode::resolve`]).
pub fn determine_quick(request: &QuickRequest, config: &QuickConfig) -> bool {
    let raw = request
        .param(&config.quick_param)
        .unwrap_or("false")
        .to_lowercase();

    let requested = match serde_json::from_str::<bool>(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(
                param = %config.quick_param,
                value = %raw,
                error = %e,
                "Failed to parse quick-mode parameter, treating it as false"
            );
            false
        }
    };

    config.always_quick || requested
}

/// How a request is rendered. Decided once at entry and never re-evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickMode {
    /// Flatten rows through lookup tables.
    Quick,
    /// Defer to the full nested serializer.
    Full,
}

impl QuickMode {
    /// Resolve the read mode: forced, or quick-toggled on a `GET`.
    pub fn resolve(request: &QuickRequest, config: &QuickConfig, force: bool) -> Self {
        let quick = force || (determine_quick(request, config) && request.is_get());
        trace!(force, method = %request.method, quick, "Resolved quick mode");
        if quick { Self::Quick } else { Self::Full }
    }

    /// Whether this is quick mode.
    pub fn is_quick(&self) -> bool {
        matches!(self, Self::Quick)
    }
}
