//! Request-tracing settings fixed at startup.

use std::{sync::OnceLock, time::Duration};

use crate::config::ServerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct RequestSettings {
    /// Requests slower than this are logged as warnings.
    pub(super) slow_request_threshold: Duration,

    /// Continue traces from incoming `traceparent` headers.
    pub(super) propagate_parent: bool,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            slow_request_threshold: Duration::from_secs(1),
            propagate_parent: false,
        }
    }
}

impl RequestSettings {
    fn from_config(config: &ServerConfig) -> Self {
        let observability = &config.observability;

        Self {
            slow_request_threshold: Duration::from_millis(config.logging.slow_request_threshold_ms),
            propagate_parent: observability.otel_enabled
                && observability.otel_parent_propagation_enabled,
        }
    }
}

static REQUEST_SETTINGS: OnceLock<RequestSettings> = OnceLock::new();

/// First call wins; later calls are ignored.
pub(super) fn configure(config: &ServerConfig) {
    _ = REQUEST_SETTINGS.set(RequestSettings::from_config(config));
}

pub(super) fn request_settings() -> RequestSettings {
    REQUEST_SETTINGS.get().copied().unwrap_or_default()
}
