//! Observability lifecycle.

use opentelemetry::global;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace::SdkTracerProvider};
use tracing::{error, info};

use crate::config::ServerConfig;

use super::{ObservabilityError, logging, otel, settings};

/// Holds the tracer provider so spans can be flushed on exit.
#[derive(Debug)]
pub(crate) struct Observability {
    tracer_provider: Option<SdkTracerProvider>,
}

impl Observability {
    /// Installs the subscriber, and the OTLP pipeline when enabled.
    pub(crate) fn init(config: &ServerConfig) -> Result<Self, ObservabilityError> {
        settings::configure(config);

        let tracer_provider = config
            .observability
            .otel_enabled
            .then(|| {
                global::set_text_map_propagator(TraceContextPropagator::new());

                otel::build_tracer_provider(&config.observability)
            })
            .transpose()?;

        logging::init_subscriber(config, tracer_provider.as_ref())?;

        info!(
            otel_enabled = tracer_provider.is_some(),
            log_format = ?config.logging.log_format,
            "observability initialised"
        );

        Ok(Self { tracer_provider })
    }

    /// Flushes pending spans. Call once the server has stopped.
    pub(crate) fn shutdown(self) {
        if let Some(provider) = self.tracer_provider
            && let Err(source) = provider.shutdown()
        {
            error!("failed to flush traces on shutdown: {source}");
        }
    }
}
