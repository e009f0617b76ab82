//! Logging, tracing and Prometheus metrics for the server.

mod init;
mod logging;
mod metrics;
mod otel;
mod request;
mod settings;

use thiserror::Error;

pub(crate) use self::{
    init::Observability,
    metrics::{metrics_handler, observe_cart_event},
    request::request_logging,
};

#[derive(Debug, Error)]
pub(crate) enum ObservabilityError {
    #[error("OTLP span exporter could not be built: {0}")]
    OtlpExporter(#[from] opentelemetry_otlp::ExporterBuildError),

    /// Usually a second subscriber install in the same process.
    #[error("tracing subscriber could not be installed: {0}")]
    TracingSubscriber(#[from] tracing_subscriber::util::TryInitError),
}
