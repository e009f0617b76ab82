//! Subscriber assembly: env filter, formatter and optional OTLP layer.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

use crate::config::{ServerConfig, observability::LogFormat};

use super::ObservabilityError;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Crates that are chatty at `info` and above.
const QUIET_TARGETS: &[&str] = &[
    "h2", "hyper", "tower", "tonic", "opentelemetry", "sqlx",
];

pub(super) fn init_subscriber(
    config: &ServerConfig,
    tracer_provider: Option<&SdkTracerProvider>,
) -> Result<(), ObservabilityError> {
    let otel_layer = tracer_provider.map(|provider| {
        let tracer = provider.tracer(config.observability.otel_service_name.clone());

        tracing_opentelemetry::layer().with_tracer(tracer).boxed()
    });

    tracing_subscriber::registry()
        .with(format_layer(config.logging.log_format))
        .with(otel_layer)
        .with(env_filter(&config.logging.log_level))
        .try_init()?;

    Ok(())
}

fn format_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
    }
}

/// `RUST_LOG` as a full directive string wins over the plain level.
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level)
        .ok()
        .filter(|_filter| level.contains('='))
        .unwrap_or_else(|| EnvFilter::new(default_directives(level)))
}

fn default_directives(level: &str) -> String {
    QUIET_TARGETS
        .iter()
        .fold(level.to_owned(), |directives, target| {
            format!("{directives},{target}=warn")
        })
}

#[cfg(test)]
mod tests {
    use super::default_directives;

    #[test]
    fn dependencies_are_quietened() {
        let directives = default_directives("debug");

        assert!(directives.starts_with("debug,"), "base level first");
        assert!(directives.contains("sqlx=warn"), "sqlx quietened");
        assert!(directives.contains("hyper=warn"), "hyper quietened");
    }
}
