//! W3C trace context carried by incoming requests.

use opentelemetry::{
    Context, global,
    propagation::{Extractor, TextMapPropagator},
    trace::TraceContextExt as _,
};
use salvo::http::header::{HeaderMap, HeaderName};

struct Headers<'a>(&'a HeaderMap);

impl Extractor for Headers<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(HeaderName::as_str).collect()
    }
}

/// The caller's span context, using the globally installed propagator.
pub(super) fn remote_parent(headers: &HeaderMap) -> Option<Context> {
    global::get_text_map_propagator(|propagator| extract(propagator, headers))
}

/// Starts from an empty context so a request without trace headers never
/// joins whatever span happens to be active.
fn extract(propagator: &dyn TextMapPropagator, headers: &HeaderMap) -> Option<Context> {
    let context = propagator.extract_with_context(&Context::new(), &Headers(headers));
    let valid = context.span().span_context().is_valid();

    valid.then_some(context)
}

#[cfg(test)]
mod tests {
    use opentelemetry_sdk::propagation::TraceContextPropagator;
    use salvo::http::header::HeaderValue;

    use super::*;

    #[test]
    fn valid_traceparent_becomes_parent() {
        let mut headers = HeaderMap::new();

        headers.insert(
            "traceparent",
            HeaderValue::from_static("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"),
        );

        let parent = extract(&TraceContextPropagator::new(), &headers);

        assert!(parent.is_some(), "trace continued");
    }

    #[test]
    fn missing_or_malformed_traceparent_is_ignored() {
        let mut headers = HeaderMap::new();

        assert!(
            extract(&TraceContextPropagator::new(), &headers).is_none(),
            "no header"
        );

        headers.insert("traceparent", HeaderValue::from_static("not-a-trace"));

        assert!(
            extract(&TraceContextPropagator::new(), &headers).is_none(),
            "garbage header"
        );
    }
}
