//! Prometheus metrics and the `/metrics` endpoint.
//!
//! Metrics live in a private registry built on first use. When building it
//! fails the error is logged once and every recorder becomes a no-op.

use std::sync::OnceLock;

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder, core::Collector,
};
use salvo::{
    Response, handler,
    http::{
        StatusCode,
        header::{CONTENT_TYPE, HeaderValue},
    },
};
use tracing::error;

use storefront_app::events::CartEvent;

const PREFIX: &str = "storefront_json";

const LATENCY_BUCKETS: [f64; 12] = [
    0.002, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Order totals in minor units, from 5.00 to 5,000.00.
const ORDER_TOTAL_BUCKETS: [f64; 8] = [
    500.0, 1_000.0, 2_500.0, 5_000.0, 10_000.0, 25_000.0, 100_000.0, 500_000.0,
];

#[derive(Debug)]
struct Metrics {
    registry: Registry,
    requests: IntCounterVec,
    latency: HistogramVec,
    in_flight: IntGauge,
    cart_events: IntCounterVec,
    order_totals: Histogram,
}

static METRICS: OnceLock<Option<Metrics>> = OnceLock::new();

fn metrics() -> Option<&'static Metrics> {
    METRICS
        .get_or_init(|| {
            Metrics::build()
                .inspect_err(|source| error!("metrics disabled: {source}"))
                .ok()
        })
        .as_ref()
}

fn register<M>(
    registry: &Registry,
    metric: Result<M, prometheus::Error>,
) -> Result<M, prometheus::Error>
where
    M: Collector + Clone + 'static,
{
    let metric = metric?;

    registry.register(Box::new(metric.clone()))?;

    Ok(metric)
}

fn name(suffix: &str) -> String {
    format!("{PREFIX}_{suffix}")
}

impl Metrics {
    fn build() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests = register(
            &registry,
            IntCounterVec::new(
                Opts::new(
                    name("http_requests_total"),
                    "HTTP requests by route and status.",
                ),
                &["method", "route", "status_class", "status_code"],
            ),
        )?;

        let latency = register(
            &registry,
            HistogramVec::new(
                HistogramOpts::new(
                    name("http_request_duration_seconds"),
                    "HTTP request latency by route.",
                )
                .buckets(LATENCY_BUCKETS.to_vec()),
                &["method", "route"],
            ),
        )?;

        let in_flight = register(
            &registry,
            IntGauge::new(
                name("http_requests_in_flight"),
                "HTTP requests being served.",
            ),
        )?;

        let cart_events = register(
            &registry,
            IntCounterVec::new(
                Opts::new(
                    name("cart_events_total"),
                    "Cart and checkout events emitted after commit.",
                ),
                &["event"],
            ),
        )?;

        let order_totals = register(
            &registry,
            Histogram::with_opts(
                HistogramOpts::new(
                    name("order_total_minor_units"),
                    "Totals of placed orders in minor currency units.",
                )
                .buckets(ORDER_TOTAL_BUCKETS.to_vec()),
            ),
        )?;

        Ok(Self {
            registry,
            requests,
            latency,
            in_flight,
            cart_events,
            order_totals,
        })
    }
}

/// Holds the in-flight gauge up for as long as it lives.
#[derive(Debug)]
pub(super) struct InFlight(Option<&'static IntGauge>);

impl InFlight {
    pub(super) fn start() -> Self {
        let gauge = metrics().map(|metrics| &metrics.in_flight);

        if let Some(gauge) = gauge {
            gauge.inc();
        }

        Self(gauge)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Some(gauge) = self.0 {
            gauge.dec();
        }
    }
}

pub(super) fn observe_request(method: &str, route: &str, status: StatusCode, seconds: f64) {
    let Some(metrics) = metrics() else {
        return;
    };

    metrics
        .requests
        .with_label_values(&[method, route, status_class(status), status.as_str()])
        .inc();

    metrics
        .latency
        .with_label_values(&[method, route])
        .observe(seconds);
}

/// Counts an event by name; placed orders also feed the order total
/// histogram.
pub(crate) fn observe_cart_event(event: &CartEvent) {
    let Some(metrics) = metrics() else {
        return;
    };

    metrics.cart_events.with_label_values(&[event.name()]).inc();

    if let CartEvent::CheckoutSucceeded { total, .. } = event {
        #[expect(
            clippy::cast_precision_loss,
            reason = "histogram buckets tolerate rounding of very large totals"
        )]
        metrics.order_totals.observe(*total as f64);
    }
}

fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() / 100 {
        1 => "1xx",
        2 => "2xx",
        3 => "3xx",
        4 => "4xx",
        5 => "5xx",
        _ => "other",
    }
}

fn encode(metrics: &Metrics) -> Result<(String, HeaderValue), String> {
    let encoder = TextEncoder::new();
    let mut body = Vec::new();

    encoder
        .encode(&metrics.registry.gather(), &mut body)
        .map_err(|source| format!("failed to encode metrics: {source}"))?;

    let content_type = HeaderValue::from_str(encoder.format_type())
        .map_err(|source| format!("invalid metrics content type: {source}"))?;

    let body = String::from_utf8(body)
        .map_err(|source| format!("metrics are not valid utf-8: {source}"))?;

    Ok((body, content_type))
}

#[handler]
pub(crate) async fn metrics_handler(res: &mut Response) {
    let encoded = metrics().ok_or_else(|| "metrics registry unavailable".to_string());

    match encoded.and_then(encode) {
        Ok((body, content_type)) => {
            res.headers_mut().insert(CONTENT_TYPE, content_type);
            res.render(body);
        }
        Err(message) => {
            error!("{message}");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}

#[cfg(test)]
mod tests {
    use salvo::{
        Router, Service,
        test::{ResponseExt, TestClient},
    };
    use testresult::TestResult;

    use storefront_app::domain::{carts::records::CartUuid, orders::records::OrderUuid};

    use super::*;

    #[test]
    fn status_classes_cover_each_family() {
        assert_eq!(status_class(StatusCode::CREATED), "2xx", "success");
        assert_eq!(status_class(StatusCode::GONE), "4xx", "client error");
        assert_eq!(
            status_class(StatusCode::INTERNAL_SERVER_ERROR),
            "5xx",
            "server error"
        );
    }

    #[tokio::test]
    async fn metrics_endpoint_exposes_http_and_cart_metrics() -> TestResult {
        observe_request("GET", "/cart", StatusCode::OK, 0.042);
        observe_request("POST", "/cart/checkout", StatusCode::CONFLICT, 0.123);
        observe_cart_event(&CartEvent::CheckoutSucceeded {
            cart: CartUuid::new(),
            order: OrderUuid::new(),
            number: "ORD-20260301-ABCDEFGH".to_string(),
            total: 275_00,
        });

        let service =
            Service::new(Router::new().push(Router::with_path("metrics").get(metrics_handler)));

        let body = TestClient::get("http://example.com/metrics")
            .send(&service)
            .await
            .take_string()
            .await?;

        assert!(
            body.contains("storefront_json_http_requests_total"),
            "request counter exposed"
        );
        assert!(
            body.contains("storefront_json_http_requests_in_flight"),
            "in-flight gauge exposed"
        );
        assert!(
            body.contains("storefront_json_cart_events_total{event=\"checkout_succeeded\"}"),
            "cart event counted"
        );
        assert!(
            body.contains("storefront_json_order_total_minor_units_count"),
            "order total observed"
        );

        Ok(())
    }
}
