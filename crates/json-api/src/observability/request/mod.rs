//! Per-request span, request id, access log and HTTP metrics.

mod parent_context;
mod request_ids;
mod routes;

use std::time::{Duration, Instant};

use salvo::{
    Request, handler,
    http::StatusCode,
    prelude::{Depot, FlowCtrl, Response},
};
use tracing::{Instrument as _, Span, error, field, info, info_span, warn};
use tracing_opentelemetry::OpenTelemetrySpanExt as _;

use self::request_ids::{REQUEST_ID_HEADER, RequestId};
use super::{metrics, settings};

/// Scrapes are neither traced nor counted.
const UNTRACED_PATHS: &[&str] = &["/metrics"];

/// What the completion log line says about a finished request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    ClientError,
    ServerError,
}

impl Outcome {
    fn of(status: StatusCode) -> Self {
        if status.is_server_error() {
            Self::ServerError
        } else if status.is_client_error() {
            Self::ClientError
        } else {
            Self::Success
        }
    }
}

struct RequestContext {
    id: RequestId,
    method: String,
    path: String,
    route: String,
    started: Instant,
}

impl RequestContext {
    fn from_request(req: &Request) -> Self {
        let path = req.uri().path().to_owned();

        Self {
            id: RequestId::from_header(
                req.headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok()),
            ),
            method: req.method().as_str().to_owned(),
            route: routes::route_template(&path),
            path,
            started: Instant::now(),
        }
    }

    fn span(&self, req: &Request) -> Span {
        let span = info_span!(
            parent: None,
            "http.request",
            otel.name = %format!("{} {}", self.method, self.route),
            otel.kind = "server",
            request_id = %self.id,
            method = %self.method,
            path = %self.path,
            remote_addr = %req.remote_addr(),
            status = field::Empty,
            duration_ms = field::Empty,
        );

        if settings::request_settings().propagate_parent
            && let Some(parent) = parent_context::remote_parent(req.headers())
            && let Err(source) = span.set_parent(parent)
        {
            warn!("failed to continue remote trace: {source}");
        }

        span
    }

    fn finish(&self, span: &Span, status: StatusCode) {
        let elapsed = self.started.elapsed();
        let duration_ms = elapsed.as_millis();

        metrics::observe_request(&self.method, &self.route, status, elapsed.as_secs_f64());

        span.record("status", status.as_u16());
        span.record("duration_ms", duration_ms);

        span.in_scope(|| {
            let code = status.as_u16();

            match Outcome::of(status) {
                Outcome::ServerError => error!(status = code, duration_ms, "request.failed"),
                Outcome::ClientError => warn!(status = code, duration_ms, "request.rejected"),
                Outcome::Success => info!(status = code, duration_ms, "request.completed"),
            }

            let threshold = settings::request_settings().slow_request_threshold;

            if is_slow(elapsed, threshold) {
                warn!(
                    route = %self.route,
                    duration_ms,
                    threshold_ms = threshold.as_millis(),
                    "request.slow"
                );
            }
        });
    }
}

fn is_slow(elapsed: Duration, threshold: Duration) -> bool {
    elapsed > threshold
}

#[handler]
pub(crate) async fn request_logging(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    if UNTRACED_PATHS.contains(&req.uri().path()) {
        ctrl.call_next(req, depot, res).await;
        return;
    }

    let context = RequestContext::from_request(req);
    let span = context.span(req);
    let _in_flight = metrics::InFlight::start();

    context.id.write_header(res);

    ctrl.call_next(req, depot, res)
        .instrument(span.clone())
        .await;

    context.finish(&span, res.status_code.unwrap_or(StatusCode::OK));
}
