//! Event sink used by the server.

use storefront_app::events::{CartEvent, EventSink, TracingEventSink};

use crate::observability::observe_cart_event;

/// Logs every event and records it in Prometheus.
#[derive(Debug, Default)]
pub(crate) struct MeteredEventSink {
    inner: TracingEventSink,
}

impl EventSink for MeteredEventSink {
    fn emit(&self, event: CartEvent) {
        observe_cart_event(&event);

        self.inner.emit(event);
    }
}
