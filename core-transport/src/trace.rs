//! Default observer: every attempt at `TRACE` level

use bridge_traits::observer::{HttpObserver, RequestRecord, ResponseRecord};
use tracing::{trace, warn};

/// Emits one `TRACE` event per request and per response.
///
/// Headers arrive already sanitized; JSON bodies are pretty-printed.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl HttpObserver for TracingObserver {
    fn on_request(&self, record: &RequestRecord) {
        trace!(
            target: "core_transport::http",
            attempt = record.attempt,
            "[{}] {}\n{}\n{}",
            record.method,
            record.url,
            record.render_headers(),
            record.render_body()
        );
    }

    fn on_response(&self, record: &ResponseRecord) {
        trace!(
            target: "core_transport::http",
            attempt = record.attempt,
            status = record.status,
            "[{}] {}\n{}\n{}",
            record.status,
            record.url,
            record.render_headers(),
            record.render_body()
        );
    }

    fn on_failure(&self, attempt: u32, url: &str, error: &str) {
        warn!(target: "core_transport::http", attempt, url, error, "HTTP attempt failed");
    }
}
