//! Default sink that emits through the `tracing` crate.

use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{field, Span};

use crate::sink::{
    AttributeSpan, Attributed, Breadcrumb, DatabaseError, ExceptionContext, ObservabilitySink,
    SpanDescriptor, SpanHandle,
};
use crate::status::SpanStatus;

/// Renders spans, breadcrumbs and captured errors as `tracing` spans and events.
///
/// Spans are named `db.query` and become children of whatever span is current
/// when the query is awaited, so they nest under HTTP request spans from
/// `tower-http` or similar middleware.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use supabase_tracing::TracingSink;
///
/// let sink = TracingSink::default().with_slow_request_threshold(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone)]
pub struct TracingSink {
    slow_request_threshold: Duration,
}

impl Default for TracingSink {
    fn default() -> Self {
        Self {
            slow_request_threshold: Duration::from_millis(500),
        }
    }
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests slower than this are logged at WARN level with `slow_query = true`.
    pub fn with_slow_request_threshold(mut self, threshold: Duration) -> Self {
        self.slow_request_threshold = threshold;
        self
    }
}

/// A `db.query` span opened by [`TracingSink`].
#[derive(Debug)]
pub struct TracingSpan {
    span: Span,
    start: Instant,
    slow_request_threshold: Duration,
}

fn record_value(span: &Span, name: &str, value: &Value) {
    match value {
        Value::String(s) => {
            span.record(name, s.as_str());
        }
        Value::Number(n) => match n.as_i64() {
            Some(i) => {
                span.record(name, i);
            }
            None => {
                span.record(name, field::display(n));
            }
        },
        Value::Bool(b) => {
            span.record(name, *b);
        }
        other => {
            span.record(name, field::display(other));
        }
    }
}

impl AttributeSpan for TracingSpan {
    fn set_attribute(&mut self, name: &str, value: Value) {
        record_value(&self.span, name, &value);
    }

    fn set_status(&mut self, status: SpanStatus) {
        match status {
            SpanStatus::Ok => {
                self.span.record("otel.status_code", "OK");
            }
            SpanStatus::Error(reason) => {
                self.span.record("otel.status_code", "ERROR");
                self.span.record("otel.status_description", reason.as_str());
                tracing::warn!(parent: &self.span, reason = %reason, "Database request failed");
            }
        }
    }

    fn scope(&self) -> Span {
        self.span.clone()
    }

    fn end(self) {
        let elapsed = self.start.elapsed();
        let duration_ms = elapsed.as_millis() as i64;
        self.span.record("db.duration_ms", duration_ms);

        if elapsed > self.slow_request_threshold {
            self.span.record("slow_query", true);
            let threshold_ms = self.slow_request_threshold.as_millis() as i64;
            tracing::warn!(
                parent: &self.span,
                duration_ms = duration_ms,
                threshold_ms = threshold_ms,
                "Slow query detected"
            );
        }
    }
}

impl ObservabilitySink for TracingSink {
    fn start_span(&self, descriptor: SpanDescriptor) -> Option<Box<dyn SpanHandle>> {
        let span = tracing::info_span!(
            "db.query",
            otel.name = %descriptor.description,
            otel.kind = "client",
            db.system = "postgresql",
            db.operation = %descriptor.op,
            span.origin = %descriptor.origin,
            db.sql.table = field::Empty,
            db.schema = field::Empty,
            db.url = field::Empty,
            db.sdk = field::Empty,
            db.query = field::Empty,
            db.body = field::Empty,
            db.duration_ms = field::Empty,
            http.response.status_code = field::Empty,
            otel.status_code = field::Empty,
            otel.status_description = field::Empty,
            slow_query = field::Empty,
        );

        for (key, value) in &descriptor.data {
            // Follow the OpenTelemetry name for the table
            let name = if key == "db.table" { "db.sql.table" } else { key.as_str() };
            record_value(&span, name, value);
        }

        Some(Box::new(Attributed(TracingSpan {
            span,
            start: Instant::now(),
            slow_request_threshold: self.slow_request_threshold,
        })))
    }

    fn add_breadcrumb(&self, breadcrumb: Breadcrumb) {
        let data = breadcrumb
            .data
            .as_ref()
            .and_then(|data| serde_json::to_string(data).ok())
            .unwrap_or_default();

        tracing::info!(
            kind = %breadcrumb.kind,
            category = %breadcrumb.category,
            data = %data,
            "{}",
            breadcrumb.message
        );
    }

    fn capture_exception(&self, error: &DatabaseError, context: ExceptionContext) {
        let context = serde_json::to_string(&context).unwrap_or_default();

        tracing::error!(
            error.message = %error.message,
            error.code = ?error.code,
            error.details = ?error.details,
            error.hint = ?error.hint,
            context = %context,
            "Database request returned an error"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Buffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let buffer = Buffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        buffer.contents()
    }

    #[test]
    fn test_span_status_is_logged() {
        let output = capture(|| {
            let sink = TracingSink::default();
            let mut data = Map::new();
            data.insert("db.table".to_string(), json!("mock-table"));
            let mut span = sink
                .start_span(SpanDescriptor {
                    description: "from(mock-table)".to_string(),
                    op: "db.select".to_string(),
                    origin: "auto.db.supabase".to_string(),
                    data,
                })
                .unwrap();
            span.set_http_status(404);
            span.end();
        });

        assert!(output.contains("Database request failed"));
        assert!(output.contains("not_found"));
        assert!(output.contains("from(mock-table)"));
    }

    #[test]
    fn test_breadcrumb_and_exception_are_logged() {
        let output = capture(|| {
            let sink = TracingSink::default();
            sink.add_breadcrumb(Breadcrumb {
                kind: "supabase".to_string(),
                category: "db.insert".to_string(),
                message: "from(users)".to_string(),
                data: None,
            });
            sink.capture_exception(
                &DatabaseError {
                    message: "permission denied".to_string(),
                    code: Some("42501".to_string()),
                    details: None,
                    hint: None,
                },
                ExceptionContext::default(),
            );
        });

        assert!(output.contains("db.insert"));
        assert!(output.contains("from(users)"));
        assert!(output.contains("Database request returned an error"));
        assert!(output.contains("42501"));
    }
}
