//! The observability backend as seen by the instrumentation.
//!
//! A sink receives three kinds of output:
//!
//! | Output | Sink method |
//! |--------|-------------|
//! | Span per observed request | [`ObservabilitySink::start_span`] |
//! | Breadcrumb per completed request | [`ObservabilitySink::add_breadcrumb`] |
//! | Error returned by the backend | [`ObservabilitySink::capture_exception`] |
//!
//! Spans come in two styles. Span-object backends implement [`SpanHandle`]
//! directly and receive the raw HTTP status. Attribute-style backends implement
//! [`AttributeSpan`] and are wrapped in [`Attributed`], which records the status
//! as an attribute and maps it to a [`SpanStatus`].

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::Span;

use crate::request::ResponseError;
use crate::status::SpanStatus;

/// Origin tag attached to every span.
pub const SPAN_ORIGIN: &str = "auto.db.supabase";

/// Breadcrumb type attached to every breadcrumb.
pub const BREADCRUMB_TYPE: &str = "supabase";

/// Attribute carrying the raw HTTP response status.
pub const HTTP_STATUS_ATTRIBUTE: &str = "http.response.status_code";

/// Everything needed to open a span.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanDescriptor {
    /// `from(<table>)`
    pub description: String,
    /// `db.<operation>`
    pub op: String,
    pub origin: String,
    pub data: Map<String, Value>,
}

/// A non-timed diagnostic record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breadcrumb {
    #[serde(rename = "type")]
    pub kind: String,
    pub category: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

/// Error synthesized from a backend error response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DatabaseError {
    pub message: String,
    pub code: Option<String>,
    pub details: Option<String>,
    pub hint: Option<String>,
}

impl From<&ResponseError> for DatabaseError {
    fn from(error: &ResponseError) -> Self {
        Self {
            message: error.message.clone(),
            code: error.code.clone(),
            details: error.details.clone(),
            hint: error.hint.clone(),
        }
    }
}

/// Context attached to a captured exception, nested under the `supabase` key.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ExceptionContext {
    pub supabase: Map<String, Value>,
}

/// A live span owned by the pipeline for the duration of one request.
pub trait SpanHandle: Send {
    /// Record the HTTP status the request settled with.
    fn set_http_status(&mut self, status: u16);

    /// `tracing` span the request runs in while it is in flight.
    fn scope(&self) -> Span {
        Span::none()
    }

    /// Terminate the span. Called exactly once.
    fn end(self: Box<Self>);
}

/// An attribute-style span.
pub trait AttributeSpan: Send {
    fn set_attribute(&mut self, name: &str, value: Value);

    fn set_status(&mut self, status: SpanStatus);

    fn scope(&self) -> Span {
        Span::none()
    }

    fn end(self);
}

/// Adapts an [`AttributeSpan`] into a [`SpanHandle`].
///
/// Statuses outside 100..=599 are recorded as an attribute only; the span
/// status is left untouched.
#[derive(Debug)]
pub struct Attributed<S>(pub S);

impl<S: AttributeSpan> SpanHandle for Attributed<S> {
    fn set_http_status(&mut self, status: u16) {
        self.0.set_attribute(HTTP_STATUS_ATTRIBUTE, Value::from(status));

        let outcome = SpanStatus::from_http(status);
        if outcome.is_reportable() {
            self.0.set_status(outcome);
        }
    }

    fn scope(&self) -> Span {
        self.0.scope()
    }

    fn end(self: Box<Self>) {
        let Attributed(span) = *self;
        span.end();
    }
}

/// Receiver of spans, breadcrumbs and captured exceptions.
pub trait ObservabilitySink: Send + Sync {
    /// Open a span. Returning `None` (e.g. no active transaction) skips span bookkeeping.
    fn start_span(&self, descriptor: SpanDescriptor) -> Option<Box<dyn SpanHandle>>;

    fn add_breadcrumb(&self, breadcrumb: Breadcrumb);

    fn capture_exception(&self, error: &DatabaseError, context: ExceptionContext);
}
