//! Observation of a single completed query.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{Instrument, Span};

use crate::client::FilterBuilder;
use crate::config::IntegrationOptions;
use crate::parser::{translate_query, Operation};
use crate::request::{QueryResult, RequestDescriptor, ResponseError};
use crate::sink::{
    Breadcrumb, DatabaseError, ExceptionContext, ObservabilitySink, SpanDescriptor, SpanHandle,
    BREADCRUMB_TYPE, SPAN_ORIGIN,
};

/// Status recorded on a span whose request failed outright.
const REJECTED_STATUS: u16 = 500;

/// Runs the observation around a filter builder's completion.
#[derive(Clone)]
pub(crate) struct Observer {
    options: Arc<IntegrationOptions>,
    sink: Arc<dyn ObservabilitySink>,
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Observer {
    pub(crate) fn new(options: Arc<IntegrationOptions>, sink: Arc<dyn ObservabilitySink>) -> Self {
        Self { options, sink }
    }

    pub(crate) fn options(&self) -> &IntegrationOptions {
        &self.options
    }

    /// Execute `builder`, reporting to the sink when its operation is observed.
    ///
    /// The result is returned exactly as the builder produced it.
    pub(crate) async fn observe<F: FilterBuilder>(
        &self,
        builder: F,
    ) -> Result<F::Output, F::Error> {
        let Some(observation) = Observation::prepare(builder.request(), &self.options) else {
            return builder.execute().await;
        };

        let mut span = observation.start_span(&self.options, self.sink.as_ref());

        let scope = span.as_ref().map_or_else(Span::none, |span| span.scope());
        let result = builder.execute().instrument(scope).await;

        match &result {
            Ok(response) => {
                if let Some(mut span) = span.take() {
                    span.set_http_status(response.status());
                    span.end();
                }

                if self.options.errors {
                    if let Some(error) = response.error() {
                        observation.capture(error, &self.options, self.sink.as_ref());
                    }
                }

                if self.options.breadcrumbs && self.options.allows_breadcrumb(&observation.request) {
                    self.sink.add_breadcrumb(observation.breadcrumb(&self.options));
                }
            }
            Err(_) => {
                if let Some(mut span) = span.take() {
                    span.set_http_status(REJECTED_STATUS);
                    span.end();
                }
            }
        }

        result
    }
}

/// Everything derived from a request before it is sent.
#[derive(Debug)]
struct Observation {
    operation: Operation,
    request: RequestDescriptor,
    table: String,
    query: Vec<String>,
    body: Map<String, Value>,
}

impl Observation {
    /// Returns `None` when the request's operation is not observed.
    fn prepare(request: &RequestDescriptor, options: &IntegrationOptions) -> Option<Self> {
        let operation = Operation::of_request(request)?;
        if !options.observes(operation) {
            return None;
        }

        let table = request.table();
        let query = translate_query(request);

        let mut body = Map::new();
        if let Some(Value::Object(fields)) = &request.body {
            for (key, value) in fields {
                body.insert(key.clone(), options.sanitize_field(&table, key, value));
            }
        }

        Some(Self {
            operation,
            request: request.clone(),
            table,
            query,
            body,
        })
    }

    fn description(&self) -> String {
        format!("from({})", self.table)
    }

    fn start_span(
        &self,
        options: &IntegrationOptions,
        sink: &dyn ObservabilitySink,
    ) -> Option<Box<dyn SpanHandle>> {
        if !options.tracing || !options.allows_span(&self.request) {
            return None;
        }

        let mut data = Map::new();
        data.insert("db.table".to_string(), Value::from(self.table.as_str()));
        if let Some(schema) = &self.request.schema {
            data.insert("db.schema".to_string(), Value::from(schema.as_str()));
        }
        data.insert(
            "db.url".to_string(),
            Value::from(self.request.url.origin().ascii_serialization()),
        );
        if let Some(sdk) = self.request.client_info() {
            data.insert("db.sdk".to_string(), Value::from(sdk));
        }
        if !self.query.is_empty() {
            data.insert("db.query".to_string(), Value::from(self.query.clone()));
        }
        if !self.body.is_empty() {
            data.insert("db.body".to_string(), Value::Object(self.body.clone()));
        }

        sink.start_span(SpanDescriptor {
            description: self.description(),
            op: self.operation.op_name(),
            origin: SPAN_ORIGIN.to_string(),
            data: options.sanitize_payload(data),
        })
    }

    /// `{ query, body }`, each omitted when empty.
    fn payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        if !self.query.is_empty() {
            payload.insert("query".to_string(), Value::from(self.query.clone()));
        }
        if !self.body.is_empty() {
            payload.insert("body".to_string(), Value::Object(self.body.clone()));
        }
        payload
    }

    fn capture(&self, error: &ResponseError, options: &IntegrationOptions, sink: &dyn ObservabilitySink) {
        let context = ExceptionContext {
            supabase: options.sanitize_payload(self.payload()),
        };
        sink.capture_exception(&DatabaseError::from(error), context);
    }

    fn breadcrumb(&self, options: &IntegrationOptions) -> Breadcrumb {
        let payload = self.payload();
        let data = if payload.is_empty() {
            None
        } else {
            Some(options.sanitize_payload(payload))
        };

        Breadcrumb {
            kind: BREADCRUMB_TYPE.to_string(),
            category: self.operation.op_name(),
            message: self.description(),
            data,
        }
    }
}
