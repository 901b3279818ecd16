//! Shared test doubles: an in-memory PostgREST-style client and a recording sink.

#![allow(dead_code)]

use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use url::Url;

use supabase_tracing::{
    AttributeSpan, Attributed, Breadcrumb, DatabaseError, ExceptionContext, FilterBuilder,
    HttpMethod, IntegrationOptions, ObservabilitySink, QueryClient, QueryResponse,
    RequestDescriptor, ResponseError, SpanDescriptor, SpanHandle, SpanStatus, SupabaseIntegration,
    TableBuilder,
};

pub const CLIENT_INFO: &str = "supabase-js-node/2.43.2";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("network failure: {0}")]
pub struct MockError(pub String);

pub type Responder =
    Arc<dyn Fn(&RequestDescriptor) -> Result<QueryResponse, MockError> + Send + Sync>;

/// Client that answers every request with a canned response.
#[derive(Clone)]
pub struct MockClient {
    base: Url,
    responder: Responder,
}

impl MockClient {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&RequestDescriptor) -> Result<QueryResponse, MockError> + Send + Sync + 'static,
    {
        Self {
            base: Url::parse("http://mock-url.com/1337/").unwrap(),
            responder: Arc::new(responder),
        }
    }

    /// Respond like PostgREST: 2xx carries data, anything else an error message.
    pub fn responding(status: u16, body: Value) -> Self {
        Self::new(move |_| {
            if (200..300).contains(&status) {
                Ok(QueryResponse {
                    data: Some(body.clone()),
                    error: None,
                    status,
                })
            } else {
                let message = match &body {
                    Value::String(message) => message.clone(),
                    other => other.to_string(),
                };
                Ok(QueryResponse::failed(status, ResponseError::new(message)))
            }
        })
    }

    pub fn failing(reason: &str) -> Self {
        let reason = reason.to_string();
        Self::new(move |_| Err(MockError(reason.clone())))
    }
}

impl QueryClient for MockClient {
    type Table = MockTable;

    fn from(&self, table: &str) -> MockTable {
        let url = self.base.join(&format!("rest/v1/{table}")).unwrap();
        let mut request = RequestDescriptor::new(HttpMethod::Get, url);
        request.schema = Some("public".to_string());
        request
            .headers
            .insert("X-Client-Info".to_string(), CLIENT_INFO.to_string());

        MockTable {
            request,
            responder: self.responder.clone(),
        }
    }
}

pub struct MockTable {
    request: RequestDescriptor,
    responder: Responder,
}

impl MockTable {
    fn into_filter(self, method: HttpMethod, body: Option<Value>) -> MockFilter {
        let mut request = self.request;
        request.method = method;
        request.body = body;
        MockFilter {
            request,
            responder: self.responder,
        }
    }
}

impl TableBuilder for MockTable {
    type Filter = MockFilter;

    fn select(self, columns: &str) -> MockFilter {
        self.into_filter(HttpMethod::Get, None).select(columns)
    }

    fn insert(self, values: Value) -> MockFilter {
        let mut filter = self.into_filter(HttpMethod::Post, Some(values));
        filter
            .request
            .headers
            .insert("Prefer".to_string(), "return=minimal".to_string());
        filter
    }

    fn upsert(self, values: Value) -> MockFilter {
        let mut filter = self.into_filter(HttpMethod::Post, Some(values));
        filter.request.headers.insert(
            "Prefer".to_string(),
            "resolution=merge-duplicates".to_string(),
        );
        filter
    }

    fn update(self, values: Value) -> MockFilter {
        self.into_filter(HttpMethod::Patch, Some(values))
    }

    fn delete(self) -> MockFilter {
        self.into_filter(HttpMethod::Delete, None)
    }
}

/// Filter builder encoding filters the way PostgREST expects them on the wire.
pub struct MockFilter {
    request: RequestDescriptor,
    responder: Responder,
}

impl MockFilter {
    fn push(mut self, key: &str, value: &str) -> Self {
        self.request.url.query_pairs_mut().append_pair(key, value);
        self
    }

    pub fn select(self, columns: &str) -> Self {
        self.push("select", columns)
    }

    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.push(column, &format!("eq.{value}"))
    }

    pub fn neq(self, column: &str, value: impl Display) -> Self {
        self.push(column, &format!("neq.{value}"))
    }

    pub fn gt(self, column: &str, value: impl Display) -> Self {
        self.push(column, &format!("gt.{value}"))
    }

    pub fn lt(self, column: &str, value: impl Display) -> Self {
        self.push(column, &format!("lt.{value}"))
    }

    pub fn ilike(self, column: &str, pattern: &str) -> Self {
        self.push(column, &format!("ilike.{pattern}"))
    }

    pub fn in_(self, column: &str, values: &[&str]) -> Self {
        self.push(column, &format!("in.({})", values.join(",")))
    }

    pub fn contains(self, column: &str, value: &str) -> Self {
        self.push(column, &format!("cs.{value}"))
    }

    pub fn not(self, column: &str, operator: &str, value: impl Display) -> Self {
        self.push(column, &format!("not.{operator}.{value}"))
    }

    pub fn or(self, filters: &str) -> Self {
        self.push("or", &format!("({filters})"))
    }

    pub fn or_referenced(self, filters: &str, table: &str) -> Self {
        self.push(&format!("{table}.or"), &format!("({filters})"))
    }

    pub fn text_search(self, column: &str, query: &str, mode: Option<&str>) -> Self {
        let verb = match mode {
            Some("plain") => "plfts",
            Some("phrase") => "phfts",
            Some("websearch") => "wfts",
            _ => "fts",
        };
        self.push(column, &format!("{verb}.{query}"))
    }

    /// Turn the request into a `HEAD` request, as `select(.., { head: true })` does.
    pub fn head(mut self) -> Self {
        self.request.method = HttpMethod::Head;
        self
    }
}

#[async_trait]
impl FilterBuilder for MockFilter {
    type Output = QueryResponse;
    type Error = MockError;

    fn request(&self) -> &RequestDescriptor {
        &self.request
    }

    async fn execute(self) -> Result<QueryResponse, MockError> {
        (self.responder)(&self.request)
    }
}

/// Everything a [`RecordingSink`] has seen.
#[derive(Debug, Default)]
pub struct Recorded {
    pub spans: Vec<SpanDescriptor>,
    pub attributes: Vec<(String, Value)>,
    pub statuses: Vec<SpanStatus>,
    pub ends: usize,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub exceptions: Vec<(DatabaseError, ExceptionContext)>,
}

#[derive(Clone, Default)]
pub struct RecordingSink(Arc<Mutex<Recorded>>);

impl RecordingSink {
    pub fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.0.lock().unwrap()
    }
}

struct RecordingSpan(Arc<Mutex<Recorded>>);

impl AttributeSpan for RecordingSpan {
    fn set_attribute(&mut self, name: &str, value: Value) {
        self.0
            .lock()
            .unwrap()
            .attributes
            .push((name.to_string(), value));
    }

    fn set_status(&mut self, status: SpanStatus) {
        self.0.lock().unwrap().statuses.push(status);
    }

    fn end(self) {
        self.0.lock().unwrap().ends += 1;
    }
}

impl ObservabilitySink for RecordingSink {
    fn start_span(&self, descriptor: SpanDescriptor) -> Option<Box<dyn SpanHandle>> {
        self.recorded().spans.push(descriptor);
        Some(Box::new(Attributed(RecordingSpan(self.0.clone()))))
    }

    fn add_breadcrumb(&self, breadcrumb: Breadcrumb) {
        self.recorded().breadcrumbs.push(breadcrumb);
    }

    fn capture_exception(&self, error: &DatabaseError, context: ExceptionContext) {
        self.recorded().exceptions.push((error.clone(), context));
    }
}

/// Build and set up an integration for [`MockClient`] reporting to `sink`.
pub fn setup(sink: &RecordingSink, options: IntegrationOptions) -> SupabaseIntegration {
    let integration = SupabaseIntegration::builder()
        .client_type::<MockClient>()
        .options(options)
        .sink(sink.clone())
        .build()
        .unwrap();
    assert!(integration.setup_once());
    integration
}

/// Span data shared by every request against `mock-table`.
pub fn common_span_data() -> Map<String, Value> {
    let mut data = Map::new();
    data.insert("db.schema".to_string(), json!("public"));
    data.insert("db.table".to_string(), json!("mock-table"));
    data.insert("db.url".to_string(), json!("http://mock-url.com"));
    data.insert("db.sdk".to_string(), json!(CLIENT_INFO));
    data
}

/// Span data for `mock-table` extended with `extra`.
pub fn span_data(extra: Value) -> Map<String, Value> {
    let mut data = common_span_data();
    if let Value::Object(extra) = extra {
        data.extend(extra);
    }
    data
}
