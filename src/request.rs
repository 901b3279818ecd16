//! Request and response shapes observed at query completion.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// HTTP methods a query builder can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Header map carried by a request. Lookups are case-insensitive.
pub type Headers = BTreeMap<String, String>;

/// Look up a header by name, ignoring ASCII case.
pub fn header<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Everything a filter builder knows about its request when it is awaited.
///
/// This is also the payload handed to the `should_create_span` and
/// `should_create_breadcrumb` predicates.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Headers,
    pub schema: Option<String>,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Headers::new(),
            schema: None,
            body: None,
        }
    }

    /// Table name, taken from the final path segment of the URL.
    pub fn table(&self) -> String {
        self.url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        header(&self.headers, name)
    }

    /// Client SDK identifier from the `X-Client-Info` header.
    pub fn client_info(&self) -> Option<&str> {
        self.header("X-Client-Info")
    }

    /// Decoded query parameters, in URL order, repeats preserved.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.url
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect()
    }
}

/// Error returned by the backend inside an otherwise resolved response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResponseError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ResponseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }
}

/// What the pipeline needs to read from a resolved query result.
pub trait QueryResult {
    /// HTTP status of the response.
    fn status(&self) -> u16;

    /// Error carried by the response, if the backend reported one.
    fn error(&self) -> Option<&ResponseError>;
}

/// A resolved PostgREST-style response: `{ data, error, status }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub data: Option<Value>,
    pub error: Option<ResponseError>,
    pub status: u16,
}

impl QueryResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            data: Some(data),
            error: None,
            status: 200,
        }
    }

    pub fn failed(status: u16, error: ResponseError) -> Self {
        Self {
            data: None,
            error: Some(error),
            status,
        }
    }
}

impl QueryResult for QueryResponse {
    fn status(&self) -> u16 {
        self.status
    }

    fn error(&self) -> Option<&ResponseError> {
        self.error.as_ref()
    }
}
