//! Configuration for instrumentation behavior.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::parser::Operation;
use crate::request::RequestDescriptor;

/// Predicate deciding whether a span or breadcrumb is created for a request.
pub type RequestPredicate = Arc<dyn Fn(&RequestDescriptor) -> bool + Send + Sync>;

/// Per-field body redaction hook: `(table, key, value) -> value`.
pub type BodySanitizer = Arc<dyn Fn(&str, &str, &Value) -> Value + Send + Sync>;

/// Whole-payload redaction hook, applied to each assembled data map.
pub type DataSanitizer = Arc<dyn Fn(Map<String, Value>) -> Map<String, Value> + Send + Sync>;

/// Configuration options for query instrumentation.
///
/// # Example
///
/// ```rust
/// use supabase_tracing::{IntegrationOptions, Operation};
///
/// let options = IntegrationOptions::default()
///     .with_errors(true)
///     .with_operations([Operation::Select, Operation::Delete])
///     .with_sanitize_body(|_table, key, value| match key {
///         "password" => "<redacted>".into(),
///         _ => value.clone(),
///     });
/// ```
#[derive(Clone)]
pub struct IntegrationOptions {
    /// Whether to create spans for observed requests.
    /// Default: `true`
    pub tracing: bool,

    /// Whether to record a breadcrumb for each completed request.
    /// Default: `true`
    pub breadcrumbs: bool,

    /// Whether to report errors returned by the backend.
    /// Default: `false`
    pub errors: bool,

    /// Operations that are observed at all. Anything else passes through untouched.
    /// Default: all five operations
    pub operations: Vec<Operation>,

    /// Decides whether a span is created for a given request.
    pub should_create_span: Option<RequestPredicate>,

    /// Decides whether a breadcrumb is recorded for a given request.
    pub should_create_breadcrumb: Option<RequestPredicate>,

    /// Redacts individual body fields before they are reported.
    pub sanitize_body: Option<BodySanitizer>,

    /// Redacts whole payload maps (span data, breadcrumb data, error context).
    /// Runs after `sanitize_body`.
    pub sanitize_data: Option<DataSanitizer>,
}

impl Default for IntegrationOptions {
    fn default() -> Self {
        Self {
            tracing: true,
            breadcrumbs: true,
            errors: false,
            operations: Operation::ALL.to_vec(),
            should_create_span: None,
            should_create_breadcrumb: None,
            sanitize_body: None,
            sanitize_data: None,
        }
    }
}

impl fmt::Debug for IntegrationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrationOptions")
            .field("tracing", &self.tracing)
            .field("breadcrumbs", &self.breadcrumbs)
            .field("errors", &self.errors)
            .field("operations", &self.operations)
            .field("should_create_span", &self.should_create_span.is_some())
            .field("should_create_breadcrumb", &self.should_create_breadcrumb.is_some())
            .field("sanitize_body", &self.sanitize_body.is_some())
            .field("sanitize_data", &self.sanitize_data.is_some())
            .finish()
    }
}

impl IntegrationOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON key-value mapping, rejecting anything unrecognized.
    ///
    /// Keys use the same spelling as the JavaScript integration (`shouldCreateSpan`, ...).
    /// Hook keys cannot be expressed as data, so they are always rejected here;
    /// set them with the `with_*` methods instead.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let object = value.as_object().ok_or(ConfigError::NotAnObject)?;
        let mut options = Self::default();

        for (key, value) in object {
            match key.as_str() {
                "tracing" => options.tracing = expect_bool(key, value)?,
                "breadcrumbs" => options.breadcrumbs = expect_bool(key, value)?,
                "errors" => options.errors = expect_bool(key, value)?,
                "operations" => options.operations = parse_operations(value)?,
                "shouldCreateSpan" | "shouldCreateBreadcrumb" => {
                    return Err(ConfigError::HookNotFunction {
                        key: key.clone(),
                        returns: "a boolean",
                    })
                }
                "sanitizeBody" | "sanitizeData" => {
                    return Err(ConfigError::HookNotFunction {
                        key: key.clone(),
                        returns: "a valid data object",
                    })
                }
                _ => return Err(ConfigError::UnknownOption(key.clone())),
            }
        }

        Ok(options)
    }

    /// Enable or disable span creation.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.tracing = enabled;
        self
    }

    /// Enable or disable breadcrumbs.
    pub fn with_breadcrumbs(mut self, enabled: bool) -> Self {
        self.breadcrumbs = enabled;
        self
    }

    /// Enable or disable reporting of backend errors.
    pub fn with_errors(mut self, enabled: bool) -> Self {
        self.errors = enabled;
        self
    }

    /// Restrict observation to the given operations.
    pub fn with_operations(mut self, operations: impl IntoIterator<Item = Operation>) -> Self {
        self.operations = operations.into_iter().collect();
        self
    }

    pub fn with_should_create_span<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&RequestDescriptor) -> bool + Send + Sync + 'static,
    {
        self.should_create_span = Some(Arc::new(predicate));
        self
    }

    pub fn with_should_create_breadcrumb<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&RequestDescriptor) -> bool + Send + Sync + 'static,
    {
        self.should_create_breadcrumb = Some(Arc::new(predicate));
        self
    }

    /// Set the per-field body sanitizer.
    ///
    /// **Security Note**: request bodies are reported as-is unless a sanitizer is set.
    pub fn with_sanitize_body<F>(mut self, sanitizer: F) -> Self
    where
        F: Fn(&str, &str, &Value) -> Value + Send + Sync + 'static,
    {
        self.sanitize_body = Some(Arc::new(sanitizer));
        self
    }

    /// Set the whole-payload sanitizer.
    pub fn with_sanitize_data<F>(mut self, sanitizer: F) -> Self
    where
        F: Fn(Map<String, Value>) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.sanitize_data = Some(Arc::new(sanitizer));
        self
    }

    pub fn observes(&self, operation: Operation) -> bool {
        self.operations.contains(&operation)
    }

    pub(crate) fn allows_span(&self, request: &RequestDescriptor) -> bool {
        self.should_create_span
            .as_ref()
            .map_or(true, |predicate| predicate(request))
    }

    pub(crate) fn allows_breadcrumb(&self, request: &RequestDescriptor) -> bool {
        self.should_create_breadcrumb
            .as_ref()
            .map_or(true, |predicate| predicate(request))
    }

    pub(crate) fn sanitize_field(&self, table: &str, key: &str, value: &Value) -> Value {
        match &self.sanitize_body {
            Some(sanitizer) => sanitizer(table, key, value),
            None => value.clone(),
        }
    }

    pub(crate) fn sanitize_payload(&self, data: Map<String, Value>) -> Map<String, Value> {
        match &self.sanitize_data {
            Some(sanitizer) => sanitizer(data),
            None => data,
        }
    }
}

fn expect_bool(key: &str, value: &Value) -> Result<bool, ConfigError> {
    value.as_bool().ok_or_else(|| ConfigError::InvalidOptionType {
        key: key.to_string(),
        expected: "a boolean",
    })
}

fn parse_operations(value: &Value) -> Result<Vec<Operation>, ConfigError> {
    let items = value.as_array().ok_or(ConfigError::OperationsNotArray)?;
    items
        .iter()
        .map(|item| match item.as_str() {
            Some(name) => name.parse(),
            None => Err(ConfigError::UnknownOperation(item.to_string())),
        })
        .collect()
}
