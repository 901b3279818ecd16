//! Request parsing utilities: operation classification and filter reconstruction.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::request::{header, Headers, HttpMethod, RequestDescriptor};

/// Semantic database operations a request can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Select,
    Insert,
    Upsert,
    Update,
    Delete,
}

impl Operation {
    /// Every operation, in the order the table builder exposes them.
    pub const ALL: [Operation; 5] = [
        Operation::Select,
        Operation::Insert,
        Operation::Upsert,
        Operation::Update,
        Operation::Delete,
    ];

    /// Method names wrapped on a table builder.
    pub const METHOD_NAMES: [&'static str; 5] = ["select", "insert", "upsert", "update", "delete"];

    /// Returns the operation as it appears in method names and option lists.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Select => "select",
            Operation::Insert => "insert",
            Operation::Upsert => "upsert",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    /// Span `op` / breadcrumb category, e.g. `db.select`.
    pub fn op_name(&self) -> String {
        format!("db.{}", self.as_str())
    }

    /// Classify a request by method and headers.
    ///
    /// `HEAD` and anything else unrecognized yield `None`.
    pub fn classify(method: HttpMethod, headers: &Headers) -> Option<Self> {
        match method {
            HttpMethod::Get => Some(Operation::Select),
            HttpMethod::Post => {
                let upsert = header(headers, "Prefer")
                    .map(|prefer| prefer.contains("resolution="))
                    .unwrap_or(false);
                if upsert {
                    Some(Operation::Upsert)
                } else {
                    Some(Operation::Insert)
                }
            }
            HttpMethod::Patch => Some(Operation::Update),
            HttpMethod::Delete => Some(Operation::Delete),
            HttpMethod::Head => None,
        }
    }

    pub fn of_request(request: &RequestDescriptor) -> Option<Self> {
        Self::classify(request.method, &request.headers)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownOperation(s.to_string()))
    }
}

// Wire verb -> fluent method name
static FILTER_METHODS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("eq", "eq"),
        ("neq", "neq"),
        ("gt", "gt"),
        ("gte", "gte"),
        ("lt", "lt"),
        ("lte", "lte"),
        ("like", "like"),
        ("like(all)", "likeAllOf"),
        ("like(any)", "likeAnyOf"),
        ("ilike", "ilike"),
        ("ilike(all)", "ilikeAllOf"),
        ("ilike(any)", "ilikeAnyOf"),
        ("is", "is"),
        ("in", "in"),
        ("cs", "contains"),
        ("cd", "containedBy"),
        ("sr", "rangeGt"),
        ("nxl", "rangeGte"),
        ("sl", "rangeLt"),
        ("nxr", "rangeLte"),
        ("adj", "rangeAdjacent"),
        ("ov", "overlaps"),
        ("not", "not"),
    ])
});

// Full-text search verbs may carry a config part, e.g. `plfts(english)`
static TEXT_SEARCH_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(pl|ph|w)?fts").unwrap());

/// Search mode of a `textSearch` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSearchMode {
    Default,
    Plain,
    Phrase,
    Websearch,
}

impl TextSearchMode {
    /// Detect a full-text search verb and its mode.
    pub fn detect(verb: &str) -> Option<Self> {
        let caps = TEXT_SEARCH_REGEX.captures(verb)?;
        let mode = match caps.get(1).map(|m| m.as_str()) {
            None => TextSearchMode::Default,
            Some("pl") => TextSearchMode::Plain,
            Some("ph") => TextSearchMode::Phrase,
            Some(_) => TextSearchMode::Websearch,
        };
        Some(mode)
    }

    pub fn method_name(&self) -> &'static str {
        match self {
            TextSearchMode::Default => "textSearch",
            TextSearchMode::Plain => "textSearch[plain]",
            TextSearchMode::Phrase => "textSearch[phrase]",
            TextSearchMode::Websearch => "textSearch[websearch]",
        }
    }
}

/// Resolve a wire filter verb to the fluent method that produces it.
pub fn filter_method(verb: &str) -> &'static str {
    if let Some(mode) = TextSearchMode::detect(verb) {
        return mode.method_name();
    }
    FILTER_METHODS.get(verb).copied().unwrap_or("filter")
}

/// Rebuild a fluent-call-like fragment from one decoded query parameter.
///
/// ```
/// use supabase_tracing::translate_filter;
///
/// assert_eq!(translate_filter("select", "id,name"), "select(id,name)");
/// assert_eq!(translate_filter("id", "eq.42"), "eq(id, 42)");
/// assert_eq!(translate_filter("or", "(id.eq.8)"), "or(id.eq.8)");
/// ```
pub fn translate_filter(key: &str, value: &str) -> String {
    if value.is_empty() || value == "*" {
        return "select(*)".to_string();
    }

    if key == "select" {
        return format!("select({value})");
    }

    // The value already carries the nested filter syntax
    if key == "or" || key.ends_with(".or") {
        return format!("{key}{value}");
    }

    let (verb, operand) = value.split_once('.').unwrap_or((value, ""));
    format!("{}({key}, {operand})", filter_method(verb))
}

/// Translate every query parameter of a request, in URL order.
pub fn translate_query(request: &RequestDescriptor) -> Vec<String> {
    request
        .query_pairs()
        .iter()
        .map(|(key, value)| translate_filter(key, value))
        .collect()
}
