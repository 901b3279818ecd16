//! # supabase-tracing
//!
//! Tracing, breadcrumb and error instrumentation for Supabase/PostgREST query builders.
//!
//! Queries built through an instrumented client are observed when they are
//! awaited: a span describes the request, a breadcrumb records it, and errors
//! returned by the backend can be reported. Results are handed back to the
//! caller untouched.
//!
//! ## Features
//!
//! - **Transparent Wrapping**: `from(table)`, the five table operations and the
//!   completion of the filter builder are wrapped; everything else is forwarded
//! - **Readable Queries**: URL filters like `id=eq.42` are reported as `eq(id, 42)`
//! - **Operation Detection**: `select`, `insert`, `upsert`, `update`, `delete`
//!   derived from method and `Prefer` header
//! - **Redaction Hooks**: per-field body sanitizer and whole-payload sanitizer
//! - **Pluggable Backend**: spans go to any [`ObservabilitySink`]; the default
//!   [`TracingSink`] emits `tracing` spans and events
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use supabase_tracing::prelude::*;
//!
//! let integration = SupabaseIntegration::builder()
//!     .client_type::<MyClient>()
//!     .build()?;
//! integration.setup_once();
//!
//! let client = my_client.instrumented(&integration);
//! let response = client
//!     .from("users")
//!     .select("*")
//!     .with(|q| q.eq("id", 42))
//!     .await?;
//! ```
//!
//! ## Span Data
//!
//! | Key | Description |
//! |-----|-------------|
//! | `db.table` | Table, from the last URL path segment |
//! | `db.schema` | Schema in use (when set) |
//! | `db.url` | Origin of the request URL |
//! | `db.sdk` | Value of the `X-Client-Info` header |
//! | `db.query` | Reconstructed filter calls (omitted when empty) |
//! | `db.body` | Sanitized request body (omitted when empty) |

mod client;
mod config;
mod error;
mod instrument;
mod integration;
mod parser;
mod pipeline;
mod registry;
mod request;
mod sink;
mod status;
mod tracing_sink;

pub use client::{FilterBuilder, QueryClient, TableBuilder};
pub use config::{BodySanitizer, DataSanitizer, IntegrationOptions, RequestPredicate};
pub use error::ConfigError;
pub use instrument::{InstrumentExt, InstrumentedClient, InstrumentedFilter, InstrumentedTable};
pub use integration::{IntegrationBuilder, SupabaseIntegration};
pub use parser::{filter_method, translate_filter, translate_query, Operation, TextSearchMode};
pub use registry::{BuilderRole, InstrumentationRegistry, InstrumentedTarget, TargetId};
pub use request::{
    header, Headers, HttpMethod, QueryResponse, QueryResult, RequestDescriptor, ResponseError,
};
pub use sink::{
    AttributeSpan, Attributed, Breadcrumb, DatabaseError, ExceptionContext, ObservabilitySink,
    SpanDescriptor, SpanHandle, BREADCRUMB_TYPE, HTTP_STATUS_ATTRIBUTE, SPAN_ORIGIN,
};
pub use status::{SpanStatus, StatusReason};
pub use tracing_sink::{TracingSink, TracingSpan};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        FilterBuilder, InstrumentExt, IntegrationOptions, ObservabilitySink, QueryClient,
        SupabaseIntegration, TableBuilder, TracingSink,
    };
}
