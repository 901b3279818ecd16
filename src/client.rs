//! Capability contracts for the three builder roles of a query client.
//!
//! A client hands out a table builder per table; each operation on the table
//! builder hands out a filter builder; awaiting the filter builder sends the
//! request. Implement these for your client to instrument it.

use async_trait::async_trait;
use serde_json::Value;

use crate::request::{QueryResult, RequestDescriptor};

/// Entry point of a query client.
pub trait QueryClient {
    type Table: TableBuilder;

    /// Start a query against `table`.
    fn from(&self, table: &str) -> Self::Table;
}

/// Per-table builder exposing the five operations.
pub trait TableBuilder {
    type Filter: FilterBuilder;

    fn select(self, columns: &str) -> Self::Filter;

    fn insert(self, values: Value) -> Self::Filter;

    fn upsert(self, values: Value) -> Self::Filter;

    fn update(self, values: Value) -> Self::Filter;

    fn delete(self) -> Self::Filter;
}

/// Builder that accumulates filters and finally executes the request.
#[async_trait]
pub trait FilterBuilder: Send + Sized {
    type Output: QueryResult + Send;
    type Error: Send;

    /// The request as it would be sent right now.
    fn request(&self) -> &RequestDescriptor;

    /// Send the request. This is the completion hook the instrumentation wraps.
    async fn execute(self) -> Result<Self::Output, Self::Error>;
}
