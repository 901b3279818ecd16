//! Basic example showing how to use supabase-tracing.
//!
//! Run with: cargo run --example basic

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use supabase_tracing::prelude::*;
use supabase_tracing::{HttpMethod, QueryResponse, RequestDescriptor, ResponseError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// A tiny in-memory stand-in for a PostgREST client.
#[derive(Clone)]
struct MemoryClient {
    base: Url,
    tables: Arc<Mutex<BTreeMap<String, Vec<Value>>>>,
}

struct MemoryTable {
    client: MemoryClient,
    request: RequestDescriptor,
}

struct MemoryFilter {
    client: MemoryClient,
    request: RequestDescriptor,
}

impl MemoryClient {
    fn new() -> Result<Self, url::ParseError> {
        Ok(Self {
            base: Url::parse("http://localhost:54321/rest/v1/")?,
            tables: Arc::default(),
        })
    }
}

impl QueryClient for MemoryClient {
    type Table = MemoryTable;

    fn from(&self, table: &str) -> MemoryTable {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(table);
        }

        let mut request = RequestDescriptor::new(HttpMethod::Get, url);
        request.schema = Some("public".to_string());
        request
            .headers
            .insert("X-Client-Info".to_string(), "memory-client/0.1.0".to_string());

        MemoryTable {
            client: self.clone(),
            request,
        }
    }
}

impl MemoryTable {
    fn filter(mut self, method: HttpMethod, body: Option<Value>) -> MemoryFilter {
        self.request.method = method;
        self.request.body = body;
        MemoryFilter {
            client: self.client,
            request: self.request,
        }
    }
}

impl TableBuilder for MemoryTable {
    type Filter = MemoryFilter;

    fn select(self, columns: &str) -> MemoryFilter {
        let mut filter = self.filter(HttpMethod::Get, None);
        filter
            .request
            .url
            .query_pairs_mut()
            .append_pair("select", columns);
        filter
    }

    fn insert(self, values: Value) -> MemoryFilter {
        self.filter(HttpMethod::Post, Some(values))
    }

    fn upsert(self, values: Value) -> MemoryFilter {
        let mut filter = self.filter(HttpMethod::Post, Some(values));
        filter.request.headers.insert(
            "Prefer".to_string(),
            "resolution=merge-duplicates".to_string(),
        );
        filter
    }

    fn update(self, values: Value) -> MemoryFilter {
        self.filter(HttpMethod::Patch, Some(values))
    }

    fn delete(self) -> MemoryFilter {
        self.filter(HttpMethod::Delete, None)
    }
}

impl MemoryFilter {
    fn eq(mut self, column: &str, value: impl std::fmt::Display) -> Self {
        self.request
            .url
            .query_pairs_mut()
            .append_pair(column, &format!("eq.{value}"));
        self
    }
}

#[async_trait]
impl FilterBuilder for MemoryFilter {
    type Output = QueryResponse;
    type Error = std::convert::Infallible;

    fn request(&self) -> &RequestDescriptor {
        &self.request
    }

    async fn execute(self) -> Result<QueryResponse, Self::Error> {
        let table = self.request.table();
        let mut tables = self.client.tables.lock().unwrap_or_else(|e| e.into_inner());
        let rows = tables.entry(table).or_default();

        let response = match (self.request.method, self.request.body) {
            (HttpMethod::Get, _) => QueryResponse::ok(Value::from(rows.clone())),
            (HttpMethod::Post, Some(row)) => {
                rows.push(row.clone());
                QueryResponse {
                    status: 201,
                    ..QueryResponse::ok(row)
                }
            }
            (HttpMethod::Delete, _) => {
                let removed = std::mem::take(rows);
                QueryResponse::ok(Value::from(removed))
            }
            _ => QueryResponse::failed(
                405,
                ResponseError::new("method not supported by the in-memory client"),
            ),
        };

        Ok(response)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,supabase_tracing=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let client = MemoryClient::new()?;

    // Option 1: Defaults (spans and breadcrumbs, no error capture)
    // let integration = SupabaseIntegration::builder()
    //     .client_type::<MemoryClient>()
    //     .build()?;

    // Option 2: Custom configuration
    let integration = SupabaseIntegration::builder()
        .client_instance(&client)
        .options(
            IntegrationOptions::default()
                .with_errors(true)
                .with_sanitize_body(|_table, key, value| match key {
                    "password" => json!("<redacted>"),
                    _ => value.clone(),
                }),
        )
        .sink(TracingSink::default())
        .build()?;

    integration.setup_once();

    // All queries through this client are now instrumented
    let client = client.instrumented(&integration);

    client
        .from("users")
        .insert(json!({ "id": 1, "name": "Ada", "password": "hunter2" }))
        .await?;

    let users = client
        .from("users")
        .select("*")
        .with(|q| q.eq("id", 1))
        .await?;
    tracing::info!(users = ?users.data, "Fetched users");

    // Unsupported by the in-memory client, reported as an error
    client
        .from("users")
        .update(json!({ "name": "Grace" }))
        .with(|q| q.eq("id", 1))
        .await?;

    client.from("users").delete().with(|q| q.eq("id", 1)).await?;

    integration.restore();

    Ok(())
}
