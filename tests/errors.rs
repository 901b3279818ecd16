mod common;

use serde_json::json;
use supabase_tracing::{
    DatabaseError, InstrumentExt, IntegrationOptions, Operation, QueryResponse, ResponseError,
};

use common::{setup, MockClient, RecordingSink};

#[tokio::test]
async fn test_errors_not_captured_by_default() {
    let sink = RecordingSink::default();
    let integration = setup(&sink, IntegrationOptions::default());
    let client = MockClient::responding(500, json!("Invalid request")).instrumented(&integration);

    let response = client
        .from("mock-table")
        .select("*")
        .with(|q| q.eq("id", 42))
        .await
        .unwrap();

    assert_eq!(response.error, Some(ResponseError::new("Invalid request")));
    assert!(sink.recorded().exceptions.is_empty());
}

#[tokio::test]
async fn test_capture_errors_for_all_operations() {
    let sink = RecordingSink::default();
    let integration = setup(&sink, IntegrationOptions::default().with_errors(true));
    let client = MockClient::responding(500, json!("Invalid request")).instrumented(&integration);

    client
        .from("mock-table")
        .select("*")
        .with(|q| q.eq("id", 42))
        .await
        .unwrap();
    client.from("mock-table").insert(json!({ "id": 42 })).await.unwrap();
    client
        .from("mock-table")
        .upsert(json!({ "id": 42 }))
        .with(|q| q.select("*"))
        .await
        .unwrap();
    client
        .from("mock-table")
        .update(json!({ "id": 1337 }))
        .with(|q| q.eq("id", 42))
        .await
        .unwrap();
    client
        .from("mock-table")
        .delete()
        .with(|q| q.eq("id", 42))
        .await
        .unwrap();

    let recorded = sink.recorded();
    assert_eq!(recorded.exceptions.len(), 5);
    for (error, _) in &recorded.exceptions {
        assert_eq!(error.to_string(), "Invalid request");
        assert_eq!(error.code, None);
        assert_eq!(error.details, None);
    }

    let contexts: Vec<_> = recorded
        .exceptions
        .iter()
        .map(|(_, context)| serde_json::Value::Object(context.supabase.clone()))
        .collect();
    assert_eq!(
        contexts,
        vec![
            json!({ "query": ["select(*)", "eq(id, 42)"] }),
            json!({ "body": { "id": 42 } }),
            json!({ "query": ["select(*)"], "body": { "id": 42 } }),
            json!({ "query": ["eq(id, 42)"], "body": { "id": 1337 } }),
            json!({ "query": ["eq(id, 42)"] }),
        ]
    );
}

#[tokio::test]
async fn test_captured_error_carries_code_and_details() {
    let sink = RecordingSink::default();
    let integration = setup(&sink, IntegrationOptions::default().with_errors(true));
    let client = MockClient::new(|_| {
        Ok(QueryResponse::failed(
            409,
            ResponseError {
                message: "duplicate key value violates unique constraint".to_string(),
                code: Some("23505".to_string()),
                details: Some("Key (id)=(42) already exists.".to_string()),
                hint: None,
            },
        ))
    })
    .instrumented(&integration);

    client.from("mock-table").insert(json!({ "id": 42 })).await.unwrap();

    let recorded = sink.recorded();
    assert_eq!(
        recorded.exceptions[0].0,
        DatabaseError {
            message: "duplicate key value violates unique constraint".to_string(),
            code: Some("23505".to_string()),
            details: Some("Key (id)=(42) already exists.".to_string()),
            hint: None,
        }
    );
}

#[tokio::test]
async fn test_successful_responses_are_not_captured() {
    let sink = RecordingSink::default();
    let integration = setup(&sink, IntegrationOptions::default().with_errors(true));
    let client = MockClient::responding(200, json!({ "id": 42 })).instrumented(&integration);

    client.from("mock-table").select("*").await.unwrap();

    assert!(sink.recorded().exceptions.is_empty());
}

#[tokio::test]
async fn test_error_context_uses_sanitized_body() {
    let sink = RecordingSink::default();
    let options = IntegrationOptions::default()
        .with_errors(true)
        .with_sanitize_body(|_table, key, value| {
            if key == "password" {
                json!("<redacted>")
            } else {
                value.clone()
            }
        });
    let integration = setup(&sink, options);
    let client = MockClient::responding(400, json!("Bad request")).instrumented(&integration);

    client
        .from("mock-table")
        .insert(json!({ "user": "x", "password": "y" }))
        .await
        .unwrap();

    let recorded = sink.recorded();
    assert_eq!(
        serde_json::Value::Object(recorded.exceptions[0].1.supabase.clone()),
        json!({ "body": { "user": "x", "password": "<redacted>" } })
    );
}

#[tokio::test]
async fn test_errors_only_for_observed_operations() {
    let sink = RecordingSink::default();
    let options = IntegrationOptions::default()
        .with_errors(true)
        .with_operations([Operation::Insert]);
    let integration = setup(&sink, options);
    let client = MockClient::responding(500, json!("Invalid request")).instrumented(&integration);

    client.from("mock-table").select("*").await.unwrap();
    client.from("mock-table").insert(json!({ "id": 1 })).await.unwrap();

    let recorded = sink.recorded();
    assert_eq!(recorded.exceptions.len(), 1);
    assert_eq!(recorded.spans.len(), 1);
    assert_eq!(recorded.spans[0].op, "db.insert");
}
