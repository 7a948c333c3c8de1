//! Integration tests for the REST API source reader
//!
//! Serve JSON pages from a local mock server and verify paging, ordering,
//! and error classification.

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use brz_acquire::source::{ApiReader, ChunkRead, SourceReader};

async fn serve_page(server: &MockServer, offset: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/v1/orders"))
        .and(query_param("offset", offset))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_pages_until_short_page() {
    let server = MockServer::start().await;

    serve_page(
        &server,
        "0",
        serde_json::json!([
            {"id": "1", "name": "first"},
            {"id": "2", "name": "second"},
        ]),
    )
    .await;
    serve_page(&server, "2", serde_json::json!([{"id": "3", "name": "third"}])).await;

    let endpoint = format!("{}/v1/orders", server.uri());
    let mut reader = ApiReader::open(&endpoint, 2, None, None).unwrap();

    assert_eq!(reader.count().await.unwrap(), 0);

    let first = reader.next_chunk(1_000).await.unwrap();
    let chunk = match first {
        ChunkRead::Complete(chunk) => chunk,
        other => panic!("expected a full first page, got {:?}", other),
    };
    assert_eq!(chunk.offset, 0);
    assert_eq!(chunk.len(), 2);
    assert_eq!(chunk.records[0].column_names(), vec!["id", "name"]);
    assert_eq!(chunk.records[1].get("id"), Some(&serde_json::json!("2")));

    let second = reader.next_chunk(1_000).await.unwrap();
    let chunk = match second {
        ChunkRead::Partial(chunk) => chunk,
        other => panic!("expected a short terminal page, got {:?}", other),
    };
    assert_eq!(chunk.offset, 2);
    assert_eq!(chunk.len(), 1);

    // The short page was terminal; no further requests go out.
    assert!(matches!(reader.next_chunk(1_000).await.unwrap(), ChunkRead::Empty));
}

#[tokio::test]
async fn test_empty_first_page_is_terminal() {
    let server = MockServer::start().await;
    serve_page(&server, "0", serde_json::json!([])).await;

    let endpoint = format!("{}/v1/orders", server.uri());
    let mut reader = ApiReader::open(&endpoint, 100, None, None).unwrap();

    assert!(matches!(reader.next_chunk(1_000).await.unwrap(), ChunkRead::Empty));
}

#[tokio::test]
async fn test_error_status_is_a_read_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/orders"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let endpoint = format!("{}/v1/orders", server.uri());
    let mut reader = ApiReader::open(&endpoint, 100, None, None).unwrap();

    let err = reader.next_chunk(1_000).await.unwrap_err();
    assert!(err.to_string().contains("error status"));
}

#[tokio::test]
async fn test_non_array_payload_is_a_read_failure() {
    let server = MockServer::start().await;
    serve_page(&server, "0", serde_json::json!({"not": "an array"})).await;

    let endpoint = format!("{}/v1/orders", server.uri());
    let mut reader = ApiReader::open(&endpoint, 100, None, None).unwrap();

    let err = reader.next_chunk(1_000).await.unwrap_err();
    assert!(err.to_string().contains("JSON array"));
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/orders"))
        .and(wiremock::matchers::header("authorization", "Bearer sekrit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = format!("{}/v1/orders", server.uri());
    let mut reader = ApiReader::open(&endpoint, 100, Some("sekrit"), None).unwrap();

    assert!(matches!(reader.next_chunk(1_000).await.unwrap(), ChunkRead::Empty));
}
