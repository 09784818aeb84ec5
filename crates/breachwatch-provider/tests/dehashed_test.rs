//! Integration tests for DehashedProvider using wiremock

use serde_json::json;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use breachwatch_core::{ProviderCredentials, SearchRequest};
use breachwatch_provider::{BreachProvider, DehashedProvider};

fn create_provider(mock_server: &MockServer) -> DehashedProvider {
    DehashedProvider::new(reqwest::Client::new())
        .with_base_url(format!("{}/v2/search", mock_server.uri()))
}

fn create_request() -> SearchRequest {
    SearchRequest::for_email("user@example.com").with_credentials(
        "dehashed",
        ProviderCredentials::new().with_api_key("dh-key"),
    )
}

#[tokio::test]
async fn test_dehashed_search_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/search"))
        .and(header("DeHashed-Api-Key", "dh-key"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "query": "email:user@example.com",
            "page": 1,
            "size": 25,
            "regex": false,
            "wildcard": false,
            "de_dupe": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "balance": 10,
            "entries": [
                {"id": "1", "email": ["user@example.com"], "password": "hunter2", "database_name": "Combo"},
                {"id": "2", "username": "user123"}
            ],
            "total": 2
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = create_provider(&mock_server).search(&create_request()).await;

    assert!(result.ok, "unexpected failure: {:?}", result.error);
    let identifiers: Vec<&str> = result.findings.iter().map(|f| f.identifier.as_str()).collect();
    assert_eq!(identifiers, vec!["user@example.com", "user123"]);
    assert_eq!(result.raw.as_ref().map(|raw| raw["total"].clone()), Some(json!(2)));
}

#[tokio::test]
async fn test_dehashed_custom_query_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/search"))
        .and(body_json(json!({
            "query": "domain:example.com",
            "page": 2,
            "size": 10,
            "regex": false,
            "wildcard": true,
            "de_dupe": true
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"results": []}})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = create_request()
        .with_criterion("dehashed", "query", "domain:example.com")
        .with_criterion("dehashed", "page", 2)
        .with_criterion("dehashed", "size", 10)
        .with_criterion("dehashed", "wildcard", true)
        .with_criterion("dehashed", "de_dupe", true);

    let result = create_provider(&mock_server).search(&request).await;

    assert!(result.ok);
    assert!(result.findings.is_empty());
}

#[tokio::test]
async fn test_dehashed_error_message_from_payload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/search"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"error": "Invalid API credentials"}))
                .insert_header("Retry-After", "60"),
        )
        .mount(&mock_server)
        .await;

    let result = create_provider(&mock_server).search(&create_request()).await;

    assert!(!result.ok);
    assert_eq!(result.status_code, Some(401));
    assert_eq!(result.error.as_deref(), Some("Invalid API credentials"));
    assert_eq!(result.retry_after.as_deref(), Some("60"));
    assert_eq!(result.raw, Some(json!({"error": "Invalid API credentials"})));
}

#[tokio::test]
async fn test_dehashed_error_without_json_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/search"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&mock_server)
        .await;

    let result = create_provider(&mock_server).search(&create_request()).await;

    assert_eq!(result.status_code, Some(502));
    assert_eq!(result.error.as_deref(), Some("dehashed request failed (HTTP 502)"));
    assert_eq!(result.raw, Some(json!({"raw_text": "Bad Gateway"})));
}

#[tokio::test]
async fn test_dehashed_success_with_undecodable_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let result = create_provider(&mock_server).search(&create_request()).await;

    assert!(!result.ok);
    assert_eq!(result.status_code, Some(200));
    assert_eq!(
        result.error.as_deref(),
        Some("failed to decode dehashed response payload")
    );
}

#[tokio::test]
async fn test_dehashed_validation_makes_no_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let request = SearchRequest::for_email("user@example.com");
    let result = create_provider(&mock_server).search(&request).await;

    assert!(!result.ok);
    assert_eq!(
        result.error.as_deref(),
        Some("dehashed provider requires an api_key.")
    );
    assert_eq!(result.status_code, None);
}

#[tokio::test]
async fn test_dehashed_unreachable_host() {
    let provider = DehashedProvider::new(reqwest::Client::new())
        .with_base_url("http://127.0.0.1:1/v2/search");

    let result = provider.search(&create_request()).await;

    assert!(!result.ok);
    assert_eq!(result.status_code, None);
    assert!(result
        .error
        .as_deref()
        .unwrap_or_default()
        .starts_with("Unable to reach dehashed API: "));
}

/// Serve one response whose body never finishes arriving.
async fn start_stalled_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await;
        let _ = socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n[")
            .await;
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(socket);
    });

    format!("http://{addr}/v2/search")
}

#[tokio::test]
async fn test_dehashed_stalled_body_is_transport_failure() {
    let provider = DehashedProvider::new(reqwest::Client::new())
        .with_base_url(start_stalled_server().await);
    let request = create_request().with_timeout(Duration::from_millis(500));

    let result = provider.search(&request).await;

    assert!(!result.ok);
    assert_eq!(result.status_code, None);
    assert!(result
        .error
        .as_deref()
        .unwrap_or_default()
        .starts_with("Unable to reach dehashed API: "));
    assert!(result.raw.is_none());
}
