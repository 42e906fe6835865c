mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{upload_request, BrokenStore, TestApp};
use serde_json::json;
use std::sync::Arc;

async fn index_samples(app: &TestApp) {
    let (status, body) = app
        .post_json(
            "/index",
            json!([
                {"id": "d1", "content": "the quick brown fox"},
                {"id": "d2", "content": "lorem ipsum dolor sit amet"},
                {"id": "d3", "content": "rust borrow checker lifetimes"},
            ]),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "indexed", "count": 3}));
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_index_increases_total_by_batch_size() {
    let app = TestApp::new();

    let (_, before) = app.get("/document-stats").await;
    assert_eq!(before["total_documents"], 0);
    assert_eq!(before["collection_name"], "documents");
    assert!(before["last_updated"].is_string());

    index_samples(&app).await;

    let (status, after) = app.get("/document-stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["total_documents"], 3);
}

#[tokio::test]
async fn test_index_empty_batch() {
    let app = TestApp::new();
    let (status, body) = app.post_json("/index", json!([])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_index_rejects_blank_id() {
    let app = TestApp::new();
    let (status, body) = app
        .post_json("/index", json!([{"id": " ", "content": "x"}]))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("id"));
}

#[tokio::test]
async fn test_search_round_trip() {
    let app = TestApp::new();
    index_samples(&app).await;

    let (status, body) = app
        .post_json("/search", json!({"query": "quick brown fox jumps", "top_k": 2}))
        .await;

    assert_eq!(status, StatusCode::OK);
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["id"], "d1");
    assert_eq!(results[0]["content"], "the quick brown fox");
    assert_eq!(results[0]["summary"], "summary: the");
}

#[tokio::test]
async fn test_search_results_bounded_and_ordered() {
    let app = TestApp::new();
    index_samples(&app).await;

    // default top_k is 5 but only 3 documents exist
    let (status, body) = app.post_json("/search", json!({"query": "fox ipsum rust"})).await;

    assert_eq!(status, StatusCode::OK);
    let scores: Vec<f64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["score"].as_f64().unwrap())
        .collect();
    assert_eq!(scores.len(), 3);
    assert!(scores.windows(2).all(|w| w[0] <= w[1]));

    let (_, body) = app.post_json("/search", json!({"query": "fox", "top_k": 1})).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_search_on_empty_store_is_empty() {
    let app = TestApp::new();
    let (status, body) = app.post_json("/search", json!({"query": "anything"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_search_rejects_zero_top_k() {
    let app = TestApp::new();
    let (status, _) = app
        .post_json("/search", json!({"query": "fox", "top_k": 0}))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_malformed_search_bodies_get_json_detail() {
    let app = TestApp::new();

    let (status, body) = app
        .post_json("/search", json!({"query": "fox", "top_k": -1}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("top_k"));

    let (status, body) = app.post_json("/search", json!({"top_k": 3})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("query"));
}

#[tokio::test]
async fn test_invalid_json_syntax_is_bad_request_with_detail() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/index")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("[{\"id\": "))
        .unwrap();

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_summary_failure_keeps_result() {
    let app = TestApp::new();
    app.post_json(
        "/index",
        json!([
            {"id": "ok", "content": "fox tales"},
            {"id": "bad", "content": "fox FAIL"},
        ]),
    )
    .await;

    let (status, body) = app.post_json("/search", json!({"query": "fox", "top_k": 5})).await;

    assert_eq!(status, StatusCode::OK);
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 2);
    let bad = results.iter().find(|r| r["id"] == "bad").unwrap();
    assert!(bad["summary"]
        .as_str()
        .unwrap()
        .starts_with("Summary unavailable: "));
    let ok = results.iter().find(|r| r["id"] == "ok").unwrap();
    assert_eq!(ok["summary"], "summary: fox");
}

#[tokio::test]
async fn test_duplicate_id_overwrites() {
    let app = TestApp::new();
    app.post_json("/index", json!([{"id": "d1", "content": "first version"}]))
        .await;
    app.post_json("/index", json!([{"id": "d1", "content": "second version"}]))
        .await;

    let (_, stats) = app.get("/document-stats").await;
    assert_eq!(stats["total_documents"], 1);

    let (_, body) = app.post_json("/search", json!({"query": "version"})).await;
    assert_eq!(body[0]["content"], "second version");
}

#[tokio::test]
async fn test_short_suggestion_query_makes_no_calls() {
    let app = TestApp::new();
    index_samples(&app).await;
    let calls = app.embedding.calls();

    for path in ["/search-suggestions?q=", "/search-suggestions?q=q", "/search-suggestions"] {
        let (status, body) = app.get(path).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    assert_eq!(app.embedding.calls(), calls);
}

#[tokio::test]
async fn test_suggestions_from_neighbours() {
    let app = TestApp::new();
    app.post_json(
        "/index",
        json!([
            {"id": "long", "content": "one two three four five six seven eight nine ten eleven"},
            {"id": "short", "content": "brown fox"},
        ]),
    )
    .await;

    let (status, body) = app.get("/search-suggestions?q=fox").await;

    assert_eq!(status, StatusCode::OK);
    let suggestions = body.as_array().unwrap();
    assert_eq!(suggestions.len(), 2);
    assert_eq!(suggestions[0], json!({"query": "brown fox", "type": "content"}));
    assert_eq!(
        suggestions[1]["query"],
        "one two three four five six seven eight nine ten"
    );
}

#[tokio::test]
async fn test_store_failures_degrade_soft_paths() {
    let app = TestApp::with_store(Arc::new(BrokenStore));

    let (status, body) = app.get("/search-suggestions?q=fox").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = app.get("/document-stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_documents"], 0);
    assert!(body["error"].as_str().unwrap().contains("store offline"));

    let (status, _) = app.get("/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = app
        .post_json("/index", json!([{"id": "d1", "content": "x"}]))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().contains("store offline"));
}

#[tokio::test]
async fn test_upload_document() {
    let app = TestApp::new();

    let (status, body) = app
        .send(upload_request(
            "fox.txt",
            b"the quick brown fox",
            Some(r#"{"source": "tests"}"#),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "uploaded");
    assert_eq!(body["filename"], "fox.txt");
    assert_eq!(body["content_length"], 19);
    let id = body["document_id"].as_str().unwrap().to_string();
    assert!(uuid::Uuid::parse_str(&id).is_ok());

    let (_, results) = app.post_json("/search", json!({"query": "quick brown fox"})).await;
    assert_eq!(results[0]["id"], id.as_str());
}

#[tokio::test]
async fn test_upload_non_utf8_is_rejected_and_not_stored() {
    let app = TestApp::new();

    let (status, body) = app
        .send(upload_request("image.png", &[0x89, 0x50, 0xff, 0xfe, 0x00], None))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .starts_with("Upload failed:"));

    let (_, stats) = app.get("/document-stats").await;
    assert_eq!(stats["total_documents"], 0);
}

#[tokio::test]
async fn test_upload_without_file_is_bad_request() {
    let app = TestApp::new();
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"metadata\"\r\n\r\nx\r\n--{b}--\r\n",
        b = common::BOUNDARY
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/upload-document")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", common::BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_without_multipart_body_gets_json_detail() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/upload-document")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("hello"))
        .unwrap();

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_cors_allows_configured_origin_only() {
    let app = TestApp::new();

    let preflight = |origin: &str| {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/search")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type,x-custom")
            .body(Body::empty())
            .unwrap()
    };

    let response = tower::ServiceExt::oneshot(app.router.clone(), preflight("http://localhost:5173"))
        .await
        .unwrap();
    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST");

    let response = tower::ServiceExt::oneshot(app.router.clone(), preflight("http://evil.example"))
        .await
        .unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
