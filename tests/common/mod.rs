#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use semantic_search::api::{create_router, AppState};
use semantic_search::application::{IndexingService, SearchService, Summarizer};
use semantic_search::domain::{
    ports::{EmbeddingService, LlmService, VectorStore},
    Document, DomainError, Embedding, ScoredDocument,
};
use semantic_search::infrastructure::{AppConfig, InMemoryVectorStore};
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

pub const DIMENSION: usize = 64;

/// Bag-of-words embedding: each lowercase word bumps one hashed slot.
#[derive(Default)]
pub struct HashEmbedding {
    pub calls: AtomicUsize,
}

impl HashEmbedding {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingService for HashEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vector = vec![0.0_f32; DIMENSION];
        for word in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() as usize) % DIMENSION] += 1.0;
        }
        // keep empty text comparable
        vector[0] += 0.001;
        Ok(Embedding::new(vector))
    }

    fn model(&self) -> &str {
        "hash"
    }
}

/// Summarises as "summary: <first word>"; fails on content containing `FAIL`.
pub struct ScriptedLlm;

#[async_trait]
impl LlmService for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> Result<String, DomainError> {
        let content = prompt.rsplit("Content: ").next().unwrap_or_default();
        if content.contains("FAIL") {
            return Err(DomainError::upstream("model overloaded"));
        }
        Ok(format!(
            "summary: {}",
            content.split_whitespace().next().unwrap_or_default()
        ))
    }
}

pub struct BrokenStore;

#[async_trait]
impl VectorStore for BrokenStore {
    async fn upsert(&self, _: &Document, _: &Embedding) -> Result<(), DomainError> {
        Err(DomainError::store("store offline"))
    }

    async fn query(&self, _: &Embedding, _: usize) -> Result<Vec<ScoredDocument>, DomainError> {
        Err(DomainError::store("store offline"))
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Err(DomainError::store("store offline"))
    }

    fn collection(&self) -> &str {
        "documents"
    }
}

pub struct TestApp {
    pub router: Router,
    pub embedding: Arc<HashEmbedding>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryVectorStore::new("documents")))
    }

    pub fn with_store(store: Arc<dyn VectorStore>) -> Self {
        let config = AppConfig::default();
        let embedding = Arc::new(HashEmbedding::default());
        let summarizer = Arc::new(Summarizer::new(
            Arc::new(ScriptedLlm),
            config.prompts.summary.clone(),
        ));

        let indexing = Arc::new(IndexingService::new(embedding.clone(), store.clone()));
        let search = Arc::new(
            SearchService::new(embedding.clone(), store, summarizer, config.config.search.clone())
                .with_summary_concurrency(2),
        );

        Self {
            router: create_router(AppState::new(indexing, search, config)),
            embedding,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        send(&self.router, request).await
    }

    pub async fn post_json(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(json_request(Method::POST, path, body)).await
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.send(Request::get(path).body(Body::empty()).unwrap()).await
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub fn json_request(method: Method, path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub const BOUNDARY: &str = "----semantic-search-test-boundary";

/// Builds a multipart/form-data upload with a `file` part and an optional
/// `metadata` part.
pub fn upload_request(filename: &str, bytes: &[u8], metadata: Option<&str>) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: text/plain\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");

    if let Some(metadata) = metadata {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"metadata\"\r\n\r\n");
        body.extend_from_slice(metadata.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/upload-document")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}
