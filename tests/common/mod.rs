//! In-process stand-in for the RAG backend.
//!
//! Serves the five endpoints the client uses on an ephemeral port and
//! records what it was sent, so tests can check both sides of each call.

#![allow(dead_code)]

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// Canned responses: `(status, body)` per endpoint.
#[derive(Clone)]
pub struct MockConfig {
    pub health: (u16, Value),
    pub documents: (u16, Value),
    pub upload: (u16, Value),
    pub chat: (u16, Value),
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            health: (200, json!({ "status": "healthy", "documents_indexed": 1 })),
            documents: (
                200,
                json!({
                    "documents": [{
                        "filename": "homeowners.pdf",
                        "document_id": "doc-home-1",
                        "chunks_count": 48,
                        "upload_time": "2024-05-01T10:00:00Z",
                        "file_size": 183_004,
                        "status": "processed"
                    }]
                }),
            ),
            upload: (
                200,
                json!({
                    "status": "success",
                    "document_id": "doc-new-7",
                    "chunks_count": 12,
                    "message": "Document processed"
                }),
            ),
            chat: (200, default_chat_reply()),
        }
    }
}

pub fn default_chat_reply() -> Value {
    json!({
        "answer": "Yes. Sudden and accidental water discharge is covered under Coverage A.",
        "source_documents": [
            {
                "content": "We cover sudden and accidental discharge of water from a plumbing system.",
                "source_filename": "homeowners.pdf",
                "chunk_id": "chunk-0012",
                "metadata": { "chunk_index": 12 },
                "relevance_score": 0.91
            },
            {
                "content": "We cover sudden and accidental discharge of water from a plumbing system.",
                "source_filename": "homeowners.pdf",
                "chunk_id": "chunk-0012",
                "metadata": { "chunk_index": 12 },
                "relevance_score": 0.74
            },
            {
                "content": "Flood damage is excluded unless a flood endorsement is purchased.",
                "source_filename": "homeowners.pdf",
                "chunk_id": "chunk-0003",
                "metadata": { "chunk_index": 3 },
                "relevance_score": 0.66
            },
            {
                "content": "Water backup endorsement limit: $10,000.",
                "source_filename": "endorsements.pdf",
                "chunk_id": "chunk-0001",
                "metadata": { "chunk_index": 1 },
                "relevance_score": 0.83
            }
        ]
    })
}

/// One multipart field as received by the mock.
#[derive(Debug, Clone)]
pub struct ReceivedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub health_calls: usize,
    pub document_calls: usize,
    pub uploads: Vec<Vec<ReceivedPart>>,
    pub chat_bodies: Vec<Value>,
}

struct Shared {
    config: MockConfig,
    recorded: Mutex<Recorded>,
}

pub struct MockBackend {
    pub base_url: String,
    shared: Arc<Shared>,
}

impl MockBackend {
    pub fn recorded<T>(&self, f: impl FnOnce(&Recorded) -> T) -> T {
        f(&self.shared.recorded.lock().unwrap())
    }
}

fn reply((status, body): &(u16, Value)) -> Response {
    let status = StatusCode::from_u16(*status).unwrap();
    if body.is_null() {
        (status, "upstream exploded").into_response()
    } else {
        (status, Json(body.clone())).into_response()
    }
}

async fn handle_health(State(shared): State<Arc<Shared>>) -> Response {
    shared.recorded.lock().unwrap().health_calls += 1;
    reply(&shared.config.health)
}

async fn handle_status(State(_shared): State<Arc<Shared>>) -> Response {
    (
        StatusCode::OK,
        Json(json!({ "backend": "mock", "vector_store": "ready" })),
    )
        .into_response()
}

async fn handle_documents(State(shared): State<Arc<Shared>>) -> Response {
    shared.recorded.lock().unwrap().document_calls += 1;
    reply(&shared.config.documents)
}

async fn handle_upload(State(shared): State<Arc<Shared>>, mut multipart: Multipart) -> Response {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.unwrap().to_vec();
        parts.push(ReceivedPart {
            name,
            file_name,
            content_type,
            bytes,
        });
    }
    shared.recorded.lock().unwrap().uploads.push(parts);
    reply(&shared.config.upload)
}

async fn handle_chat(State(shared): State<Arc<Shared>>, Json(body): Json<Value>) -> Response {
    shared.recorded.lock().unwrap().chat_bodies.push(body);
    reply(&shared.config.chat)
}

/// Start a mock backend on `127.0.0.1:<ephemeral>`.
pub async fn start(config: MockConfig) -> MockBackend {
    let shared = Arc::new(Shared {
        config,
        recorded: Mutex::new(Recorded::default()),
    });

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/api/status", get(handle_status))
        .route("/api/documents", get(handle_documents))
        .route("/api/upload", post(handle_upload))
        .route("/api/chat", post(handle_chat))
        .with_state(shared.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend {
        base_url: format!("http://{}", addr),
        shared,
    }
}

/// A URL nothing is listening on.
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
