//! HTTP client for the RAG backend.
//!
//! # Endpoints
//!
//! | Method | Path | Used by |
//! |--------|------|---------|
//! | `GET`  | `/health` | [`RagBackend::check_health`] |
//! | `GET`  | `/api/status` | [`ApiClient::get_status`] |
//! | `GET`  | `/api/documents` | [`RagBackend::list_documents`] |
//! | `POST` | `/api/upload` | [`RagBackend::upload_document`] (multipart, field `file`) |
//! | `POST` | `/api/chat` | [`RagBackend::send_chat_message`] (JSON) |
//!
//! # Error Contract
//!
//! Non-2xx responses become [`ClientError::Server`]. The message comes from
//! the body's `detail` field (FastAPI style), then `message`, then a generic
//! `"<operation> failed: <status>"`. Requests that never get a response
//! become [`ClientError::Connection`]. Nothing is retried.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use crate::config::Config;
use crate::error::{ClientError, ClientResult};
use crate::models::{
    ChatResponse, DocumentDescriptor, DocumentListResponse, SourceCitation, UploadResponse,
};
use crate::upload::UploadCandidate;

/// An answer with the chunks the backend cited for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub answer: String,
    pub sources: Vec<SourceCitation>,
}

/// Operations the session needs from a backend.
///
/// [`ApiClient`] is the HTTP implementation; anything else that can answer
/// these calls (an in-process fake, a recording proxy) can drive a
/// [`Session`](crate::session::Session) too.
#[async_trait]
pub trait RagBackend: Send + Sync {
    /// Returns the backend's health payload as-is.
    async fn check_health(&self) -> ClientResult<Value>;

    /// Documents indexed in earlier sessions.
    async fn list_documents(&self) -> ClientResult<Vec<DocumentDescriptor>>;

    /// Send `body` as the contents of `candidate` and return the descriptor
    /// of the indexed document.
    async fn upload_document(
        &self,
        candidate: &UploadCandidate,
        body: Vec<u8>,
    ) -> ClientResult<DocumentDescriptor>;

    async fn send_chat_message(&self, question: &str) -> ClientResult<ChatReply>;
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    request_key: String,
}

impl ApiClient {
    /// Client for the base URL resolved from `config` (environment first).
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Self::with_base_url(config, &config.base_url())
    }

    /// Client for an explicit base URL; other settings come from `config`.
    pub fn with_base_url(config: &Config, base_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_key: config.chat.request_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /api/status`, returned untouched.
    pub async fn get_status(&self) -> ClientResult<Value> {
        let url = self.url("/api/status");
        log::debug!("Making GET request to {}", url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(ClientError::Connection)?;
        read_json(resp, "Status request").await
    }
}

#[async_trait]
impl RagBackend for ApiClient {
    async fn check_health(&self) -> ClientResult<Value> {
        let url = self.url("/health");
        log::debug!("Making GET request to {}", url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(ClientError::Connection)?;
        read_json(resp, "API health check").await
    }

    async fn list_documents(&self) -> ClientResult<Vec<DocumentDescriptor>> {
        let url = self.url("/api/documents");
        log::debug!("Making GET request to {}", url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(ClientError::Connection)?;
        let list: DocumentListResponse = read_json(resp, "Document listing").await?;
        Ok(list.documents)
    }

    async fn upload_document(
        &self,
        candidate: &UploadCandidate,
        body: Vec<u8>,
    ) -> ClientResult<DocumentDescriptor> {
        let url = self.url("/api/upload");
        log::debug!(
            "Making POST request to {} ({}, {} bytes)",
            url,
            candidate.name,
            body.len()
        );

        let mut part = multipart::Part::bytes(body).file_name(candidate.name.clone());
        if let Some(mime) = &candidate.mime {
            part = part.mime_str(mime).map_err(|e| {
                ClientError::validation(format!("Invalid MIME type {}: {}", mime, e))
            })?;
        }
        let form = multipart::Form::new().part("file", part);

        let resp = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(ClientError::Connection)?;
        let data: UploadResponse = read_json(resp, "Upload").await?;

        upload_descriptor(candidate, data)
    }

    async fn send_chat_message(&self, question: &str) -> ClientResult<ChatReply> {
        let url = self.url("/api/chat");
        log::debug!("Making POST request to {}", url);

        let mut body = serde_json::Map::new();
        body.insert(self.request_key.clone(), Value::String(question.to_string()));

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ClientError::Connection)?;
        let data: ChatResponse = read_json(resp, "Chat request").await?;

        chat_reply(data)
    }
}

/// Turn a response into `T`, or into the error its body describes.
async fn read_json<T: DeserializeOwned>(
    resp: reqwest::Response,
    operation: &str,
) -> ClientResult<T> {
    let status = resp.status();
    let text = resp.text().await.map_err(ClientError::Connection)?;

    if !status.is_success() {
        let fallback = format!("{} failed: {}", operation, status.as_u16());
        let message = error_message(&text).unwrap_or(fallback);
        log::warn!("{} returned {}: {}", operation, status, message);
        return Err(ClientError::Server {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&text).map_err(|e| {
        ClientError::InvalidResponse(format!("{} returned an unreadable body: {}", operation, e))
    })
}

/// Pull a human-readable message out of an error body.
///
/// `detail` may be a string or (for request validation failures) a
/// structured value, which is rendered as compact JSON.
pub fn error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    let pick = |key: &str| -> Option<String> {
        match json.get(key)? {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    };
    pick("detail").or_else(|| pick("message"))
}

fn upload_descriptor(
    candidate: &UploadCandidate,
    data: UploadResponse,
) -> ClientResult<DocumentDescriptor> {
    if data.status.as_deref() != Some("success") {
        return Err(ClientError::InvalidResponse(
            data.message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "Upload processing failed".to_string()),
        ));
    }

    let document_id = data.document_id.ok_or_else(|| {
        ClientError::InvalidResponse("Upload response is missing document_id".to_string())
    })?;

    Ok(DocumentDescriptor {
        filename: candidate.name.clone(),
        document_id,
        chunks_count: data.chunks_count,
        upload_time: Some(Utc::now().to_rfc3339()),
        file_size: Some(candidate.size),
        status: Some("success".to_string()),
    })
}

fn chat_reply(data: ChatResponse) -> ClientResult<ChatReply> {
    match data.answer {
        Some(answer) if !answer.trim().is_empty() => Ok(ChatReply {
            answer,
            sources: data.source_documents.unwrap_or_default(),
        }),
        _ => Err(ClientError::InvalidResponse(
            "Invalid response format from API".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn candidate() -> UploadCandidate {
        UploadCandidate {
            path: PathBuf::from("/tmp/policy.pdf"),
            name: "policy.pdf".to_string(),
            mime: Some("application/pdf".to_string()),
            size: 2048,
        }
    }

    #[test]
    fn error_message_prefers_detail() {
        let body = r#"{"detail": "Only PDF files", "message": "ignored"}"#;
        assert_eq!(error_message(body).as_deref(), Some("Only PDF files"));
    }

    #[test]
    fn error_message_uses_message_when_no_detail() {
        let body = r#"{"message": "Vector store offline"}"#;
        assert_eq!(error_message(body).as_deref(), Some("Vector store offline"));
    }

    #[test]
    fn error_message_renders_structured_detail() {
        let body = r#"{"detail": [{"loc": ["body", "question"], "msg": "field required"}]}"#;
        let msg = error_message(body).unwrap();
        assert!(msg.contains("field required"));
    }

    #[test]
    fn error_message_none_for_non_json_or_empty() {
        assert_eq!(error_message("<html>502</html>"), None);
        assert_eq!(error_message(r#"{"detail": ""}"#), None);
        assert_eq!(error_message("{}"), None);
    }

    #[test]
    fn upload_descriptor_from_success() {
        let data = UploadResponse {
            status: Some("success".to_string()),
            document_id: Some("doc-9".to_string()),
            chunks_count: Some(12),
            message: None,
        };
        let doc = upload_descriptor(&candidate(), data).unwrap();
        assert_eq!(doc.filename, "policy.pdf");
        assert_eq!(doc.document_id, "doc-9");
        assert_eq!(doc.chunks_count, Some(12));
        assert_eq!(doc.file_size, Some(2048));
        assert!(doc.upload_time.is_some());
    }

    #[test]
    fn upload_descriptor_rejects_non_success_status() {
        let data = UploadResponse {
            status: Some("error".to_string()),
            document_id: None,
            chunks_count: None,
            message: Some("Could not extract text".to_string()),
        };
        let err = upload_descriptor(&candidate(), data).unwrap_err();
        assert_eq!(err.to_string(), "Could not extract text");

        let data = UploadResponse {
            status: None,
            document_id: Some("x".to_string()),
            chunks_count: None,
            message: None,
        };
        let err = upload_descriptor(&candidate(), data).unwrap_err();
        assert_eq!(err.to_string(), "Upload processing failed");
    }

    #[test]
    fn chat_reply_requires_answer() {
        let err = chat_reply(ChatResponse {
            answer: None,
            source_documents: None,
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid response format from API");

        let reply = chat_reply(ChatResponse {
            answer: Some("Yes, theft is covered.".to_string()),
            source_documents: None,
        })
        .unwrap();
        assert!(reply.sources.is_empty());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::with_base_url(&Config::minimal(), "http://127.0.0.1:9/").unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:9");
        assert_eq!(client.url("/health"), "http://127.0.0.1:9/health");
    }
}
