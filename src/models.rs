//! Data types exchanged with the RAG backend and held in the session.
//!
//! Wire types mirror the backend's snake_case JSON. Fields the backend may
//! omit are `Option` or `#[serde(default)]` so that older backends still
//! deserialize.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// A document the backend has indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    #[serde(default, deserialize_with = "null_as_default")]
    pub filename: String,
    #[serde(deserialize_with = "string_or_number")]
    pub document_id: String,
    #[serde(default)]
    pub chunks_count: Option<u64>,
    #[serde(default)]
    pub upload_time: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Extra per-chunk fields some backends attach to a citation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CitationMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<i64>,
}

/// A retrieved chunk the backend cited as evidence for an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireCitation")]
pub struct SourceCitation {
    pub content: String,
    pub source_filename: Option<String>,
    pub chunk_id: String,
    pub metadata: CitationMetadata,
    /// Score supplied by the backend, or a rank estimate when
    /// `score_estimated` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    #[serde(skip_serializing_if = "is_false")]
    pub score_estimated: bool,
}

/// Citation as backends send it: any field may be missing or `null`, and
/// the excerpt arrives as `content`, `text`, or both.
#[derive(Deserialize)]
struct WireCitation {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    source_filename: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    chunk_id: String,
    #[serde(default)]
    metadata: Option<CitationMetadata>,
    #[serde(default)]
    relevance_score: Option<f64>,
}

impl From<WireCitation> for SourceCitation {
    fn from(wire: WireCitation) -> Self {
        Self {
            content: wire.content.or(wire.text).unwrap_or_default(),
            source_filename: wire.source_filename,
            chunk_id: wire.chunk_id,
            metadata: wire.metadata.unwrap_or_default(),
            relevance_score: wire.relevance_score,
            score_estimated: false,
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl SourceCitation {
    /// Filename used for grouping and display.
    pub fn display_filename(&self) -> &str {
        self.source_filename
            .as_deref()
            .or(self.metadata.filename.as_deref())
            .filter(|name| !name.is_empty())
            .unwrap_or("Unknown Document")
    }
}

/// One question/answer pair in the transcript.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatExchange {
    pub id: u64,
    pub query: String,
    pub response: String,
    pub sources: Vec<SourceCitation>,
    pub timestamp: DateTime<Utc>,
}

/// Body of `GET /api/documents`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentListResponse {
    #[serde(default)]
    pub documents: Vec<DocumentDescriptor>,
}

/// Body of `POST /api/upload`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub document_id: Option<String>,
    #[serde(default)]
    pub chunks_count: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub source_documents: Option<Vec<SourceCitation>>,
}

/// The three screens of the client, gated on session data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Upload,
    Chat,
    Sources,
}

impl View {
    pub const ALL: [View; 3] = [View::Upload, View::Chat, View::Sources];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Upload => "upload",
            View::Chat => "chat",
            View::Sources => "sources",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "upload" => Ok(View::Upload),
            "chat" => Ok(View::Chat),
            "sources" => Ok(View::Sources),
            other => Err(format!(
                "unknown view '{}': expected upload, chat or sources",
                other
            )),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Backends disagree on whether ids are strings or integers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let id = string_or_number(deserializer)?;
    Ok(if id.is_empty() { None } else { Some(id) })
}
