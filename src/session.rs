//! In-memory client session.
//!
//! Holds what the user has done so far: indexed documents, the chat
//! transcript, the citations of the latest answer, and which view is active.
//! Nothing here is persisted; a new session restores its document list from
//! the backend in [`Session::bootstrap`].
//!
//! # View gating
//!
//! | View | Enabled when |
//! |------|--------------|
//! | `upload` | always |
//! | `chat` | at least one document is known |
//! | `sources` | the latest answer cited at least one chunk |

use chrono::Utc;
use std::path::Path;

use crate::api::RagBackend;
use crate::config::{Config, UploadConfig};
use crate::error::{ClientError, ClientResult};
use crate::models::{ChatExchange, DocumentDescriptor, SourceCitation, View};
use crate::notify::{
    plural, Notice, NoticeSink, CHAT_ERROR_DURATION, INFO_DURATION, UPLOAD_ERROR_DURATION,
};
use crate::progress::{UploadProgressEvent, UploadProgressReporter};
use crate::sources::apply_ordinal_scores;
use crate::upload::{validate_upload, UploadCandidate};

pub struct Session {
    documents: Vec<DocumentDescriptor>,
    transcript: Vec<ChatExchange>,
    current_sources: Vec<SourceCitation>,
    active_view: View,
    api_healthy: bool,
    upload_config: UploadConfig,
    ordinal_scores: bool,
    last_exchange_id: u64,
}

impl Session {
    pub fn new(config: &Config) -> Self {
        Self {
            documents: Vec::new(),
            transcript: Vec::new(),
            current_sources: Vec::new(),
            active_view: View::Upload,
            api_healthy: false,
            upload_config: config.upload.clone(),
            ordinal_scores: config.sources.ordinal_scores,
            last_exchange_id: 0,
        }
    }

    pub fn documents(&self) -> &[DocumentDescriptor] {
        &self.documents
    }

    pub fn transcript(&self) -> &[ChatExchange] {
        &self.transcript
    }

    /// Citations of the most recent answer.
    pub fn current_sources(&self) -> &[SourceCitation] {
        &self.current_sources
    }

    pub fn active_view(&self) -> View {
        self.active_view
    }

    pub fn is_api_healthy(&self) -> bool {
        self.api_healthy
    }

    /// Health check, then restore documents from earlier sessions.
    ///
    /// A failed health check leaves the session usable but marked unhealthy.
    /// A failed document listing is logged and otherwise ignored.
    pub async fn bootstrap(&mut self, backend: &dyn RagBackend, notices: &dyn NoticeSink) {
        if let Err(e) = backend.check_health().await {
            log::warn!("API health check failed: {}", e);
            self.api_healthy = false;
            notices.notify(Notice::error("Unable to connect to the backend API"));
            return;
        }

        self.api_healthy = true;
        notices.notify(Notice::success("Successfully connected to InsureRAG backend"));

        match backend.list_documents().await {
            Ok(docs) => {
                let restored = self.restore_documents(docs);
                if restored > 0 {
                    notices.notify(
                        Notice::info(format!(
                            "Restored {} from database",
                            plural(restored, "previously uploaded document")
                        ))
                        .lasting(INFO_DURATION),
                    );
                    self.active_view = View::Chat;
                }
            }
            Err(e) => {
                log::warn!("Failed to load previous documents: {}", e);
            }
        }
    }

    /// Add documents, skipping ids already present. Returns how many were new.
    pub fn restore_documents(&mut self, docs: Vec<DocumentDescriptor>) -> usize {
        let before = self.documents.len();
        for doc in docs {
            if !self.has_document(&doc.document_id) {
                self.documents.push(doc);
            }
        }
        self.documents.len() - before
    }

    fn has_document(&self, document_id: &str) -> bool {
        self.documents.iter().any(|d| d.document_id == document_id)
    }

    /// Register a freshly uploaded document and switch to the chat view.
    ///
    /// Returns `false` (and changes nothing) if the id is already known.
    pub fn add_document(&mut self, doc: DocumentDescriptor, notices: &dyn NoticeSink) -> bool {
        if self.has_document(&doc.document_id) {
            return false;
        }

        notices.notify(Notice::success(format!(
            "{} has been successfully analyzed and is ready for AI queries",
            doc.filename
        )));
        self.documents.push(doc);
        self.active_view = View::Chat;
        notices.notify(
            Notice::info("You can now ask questions about your uploaded document")
                .lasting(std::time::Duration::from_millis(3000)),
        );
        true
    }

    pub fn is_view_enabled(&self, view: View) -> bool {
        self.view_gate(view).is_ok()
    }

    /// `Ok` if `view` may be shown, otherwise the reason it may not.
    pub fn view_gate(&self, view: View) -> ClientResult<()> {
        match view {
            View::Upload => Ok(()),
            View::Chat if self.documents.is_empty() => Err(ClientError::ViewDisabled {
                view,
                reason: "upload a document first",
            }),
            View::Sources if self.current_sources.is_empty() => Err(ClientError::ViewDisabled {
                view,
                reason: "ask a question that returns sources first",
            }),
            _ => Ok(()),
        }
    }

    pub fn select_view(&mut self, view: View) -> ClientResult<()> {
        self.view_gate(view)?;
        self.active_view = view;
        Ok(())
    }

    /// Strictly increasing id based on the millisecond clock.
    fn next_exchange_id(&mut self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let id = now.max(self.last_exchange_id + 1);
        self.last_exchange_id = id;
        id
    }

    /// Append an answered question to the transcript and make its citations
    /// the current ones.
    pub fn record_exchange(
        &mut self,
        query: &str,
        answer: String,
        mut sources: Vec<SourceCitation>,
        notices: &dyn NoticeSink,
    ) -> &ChatExchange {
        if self.ordinal_scores {
            apply_ordinal_scores(&mut sources);
        }

        if !sources.is_empty() {
            notices.notify(
                Notice::info(format!(
                    "Found {} from your documents. Check the sources view for details.",
                    plural(sources.len(), "relevant source")
                ))
                .lasting(INFO_DURATION),
            );
        }

        self.push_exchange(query, answer, sources)
    }

    /// Append an apology for a question that could not be answered.
    /// Clears the current citations.
    pub fn record_failure(
        &mut self,
        query: &str,
        error: &ClientError,
        notices: &dyn NoticeSink,
    ) -> &ChatExchange {
        notices.notify(
            Notice::error(format!("Chat Error: {}", error)).lasting(CHAT_ERROR_DURATION),
        );
        let response = format!(
            "I apologize, but I encountered an error while processing your question: {}. \
             Please try again or rephrase your question.",
            error
        );
        self.push_exchange(query, response, Vec::new())
    }

    fn push_exchange(
        &mut self,
        query: &str,
        response: String,
        sources: Vec<SourceCitation>,
    ) -> &ChatExchange {
        let id = self.next_exchange_id();
        self.current_sources = sources.clone();
        self.transcript.push(ChatExchange {
            id,
            query: query.to_string(),
            response,
            sources,
            timestamp: Utc::now(),
        });
        &self.transcript[self.transcript.len() - 1]
    }

    /// Ask the backend a question about the uploaded documents.
    ///
    /// Backend failures are recorded in the transcript as an apology and
    /// also returned.
    pub async fn ask(
        &mut self,
        backend: &dyn RagBackend,
        question: &str,
        notices: &dyn NoticeSink,
    ) -> ClientResult<&ChatExchange> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ClientError::validation("Question must not be empty"));
        }
        self.view_gate(View::Chat)?;

        match backend.send_chat_message(question).await {
            Ok(reply) => Ok(self.record_exchange(question, reply.answer, reply.sources, notices)),
            Err(e) => {
                log::warn!("Chat request failed: {}", e);
                self.record_failure(question, &e, notices);
                Err(e)
            }
        }
    }

    /// Validate and upload the file at `path`, then add it to the session.
    pub async fn upload(
        &mut self,
        backend: &dyn RagBackend,
        path: &Path,
        progress: &dyn UploadProgressReporter,
        notices: &dyn NoticeSink,
    ) -> ClientResult<DocumentDescriptor> {
        let candidate = match UploadCandidate::from_path(path) {
            Ok(c) => c,
            Err(e) => {
                notices.notify(
                    Notice::error(format!("Upload failed: {}", e)).lasting(UPLOAD_ERROR_DURATION),
                );
                return Err(e);
            }
        };

        if let Err(e) = validate_upload(&candidate, &self.upload_config) {
            notices.notify(Notice::error(format!("File Validation Error: {}", e)));
            return Err(e);
        }
        progress.report(UploadProgressEvent::Validated {
            filename: candidate.name.clone(),
        });

        match send_upload(backend, &candidate, progress).await {
            Ok(doc) => {
                progress.report(UploadProgressEvent::Indexed {
                    filename: candidate.name.clone(),
                    chunks: doc.chunks_count.unwrap_or(0),
                });
                self.add_document(doc.clone(), notices);
                Ok(doc)
            }
            Err(e) => {
                log::warn!("Document upload failed: {}", e);
                notices.notify(
                    Notice::error(format!("Upload failed for \"{}\": {}", candidate.name, e))
                        .lasting(UPLOAD_ERROR_DURATION),
                );
                Err(e)
            }
        }
    }
}

async fn send_upload(
    backend: &dyn RagBackend,
    candidate: &UploadCandidate,
    progress: &dyn UploadProgressReporter,
) -> ClientResult<DocumentDescriptor> {
    let body = candidate.read()?;
    progress.report(UploadProgressEvent::Sending {
        filename: candidate.name.clone(),
        bytes: body.len() as u64,
    });
    backend.upload_document(candidate, body).await
}
