//! # InsureRAG client
//!
//! A command-line client for an insurance-document RAG backend. Upload a
//! policy, ask questions about it, and inspect which excerpts the answer was
//! built from.
//!
//! All retrieval work (parsing, chunking, embedding, search, generation)
//! happens in the backend. This crate owns the client side: request and
//! error handling, local upload checks, the in-memory session, and
//! post-processing of cited sources.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────────┐
//! │   CLI    │──▶│ Session  │──▶│  ApiClient   │──▶ RAG backend (HTTP)
//! │  (irag)  │   │ + views  │   │ (RagBackend) │
//! └──────────┘   └────┬─────┘   └──────────────┘
//!                     │
//!          ┌──────────┼───────────┐
//!          ▼          ▼           ▼
//!      upload      sources     notify
//!    validation   dedup/group  notices
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! irag health
//! irag upload ./policy.pdf
//! irag ask "Is water damage covered?" --filter high
//! irag chat
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and base URL resolution |
//! | [`models`] | Wire and session data types |
//! | [`error`] | Client error categories |
//! | [`api`] | HTTP client and the [`api::RagBackend`] trait |
//! | [`upload`] | Client-side upload validation |
//! | [`sources`] | Citation dedup, filtering, grouping, sorting |
//! | [`session`] | Session state, bootstrap, view gating |
//! | [`notify`] | User-facing notices |
//! | [`progress`] | Upload progress reporting |
//! | [`render`] | Plain-text output |

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod progress;
pub mod render;
pub mod session;
pub mod sources;
pub mod upload;
