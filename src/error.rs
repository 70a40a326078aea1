//! Error type shared by the client, validator and session.
//!
//! Every failure a user can hit falls into one of a few categories, so the
//! CLI can phrase notices the same way regardless of which flow failed.

use crate::models::View;

/// Message used for every transport-level failure.
pub const CONNECTION_MESSAGE: &str =
    "Unable to connect to the server. Please check if the backend is running.";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Rejected locally before any request was sent.
    #[error("{0}")]
    Validation(String),

    /// The request never produced an HTTP response.
    #[error("Unable to connect to the server. Please check if the backend is running.")]
    Connection(#[source] reqwest::Error),

    /// Non-2xx response; `message` is taken from the body when possible.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// A 2xx response whose body did not have the expected shape.
    #[error("{0}")]
    InvalidResponse(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The requested view is gated on data that is not there yet.
    #[error("the {view} view is not available yet: {reason}")]
    ViewDisabled { view: View, reason: &'static str },
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        ClientError::Validation(message.into())
    }

    /// Short category label used in JSON notices and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Validation(_) => "validation",
            ClientError::Connection(_) => "connection",
            ClientError::Server { .. } => "server",
            ClientError::InvalidResponse(_) => "invalid_response",
            ClientError::Io { .. } => "io",
            ClientError::ViewDisabled { .. } => "view_disabled",
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_displays_backend_message() {
        let err = ClientError::Server {
            status: 422,
            message: "Unsupported document".to_string(),
        };
        assert_eq!(err.to_string(), "Unsupported document");
        assert_eq!(err.kind(), "server");
    }

    #[test]
    fn view_disabled_names_view() {
        let err = ClientError::ViewDisabled {
            view: View::Sources,
            reason: "ask a question first",
        };
        assert_eq!(
            err.to_string(),
            "the sources view is not available yet: ask a question first"
        );
    }
}
