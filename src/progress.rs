//! Upload progress reporting.
//!
//! Reports the phases of `irag upload` (and `:upload` in the chat loop) so
//! users see what is happening while the backend parses and indexes a
//! document. Progress is emitted on **stderr** so stdout remains parseable
//! for scripts.

use std::io::Write;

/// A single progress event for an upload.
#[derive(Clone, Debug, PartialEq)]
pub enum UploadProgressEvent {
    /// File passed client-side validation.
    Validated { filename: String },
    /// Request body is on its way; the backend is parsing and embedding.
    Sending { filename: String, bytes: u64 },
    /// Backend finished indexing the document.
    Indexed { filename: String, chunks: u64 },
}

/// Reports upload progress. Implementations write to stderr (human or JSON).
pub trait UploadProgressReporter: Send + Sync {
    fn report(&self, event: UploadProgressEvent);
}

/// Human-friendly progress on stderr: "upload policy.pdf  sending  1,234 bytes".
pub struct StderrProgress;

impl UploadProgressReporter for StderrProgress {
    fn report(&self, event: UploadProgressEvent) {
        let line = match &event {
            UploadProgressEvent::Validated { filename } => {
                format!("upload {}  validated\n", filename)
            }
            UploadProgressEvent::Sending { filename, bytes } => {
                format!(
                    "upload {}  sending  {} bytes (indexing may take a while)\n",
                    filename,
                    format_number(*bytes)
                )
            }
            UploadProgressEvent::Indexed { filename, chunks } => {
                format!(
                    "upload {}  indexed  {} chunks\n",
                    filename,
                    format_number(*chunks)
                )
            }
        };
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(line.as_bytes());
        let _ = err.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl UploadProgressReporter for JsonProgress {
    fn report(&self, event: UploadProgressEvent) {
        let obj = match &event {
            UploadProgressEvent::Validated { filename } => serde_json::json!({
                "event": "progress",
                "file": filename,
                "phase": "validated"
            }),
            UploadProgressEvent::Sending { filename, bytes } => serde_json::json!({
                "event": "progress",
                "file": filename,
                "phase": "sending",
                "bytes": bytes
            }),
            UploadProgressEvent::Indexed { filename, chunks } => serde_json::json!({
                "event": "progress",
                "file": filename,
                "phase": "indexed",
                "chunks": chunks
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut err = std::io::stderr().lock();
            let _ = writeln!(err, "{}", line);
            let _ = err.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl UploadProgressReporter for NoProgress {
    fn report(&self, _event: UploadProgressEvent) {}
}

pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Output mode for stderr reporting: off, human, or JSON lines.
///
/// Shared by progress and notices.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReportMode {
    Off,
    Human,
    Json,
}

impl ReportMode {
    /// Default: human output when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ReportMode::Human
        } else {
            ReportMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn UploadProgressReporter> {
        match self {
            ReportMode::Off => Box::new(NoProgress),
            ReportMode::Human => Box::new(StderrProgress),
            ReportMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(52_428_800), "52,428,800");
    }
}
