//! User-facing notices.
//!
//! Flows report outcomes ("connected", "restored 3 documents", "upload
//! failed") as [`Notice`]s through a [`NoticeSink`]. The CLI prints them to
//! stderr; library users can collect them with [`MemoryNotices`]. Each notice
//! carries the time it should stay visible, which interactive front-ends use
//! to auto-dismiss it and which the JSON sink passes through.

use serde::Serialize;
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use crate::progress::ReportMode;

/// Display time for ordinary notices.
pub const DEFAULT_DURATION: Duration = Duration::from_millis(5000);
/// Restored-documents and sources-found notices.
pub const INFO_DURATION: Duration = Duration::from_millis(4000);
pub const CHAT_ERROR_DURATION: Duration = Duration::from_millis(6000);
pub const UPLOAD_ERROR_DURATION: Duration = Duration::from_millis(8000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

impl NoticeLevel {
    fn tag(&self) -> &'static str {
        match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "ok",
            NoticeLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub duration: Duration,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            duration: DEFAULT_DURATION,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    pub fn lasting(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// Destination for notices.
pub trait NoticeSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// `[ok] Successfully connected ...` lines on stderr.
pub struct StderrNotices;

impl NoticeSink for StderrNotices {
    fn notify(&self, notice: Notice) {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "[{}] {}", notice.level.tag(), notice.message);
        let _ = err.flush();
    }
}

/// One JSON object per notice on stderr.
pub struct JsonNotices;

impl NoticeSink for JsonNotices {
    fn notify(&self, notice: Notice) {
        let obj = serde_json::json!({
            "event": "notice",
            "level": notice.level,
            "message": notice.message,
            "duration_ms": notice.duration.as_millis() as u64,
        });
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut err = std::io::stderr().lock();
            let _ = writeln!(err, "{}", line);
            let _ = err.flush();
        }
    }
}

pub struct NoNotices;

impl NoticeSink for NoNotices {
    fn notify(&self, _notice: Notice) {}
}

/// Collects notices in memory, in emission order.
#[derive(Default)]
pub struct MemoryNotices {
    notices: Mutex<Vec<Notice>>,
}

impl MemoryNotices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything received so far.
    pub fn snapshot(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    /// Remove and return everything received so far.
    pub fn drain(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|mut n| std::mem::take(&mut *n))
            .unwrap_or_default()
    }
}

impl NoticeSink for MemoryNotices {
    fn notify(&self, notice: Notice) {
        if let Ok(mut n) = self.notices.lock() {
            n.push(notice);
        }
    }
}

impl ReportMode {
    pub fn notices(&self) -> Box<dyn NoticeSink> {
        match self {
            ReportMode::Off => Box::new(NoNotices),
            ReportMode::Human => Box::new(StderrNotices),
            ReportMode::Json => Box::new(JsonNotices),
        }
    }
}

/// "1 relevant source" / "3 relevant sources".
pub fn plural(count: usize, singular: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}s", count, singular)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_keeps_order_and_drains() {
        let sink = MemoryNotices::new();
        sink.notify(Notice::success("connected"));
        sink.notify(Notice::error("boom").lasting(UPLOAD_ERROR_DURATION));

        let seen = sink.snapshot();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].level, NoticeLevel::Success);
        assert_eq!(seen[0].duration, DEFAULT_DURATION);
        assert_eq!(seen[1].duration, Duration::from_secs(8));

        assert_eq!(sink.drain().len(), 2);
        assert!(sink.snapshot().is_empty());
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "document"), "1 document");
        assert_eq!(plural(0, "document"), "0 documents");
        assert_eq!(plural(4, "relevant source"), "4 relevant sources");
    }
}
