//! Plain-text rendering for the CLI.
//!
//! Every function returns a `String` so output can be tested and so the
//! caller decides between stdout and stderr.

use std::fmt::Write;

use crate::models::{ChatExchange, DocumentDescriptor, View};
use crate::session::Session;
use crate::sources::{relevance_label, SourceView};

/// Human-readable size, e.g. `1.5 KB`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

fn percent(score: f64) -> String {
    format!("{:.0}%", score * 100.0)
}

pub fn documents_table(docs: &[DocumentDescriptor]) -> String {
    if docs.is_empty() {
        return "No documents uploaded yet.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<32} {:<24} {:>7} {:>10}  STATUS",
        "FILENAME", "DOCUMENT ID", "CHUNKS", "SIZE"
    );
    for doc in docs {
        let _ = writeln!(
            out,
            "{:<32} {:<24} {:>7} {:>10}  {}",
            doc.filename,
            doc.document_id,
            doc.chunks_count
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
            doc.file_size
                .map(format_bytes)
                .unwrap_or_else(|| "-".to_string()),
            doc.status.as_deref().unwrap_or("-")
        );
    }
    out
}

pub fn document_line(doc: &DocumentDescriptor) -> String {
    format!(
        "{} (id {}, {} chunks, {})",
        doc.filename,
        doc.document_id,
        doc.chunks_count
            .map(|c| c.to_string())
            .unwrap_or_else(|| "?".to_string()),
        doc.file_size
            .map(format_bytes)
            .unwrap_or_else(|| "unknown size".to_string())
    )
}

pub fn exchange(ex: &ChatExchange) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Q: {}", ex.query);
    let _ = writeln!(out, "A: {}", ex.response);
    if !ex.sources.is_empty() {
        let n = ex.sources.len();
        let _ = writeln!(
            out,
            "   (referenced {} source{} from your documents)",
            n,
            if n == 1 { "" } else { "s" }
        );
    }
    out
}

pub fn transcript(exchanges: &[ChatExchange]) -> String {
    if exchanges.is_empty() {
        return "No questions asked yet.\n".to_string();
    }
    let mut out = String::new();
    for (i, ex) in exchanges.iter().enumerate() {
        let _ = writeln!(out, "#{} [{}]", i + 1, ex.timestamp.format("%H:%M:%S"));
        out.push_str(&exchange(ex));
    }
    out
}

/// Grouped citations with a summary header.
pub fn source_view(view: &SourceView) -> String {
    let mut out = String::new();

    let _ = write!(
        out,
        "{} source{} from {} document{}",
        view.shown(),
        if view.shown() == 1 { "" } else { "s" },
        view.document_count(),
        if view.document_count() == 1 { "" } else { "s" }
    );
    if let Some(avg) = view.average_score {
        let _ = write!(out, ", average relevance {}", percent(avg));
    }
    out.push('\n');
    if view.duplicates_removed > 0 {
        let _ = writeln!(
            out,
            "Note: {} duplicate source{} filtered for clarity.",
            view.duplicates_removed,
            if view.duplicates_removed == 1 { "" } else { "s" }
        );
    }
    if view.filtered_out > 0 {
        let _ = writeln!(out, "{} hidden by the relevance filter.", view.filtered_out);
    }

    for group in &view.groups {
        out.push('\n');
        let _ = write!(out, "== {} ({})", group.filename, group.sources.len());
        if let Some(avg) = group.average_score() {
            let _ = write!(out, "  avg {}", percent(avg));
        }
        out.push('\n');

        for source in &group.sources {
            let mut header = String::new();
            if let Some(idx) = source.metadata.chunk_index {
                let _ = write!(header, "section {} ", idx.saturating_add(1));
            }
            let _ = write!(header, "chunk {}", short_id(&source.chunk_id));
            if let Some(score) = source.relevance_score {
                let _ = write!(header, "  {} {}", relevance_label(score), percent(score));
                if source.score_estimated {
                    header.push_str(" (rank estimate)");
                }
            }
            let _ = writeln!(out, "  - {}", header);
            for line in source.content.lines().filter(|l| !l.trim().is_empty()) {
                let _ = writeln!(out, "    {}", line.trim());
            }
        }
    }
    out
}

/// Last eight characters, enough to tell chunks apart.
fn short_id(id: &str) -> &str {
    let count = id.chars().count();
    if count <= 8 {
        return id;
    }
    let start = id
        .char_indices()
        .nth(count - 8)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &id[start..]
}

/// One line per view with its gating state, active view marked.
pub fn views(session: &Session) -> String {
    let mut out = String::new();
    for view in View::ALL {
        let marker = if session.active_view() == view { "*" } else { " " };
        let state = match session.view_gate(view) {
            Ok(()) => "enabled".to_string(),
            Err(e) => format!("disabled ({})", e),
        };
        let _ = writeln!(out, "{} {:<8} {}", marker, view, state);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CitationMetadata, SourceCitation};
    use crate::sources::{RelevanceFilter, SortBy};

    #[test]
    fn bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(50 * 1024 * 1024), "50.0 MB");
    }

    #[test]
    fn short_id_keeps_tail() {
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_id("chunk-0000-1234abcd"), "1234abcd");
    }

    #[test]
    fn empty_documents_message() {
        assert_eq!(documents_table(&[]), "No documents uploaded yet.\n");
    }

    #[test]
    fn source_view_marks_estimates_and_duplicates() {
        let mut estimated = SourceCitation {
            content: "Water damage from burst pipes is covered.".to_string(),
            source_filename: Some("home.pdf".to_string()),
            chunk_id: "c1".to_string(),
            metadata: CitationMetadata {
                filename: None,
                chunk_index: Some(4),
            },
            relevance_score: Some(0.95),
            score_estimated: true,
        };
        let dup = estimated.clone();
        estimated.chunk_id = "c2".to_string();

        let view = SourceView::build(
            &[estimated, dup.clone(), dup],
            SortBy::Relevance,
            RelevanceFilter::All,
        );
        let text = source_view(&view);
        assert!(text.starts_with("2 sources from 1 document"));
        assert!(text.contains("1 duplicate source filtered"));
        assert!(text.contains("== home.pdf (2)"));
        assert!(text.contains("section 5 chunk c1"));
        assert!(text.contains("Highly Relevant 95% (rank estimate)"));
    }

    #[test]
    fn section_number_saturates_on_huge_chunk_index() {
        let source = SourceCitation {
            content: "Deductible: $1,000".to_string(),
            source_filename: Some("auto.pdf".to_string()),
            chunk_id: "c9".to_string(),
            metadata: CitationMetadata {
                filename: None,
                chunk_index: Some(i64::MAX),
            },
            relevance_score: None,
            score_estimated: false,
        };
        let view = SourceView::build(&[source], SortBy::Chunk, RelevanceFilter::All);
        let text = source_view(&view);
        assert!(text.contains(&format!("section {} chunk c9", i64::MAX)));
    }
}
