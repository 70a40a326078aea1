//! Client-side upload validation.
//!
//! A file is checked against the configured type allow-list and size limits
//! before anything is sent to the backend. Checks run in a fixed order
//! (type, then size ceiling, then emptiness) so a user sees the same message
//! the backend-facing UI always showed for a given file.

use std::path::{Path, PathBuf};

use crate::config::UploadConfig;
use crate::error::{ClientError, ClientResult};

/// A local file selected for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadCandidate {
    pub path: PathBuf,
    /// File name sent to the backend (no directories).
    pub name: String,
    pub mime: Option<String>,
    pub size: u64,
}

impl UploadCandidate {
    /// Describe the file at `path` without reading its contents.
    pub fn from_path(path: &Path) -> ClientResult<Self> {
        let meta = std::fs::metadata(path).map_err(|source| ClientError::Io {
            path: path.display().to_string(),
            source,
        })?;
        if !meta.is_file() {
            return Err(ClientError::validation(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            path: path.to_path_buf(),
            mime: infer_mime(&name).map(str::to_string),
            name,
            size: meta.len(),
        })
    }

    /// Lowercase extension of [`name`](Self::name), if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }

    /// Read the file body for sending.
    pub fn read(&self) -> ClientResult<Vec<u8>> {
        std::fs::read(&self.path).map_err(|source| ClientError::Io {
            path: self.path.display().to_string(),
            source,
        })
    }
}

/// MIME type for the extensions the backend understands.
pub fn infer_mime(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_string_lossy().to_lowercase();
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "txt" => Some("text/plain"),
        "docx" => Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        "doc" => Some("application/msword"),
        "md" => Some("text/markdown"),
        _ => None,
    }
}

/// Reject files the backend cannot ingest.
pub fn validate_upload(candidate: &UploadCandidate, config: &UploadConfig) -> ClientResult<()> {
    let mime_ok = candidate
        .mime
        .as_deref()
        .is_some_and(|m| config.allowed_mime_types.iter().any(|a| a.eq_ignore_ascii_case(m)));
    let ext_ok = candidate
        .extension()
        .is_some_and(|e| config.allowed_extensions.iter().any(|a| a.eq_ignore_ascii_case(&e)));

    if !mime_ok && !ext_ok {
        return Err(ClientError::validation(format!(
            "Invalid file type. Please upload {} files only.",
            allowed_label(config)
        )));
    }

    if candidate.size > config.max_bytes {
        return Err(ClientError::validation(format!(
            "File size exceeds {} limit. Please choose a smaller file.",
            limit_label(config.max_bytes)
        )));
    }

    if candidate.size == 0 {
        return Err(ClientError::validation(
            "File is empty. Please choose a valid document.",
        ));
    }

    Ok(())
}

/// "PDF or TXT" for the default allow-list.
fn allowed_label(config: &UploadConfig) -> String {
    let names: Vec<String> = config
        .allowed_extensions
        .iter()
        .map(|e| e.to_uppercase())
        .collect();
    match names.len() {
        0 => "supported".to_string(),
        1 => names[0].clone(),
        n => format!("{} or {}", names[..n - 1].join(", "), names[n - 1]),
    }
}

fn limit_label(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, size: u64) -> UploadCandidate {
        UploadCandidate {
            path: PathBuf::from(name),
            name: name.to_string(),
            mime: infer_mime(name).map(str::to_string),
            size,
        }
    }

    #[test]
    fn accepts_pdf_and_txt_under_limit() {
        let config = UploadConfig::default();
        assert!(validate_upload(&candidate("policy.pdf", 1024), &config).is_ok());
        assert!(validate_upload(&candidate("notes.TXT", 10), &config).is_ok());
    }

    #[test]
    fn accepts_exactly_the_limit() {
        let config = UploadConfig::default();
        assert!(validate_upload(&candidate("big.pdf", 50 * 1024 * 1024), &config).is_ok());
    }

    #[test]
    fn rejects_docx() {
        let err = validate_upload(&candidate("claim.docx", 2048), &UploadConfig::default())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid file type. Please upload PDF or TXT files only."
        );
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn rejects_oversized_file() {
        let err = validate_upload(
            &candidate("huge.pdf", 50 * 1024 * 1024 + 1),
            &UploadConfig::default(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "File size exceeds 50MB limit. Please choose a smaller file."
        );
    }

    #[test]
    fn rejects_empty_file() {
        let err = validate_upload(&candidate("empty.txt", 0), &UploadConfig::default())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "File is empty. Please choose a valid document."
        );
    }

    #[test]
    fn type_check_runs_before_size_checks() {
        let err = validate_upload(&candidate("empty.docx", 0), &UploadConfig::default())
            .unwrap_err();
        assert!(err.to_string().starts_with("Invalid file type"));
    }

    #[test]
    fn mime_alone_is_enough() {
        let c = UploadCandidate {
            path: PathBuf::from("scan"),
            name: "scan".to_string(),
            mime: Some("application/pdf".to_string()),
            size: 5,
        };
        assert!(validate_upload(&c, &UploadConfig::default()).is_ok());
    }

    #[test]
    fn from_path_reads_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terms.txt");
        std::fs::write(&path, "deductible: 500").unwrap();

        let c = UploadCandidate::from_path(&path).unwrap();
        assert_eq!(c.name, "terms.txt");
        assert_eq!(c.mime.as_deref(), Some("text/plain"));
        assert_eq!(c.size, 15);
        assert_eq!(c.read().unwrap(), b"deductible: 500");
    }

    #[test]
    fn from_path_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = UploadCandidate::from_path(&dir.path().join("nope.pdf")).unwrap_err();
        assert_eq!(err.kind(), "io");
    }
}
