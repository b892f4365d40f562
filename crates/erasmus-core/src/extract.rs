use std::path::Path;

use thiserror::Error;

use crate::AdvisorError;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for PDF text extraction backends.
///
/// Implementors produce line-oriented text, per page: detected table rows
/// first, one row per line with cells whitespace-normalized and joined with
/// `" | "`, then the page's running text one physical line per extracted
/// line. Page order is preserved.
///
/// The advising pipeline only ever sees this normalized form: call
/// summarization, department discovery, destination segmentation and exam
/// catalog retrieval all consume the same routine, never raw PDF structures.
pub trait PdfBackend: Send + Sync {
    fn extract_text(&self, path: &Path) -> Result<String, BackendError>;
}

/// Extract a document's text and reject blank results.
pub fn extract_document_text(
    backend: &dyn PdfBackend,
    path: &Path,
) -> Result<String, AdvisorError> {
    let text = backend.extract_text(path)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AdvisorError::EmptyExtraction {
            path: path.to_path_buf(),
        });
    }
    tracing::debug!(path = %path.display(), chars = trimmed.len(), "extracted document text");
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct StaticBackend(&'static str);

    impl PdfBackend for StaticBackend {
        fn extract_text(&self, _path: &Path) -> Result<String, BackendError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn trims_extracted_text() {
        let backend = StaticBackend("  line one\nline two\n\n");
        let text = extract_document_text(&backend, &PathBuf::from("doc.pdf")).unwrap();
        assert_eq!(text, "line one\nline two");
    }

    #[test]
    fn blank_extraction_is_an_error() {
        let backend = StaticBackend("   \n\t\n");
        let err = extract_document_text(&backend, &PathBuf::from("doc.pdf")).unwrap_err();
        assert!(matches!(err, AdvisorError::EmptyExtraction { .. }));
    }
}
