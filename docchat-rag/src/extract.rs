//! Text extraction from uploaded files.
//!
//! The pipeline only consumes plain text; turning file bytes into text is
//! delegated to a [`TextExtractor`]. [`PdfExtractor`] (behind the `pdf`
//! feature) reads PDFs with `lopdf`.

use crate::error::Result;

/// Converts the bytes of an uploaded file into plain text.
///
/// Extraction is CPU-bound; async callers should run it on a blocking thread.
pub trait TextExtractor: Send + Sync {
    /// Extract the full text of the file.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Extraction`](crate::RagError::Extraction) if the
    /// file cannot be read or contains no text.
    fn extract(&self, bytes: &[u8]) -> Result<String>;
}

#[cfg(feature = "pdf")]
pub use pdf::PdfExtractor;

#[cfg(feature = "pdf")]
mod pdf {
    use tracing::{debug, warn};

    use super::TextExtractor;
    use crate::error::{RagError, Result};

    /// Extracts the text of every page of a PDF, in page order.
    ///
    /// Pages whose content cannot be decoded are skipped with a warning. A
    /// PDF that yields no text at all (e.g. a scan without OCR) is an error.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct PdfExtractor;

    impl TextExtractor for PdfExtractor {
        fn extract(&self, bytes: &[u8]) -> Result<String> {
            let document = lopdf::Document::load_mem(bytes)
                .map_err(|e| RagError::Extraction(format!("failed to load PDF: {e}")))?;
            if document.is_encrypted() {
                return Err(RagError::Extraction("encrypted PDFs are not supported".to_string()));
            }

            let pages: Vec<u32> = document.get_pages().keys().copied().collect();
            debug!(page_count = pages.len(), "extracting text from PDF");

            let mut text = String::new();
            for page in pages {
                match document.extract_text(&[page]) {
                    Ok(page_text) => {
                        text.push_str(&page_text);
                        if !page_text.ends_with('\n') {
                            text.push('\n');
                        }
                    }
                    Err(e) => warn!(page, error = %e, "failed to extract page text, skipping"),
                }
            }

            if text.trim().is_empty() {
                return Err(RagError::Extraction("no text content found in PDF".to_string()));
            }
            debug!(text_len = text.len(), "PDF text extraction complete");
            Ok(text)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn garbage_is_an_extraction_error() {
            let err = PdfExtractor.extract(b"definitely not a pdf").unwrap_err();
            assert!(matches!(err, RagError::Extraction(_)));
        }
    }
}
