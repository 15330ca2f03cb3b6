//! Content extraction: turns a fetched document into ordered text segments.

mod pptx;
mod text;

pub use pptx::{read_slides, PptxError, Slide};
pub use text::chunk_paragraphs;

use crate::domain::{Document, DocumentFormat, DomainError, Result, Segment};

const DEFAULT_CHUNK_SIZE: usize = 1000;

#[derive(Debug, Clone)]
pub struct ContentExtractor {
    chunk_size: usize,
}

impl ContentExtractor {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Extracts segments in native slide/page order. Empty or
    /// whitespace-only segments are dropped and positions stay contiguous.
    pub fn extract(&self, document: &Document) -> Result<Vec<Segment>> {
        let format = document.format().ok_or_else(|| {
            DomainError::extraction(
                &document.id,
                format!(
                    "unsupported format (name: {}, mime: {})",
                    document.name,
                    document.mime_type.as_deref().unwrap_or("unknown")
                ),
            )
        })?;

        let drafts = match format {
            DocumentFormat::Pptx => read_slides(&document.content)
                .map_err(|e| DomainError::extraction(&document.id, e.to_string()))?
                .into_iter()
                .map(|slide| Draft {
                    text: slide.text(),
                    slide_index: Some(slide.number),
                    title: slide.title,
                })
                .collect::<Vec<_>>(),
            DocumentFormat::PlainText => {
                let content = String::from_utf8_lossy(&document.content);
                chunk_paragraphs(&content, self.chunk_size)
                    .into_iter()
                    .map(|text| Draft {
                        text,
                        slide_index: None,
                        title: None,
                    })
                    .collect()
            }
        };

        let segments = drafts
            .into_iter()
            .filter(|d| !d.text.trim().is_empty())
            .enumerate()
            .map(|(position, d)| {
                let mut segment = Segment::new(&document.id, position, d.text.trim())
                    .with_source_name(&document.name);
                segment.slide_index = d.slide_index;
                segment.title = d.title;
                segment
            })
            .collect();

        Ok(segments)
    }
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

struct Draft {
    text: String,
    slide_index: Option<usize>,
    title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorKind, PPTX_MIME};
    use crate::testing::{build_pptx, SlideFixture};

    fn pptx_document(id: &str, slides: &[SlideFixture]) -> Document {
        Document::new(id, format!("{id}.pptx"), build_pptx(slides)).with_mime_type(PPTX_MIME)
    }

    #[test]
    fn test_extract_pptx_drops_empty_slides() {
        let doc = pptx_document(
            "deck",
            &[
                SlideFixture::new(Some("Intro"), &["Who we are"]),
                SlideFixture::new(None, &["   "]),
                SlideFixture::new(None, &[]),
                SlideFixture::new(Some("Pricing"), &["Per seat"]),
            ],
        );

        let segments = ContentExtractor::default().extract(&doc).unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].position, 0);
        assert_eq!(segments[0].slide_index, Some(1));
        assert_eq!(segments[0].text, "Intro\nWho we are");
        assert_eq!(segments[1].position, 1);
        assert_eq!(segments[1].slide_index, Some(4));
        assert_eq!(segments[1].title.as_deref(), Some("Pricing"));
        assert!(segments.iter().all(|s| s.document_id == "deck"));
        assert!(segments.iter().all(|s| s.source_name == "deck.pptx"));
    }

    #[test]
    fn test_extract_plain_text() {
        let doc = Document::new("notes", "notes.txt", b"Alpha.\n\nBeta.".to_vec());

        let segments = ContentExtractor::new(8).extract(&doc).unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Alpha.");
        assert_eq!(segments[1].text, "Beta.");
        assert_eq!(segments[1].slide_index, None);
    }

    #[test]
    fn test_malformed_pptx_names_document() {
        let doc = Document::new("broken", "broken.pptx", b"garbage".to_vec());

        let err = ContentExtractor::default().extract(&doc).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Extraction);
        assert!(matches!(err, DomainError::Extraction { ref document_id, .. } if document_id == "broken"));
    }

    #[test]
    fn test_unsupported_format_is_extraction_error() {
        let doc = Document::new("img", "photo.png", vec![0x89, b'P', b'N', b'G']);

        let err = ContentExtractor::default().extract(&doc).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Extraction);
    }
}
