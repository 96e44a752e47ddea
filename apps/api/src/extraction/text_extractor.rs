//! Turns a `Document` into a single text payload.
//!
//! One component, three strategies: PDF page text, Word document text, and a
//! raw base64 passthrough for models that read the encoded file directly. The
//! strategy comes from the document's format tag and the configured
//! `ExtractionMode`.

use base64::{engine::general_purpose, Engine as _};
use tracing::{debug, error};

use crate::extraction::docx::docx_to_text;
use crate::extraction::document::{Document, DocumentFormat, ExtractedText};
use crate::extraction::errors::ExtractionError;

/// Whether documents are converted to text or forwarded as encoded bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtractionMode {
    #[default]
    Text,
    Raw,
}

impl std::str::FromStr for ExtractionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(ExtractionMode::Text),
            "raw" | "base64" => Ok(ExtractionMode::Raw),
            other => Err(format!("unknown extraction mode '{other}' (expected text|raw)")),
        }
    }
}

/// A single way of producing text from document bytes.
pub trait ExtractStrategy: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// Page-by-page PDF text, pages joined by a line break.
pub struct PdfText;

impl ExtractStrategy for PdfText {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        // pdf-extract can panic on malformed content streams
        let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
            .map_err(|_| ExtractionError::Pdf("PDF decoder aborted on malformed input".to_string()))?
            .map_err(|e| ExtractionError::Pdf(e.to_string()))?;

        debug!("Decoded {} PDF pages", pages.len());

        let text = join_pages(&pages);
        if text.is_empty() {
            return Err(ExtractionError::Empty(DocumentFormat::Pdf.as_str()));
        }
        Ok(text)
    }
}

/// Concatenates page texts, one line break after each page, then trims.
fn join_pages(pages: &[String]) -> String {
    let mut text = String::new();
    for page in pages {
        text.push_str(page);
        text.push('\n');
    }
    text.trim().to_string()
}

/// Office Open XML word-processing documents.
pub struct WordText;

impl ExtractStrategy for WordText {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        docx_to_text(bytes).map_err(ExtractionError::Word)
    }
}

/// Standard padded base64 of the whole payload. Total.
pub struct RawBase64;

impl ExtractStrategy for RawBase64 {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        Ok(general_purpose::STANDARD.encode(bytes))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TextExtractor {
    mode: ExtractionMode,
}

impl TextExtractor {
    pub fn new(mode: ExtractionMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ExtractionMode {
        self.mode
    }

    fn strategy(&self, format: DocumentFormat) -> Result<&'static dyn ExtractStrategy, ExtractionError> {
        match (format, self.mode) {
            (DocumentFormat::Unknown, _) => Err(ExtractionError::UnsupportedFormat(format.as_str())),
            (_, ExtractionMode::Raw) => Ok(&RawBase64),
            (DocumentFormat::Pdf, ExtractionMode::Text) => Ok(&PdfText),
            (DocumentFormat::Word, ExtractionMode::Text) => Ok(&WordText),
        }
    }

    pub fn extract(&self, document: &Document) -> Result<ExtractedText, ExtractionError> {
        let format = document.format();
        let text = self
            .strategy(format)
            .and_then(|strategy| strategy.extract(document.bytes()))
            .map_err(|e| {
                error!("Text extraction failed for {} document: {e}", format.as_str());
                e
            })?;
        ExtractedText::new(text, format)
    }
}

/// Builds a PDF with one page per entry, each drawn as a single Courier text run.
/// An empty entry yields a page with no text.
#[cfg(test)]
pub(crate) fn build_pdf(pages: &[&str]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let operations = if text.is_empty() {
            Vec::new()
        } else {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Td", vec![50.into(), 750.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}
