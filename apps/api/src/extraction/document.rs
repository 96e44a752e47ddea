use bytes::Bytes;

use crate::extraction::errors::ExtractionError;

/// Declared format of an uploaded document, derived from its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Word,
    Unknown,
}

impl DocumentFormat {
    /// Maps a file extension (without the dot, any case) to a format tag.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => DocumentFormat::Pdf,
            "docx" | "doc" => DocumentFormat::Word,
            _ => DocumentFormat::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Word => "word",
            DocumentFormat::Unknown => "unknown",
        }
    }
}

/// Raw upload bytes plus the format the caller declared for them.
#[derive(Debug, Clone)]
pub struct Document {
    bytes: Bytes,
    format: DocumentFormat,
}

impl Document {
    pub fn new(bytes: impl Into<Bytes>, format: DocumentFormat) -> Self {
        Self {
            bytes: bytes.into(),
            format,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

/// Text pulled out of a document. Never empty or whitespace-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    text: String,
    format: DocumentFormat,
}

impl ExtractedText {
    pub fn new(text: String, format: DocumentFormat) -> Result<Self, ExtractionError> {
        if text.trim().is_empty() {
            return Err(ExtractionError::Empty(format.as_str()));
        }
        Ok(Self { text, format })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }
}
