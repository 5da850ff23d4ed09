//! Format normalizer: flattens uploaded documents into comparable plain text.
//!
//! The document kind is derived once from the filename and selects exactly one
//! extractor. The same bytes and kind always produce the same text.

pub mod docx;
mod ooxml;
pub mod pdf;
pub mod presentation;
pub mod spreadsheet;
pub mod text;

use serde::{Deserialize, Serialize};

use crate::config::schema::{CellJoin, NormalizerConfig};
use crate::error::NormalizeError;

pub use spreadsheet::Sheet;

/// Recognized category of an uploaded document.
///
/// Persisted as its extension tag; unrecognized tags read back as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Spreadsheet,
    WordDocument,
    PlainText,
    Pdf,
    Presentation,
    Sql,
    Unknown,
}

impl Serialize for DocumentKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.extension())
    }
}

impl<'de> Deserialize<'de> for DocumentKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(DocumentKind::from_extension(&tag))
    }
}

impl DocumentKind {
    /// Every kind an upload may be accepted as.
    pub const SUPPORTED: [DocumentKind; 6] = [
        DocumentKind::Spreadsheet,
        DocumentKind::WordDocument,
        DocumentKind::PlainText,
        DocumentKind::Pdf,
        DocumentKind::Presentation,
        DocumentKind::Sql,
    ];

    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "xlsx" => DocumentKind::Spreadsheet,
            "docx" => DocumentKind::WordDocument,
            "txt" => DocumentKind::PlainText,
            "pdf" => DocumentKind::Pdf,
            "pptx" => DocumentKind::Presentation,
            "sql" => DocumentKind::Sql,
            _ => DocumentKind::Unknown,
        }
    }

    /// Extension tag, also the persisted form of the kind.
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentKind::Spreadsheet => "xlsx",
            DocumentKind::WordDocument => "docx",
            DocumentKind::PlainText => "txt",
            DocumentKind::Pdf => "pdf",
            DocumentKind::Presentation => "pptx",
            DocumentKind::Sql => "sql",
            DocumentKind::Unknown => "",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, DocumentKind::Unknown)
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Spreadsheet => write!(f, "spreadsheet"),
            DocumentKind::WordDocument => write!(f, "word_document"),
            DocumentKind::PlainText => write!(f, "plain_text"),
            DocumentKind::Pdf => write!(f, "pdf"),
            DocumentKind::Presentation => write!(f, "presentation"),
            DocumentKind::Sql => write!(f, "sql"),
            DocumentKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Classifies a filename by its suffix. Unknown suffixes yield `Unknown`.
pub fn classify(filename: &str) -> DocumentKind {
    match filename.rsplit_once('.') {
        Some((_, ext)) => DocumentKind::from_extension(ext),
        None => DocumentKind::Unknown,
    }
}

/// Text extracted from an upload together with its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDocument {
    pub kind: DocumentKind,
    pub text: String,
}

/// Kind-dispatched normalizer carrying the spreadsheet join policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    cell_join: CellJoin,
}

impl Normalizer {
    pub fn new(config: &NormalizerConfig) -> Self {
        Self {
            cell_join: config.cell_join,
        }
    }

    pub fn with_cell_join(cell_join: CellJoin) -> Self {
        Self { cell_join }
    }

    /// Produces the flattened text for `bytes` interpreted as `kind`.
    pub fn normalize(&self, bytes: &[u8], kind: DocumentKind) -> Result<String, NormalizeError> {
        let _span = tracing::debug_span!("normalizer.normalize", kind = %kind).entered();

        match kind {
            DocumentKind::Spreadsheet => spreadsheet::to_text(bytes, self.cell_join),
            DocumentKind::WordDocument => docx::to_text(bytes),
            DocumentKind::Presentation => presentation::to_text(bytes),
            DocumentKind::PlainText | DocumentKind::Sql => text::to_text(bytes, kind),
            DocumentKind::Pdf => pdf::to_text(bytes),
            DocumentKind::Unknown => Err(NormalizeError::Unsupported {
                filename: String::new(),
            }),
        }
    }

    /// Classifies and normalizes an upload, naming the file in any error.
    pub fn normalize_upload(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> Result<NormalizedDocument, NormalizeError> {
        let kind = classify(filename);
        let text = self
            .normalize(bytes, kind)
            .map_err(|e| e.with_filename(filename))?;

        log::debug!(
            "Normalized '{}' as {} ({} chars)",
            filename,
            kind,
            text.chars().count()
        );

        Ok(NormalizedDocument { kind, text })
    }
}

/// Normalizes with the default join policy.
pub fn normalize(bytes: &[u8], kind: DocumentKind) -> Result<String, NormalizeError> {
    Normalizer::default().normalize(bytes, kind)
}
