//! Shared helpers for Office Open XML packages (xlsx, docx, pptx).

use std::io::{Cursor, Read};

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, BytesText};
use zip::ZipArchive;

use crate::error::NormalizeError;
use crate::normalizer::DocumentKind;

pub(crate) struct Package {
    kind: DocumentKind,
    archive: ZipArchive<Cursor<Vec<u8>>>,
}

impl Package {
    pub(crate) fn open(bytes: &[u8], kind: DocumentKind) -> Result<Self, NormalizeError> {
        let archive = ZipArchive::new(Cursor::new(bytes.to_vec()))
            .map_err(|e| NormalizeError::malformed(kind, format!("not a zip package: {}", e)))?;
        Ok(Self { kind, archive })
    }

    pub(crate) fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// Reads a required part as UTF-8.
    pub(crate) fn read_part(&mut self, name: &str) -> Result<String, NormalizeError> {
        self.read_optional_part(name)?.ok_or_else(|| {
            NormalizeError::malformed(self.kind, format!("missing package part '{}'", name))
        })
    }

    pub(crate) fn read_optional_part(
        &mut self,
        name: &str,
    ) -> Result<Option<String>, NormalizeError> {
        let kind = self.kind;
        let mut part = match self.archive.by_name(name) {
            Ok(part) => part,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => {
                return Err(NormalizeError::malformed(
                    kind,
                    format!("failed to open '{}': {}", name, e),
                ))
            }
        };

        let mut content = String::new();
        part.read_to_string(&mut content).map_err(|e| {
            NormalizeError::malformed(kind, format!("failed to read '{}': {}", name, e))
        })?;
        Ok(Some(content))
    }

    /// Names of all parts in archive order.
    pub(crate) fn part_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    pub(crate) fn xml_error(&self, part: &str, err: impl std::fmt::Display) -> NormalizeError {
        NormalizeError::malformed(self.kind, format!("XML error in '{}': {}", part, err))
    }
}

/// Looks up an attribute by local name and returns its unescaped value.
pub(crate) fn attribute(element: &BytesStart<'_>, local_name: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == local_name)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// Text content of a `Text` event. Entity references arrive separately as
/// `GeneralRef` events, see [`entity`].
pub(crate) fn text_content(text: &BytesText<'_>) -> String {
    text.decode()
        .map(|t| t.into_owned())
        .unwrap_or_else(|_| String::from_utf8_lossy(text).into_owned())
}

/// Resolves a general entity reference (`&amp;`, `&#38;`, `&#x26;`). Unknown
/// entities are kept verbatim.
pub(crate) fn entity(reference: &BytesRef<'_>) -> String {
    if let Ok(Some(c)) = reference.resolve_char_ref() {
        return c.to_string();
    }
    let name = reference.decode().unwrap_or_default();
    match resolve_predefined_entity(&name) {
        Some(resolved) => resolved.to_string(),
        None => format!("&{};", name),
    }
}
