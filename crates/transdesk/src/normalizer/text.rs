use crate::error::NormalizeError;
use crate::normalizer::DocumentKind;

/// Decodes UTF-8 text (plain text and SQL scripts) with line endings normalized to `\n`.
pub fn to_text(bytes: &[u8], kind: DocumentKind) -> Result<String, NormalizeError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| NormalizeError::malformed(kind, format!("invalid UTF-8: {}", e)))?;

    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    Ok(text.replace("\r\n", "\n").replace('\r', "\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passthrough() {
        let text = to_text("Hello, World!\nThis is a test document.".as_bytes(), DocumentKind::PlainText)
            .unwrap();
        assert_eq!(text, "Hello, World!\nThis is a test document.");
    }

    #[test]
    fn test_line_endings_are_normalized() {
        let text = to_text(b"a\r\nb\rc\n", DocumentKind::Sql).unwrap();
        assert_eq!(text, "a\nb\nc\n");
    }

    #[test]
    fn test_bom_is_stripped() {
        let text = to_text("\u{feff}select 1;".as_bytes(), DocumentKind::Sql).unwrap();
        assert_eq!(text, "select 1;");
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let result = to_text(&[0x66, 0x6f, 0xff, 0xfe], DocumentKind::PlainText);
        match result {
            Err(NormalizeError::Malformed { kind, .. }) => assert_eq!(kind, DocumentKind::PlainText),
            other => panic!("Expected Malformed error, got {:?}", other),
        }
    }
}
