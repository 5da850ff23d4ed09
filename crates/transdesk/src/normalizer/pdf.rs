use crate::error::NormalizeError;
use crate::normalizer::DocumentKind;

/// Extracts text page by page. Pages whose content cannot be decoded are skipped.
pub fn to_text(bytes: &[u8]) -> Result<String, NormalizeError> {
    let _span = tracing::debug_span!("normalizer.pdf").entered();

    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| NormalizeError::malformed(DocumentKind::Pdf, e.to_string()))?;

    let mut pages = Vec::new();
    for (page_num, _) in doc.get_pages() {
        match doc.extract_text(&[page_num]) {
            Ok(text) => pages.push(text.trim_end_matches('\n').to_string()),
            Err(e) => log::warn!("Skipping unreadable PDF page {}: {}", page_num, e),
        }
    }

    Ok(pages.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Document, Object, Stream};

    fn single_page_pdf(line: &str) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = format!("BT\n/F1 12 Tf\n50 742 Td\n({}) Tj\nET\n", line);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_extracts_page_text() {
        let bytes = single_page_pdf("Quarterly report");
        let text = to_text(&bytes).unwrap();
        assert!(text.contains("Quarterly report"));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let bytes = single_page_pdf("Same input");
        assert_eq!(to_text(&bytes).unwrap(), to_text(&bytes).unwrap());
    }

    #[test]
    fn test_rejects_garbage() {
        let result = to_text(b"%PDF-nope");
        match result {
            Err(NormalizeError::Malformed { kind, .. }) => assert_eq!(kind, DocumentKind::Pdf),
            other => panic!("Expected Malformed error, got {:?}", other),
        }
    }
}
