use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::NormalizeError;
use crate::normalizer::ooxml::{self, Package};
use crate::normalizer::DocumentKind;

const DOCUMENT_PART: &str = "word/document.xml";

/// Body paragraphs joined by newlines. Tables, text boxes and images are dropped.
pub fn to_text(bytes: &[u8]) -> Result<String, NormalizeError> {
    let mut package = Package::open(bytes, DocumentKind::WordDocument)?;
    let xml = package.read_part(DOCUMENT_PART)?;
    let paragraphs = parse_paragraphs(&xml).map_err(|e| package.xml_error(DOCUMENT_PART, e))?;
    Ok(paragraphs.join("\n"))
}

fn parse_paragraphs(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);

    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_paragraph = false;
    let mut in_text = false;
    // Depth inside tables, text boxes and drawings, whose paragraphs are not body paragraphs.
    let mut skip_depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"tbl" | b"txbxContent" | b"drawing" | b"pict" => skip_depth += 1,
                b"p" if skip_depth == 0 => {
                    in_paragraph = true;
                    current.clear();
                }
                b"t" if skip_depth == 0 => in_text = in_paragraph,
                _ => {}
            },
            Event::Empty(ref e) if skip_depth == 0 && in_paragraph => {
                match e.local_name().as_ref() {
                    b"tab" => current.push('\t'),
                    b"br" | b"cr" => current.push('\n'),
                    _ => {}
                }
            }
            Event::Empty(ref e) if skip_depth == 0 && e.local_name().as_ref() == b"p" => {
                paragraphs.push(String::new());
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"tbl" | b"txbxContent" | b"drawing" | b"pict" => {
                    skip_depth = skip_depth.saturating_sub(1)
                }
                b"p" if skip_depth == 0 && in_paragraph => {
                    paragraphs.push(std::mem::take(&mut current));
                    in_paragraph = false;
                }
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(ref e) if in_text && skip_depth == 0 => {
                current.push_str(&ooxml::text_content(e));
            }
            Event::GeneralRef(ref e) if in_text && skip_depth == 0 => {
                current.push_str(&ooxml::entity(e));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}
