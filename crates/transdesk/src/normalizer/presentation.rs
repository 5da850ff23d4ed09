use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::NormalizeError;
use crate::normalizer::ooxml::{self, Package};
use crate::normalizer::DocumentKind;

const SLIDE_PREFIX: &str = "ppt/slides/slide";

/// Slide text in slide order, one line per text paragraph.
pub fn to_text(bytes: &[u8]) -> Result<String, NormalizeError> {
    let mut package = Package::open(bytes, DocumentKind::Presentation)?;

    let mut slides: Vec<(u32, String)> = package
        .part_names()
        .into_iter()
        .filter_map(|name| slide_number(&name).map(|n| (n, name)))
        .collect();
    slides.sort();

    if slides.is_empty() {
        return Err(NormalizeError::malformed(
            package.kind(),
            "presentation has no slides",
        ));
    }

    let mut lines = Vec::new();
    for (_, part) in &slides {
        let xml = package.read_part(part)?;
        let paragraphs = parse_slide(&xml).map_err(|e| package.xml_error(part, e))?;
        lines.extend(paragraphs);
    }

    Ok(lines.join("\n"))
}

fn slide_number(part: &str) -> Option<u32> {
    part.strip_prefix(SLIDE_PREFIX)?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

fn parse_slide(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_paragraph = false;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"p" => {
                    in_paragraph = true;
                    current.clear();
                }
                b"t" => in_text = in_paragraph,
                _ => {}
            },
            Event::Empty(ref e) if in_paragraph && e.local_name().as_ref() == b"br" => {
                current.push('\n');
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"p" if in_paragraph => {
                    paragraphs.push(std::mem::take(&mut current));
                    in_paragraph = false;
                }
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(ref e) if in_text => current.push_str(&ooxml::text_content(e)),
            Event::GeneralRef(ref e) if in_text => current.push_str(&ooxml::entity(e)),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}
