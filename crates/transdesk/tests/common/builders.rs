//! Builders for in-memory office documents.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;

const SPREADSHEET_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Writes `(part name, content)` pairs into a zip package.
pub fn package(parts: &[(&str, String)]) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buffer);
        let options = SimpleFileOptions::default();
        for (name, content) in parts {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buffer.into_inner()
}

/// Builder for xlsx workbooks with inline-string cells.
///
/// Cells are addressed A1-style; unset cells stay empty.
pub struct WorkbookBuilder {
    sheets: Vec<(String, Vec<(String, String)>)>,
}

impl WorkbookBuilder {
    pub fn new() -> Self {
        Self { sheets: Vec::new() }
    }

    /// Start a new sheet.
    pub fn sheet(mut self, name: &str) -> Self {
        self.sheets.push((name.to_string(), Vec::new()));
        self
    }

    /// Set a cell on the current sheet.
    pub fn cell(mut self, reference: &str, value: &str) -> Self {
        if self.sheets.is_empty() {
            self.sheets.push(("Sheet1".to_string(), Vec::new()));
        }
        if let Some((_, cells)) = self.sheets.last_mut() {
            cells.push((reference.to_string(), value.to_string()));
        }
        self
    }

    /// Fill consecutive rows from A1, one string per column.
    pub fn rows(mut self, rows: &[&[&str]]) -> Self {
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                let column = (b'A' + c as u8) as char;
                self = self.cell(&format!("{}{}", column, r + 1), value);
            }
        }
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut sheet_entries = String::new();
        let mut rels = String::new();
        let mut parts = Vec::new();

        for (index, (name, cells)) in self.sheets.iter().enumerate() {
            let n = index + 1;
            sheet_entries.push_str(&format!(
                r#"<sheet name="{name}" sheetId="{n}" r:id="rId{n}"/>"#
            ));
            rels.push_str(&format!(
                r#"<Relationship Id="rId{n}" Type="{RELATIONSHIPS_NS}/worksheet" Target="worksheets/sheet{n}.xml"/>"#
            ));
            parts.push((format!("xl/worksheets/sheet{n}.xml"), worksheet(cells)));
        }

        let workbook = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="{SPREADSHEET_NS}" xmlns:r="{RELATIONSHIPS_NS}"><sheets>{sheet_entries}</sheets></workbook>"#
        );
        let workbook_rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#
        );

        let mut all: Vec<(&str, String)> = vec![
            ("xl/workbook.xml", workbook),
            ("xl/_rels/workbook.xml.rels", workbook_rels),
        ];
        for (name, content) in &parts {
            all.push((name.as_str(), content.clone()));
        }
        package(&all)
    }
}

impl Default for WorkbookBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn worksheet(cells: &[(String, String)]) -> String {
    let mut rows: std::collections::BTreeMap<usize, Vec<&(String, String)>> = Default::default();
    for cell in cells {
        let row: usize = cell
            .0
            .trim_start_matches(|c: char| c.is_ascii_alphabetic())
            .parse()
            .unwrap();
        rows.entry(row).or_default().push(cell);
    }

    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="{SPREADSHEET_NS}"><sheetData>"#
    );
    for (row, cells) in rows {
        xml.push_str(&format!(r#"<row r="{row}">"#));
        for (reference, value) in cells {
            xml.push_str(&format!(
                r#"<c r="{reference}" t="inlineStr"><is><t>{value}</t></is></c>"#
            ));
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// A docx whose body holds one paragraph per entry.
pub fn docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body
    );
    package(&[("word/document.xml", document)])
}

/// A pptx with one slide per entry, each slide holding its paragraphs.
pub fn pptx(slides: &[&[&str]]) -> Vec<u8> {
    let parts: Vec<(String, String)> = slides
        .iter()
        .enumerate()
        .map(|(i, paragraphs)| {
            let body: String = paragraphs
                .iter()
                .map(|p| format!("<a:p><a:r><a:t>{}</a:t></a:r></a:p>", p))
                .collect();
            (
                format!("ppt/slides/slide{}.xml", i + 1),
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8"?><p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:sp><p:txBody>{}</p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
                    body
                ),
            )
        })
        .collect();
    let refs: Vec<(&str, String)> = parts
        .iter()
        .map(|(name, xml)| (name.as_str(), xml.clone()))
        .collect();
    package(&refs)
}
