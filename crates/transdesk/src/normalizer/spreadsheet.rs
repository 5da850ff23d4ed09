//! Spreadsheet (xlsx) reader and text flattening.

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::config::schema::CellJoin;
use crate::error::NormalizeError;
use crate::normalizer::ooxml::{self, Package};
use crate::normalizer::DocumentKind;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// Column `XFD`, the last one a worksheet can address.
const MAX_COLUMNS: usize = 16_384;
const MAX_ROWS: usize = 1_048_576;
/// Largest row-by-column span flattened per sheet.
const MAX_GRID_CELLS: usize = 4_000_000;

/// One worksheet as a rectangular grid. `None` marks an empty cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Sheet {
    pub fn width(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }
}

/// Flattens every sheet, in workbook order, into text.
///
/// Each sheet contributes its name followed by its rows; every row ends with
/// a newline and empty cells render as a single space.
pub fn to_text(bytes: &[u8], join: CellJoin) -> Result<String, NormalizeError> {
    let sheets = read_sheets(bytes)?;
    let mut text = String::new();
    for sheet in &sheets {
        text.push_str(&sheet.name);
        for row in &sheet.rows {
            push_row(&mut text, row, join);
            text.push('\n');
        }
    }
    Ok(text)
}

fn push_row(text: &mut String, row: &[Option<String>], join: CellJoin) {
    let mut previous_filled = false;
    for cell in row {
        match cell {
            Some(value) => {
                if previous_filled && join == CellJoin::Spaced {
                    text.push(' ');
                }
                text.push_str(value);
                previous_filled = true;
            }
            None => {
                text.push(' ');
                previous_filled = false;
            }
        }
    }
}

/// Parses all worksheets of an xlsx package in workbook order.
pub fn read_sheets(bytes: &[u8]) -> Result<Vec<Sheet>, NormalizeError> {
    let mut package = Package::open(bytes, DocumentKind::Spreadsheet)?;

    let workbook = package.read_part(WORKBOOK_PART)?;
    let entries = parse_workbook(&workbook).map_err(|e| package.xml_error(WORKBOOK_PART, e))?;

    let targets = match package.read_optional_part(WORKBOOK_RELS_PART)? {
        Some(rels) => {
            parse_relationships(&rels).map_err(|e| package.xml_error(WORKBOOK_RELS_PART, e))?
        }
        None => BTreeMap::new(),
    };

    let shared = match package.read_optional_part(SHARED_STRINGS_PART)? {
        Some(xml) => {
            parse_shared_strings(&xml).map_err(|e| package.xml_error(SHARED_STRINGS_PART, e))?
        }
        None => Vec::new(),
    };

    let mut sheets = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let part = entry
            .rel_id
            .as_ref()
            .and_then(|id| targets.get(id))
            .map(|target| resolve_target(target))
            .unwrap_or_else(|| format!("xl/worksheets/sheet{}.xml", index + 1));

        let xml = package.read_part(&part)?;
        let cells = parse_worksheet(&xml, &shared).map_err(|e| package.xml_error(&part, e))?;

        let rows = into_grid(cells).map_err(|span| {
            NormalizeError::malformed(
                DocumentKind::Spreadsheet,
                format!(
                    "sheet '{}' spans {} rows by {} columns, more than {} cells",
                    entry.name, span.rows, span.columns, MAX_GRID_CELLS
                ),
            )
        })?;
        sheets.push(Sheet {
            name: entry.name.clone(),
            rows,
        });
    }

    log::debug!("Read {} sheet(s) from workbook", sheets.len());
    Ok(sheets)
}

struct SheetEntry {
    name: String,
    rel_id: Option<String>,
}

fn parse_workbook(xml: &str) -> Result<Vec<SheetEntry>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut entries = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"sheet" => {
                entries.push(SheetEntry {
                    name: ooxml::attribute(e, b"name").unwrap_or_default(),
                    rel_id: ooxml::attribute(e, b"id"),
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

fn parse_relationships(xml: &str) -> Result<BTreeMap<String, String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut targets = BTreeMap::new();

    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) =
                    (ooxml::attribute(e, b"Id"), ooxml::attribute(e, b"Target"))
                {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(targets)
}

fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_item = false;
    let mut in_text = false;
    // Phonetic runs duplicate the visible text.
    let mut in_phonetic = false;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"si" => {
                    in_item = true;
                    current.clear();
                }
                b"t" => in_text = in_item && !in_phonetic,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::End(ref e) => match e.local_name().as_ref() {
                b"si" => {
                    strings.push(std::mem::take(&mut current));
                    in_item = false;
                }
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Empty(ref e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(ref e) if in_text => current.push_str(&ooxml::text_content(e)),
            Event::CData(ref e) if in_text => current.push_str(&String::from_utf8_lossy(e)),
            Event::GeneralRef(ref e) if in_text => current.push_str(&ooxml::entity(e)),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(strings)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CellType {
    Number,
    Shared,
    Inline,
    Formula,
    Boolean,
    Error,
}

impl CellType {
    fn from_attr(t: Option<&str>) -> Self {
        match t {
            Some("s") => CellType::Shared,
            Some("inlineStr") => CellType::Inline,
            Some("str") => CellType::Formula,
            Some("b") => CellType::Boolean,
            Some("e") => CellType::Error,
            _ => CellType::Number,
        }
    }
}

struct PendingCell {
    row: usize,
    column: usize,
    cell_type: CellType,
    value: String,
}

/// (row, column) → value, zero-based, empty values omitted.
type CellMap = BTreeMap<(usize, usize), String>;

fn parse_worksheet(xml: &str, shared: &[String]) -> Result<CellMap, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut cells = CellMap::new();

    let mut next_row = 0usize;
    let mut current_row = 0usize;
    let mut next_column = 0usize;
    let mut cell: Option<PendingCell> = None;
    let mut capture = false;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"row" => {
                    current_row = row_index(e).unwrap_or(next_row);
                    next_row = current_row + 1;
                    next_column = 0;
                }
                b"c" => {
                    let (row, column) = cell_position(e).unwrap_or((current_row, next_column));
                    next_column = column + 1;
                    cell = Some(PendingCell {
                        row,
                        column,
                        cell_type: CellType::from_attr(ooxml::attribute(e, b"t").as_deref()),
                        value: String::new(),
                    });
                }
                b"v" => capture = cell.is_some(),
                b"t" => {
                    capture = cell
                        .as_ref()
                        .is_some_and(|c| c.cell_type == CellType::Inline);
                }
                _ => {}
            },
            Event::Empty(ref e) => match e.local_name().as_ref() {
                b"row" => {
                    current_row = row_index(e).unwrap_or(next_row);
                    next_row = current_row + 1;
                }
                b"c" => {
                    let (_, column) = cell_position(e).unwrap_or((current_row, next_column));
                    next_column = column + 1;
                }
                _ => {}
            },
            Event::End(ref e) => match e.local_name().as_ref() {
                b"v" | b"t" => capture = false,
                b"c" => {
                    if let Some(done) = cell.take() {
                        let value = resolve_value(done.cell_type, &done.value, shared);
                        if !value.is_empty() {
                            cells.insert((done.row, done.column), value);
                        }
                    }
                }
                _ => {}
            },
            Event::Text(ref e) if capture => {
                if let Some(c) = cell.as_mut() {
                    c.value.push_str(&ooxml::text_content(e));
                }
            }
            Event::GeneralRef(ref e) if capture => {
                if let Some(c) = cell.as_mut() {
                    c.value.push_str(&ooxml::entity(e));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(cells)
}

fn resolve_value(cell_type: CellType, raw: &str, shared: &[String]) -> String {
    match cell_type {
        CellType::Shared => raw
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|i| shared.get(i))
            .cloned()
            .unwrap_or_default(),
        CellType::Boolean => match raw.trim() {
            "1" => "TRUE".to_string(),
            "0" => "FALSE".to_string(),
            other => other.to_string(),
        },
        CellType::Number => raw.trim().to_string(),
        CellType::Inline | CellType::Formula | CellType::Error => raw.to_string(),
    }
}

fn row_index(e: &BytesStart<'_>) -> Option<usize> {
    ooxml::attribute(e, b"r")?
        .parse::<usize>()
        .ok()
        .filter(|row| *row <= MAX_ROWS)?
        .checked_sub(1)
}

fn cell_position(e: &BytesStart<'_>) -> Option<(usize, usize)> {
    parse_reference(&ooxml::attribute(e, b"r")?)
}

/// Parses an A1-style reference into zero-based (row, column).
///
/// References outside `A1:XFD1048576` are rejected.
fn parse_reference(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }

    let mut column = 0usize;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let value = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
        column = column.checked_mul(26)?.checked_add(value)?;
        if column > MAX_COLUMNS {
            return None;
        }
    }

    let row = digits.parse::<usize>().ok()?;
    if row > MAX_ROWS {
        return None;
    }
    Some((row.checked_sub(1)?, column - 1))
}

/// Rows and columns of a sheet too large to flatten.
#[derive(Debug, PartialEq, Eq)]
struct Span {
    rows: usize,
    columns: usize,
}

/// Builds a rectangular grid spanning the first to the last non-empty row and
/// the first to the widest column.
fn into_grid(cells: CellMap) -> Result<Vec<Vec<Option<String>>>, Span> {
    let (Some(first_row), Some(last_row)) = (
        cells.keys().map(|(r, _)| *r).min(),
        cells.keys().map(|(r, _)| *r).max(),
    ) else {
        return Ok(Vec::new());
    };
    let width = cells.keys().map(|(_, c)| *c + 1).max().unwrap_or(0);
    let height = last_row - first_row + 1;

    match height.checked_mul(width) {
        Some(total) if total <= MAX_GRID_CELLS => {}
        _ => {
            return Err(Span {
                rows: height,
                columns: width,
            })
        }
    }

    let mut grid = vec![vec![None; width]; height];
    for ((row, column), value) in cells {
        grid[row - first_row][column] = Some(value);
    }
    Ok(grid)
}
