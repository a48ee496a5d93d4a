//! Reads uploaded statement files into raw rows.
//!
//! Delimited text and spreadsheets (xlsx, xls, xlsb, ods) are both reduced to
//! a grid of strings, after which the header row is detected and every row
//! below it becomes a [`RawRow`].

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Duration, NaiveDate};
use csv::{ReaderBuilder, Terminator};
use encoding_rs::{Encoding, UTF_8};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::io::Cursor;

use super::header_detection::{detect_header_row, normalize_headers};
use super::imports_errors::ImportError;
use super::imports_model::RawRow;

const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];
const DELIMITER_SAMPLE_LINES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Delimited,
    Spreadsheet,
}

/// How a statement file was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementSource {
    pub kind: StatementKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
}

/// Bounds applied while reading.
#[derive(Debug, Clone, Copy)]
pub struct ReadLimits {
    pub header_scan_rows: usize,
    pub max_rows: usize,
}

/// A statement reduced to headers and data rows.
#[derive(Debug, Clone)]
pub struct ParsedStatement {
    pub source: StatementSource,
    pub headers: Vec<String>,
    pub header_row_number: usize,
    pub rows: Vec<RawRow>,
}

/// A non-blank line of the source grid with its 1-based position.
struct GridRow {
    number: usize,
    cells: Vec<String>,
}

/// `None` when the grid outgrew its limit.
type GridResult = Result<Option<(StatementSource, Vec<GridRow>)>, ImportError>;

/// Reads a statement file and splits it into header and data rows.
pub fn read_statement(content: &[u8], limits: ReadLimits) -> Result<ParsedStatement, ImportError> {
    // Rows above the header are allowed on top of the data-row limit.
    let grid_limit = limits.max_rows.saturating_add(limits.header_scan_rows);
    let grid_result = if is_spreadsheet(content) {
        read_spreadsheet(content, grid_limit)
    } else {
        read_delimited(content, grid_limit)
    };
    let (source, grid) = grid_result?.ok_or(ImportError::TooManyRows {
        limit: limits.max_rows,
    })?;

    if grid.is_empty() {
        return Err(ImportError::UnreadableFile(
            "no parseable rows were found".to_string(),
        ));
    }

    let cells: Vec<Vec<String>> = grid.iter().map(|r| r.cells.clone()).collect();
    let header_index = detect_header_row(&cells, limits.header_scan_rows).ok_or_else(|| {
        ImportError::UnreadableFile(format!(
            "no header row found in the first {} rows",
            limits.header_scan_rows
        ))
    })?;

    let header_row = &grid[header_index];
    let headers = normalize_headers(&header_row.cells);
    let rows: Vec<RawRow> = grid[header_index + 1..]
        .iter()
        .map(|r| RawRow::new(r.number, &headers, r.cells.clone()))
        .collect();

    if rows.is_empty() {
        return Err(ImportError::EmptyFile);
    }
    if rows.len() > limits.max_rows {
        return Err(ImportError::TooManyRows {
            limit: limits.max_rows,
        });
    }

    debug!(
        "Read statement ({:?}): header at row {}, {} data rows",
        source.kind,
        header_row.number,
        rows.len()
    );

    Ok(ParsedStatement {
        source,
        headers,
        header_row_number: header_row.number,
        rows,
    })
}

fn is_spreadsheet(content: &[u8]) -> bool {
    // ZIP container (xlsx, xlsb, ods) or OLE compound document (xls).
    content.starts_with(b"PK\x03\x04") || content.starts_with(&[0xD0, 0xCF, 0x11, 0xE0])
}

fn is_blank_row(cells: &[String]) -> bool {
    cells.iter().all(|c| c.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Delimited text
// ---------------------------------------------------------------------------

/// Decodes file bytes to text: BOM first, then strict UTF-8, then charset
/// detection for legacy encodings.
pub fn decode_text(content: &[u8]) -> (Cow<'_, str>, &'static Encoding) {
    if let Some((encoding, bom_len)) = Encoding::for_bom(content) {
        let (text, _) = encoding.decode_without_bom_handling(&content[bom_len..]);
        return (text, encoding);
    }
    if let Ok(text) = std::str::from_utf8(content) {
        return (Cow::Borrowed(text), UTF_8);
    }
    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(content, true);
    let encoding = detector.guess(None, true);
    let (text, had_errors) = encoding.decode_without_bom_handling(content);
    if had_errors {
        warn!(
            "Statement is not valid {}; some characters were replaced",
            encoding.name()
        );
    }
    (text, encoding)
}

/// Picks the delimiter whose field count is most consistent across the
/// opening lines. Lines above the header (preamble) usually disagree, so the
/// most frequent count is used rather than the first line's.
pub fn detect_delimiter(text: &str) -> u8 {
    let lines: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(DELIMITER_SAMPLE_LINES)
        .collect();

    let mut best = (b',', 0usize, 0usize);
    for delimiter in DELIMITER_CANDIDATES {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| line.bytes().filter(|b| *b == delimiter).count())
            .filter(|c| *c > 0)
            .collect();
        let mut modal = (0usize, 0usize);
        for count in &counts {
            let frequency = counts.iter().filter(|c| *c == count).count();
            if frequency > modal.1 || (frequency == modal.1 && *count > modal.0) {
                modal = (*count, frequency);
            }
        }
        let (fields, lines_matching) = modal;
        if lines_matching > best.2 || (lines_matching == best.2 && fields > best.1) {
            best = (delimiter, fields, lines_matching);
        }
    }
    best.0
}

fn read_delimited(content: &[u8], grid_limit: usize) -> GridResult {
    let (text, encoding) = decode_text(content);
    if text.trim().is_empty() {
        return Err(ImportError::UnreadableFile("file is empty".to_string()));
    }
    let delimiter = detect_delimiter(&text);

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .terminator(Terminator::Any(b'\n'))
        .from_reader(text.as_bytes());

    let mut grid = Vec::new();
    let mut failures = 0usize;
    for (idx, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                failures += 1;
                warn!("Skipping unreadable record {}: {}", idx + 1, e);
                continue;
            }
        };
        let cells: Vec<String> = record
            .iter()
            .map(|s| s.trim_end_matches('\r').to_string())
            .collect();
        if is_blank_row(&cells) {
            continue;
        }
        if grid.len() >= grid_limit {
            return Ok(None);
        }
        let number = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 1);
        grid.push(GridRow { number, cells });
    }

    if grid.is_empty() && failures > 0 {
        return Err(ImportError::UnreadableFile(format!(
            "none of {} records could be parsed",
            failures
        )));
    }

    let source = StatementSource {
        kind: StatementKind::Delimited,
        delimiter: Some((delimiter as char).to_string()),
        encoding: Some(encoding.name().to_string()),
        sheet_name: None,
    };
    Ok(Some((source, grid)))
}

// ---------------------------------------------------------------------------
// Spreadsheets
// ---------------------------------------------------------------------------

fn read_spreadsheet(content: &[u8], grid_limit: usize) -> GridResult {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(content.to_vec()))
        .map_err(|e| ImportError::UnreadableFile(format!("cannot open spreadsheet: {}", e)))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    for sheet_name in sheet_names {
        let range = match workbook.worksheet_range(&sheet_name) {
            Ok(range) => range,
            Err(e) => {
                warn!("Skipping unreadable sheet '{}': {}", sheet_name, e);
                continue;
            }
        };
        let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);

        let mut grid = Vec::new();
        for (offset, row) in range.rows().enumerate() {
            let cells: Vec<String> = row.iter().map(cell_to_string).collect();
            if is_blank_row(&cells) {
                continue;
            }
            if grid.len() >= grid_limit {
                return Ok(None);
            }
            grid.push(GridRow {
                number: first_row + offset + 1,
                cells,
            });
        }

        if !grid.is_empty() {
            let source = StatementSource {
                kind: StatementKind::Spreadsheet,
                delimiter: None,
                encoding: None,
                sheet_name: Some(sheet_name),
            };
            return Ok(Some((source, grid)));
        }
    }

    Err(ImportError::UnreadableFile(
        "spreadsheet has no non-empty sheet".to_string(),
    ))
}

/// Renders a spreadsheet cell the way it would appear in a CSV export.
/// Date cells become ISO `yyyy-MM-dd`.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        Data::DateTimeIso(s) => s.split('T').next().unwrap_or(s).to_string(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Converts a 1900-system Excel serial day number to a date.
fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    // 2_958_465 is 9999-12-31.
    if !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::try_days(serial.floor() as i64)?)
}
