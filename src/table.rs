use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader};
use tracing::debug;

use crate::error::{FaturaError, Result};

/// A single cell of a statement or rule file, independent of the source format.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Int(i64),
    Bool(bool),
    /// Spreadsheet date cell, as an Excel serial day number.
    DateTime(f64),
}

impl CellValue {
    pub fn text(raw: &str) -> Self {
        if raw.is_empty() {
            Self::Empty
        } else {
            Self::Text(raw.to_string())
        }
    }

    /// Render the cell as text, the way it reads in the source file.
    pub fn as_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(f) | Self::DateTime(f) => {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{}", *f as i64)
                } else {
                    f.to_string()
                }
            }
            Self::Int(i) => i.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }
}

impl From<&Data> for CellValue {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Self::Empty,
            Data::String(s) => Self::text(s),
            Data::Float(f) => Self::Number(*f),
            Data::Int(i) => Self::Int(*i),
            Data::Bool(b) => Self::Bool(*b),
            Data::DateTime(dt) => Self::DateTime(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Self::text(s),
        }
    }
}

/// Rows of cells; the first row is usually (but not always) the header.
pub type RawTable = Vec<Vec<CellValue>>;

static EMPTY_CELL: CellValue = CellValue::Empty;

/// Cell at `idx`, or an empty cell when the row is short.
pub fn cell_at(row: &[CellValue], idx: usize) -> &CellValue {
    row.get(idx).unwrap_or(&EMPTY_CELL)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Xls,
    Xlsx,
    Csv,
}

impl TableFormat {
    pub fn from_filename(filename: &str) -> Result<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "xls" => Ok(Self::Xls),
            "xlsx" => Ok(Self::Xlsx),
            "csv" => Ok(Self::Csv),
            _ => Err(FaturaError::UnsupportedFormat(filename.to_string())),
        }
    }
}

pub fn read_table(bytes: &[u8], format: TableFormat) -> Result<RawTable> {
    match format {
        TableFormat::Xls | TableFormat::Xlsx => read_spreadsheet(bytes),
        TableFormat::Csv => read_delimited(bytes),
    }
}

// ---------------------------------------------------------------------------
// Spreadsheets
// ---------------------------------------------------------------------------

/// Read the first sheet of an .xls/.xlsx workbook.
pub fn read_spreadsheet(bytes: &[u8]) -> Result<RawTable> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| FaturaError::UnparsableFile("workbook has no sheets".to_string()))??;
    let rows: RawTable = range
        .rows()
        .map(|row| row.iter().map(CellValue::from).collect())
        .collect();
    debug!(rows = rows.len(), "read first worksheet");
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Delimited text
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextEncoding {
    Utf8,
    Latin1,
}

impl TextEncoding {
    fn label(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Latin1 => "latin-1",
        }
    }

    fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => std::str::from_utf8(bytes)
                .ok()
                .map(|s| s.strip_prefix('\u{feff}').unwrap_or(s).to_string()),
            Self::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

const DELIMITED_ATTEMPTS: &[(TextEncoding, u8)] = &[
    (TextEncoding::Utf8, b','),
    (TextEncoding::Latin1, b','),
    (TextEncoding::Utf8, b';'),
    (TextEncoding::Latin1, b';'),
];

/// Minimum header width for a delimited guess to be accepted.
const MIN_COLUMNS: usize = 3;

/// Read delimited text, trying each (encoding, delimiter) pair in order until
/// one yields a header of at least three columns, at least one data row and
/// no data row wider than the header.
pub fn read_delimited(bytes: &[u8]) -> Result<RawTable> {
    let mut tried = Vec::new();
    for &(encoding, delimiter) in DELIMITED_ATTEMPTS {
        let label = format!("{}/'{}'", encoding.label(), delimiter as char);
        let Some(text) = encoding.decode(bytes) else {
            debug!(attempt = %label, "text is not valid for this encoding");
            tried.push(label);
            continue;
        };
        match parse_delimited(&text, delimiter) {
            Ok(rows) if is_usable(&rows) => {
                debug!(attempt = %label, rows = rows.len(), "parsed delimited file");
                return Ok(rows);
            }
            Ok(rows) => {
                debug!(
                    attempt = %label,
                    columns = rows.first().map_or(0, Vec::len),
                    rows = rows.len(),
                    "delimited guess rejected"
                );
            }
            Err(e) => debug!(attempt = %label, error = %e, "delimited parse failed"),
        }
        tried.push(label);
    }
    Err(FaturaError::UnparsableFile(format!(
        "no encoding/delimiter combination produced a table (tried {})",
        tried.join(", ")
    )))
}

fn parse_delimited(text: &str, delimiter: u8) -> Result<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(CellValue::text).collect());
    }
    Ok(rows)
}

/// A guess is usable when some row has at least three filled cells and no
/// row below it is wider. Rows above it are preamble and may be ragged.
/// A wider body row means the delimiter also occurs inside values, as with
/// unquoted decimal commas.
fn is_usable(rows: &RawTable) -> bool {
    let Some(start) = rows.iter().position(|row| filled_cells(row) >= MIN_COLUMNS) else {
        return false;
    };
    let width = rows[start].len();
    let body = &rows[start + 1..];
    !body.is_empty() && body.iter().all(|row| used_width(row) <= width)
}

fn filled_cells(row: &[CellValue]) -> usize {
    row.iter().filter(|c| **c != CellValue::Empty).count()
}

/// Width up to the last non-empty cell, so trailing delimiters are tolerated.
fn used_width(row: &[CellValue]) -> usize {
    row.iter()
        .rposition(|c| *c != CellValue::Empty)
        .map_or(0, |idx| idx + 1)
}
