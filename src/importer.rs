use std::path::Path;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info, warn};

use crate::amount::{parse_amount, Amount};
use crate::error::{FaturaError, Result};
use crate::models::Transaction;
use crate::table::{cell_at, read_table, CellValue, TableFormat};

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Date,
    Description,
    Amount,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Date, Field::Description, Field::Amount];

    pub fn name(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Description => "description",
            Self::Amount => "amount",
        }
    }

    /// Header names accepted for this field, compared case-insensitively.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Date => &["data", "date"],
            Self::Description => &[
                "lançamento",
                "lancamento",
                "descrição",
                "descricao",
                "estabelecimento",
                "histórico",
                "description",
            ],
            Self::Amount => &["valor", "valor (r$)", "amount", "value"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    date: usize,
    description: usize,
    amount: usize,
}

fn resolve_columns(header: &[CellValue]) -> std::result::Result<Columns, Vec<String>> {
    let names: Vec<String> = header
        .iter()
        .map(|c| c.as_text().trim().to_lowercase())
        .collect();
    let find = |field: Field| {
        field
            .aliases()
            .iter()
            .find_map(|alias| names.iter().position(|n| n == alias))
    };
    match (find(Field::Date), find(Field::Description), find(Field::Amount)) {
        (Some(date), Some(description), Some(amount)) => Ok(Columns {
            date,
            description,
            amount,
        }),
        found => {
            let found = [found.0, found.1, found.2];
            Err(Field::ALL
                .iter()
                .zip(found)
                .filter(|(_, idx)| idx.is_none())
                .map(|(field, _)| field.name().to_string())
                .collect())
        }
    }
}

/// Locate the header: the first row that resolves every field. Exports often
/// carry a preamble (account holder, card number) above the table.
fn find_header(rows: &[Vec<CellValue>]) -> Result<(usize, Columns)> {
    let mut first_missing = None;
    for (idx, row) in rows.iter().enumerate() {
        match resolve_columns(row) {
            Ok(columns) => {
                if idx > 0 {
                    debug!(row = idx, "header found below preamble");
                }
                return Ok((idx, columns));
            }
            Err(missing) => {
                first_missing.get_or_insert(missing);
            }
        }
    }
    let missing = first_missing
        .unwrap_or_else(|| Field::ALL.iter().map(|f| f.name().to_string()).collect());
    Err(FaturaError::MissingColumns(missing))
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Text date formats, in the order they are tried.
pub const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d", "%m/%d/%Y", "%d-%m-%Y"];

/// Excel serial day number to date (epoch 1899-12-30, which absorbs the
/// 1900 leap year bug).
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(chrono::Duration::days(serial.floor() as i64))
}

fn serial_date(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::DateTime(f) | CellValue::Number(f) => excel_serial_to_date(*f),
        CellValue::Int(i) => excel_serial_to_date(*i as f64),
        _ => None,
    }
}

/// Parse one date cell. Text years must have four digits: chrono's `%Y`
/// would read `15/01/25` as year 25.
pub fn parse_date_with(cell: &CellValue, format: &str) -> Option<NaiveDate> {
    match cell {
        CellValue::Text(s) => NaiveDate::parse_from_str(s.trim(), format)
            .ok()
            .filter(|d| (1000..=9999).contains(&d.year())),
        other => serial_date(other),
    }
}

/// Parse a date column with the first format under which at least one cell
/// parses. Cells that still fail become `None`.
fn parse_dates(cells: &[&CellValue]) -> Result<Vec<Option<NaiveDate>>> {
    if cells.is_empty() {
        return Ok(Vec::new());
    }
    for format in DATE_FORMATS {
        let parsed: Vec<Option<NaiveDate>> =
            cells.iter().map(|cell| parse_date_with(cell, format)).collect();
        if parsed.iter().any(Option::is_some) {
            debug!(format, "selected date format");
            return Ok(parsed);
        }
    }
    Err(FaturaError::DateFormat)
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestOptions {
    /// Keep only rows with a parseable, non-negative amount (drops refunds
    /// and credits).
    pub drop_negative_amounts: bool,
}

/// Parse a statement export into transactions sorted by date.
///
/// Rows keep their relative order among equal dates; rows without a date go
/// last, in file order.
pub fn ingest(bytes: &[u8], filename: &str, options: &IngestOptions) -> Result<Vec<Transaction>> {
    let format = TableFormat::from_filename(filename)?;
    let rows = read_table(bytes, format)?;
    let (header_idx, columns) = find_header(&rows)?;
    let body = &rows[header_idx + 1..];

    let date_cells: Vec<&CellValue> = body.iter().map(|row| cell_at(row, columns.date)).collect();
    let dates = parse_dates(&date_cells)?;

    let mut transactions: Vec<Transaction> = body
        .iter()
        .zip(dates)
        .map(|(row, date)| {
            let description = cell_at(row, columns.description).as_text().trim().to_string();
            let amount = parse_amount(cell_at(row, columns.amount));
            Transaction::new(date, description, amount)
        })
        .collect();

    let read = transactions.len();
    if options.drop_negative_amounts {
        transactions.retain(|t| matches!(t.amount, Amount::Value(v) if v >= 0.0));
    }
    transactions.retain(|t| !t.description.is_empty() && t.description.to_lowercase() != "nan");

    transactions.sort_by(|a, b| match (a.date, b.date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    let undated = transactions.iter().filter(|t| t.date.is_none()).count();
    let unparsed = transactions.iter().filter(|t| t.amount.is_nan()).count();
    if undated > 0 || unparsed > 0 {
        warn!(undated, unparsed, "some rows have an unreadable date or amount");
    }
    info!(
        file = filename,
        rows = read,
        kept = transactions.len(),
        "ingested statement"
    );
    Ok(transactions)
}

pub fn ingest_file(path: &Path, options: &IngestOptions) -> Result<Vec<Transaction>> {
    let bytes = std::fs::read(path)?;
    ingest(&bytes, &path.to_string_lossy(), options)
}
