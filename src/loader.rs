use crate::derive::derive_all;
use crate::error::LoadError;
use crate::types::{
    ChannelSlot, DerivedRecord, RawRecord, SlotColumns, CATEGORY_COLUMN, DATE_COLUMN,
    DEFAULT_SLOTS,
};
use crate::util::{parse_f64_safe, parse_timestamp};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// Worksheet to read; the first one when `None`. Ignored for CSV.
    pub sheet: Option<String>,
    /// Read slash dates as `dd/mm/yyyy` instead of `mm/dd/yyyy`.
    pub day_first: bool,
    pub slots: Vec<SlotColumns>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            sheet: None,
            day_first: false,
            slots: DEFAULT_SLOTS.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub blank_rows: usize,
    pub unparsed_revenue: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Csv,
    Workbook,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(SourceKind::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(SourceKind::Workbook),
            _ => Err(LoadError::UnsupportedFormat(ext)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Trimmed text content; `None` when blank.
    fn text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Cell::Number(n) => Some(n.to_string()),
            Cell::DateTime(dt) => Some(dt.to_string()),
        }
    }

    fn raw_text(&self) -> String {
        self.text().unwrap_or_default()
    }
}

struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

static EMPTY: Cell = Cell::Empty;

impl RawTable {
    fn column(&self, name: &str) -> Result<usize, LoadError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
    }

    fn cell<'a>(row: &'a [Cell], idx: usize) -> &'a Cell {
        row.get(idx).unwrap_or(&EMPTY)
    }
}

pub fn read_source(path: &Path) -> Result<Vec<u8>, LoadError> {
    std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read `path`, parse it and derive the time fields for every row.
pub fn load_and_derive(
    path: &Path,
    opts: &LoadOptions,
) -> Result<(Vec<DerivedRecord>, LoadReport), LoadError> {
    let kind = SourceKind::from_path(path)?;
    let bytes = read_source(path)?;
    info!(path = %path.display(), bytes = bytes.len(), "loading sales table");
    load_bytes(&bytes, kind, opts)
}

/// Parse an in-memory file. A single bad timestamp fails the whole load.
pub fn load_bytes(
    bytes: &[u8],
    kind: SourceKind,
    opts: &LoadOptions,
) -> Result<(Vec<DerivedRecord>, LoadReport), LoadError> {
    let table = match kind {
        SourceKind::Csv => read_csv_table(bytes)?,
        SourceKind::Workbook => read_workbook_table(bytes, opts.sheet.as_deref())?,
    };
    let (raw, report) = records_from_table(&table, opts)?;
    info!(
        rows = report.loaded_rows,
        blank = report.blank_rows,
        "sales table loaded"
    );
    Ok((derive_all(raw), report))
}

fn read_csv_table<R: Read>(reader: R) -> Result<RawTable, LoadError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(
            record
                .iter()
                .map(|v| {
                    if v.trim().is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(v.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(RawTable { headers, rows })
}

fn read_workbook_table(bytes: &[u8], sheet: Option<&str>) -> Result<RawTable, LoadError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = match sheet {
        Some(name) => {
            if !workbook.sheet_names().iter().any(|s| s == name) {
                return Err(LoadError::SheetNotFound(name.to_string()));
            }
            workbook.worksheet_range(name)?
        }
        None => workbook.worksheet_range_at(0).ok_or(LoadError::NoWorksheet)??,
    };

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(r) => r.iter().map(|c| cell_from_data(c).raw_text()).collect(),
        None => Vec::new(),
    };
    let rows = rows
        .map(|r| r.iter().map(cell_from_data).collect())
        .collect();
    Ok(RawTable { headers, rows })
}

fn cell_from_data(cell: &Data) -> Cell {
    match cell {
        Data::String(v) => Cell::Text(v.clone()),
        Data::Float(v) => Cell::Number(*v),
        Data::Int(v) => Cell::Number(*v as f64),
        Data::Bool(v) => Cell::Text(v.to_string()),
        Data::DateTime(v) => match v.as_datetime() {
            Some(dt) => Cell::DateTime(dt),
            None => Cell::Text(v.to_string()),
        },
        Data::DateTimeIso(v) => Cell::Text(v.clone()),
        Data::DurationIso(v) => Cell::Text(v.clone()),
        Data::Error(v) => Cell::Text(format!("{v:?}")),
        Data::Empty => Cell::Empty,
    }
}

fn records_from_table(
    table: &RawTable,
    opts: &LoadOptions,
) -> Result<(Vec<RawRecord>, LoadReport), LoadError> {
    let date_idx = table.column(DATE_COLUMN)?;
    let category_idx = table.column(CATEGORY_COLUMN)?;
    let slot_idx = opts
        .slots
        .iter()
        .map(|s| Ok((table.column(&s.channel)?, table.column(&s.revenue)?)))
        .collect::<Result<Vec<_>, LoadError>>()?;

    let mut report = LoadReport {
        total_rows: table.rows.len(),
        ..LoadReport::default()
    };
    let mut records = Vec::with_capacity(table.rows.len());

    for (i, row) in table.rows.iter().enumerate() {
        // Spreadsheet row number, counting the header as row 1.
        let line = i + 2;
        if row.iter().all(|c| *c == Cell::Empty) {
            report.blank_rows += 1;
            debug!(row = line, "skipping blank row");
            continue;
        }

        let date_cell = RawTable::cell(row, date_idx);
        let placed_at = match date_cell {
            Cell::DateTime(dt) => Some(*dt),
            Cell::Text(s) => parse_timestamp(s, opts.day_first),
            Cell::Empty | Cell::Number(_) => None,
        }
        .ok_or_else(|| LoadError::InvalidDate {
            row: line,
            value: date_cell.raw_text(),
        })?;

        let category = RawTable::cell(row, category_idx).raw_text();

        let slots = slot_idx
            .iter()
            .map(|&(channel_idx, revenue_idx)| {
                let revenue_cell = RawTable::cell(row, revenue_idx);
                let revenue = match revenue_cell {
                    Cell::Number(n) => Some(*n),
                    Cell::Empty => None,
                    other => {
                        let text = other.raw_text();
                        let parsed = parse_f64_safe(Some(&text));
                        if parsed.is_none() {
                            report.unparsed_revenue += 1;
                            warn!(row = line, value = %text, "revenue is not a number, treating as empty");
                        }
                        parsed
                    }
                };
                ChannelSlot {
                    channel: RawTable::cell(row, channel_idx).text(),
                    revenue,
                }
            })
            .collect();

        records.push(RawRecord {
            placed_at,
            category,
            slots,
        });
    }

    report.loaded_rows = records.len();
    Ok((records, report))
}

/// Distinct category values in first-appearance order.
pub fn products(records: &[DerivedRecord]) -> Vec<String> {
    distinct(records.iter().map(|r| r.raw.category.as_str()))
}

/// Distinct month names in first-appearance order.
pub fn months(records: &[DerivedRecord]) -> Vec<String> {
    distinct(records.iter().map(|r| r.month.as_str()))
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}
