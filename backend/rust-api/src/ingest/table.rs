use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{NaiveDateTime, NaiveTime};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use crate::error::IngestError;

/// Tabular encodings accepted for uploads, picked by file name suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Spreadsheet,
}

impl FileFormat {
    pub fn from_file_name(file_name: &str) -> Result<Self, IngestError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Ok(FileFormat::Csv),
            "xlsx" | "xls" | "xlsm" | "ods" => Ok(FileFormat::Spreadsheet),
            _ => Err(IngestError::UnsupportedFormat(file_name.to_string())),
        }
    }
}

/// One decoded cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    /// Null or whitespace-only
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            CellValue::Number(value) => value.is_nan(),
            CellValue::Bool(_) | CellValue::Date(_) => false,
        }
    }

    /// Trimmed textual form. Whole numbers print without a fractional part so
    /// that roll numbers or phone numbers typed into numeric cells survive.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(text) => text.trim().to_string(),
            CellValue::Number(value) => format_number(*value),
            CellValue::Bool(value) => value.to_string(),
            CellValue::Date(value) if value.time() == NaiveTime::MIN => {
                value.format("%Y-%m-%d").to_string()
            }
            CellValue::Date(value) => value.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Numeric reading of the cell: numeric cells as-is, text parsed as a
    /// decimal number. Anything else has no numeric value.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(value) if value.is_finite() => Some(*value),
            CellValue::Text(text) => text.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// One data row, addressed by column name
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// Zero-based position among the data rows of the file
    pub index: usize,
    cells: HashMap<String, CellValue>,
}

impl RawRow {
    pub fn new(index: usize, cells: HashMap<String, CellValue>) -> Self {
        Self { index, cells }
    }

    /// Cell of `column`, or an empty cell when the row has none
    pub fn get(&self, column: &str) -> &CellValue {
        self.cells.get(column).unwrap_or(&EMPTY_CELL)
    }

    fn is_blank(&self) -> bool {
        self.cells.values().all(CellValue::is_blank)
    }
}

/// Fully buffered decoded upload: header plus data rows in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl Table {
    pub fn decode(format: FileFormat, bytes: &[u8]) -> Result<Self, IngestError> {
        match format {
            FileFormat::Csv => Self::from_csv(bytes),
            FileFormat::Spreadsheet => Self::from_spreadsheet(bytes),
        }
    }

    fn from_csv(bytes: &[u8]) -> Result<Self, IngestError> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(bytes);

        let header = reader
            .headers()
            .map_err(|e| IngestError::UnreadableFile(e.to_string()))?
            .iter()
            .map(|name| name.trim().to_string())
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| IngestError::UnreadableFile(e.to_string()))?;
            rows.push(
                record
                    .iter()
                    .map(|field| {
                        if field.is_empty() {
                            CellValue::Empty
                        } else {
                            CellValue::Text(field.to_string())
                        }
                    })
                    .collect(),
            );
        }

        Ok(Self::from_rows(header, rows))
    }

    fn from_spreadsheet(bytes: &[u8]) -> Result<Self, IngestError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| IngestError::UnreadableFile(e.to_string()))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| IngestError::UnreadableFile("workbook has no worksheets".into()))?
            .map_err(|e| IngestError::UnreadableFile(e.to_string()))?;

        let mut sheet_rows = range.rows();
        let header = match sheet_rows.next() {
            Some(cells) => cells
                .iter()
                .map(|cell| cell_from_data(cell).to_text())
                .collect::<Vec<_>>(),
            None => return Ok(Table::default()),
        };

        let rows = sheet_rows
            .map(|cells| cells.iter().map(cell_from_data).collect())
            .collect();

        Ok(Self::from_rows(header, rows))
    }

    fn from_rows(header: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let mut decoded = rows
            .into_iter()
            .enumerate()
            .map(|(index, cells)| {
                let cells = header
                    .iter()
                    .zip(cells)
                    .filter(|(name, _)| !name.is_empty())
                    .map(|(name, cell)| (name.clone(), cell))
                    .collect();
                RawRow::new(index, cells)
            })
            .collect::<Vec<_>>();

        // Spreadsheets often carry formatted but empty rows after the data
        while decoded.last().is_some_and(RawRow::is_blank) {
            decoded.pop();
        }

        Table {
            columns: header.into_iter().filter(|name| !name.is_empty()).collect(),
            rows: decoded,
        }
    }
}

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(text) if text.is_empty() => CellValue::Empty,
        Data::String(text) | Data::DateTimeIso(text) | Data::DurationIso(text) => {
            CellValue::Text(text.clone())
        }
        Data::Float(value) => CellValue::Number(*value),
        Data::Int(value) => CellValue::Number(*value as f64),
        Data::Bool(value) => CellValue::Bool(*value),
        Data::DateTime(value) => value
            .as_datetime()
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::Number(value.as_f64())),
    }
}
