use calamine::{Data, DataType, Reader};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One input record: column labels paired with their raw cell text, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    cells: Vec<(String, String)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<L, V>(pairs: impl IntoIterator<Item = (L, V)>) -> Self
    where
        L: Into<String>,
        V: Into<String>,
    {
        Self {
            cells: pairs
                .into_iter()
                .map(|(l, v)| (l.into(), v.into()))
                .collect(),
        }
    }

    pub fn push(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.cells.push((label.into(), value.into()));
    }

    /// Value under an exact label.
    pub fn get(&self, label: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    pub fn value_at(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(|(_, v)| v.as_str())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(l, _)| l.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.trim().is_empty())
    }
}

#[derive(Error, Debug)]
pub enum RowSourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),
    #[error("Workbook has no sheets")]
    NoSheets,
}

/// Reads comma-delimited text into rows.
///
/// The header is the first physical row containing any of `header_tokens`;
/// bank exports often put account summaries above it. Without such a row the
/// first row is the header. Columns with a blank label are dropped, as are
/// rows with no content. When a token located the header, rows whose token
/// column is blank (footers, subtotals) are skipped too.
pub fn read_csv<R: Read>(data: R, header_tokens: &[&str]) -> Result<Vec<RawRow>, RowSourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut records: Vec<Vec<String>> = Vec::new();
    for result in reader.byte_records() {
        let record = result?;
        records.push(
            record
                .iter()
                .map(|field| String::from_utf8_lossy(field).into_owned())
                .collect(),
        );
    }

    let token_header = records.iter().position(|record| {
        record
            .iter()
            .any(|cell| header_tokens.iter().any(|t| cell.contains(t)))
    });

    let (header_index, token_column) = match token_header {
        Some(idx) => {
            let column = records[idx]
                .iter()
                .position(|cell| header_tokens.iter().any(|t| cell.contains(t)));
            (idx, column)
        }
        None => match records.iter().position(|r| r.iter().any(|c| !c.trim().is_empty())) {
            Some(idx) => (idx, None),
            None => return Ok(Vec::new()),
        },
    };

    let labels: Vec<String> = records[header_index]
        .iter()
        .map(|cell| clean_label(cell))
        .collect();

    let rows = records
        .iter()
        .skip(header_index + 1)
        .filter(|record| match token_column {
            Some(col) => record.get(col).is_some_and(|v| !v.trim().is_empty()),
            None => true,
        })
        .map(|record| labeled_row(&labels, record.iter().map(String::as_str)))
        .filter(|row| !row.is_blank())
        .collect();

    Ok(rows)
}

/// Reads one sheet of a workbook (xlsx, xls, ods). `sheet` picks by name;
/// `None` means the first sheet. The first row holds the labels.
pub fn read_spreadsheet(path: &Path, sheet: Option<&str>) -> Result<Vec<RawRow>, RowSourceError> {
    let mut workbook = calamine::open_workbook_auto(path)?;

    let sheet_name = match sheet {
        Some(name) => {
            if !workbook.sheet_names().iter().any(|n| n == name) {
                return Err(RowSourceError::SheetNotFound(name.to_string()));
            }
            name.to_string()
        }
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(RowSourceError::NoSheets)?,
    };

    let range = workbook.worksheet_range(&sheet_name)?;
    let mut grid = range.rows();

    let Some(header) = grid.next() else {
        return Ok(Vec::new());
    };
    let labels: Vec<String> = header.iter().map(|c| clean_label(&cell_text(c))).collect();

    let rows = grid
        .map(|cells| {
            let texts: Vec<String> = cells.iter().map(cell_text).collect();
            labeled_row(&labels, texts.iter().map(String::as_str))
        })
        .filter(|row| !row.is_blank())
        .collect();

    Ok(rows)
}

fn clean_label(cell: &str) -> String {
    cell.trim_start_matches('\u{feff}').trim().to_string()
}

fn labeled_row<'a>(labels: &[String], values: impl Iterator<Item = &'a str>) -> RawRow {
    let mut row = RawRow::new();
    for (label, value) in labels.iter().zip(values) {
        if label.is_empty() {
            continue;
        }
        row.push(label.clone(), value.trim());
    }
    row
}

fn cell_text(cell: &Data) -> String {
    if cell.is_datetime() {
        if let Some(dt) = cell.as_datetime() {
            return dt.format("%Y-%m-%d %H:%M:%S").to_string();
        }
    }
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadKind {
    Csv,
    Spreadsheet { sheet: Option<String> },
}

/// A transient uploaded file. The file is removed when the value is dropped,
/// whichever way the import that consumed it ended.
#[derive(Debug)]
pub struct Upload {
    path: PathBuf,
    kind: UploadKind,
}

impl Upload {
    pub fn csv(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: UploadKind::Csv,
        }
    }

    pub fn spreadsheet(path: impl Into<PathBuf>, sheet: Option<String>) -> Self {
        Self {
            path: path.into(),
            kind: UploadKind::Spreadsheet { sheet },
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> &UploadKind {
        &self.kind
    }

    pub fn read_rows(&self, header_tokens: &[&str]) -> Result<Vec<RawRow>, RowSourceError> {
        match &self.kind {
            UploadKind::Csv => {
                let file = std::fs::File::open(&self.path)?;
                read_csv(std::io::BufReader::new(file), header_tokens)
            }
            UploadKind::Spreadsheet { sheet } => read_spreadsheet(&self.path, sheet.as_deref()),
        }
    }
}

impl Drop for Upload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Removed upload {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove upload {}: {e}", self.path.display()),
        }
    }
}
