//! Opening uploads and loading selected sheets.
//!
//! A [`Workbook`] is parsed eagerly from bytes: every sheet's cells are read
//! once so the workbook can be shared between requests and inspected
//! repeatedly (sheet names, headers) without touching the source again.

use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader};
use serde::{Deserialize, Serialize};

use crate::ids::standardize_cell;
use crate::table::{normalize_headers, CellValue, Table};
use crate::{Error, Result};

// ============================================================================
// SourceFormat
// ============================================================================

/// Input format, chosen from the file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// xlsx, xlsm, xlsb, xls or ods.
    Spreadsheet,
    /// Comma separated values; exposed as a single sheet.
    Csv,
}

impl SourceFormat {
    /// Detect the format of a file by its name.
    pub fn from_file_name(name: &str) -> Result<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => Ok(Self::Spreadsheet),
            Some("csv") => Ok(Self::Csv),
            _ => Err(Error::UnsupportedFormat {
                name: name.to_string(),
            }),
        }
    }
}

// ============================================================================
// Notices
// ============================================================================

/// Severity of a [`Notice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// Progress information.
    Info,
    /// Something was skipped.
    Warning,
}

/// A user-facing diagnostic produced while loading or comparing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Human-readable message.
    pub message: String,
}

impl Notice {
    /// Informational notice; also logged.
    pub fn info(message: impl Into<String>) -> Self {
        let message = message.into();
        log::info!("{message}");
        Self {
            level: NoticeLevel::Info,
            message,
        }
    }

    /// Warning notice; also logged.
    pub fn warning(message: impl Into<String>) -> Self {
        let message = message.into();
        log::warn!("{message}");
        Self {
            level: NoticeLevel::Warning,
            message,
        }
    }
}

// ============================================================================
// Selection and loaded table
// ============================================================================

/// Which sheets to load from a workbook and where the IDs are.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetSelection {
    /// Name of the ID column.
    pub id_column: String,
    /// Sheets to stack, in order.
    pub sheets: Vec<String>,
    /// Zero-based row holding the column names, counted after leading blank
    /// rows.
    #[serde(default)]
    pub header_row: usize,
}

impl SheetSelection {
    /// Selection with the header on the first row.
    pub fn new(id_column: impl Into<String>, sheets: Vec<String>) -> Self {
        Self {
            id_column: id_column.into(),
            sheets,
            header_row: 0,
        }
    }

    /// Set the header row.
    pub fn with_header_row(mut self, header_row: usize) -> Self {
        self.header_row = header_row;
        self
    }
}

/// Rows stacked from the selected sheets, with the ID column standardised.
#[derive(Clone, Debug)]
pub struct LoadedTable {
    /// The stacked rows.
    pub table: Table,
    /// Name of the ID column inside `table`.
    pub id_column: String,
    /// What happened while loading.
    pub notices: Vec<Notice>,
}

impl LoadedTable {
    /// Position of the ID column.
    pub fn id_index(&self) -> Option<usize> {
        self.table.column_index(&self.id_column)
    }
}

// ============================================================================
// Workbook
// ============================================================================

#[derive(Clone, Debug)]
struct Sheet {
    name: String,
    rows: Vec<Vec<CellValue>>,
}

/// A parsed upload.
#[derive(Clone, Debug)]
pub struct Workbook {
    name: String,
    format: SourceFormat,
    sheets: Vec<Sheet>,
}

impl Workbook {
    /// Parse a workbook from memory. `name` is the uploaded file name and
    /// selects the format.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let format = SourceFormat::from_file_name(&name)?;
        let sheets = match format {
            SourceFormat::Spreadsheet => read_spreadsheet(&name, bytes)?,
            SourceFormat::Csv => vec![read_csv(&name, &bytes)?],
        };
        log::debug!("Parsed '{name}' ({} sheets)", sheets.len());
        Ok(Self {
            name,
            format,
            sheets,
        })
    }

    /// Read and parse a workbook from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| Error::io_with_path(e, path))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        Self::from_bytes(name, bytes)
    }

    /// File name the workbook was created from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Detected format.
    pub fn format(&self) -> SourceFormat {
        self.format
    }

    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    /// Returns `true` if the workbook has a sheet with this name.
    pub fn has_sheet(&self, sheet: &str) -> bool {
        self.sheet(sheet).is_some()
    }

    fn sheet(&self, sheet: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == sheet)
    }

    /// Column names of one sheet.
    pub fn columns(&self, sheet: &str, header_row: usize) -> Result<Vec<String>> {
        Ok(self.sheet_table(sheet, header_row)?.columns().to_vec())
    }

    /// Ordered union of the column names of several sheets. Unknown sheets
    /// are ignored.
    pub fn columns_union(&self, sheets: &[String], header_row: usize) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for sheet in sheets {
            let Ok(columns) = self.columns(sheet, header_row) else {
                continue;
            };
            for column in columns {
                if !out.contains(&column) {
                    out.push(column);
                }
            }
        }
        out
    }

    /// One sheet as a table.
    ///
    /// Leading blank rows are skipped, then `header_row` more rows; the next
    /// row supplies column names. Fully blank data rows are dropped.
    pub fn sheet_table(&self, sheet: &str, header_row: usize) -> Result<Table> {
        let source = self.sheet(sheet).ok_or_else(|| Error::SheetNotFound {
            name: self.name.clone(),
            sheet: sheet.to_string(),
        })?;

        let mut rows = source
            .rows
            .iter()
            .skip_while(|row| row_is_blank(row))
            .skip(header_row);

        let Some(header) = rows.next() else {
            return Ok(Table::default());
        };
        let data: Vec<&Vec<CellValue>> = rows.filter(|row| !row_is_blank(row)).collect();

        let width = data
            .iter()
            .map(|row| row.len())
            .chain(std::iter::once(header.len()))
            .max()
            .unwrap_or(0);
        let mut raw_header = header.clone();
        raw_header.resize(width, CellValue::Empty);

        let mut table = Table::new(normalize_headers(&raw_header));
        for row in data {
            table.push_row(row.clone())?;
        }
        Ok(table)
    }

    /// Load and stack the selected sheets.
    ///
    /// Sheets that do not exist, or whose header lacks the ID column, are
    /// skipped with a warning. Fails with [`Error::NoUsableSheets`] if
    /// nothing could be loaded.
    pub fn load_selected_sheets(&self, selection: &SheetSelection) -> Result<LoadedTable> {
        if selection.sheets.is_empty() {
            return Err(Error::validation_field(
                "sheets",
                format!("no sheets selected for '{}'", self.name),
            ));
        }

        let id_column = selection.id_column.as_str();
        let mut notices = Vec::new();
        let mut tables = Vec::new();

        for sheet in &selection.sheets {
            if !self.has_sheet(sheet) {
                notices.push(Notice::warning(format!(
                    "Sheet '{sheet}' not found in '{}'. Skipping.",
                    self.name
                )));
                continue;
            }

            let mut table = self.sheet_table(sheet, selection.header_row)?;
            let Some(index) = table.column_index(id_column) else {
                notices.push(Notice::warning(format!(
                    "Column '{id_column}' not found in sheet '{sheet}'. Skipping this sheet."
                )));
                continue;
            };

            table.map_column(index, standardize_cell);
            notices.push(Notice::info(format!(
                "Loaded data from sheet '{sheet}' of '{}' with {} rows.",
                self.name,
                table.len()
            )));
            tables.push(table);
        }

        if tables.is_empty() {
            return Err(Error::NoUsableSheets {
                id_column: id_column.to_string(),
            });
        }

        Ok(LoadedTable {
            table: Table::concat(tables),
            id_column: id_column.to_string(),
            notices,
        })
    }
}

fn row_is_blank(row: &[CellValue]) -> bool {
    row.iter().all(CellValue::is_empty)
}

// ============================================================================
// Readers
// ============================================================================

fn read_spreadsheet(name: &str, bytes: Vec<u8>) -> Result<Vec<Sheet>> {
    let workbook_error = |source: calamine::Error| Error::Workbook {
        name: name.to_string(),
        source,
    };

    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(workbook_error)?;

    let mut sheets = Vec::new();
    for sheet_name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(workbook_error)?;

        // Ranges start at the first used cell; keep leading blank columns so
        // they show up as unnamed columns.
        let leading_columns = range.start().map(|(_, col)| col as usize).unwrap_or(0);
        let rows = range
            .rows()
            .map(|row| {
                let mut cells = vec![CellValue::Empty; leading_columns];
                cells.extend(row.iter().map(cell_from_data));
                cells
            })
            .collect();

        sheets.push(Sheet {
            name: sheet_name,
            rows,
        });
    }
    Ok(sheets)
}

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(x) => CellValue::Float(*x),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::DateTime(dt) if dt.is_duration() => CellValue::Float(dt.as_f64()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => CellValue::DateTime(value.to_string()),
            None => CellValue::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::DateTime(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

fn read_csv(name: &str, bytes: &[u8]) -> Result<Sheet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    // Fields are decoded lossily; non-UTF-8 bytes become U+FFFD.
    for record in reader.byte_records() {
        let record = record?;
        let row = record
            .iter()
            .map(|field| {
                let text = String::from_utf8_lossy(field);
                match text.trim_start_matches('\u{feff}') {
                    "" => CellValue::Empty,
                    s => CellValue::Text(s.to_string()),
                }
            })
            .collect();
        rows.push(row);
    }

    let sheet_name = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("Sheet1")
        .to_string();

    Ok(Sheet {
        name: sheet_name,
        rows,
    })
}

// ============================================================================
// Tests
// ============================================================================
