//! In-memory tables.
//!
//! A [`Table`] is an ordered list of column names plus rows of [`CellValue`]s.
//! Every row holds exactly one cell per column; short rows are padded with
//! [`CellValue::Empty`] when pushed.

use std::collections::HashMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::{Error, Result};

// ============================================================================
// CellValue
// ============================================================================

/// A single spreadsheet cell.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    /// No value.
    Empty,
    /// Boolean cell.
    Bool(bool),
    /// Integer cell.
    Int(i64),
    /// Floating point cell.
    Float(f64),
    /// Text cell.
    Text(String),
    /// Date or time, already rendered as text.
    DateTime(String),
}

impl CellValue {
    /// Returns `true` for [`CellValue::Empty`] and for blank text.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) | Self::DateTime(s) => f.write_str(s),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for CellValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

// ============================================================================
// Header normalisation
// ============================================================================

/// Turn a raw header row into unique column names.
///
/// Blank cells become `Unnamed: {index}`. Repeated names get `.1`, `.2`, ...
/// suffixes; the first occurrence keeps its name.
pub fn normalize_headers(raw: &[CellValue]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(raw.len());

    for (index, cell) in raw.iter().enumerate() {
        let base = match cell {
            c if c.is_empty() => format!("Unnamed: {index}"),
            c => c.to_string().trim().to_string(),
        };

        let mut name = base.clone();
        while let Some(count) = seen.get_mut(&name) {
            *count += 1;
            name = format!("{base}.{count}");
        }
        seen.insert(name.clone(), 0);
        names.push(name);
    }

    names
}

// ============================================================================
// Table
// ============================================================================

/// Ordered columns plus rows of cells.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Create an empty table with the given columns.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows.
    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a row, padding it with empty cells up to the column count.
    ///
    /// Rows wider than the table are rejected.
    pub fn push_row(&mut self, mut row: Vec<CellValue>) -> Result<()> {
        if row.len() > self.columns.len() {
            return Err(Error::validation(format!(
                "row has {} cells but the table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        row.resize(self.columns.len(), CellValue::Empty);
        self.rows.push(row);
        Ok(())
    }

    /// Replace every cell of one column using `f`.
    pub fn map_column<F>(&mut self, index: usize, mut f: F)
    where
        F: FnMut(&CellValue) -> CellValue,
    {
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(index) {
                *cell = f(cell);
            }
        }
    }

    /// Stack several tables.
    ///
    /// The result's columns are the ordered union of the inputs' columns in
    /// first-seen order; cells a source table does not have are empty.
    pub fn concat(tables: Vec<Table>) -> Table {
        let mut columns: Vec<String> = Vec::new();
        for table in &tables {
            for column in &table.columns {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }

        let mut out = Table::new(columns);
        for table in tables {
            let mapping: Vec<usize> = table
                .columns
                .iter()
                .filter_map(|c| out.column_index(c))
                .collect();
            for row in table.rows {
                let mut cells = vec![CellValue::Empty; out.columns.len()];
                for (cell, &target) in row.into_iter().zip(&mapping) {
                    cells[target] = cell;
                }
                out.rows.push(cells);
            }
        }
        out
    }

    /// Rows rendered as display strings, for JSON output.
    pub fn to_string_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_display() {
        assert_eq!(CellValue::Empty.to_string(), "");
        assert_eq!(CellValue::Int(42).to_string(), "42");
        assert_eq!(CellValue::Float(42.0).to_string(), "42");
        assert_eq!(CellValue::Float(2.5).to_string(), "2.5");
        assert_eq!(CellValue::Bool(true).to_string(), "True");
        assert_eq!(CellValue::from("abc").to_string(), "abc");
    }

    #[test]
    fn test_cell_is_empty() {
        assert!(CellValue::Empty.is_empty());
        assert!(CellValue::from("   ").is_empty());
        assert!(!CellValue::Int(0).is_empty());
    }

    #[test]
    fn test_normalize_headers_blank_and_duplicates() {
        let raw = vec![
            CellValue::from("ID"),
            CellValue::Empty,
            CellValue::from("Name"),
            CellValue::from("ID"),
            CellValue::from(" ID "),
        ];
        assert_eq!(
            normalize_headers(&raw),
            vec!["ID", "Unnamed: 1", "Name", "ID.1", "ID.2"]
        );
    }

    #[test]
    fn test_push_row_pads_short_rows() {
        let mut table = Table::new(["a", "b", "c"]);
        table.push_row(vec![CellValue::Int(1)]).unwrap();
        assert_eq!(
            table.rows()[0],
            vec![CellValue::Int(1), CellValue::Empty, CellValue::Empty]
        );
    }

    #[test]
    fn test_push_row_rejects_wide_rows() {
        let mut table = Table::new(["a"]);
        let result = table.push_row(vec![CellValue::Int(1), CellValue::Int(2)]);
        assert!(result.is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn test_concat_unions_columns() {
        let mut first = Table::new(["ID", "Name"]);
        first
            .push_row(vec![CellValue::from("1"), CellValue::from("Ann")])
            .unwrap();
        let mut second = Table::new(["Phone", "ID"]);
        second
            .push_row(vec![CellValue::from("555"), CellValue::from("2")])
            .unwrap();

        let combined = Table::concat(vec![first, second]);
        assert_eq!(combined.columns(), ["ID", "Name", "Phone"]);
        assert_eq!(
            combined.to_string_rows(),
            vec![vec!["1", "Ann", ""], vec!["2", "", "555"]]
        );
    }

    #[test]
    fn test_map_column() {
        let mut table = Table::new(["ID"]);
        table.push_row(vec![CellValue::from(" 7 ")]).unwrap();
        table.map_column(0, |c| CellValue::Text(c.to_string().trim().to_string()));
        assert_eq!(table.rows()[0][0], CellValue::from("7"));
    }
}
