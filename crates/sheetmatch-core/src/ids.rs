//! ID standardisation.
//!
//! IDs from both files are compared as strings. Numeric cells are rendered
//! without a spurious fractional part so that `42`, `42.0` and `" 42 "` all
//! compare equal.

use crate::table::CellValue;

/// Render a cell as a comparable ID.
///
/// # Examples
///
/// ```
/// use sheetmatch_core::{standardize_id, CellValue};
///
/// assert_eq!(standardize_id(&CellValue::from("  A-17 ")), "A-17");
/// assert_eq!(standardize_id(&CellValue::Float(1234.0)), "1234");
/// assert_eq!(standardize_id(&CellValue::Int(99)), "99");
/// assert_eq!(standardize_id(&CellValue::Empty), "");
/// ```
pub fn standardize_id(cell: &CellValue) -> String {
    match cell {
        CellValue::Float(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e15 => {
            format!("{}", *x as i64)
        }
        other => other.to_string().trim().to_string(),
    }
}

/// Standardise a cell into a text cell; blank IDs become [`CellValue::Empty`].
pub fn standardize_cell(cell: &CellValue) -> CellValue {
    match standardize_id(cell) {
        s if s.is_empty() => CellValue::Empty,
        s => CellValue::Text(s),
    }
}
