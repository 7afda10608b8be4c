//! The duplicate finder.
//!
//! Finds every row of File 1 whose standardised ID also appears in File 2
//! and joins it with each File 2 row carrying that ID. File 1 is walked in
//! chunks so progress can be reported and the run can be stopped between
//! chunks.

use std::collections::{HashMap, HashSet};

use crate::ids::standardize_id;
use crate::table::{CellValue, Table};
use crate::workbook::{LoadedTable, Notice};
use crate::{Error, Result};

/// Rows of File 1 examined between progress reports.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Column holding the standardised File 1 ID in the result.
pub const STANDARD_ID_COLUMN: &str = "Standard_ID";

/// Suffix for File 1 columns whose name also exists in File 2.
pub const FILE1_SUFFIX: &str = "_File1";

/// Suffix for File 2 columns whose name also exists in File 1.
pub const FILE2_SUFFIX: &str = "_File2";

// ============================================================================
// Progress
// ============================================================================

/// Receives progress while a comparison runs.
pub trait ProgressSink {
    /// Called after each chunk with the number of File 1 rows checked so far.
    fn report(&self, checked: usize, total: usize);

    /// Polled before each chunk; returning `true` aborts the run.
    fn should_stop(&self) -> bool {
        false
    }
}

/// A sink that ignores progress.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _checked: usize, _total: usize) {}
}

impl<F> ProgressSink for F
where
    F: Fn(usize, usize),
{
    fn report(&self, checked: usize, total: usize) {
        self(checked, total)
    }
}

// ============================================================================
// Options and result
// ============================================================================

/// Tuning for [`find_duplicates`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompareOptions {
    /// File 1 rows per chunk. Must be at least 1.
    pub chunk_size: usize,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl CompareOptions {
    /// Set the chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

/// Outcome of a comparison.
#[derive(Clone, Debug)]
pub struct Comparison {
    /// File 1 columns, `Standard_ID`, then File 2 columns; one row per
    /// (File 1 row, matching File 2 row) pair.
    pub matches: Table,
    /// Number of File 1 rows examined.
    pub file1_rows: usize,
    /// Number of distinct IDs in File 2.
    pub lookup_ids: usize,
    /// What happened during the run.
    pub notices: Vec<Notice>,
}

impl Comparison {
    /// Returns `true` if at least one duplicate was found.
    pub fn has_duplicates(&self) -> bool {
        !self.matches.is_empty()
    }
}

// ============================================================================
// Finder
// ============================================================================

/// Find File 1 records whose ID appears in File 2.
///
/// Blank IDs never match. The result does not depend on the chunk size.
pub fn find_duplicates(
    file1: &LoadedTable,
    file2: &LoadedTable,
    options: &CompareOptions,
    progress: &dyn ProgressSink,
) -> Result<Comparison> {
    if options.chunk_size == 0 {
        return Err(Error::validation_field("chunk_size", "must be at least 1"));
    }
    let id1 = id_index(file1)?;
    let id2 = id_index(file2)?;

    let mut notices = Vec::new();

    let mut lookup: HashMap<String, Vec<usize>> = HashMap::new();
    for (index, row) in file2.table.rows().iter().enumerate() {
        let id = standardize_id(&row[id2]);
        if !id.is_empty() {
            lookup.entry(id).or_default().push(index);
        }
    }
    notices.push(Notice::info(format!(
        "Created a lookup set with {} unique IDs from the second file.",
        lookup.len()
    )));

    // A File 1 column already named `Standard_ID` is overwritten in place.
    let existing_standard = file1.table.column_index(STANDARD_ID_COLUMN);
    let mut left_columns = file1.table.columns().to_vec();
    if existing_standard.is_none() {
        left_columns.push(STANDARD_ID_COLUMN.to_string());
    }
    let mut matches = Table::new(merged_columns(&left_columns, file2.table.columns()));

    let total = file1.table.len();
    let mut checked = 0;
    progress.report(checked, total);

    for chunk in file1.table.rows().chunks(options.chunk_size) {
        if progress.should_stop() {
            log::info!("Comparison stopped after {checked} of {total} rows");
            return Err(Error::Cancelled);
        }

        for row in chunk {
            let standard_id = standardize_id(&row[id1]);
            let Some(partners) = lookup.get(&standard_id) else {
                continue;
            };
            for &partner in partners {
                let mut cells = row.clone();
                let standard = CellValue::Text(standard_id.clone());
                match existing_standard {
                    Some(index) => cells[index] = standard,
                    None => cells.push(standard),
                }
                cells.extend(file2.table.rows()[partner].iter().cloned());
                matches.push_row(cells)?;
            }
        }

        checked += chunk.len();
        progress.report(checked, total);
        log::debug!("Processing... Checked {checked} of {total} rows from the first file.");
    }

    notices.push(if matches.is_empty() {
        Notice::info("Comparison complete! No duplicates were found.")
    } else {
        Notice::info(format!(
            "Comparison complete! Found {} duplicate records.",
            matches.len()
        ))
    });

    Ok(Comparison {
        matches,
        file1_rows: total,
        lookup_ids: lookup.len(),
        notices,
    })
}

fn id_index(loaded: &LoadedTable) -> Result<usize> {
    loaded.id_index().ok_or_else(|| Error::NoUsableSheets {
        id_column: loaded.id_column.clone(),
    })
}

/// Column names of a join: names present on both sides get the File 1 and
/// File 2 suffixes.
pub fn merged_columns(left: &[String], right: &[String]) -> Vec<String> {
    let left_set: HashSet<&str> = left.iter().map(String::as_str).collect();
    let right_set: HashSet<&str> = right.iter().map(String::as_str).collect();

    let left_names = left.iter().map(|c| {
        if right_set.contains(c.as_str()) {
            format!("{c}{FILE1_SUFFIX}")
        } else {
            c.clone()
        }
    });
    let right_names = right.iter().map(|c| {
        if left_set.contains(c.as_str()) {
            format!("{c}{FILE2_SUFFIX}")
        } else {
            c.clone()
        }
    });
    left_names.chain(right_names).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    fn loaded(columns: &[&str], id_column: &str, rows: &[&[&str]]) -> LoadedTable {
        let mut table = Table::new(columns.iter().copied());
        for row in rows {
            table
                .push_row(row.iter().map(|s| CellValue::from(*s)).collect())
                .unwrap();
        }
        LoadedTable {
            table,
            id_column: id_column.to_string(),
            notices: vec![],
        }
    }

    fn waiting_list() -> LoadedTable {
        loaded(
            &["ID", "Name"],
            "ID",
            &[&["100", "Ann"], &["101", "Bob"], &["102", "Cy"], &["", "Dee"]],
        )
    }

    fn allocations() -> LoadedTable {
        loaded(
            &["Resident ID", "Unit"],
            "Resident ID",
            &[&["102", "B-2"], &["100", "A-1"], &["100", "A-7"], &["", "Z-9"]],
        )
    }

    #[test]
    fn test_finds_matches_in_file1_order() {
        let result = find_duplicates(
            &waiting_list(),
            &allocations(),
            &CompareOptions::default(),
            &NoProgress,
        )
        .unwrap();

        assert_eq!(
            result.matches.columns(),
            ["ID", "Name", "Standard_ID", "Resident ID", "Unit"]
        );
        assert_eq!(
            result.matches.to_string_rows(),
            vec![
                vec!["100", "Ann", "100", "100", "A-1"],
                vec!["100", "Ann", "100", "100", "A-7"],
                vec!["102", "Cy", "102", "102", "B-2"],
            ]
        );
        assert_eq!(result.file1_rows, 4);
        assert_eq!(result.lookup_ids, 2);
        assert!(result.has_duplicates());
    }

    #[test]
    fn test_blank_ids_never_match() {
        let file1 = loaded(&["ID"], "ID", &[&[""], &["  "]]);
        let file2 = loaded(&["ID"], "ID", &[&[""]]);
        let result =
            find_duplicates(&file1, &file2, &CompareOptions::default(), &NoProgress).unwrap();
        assert!(!result.has_duplicates());
        assert_eq!(
            result.notices.last().unwrap().message,
            "Comparison complete! No duplicates were found."
        );
    }

    #[test]
    fn test_overlapping_columns_are_suffixed() {
        let file1 = loaded(&["ID", "Name"], "ID", &[&["1", "Ann"]]);
        let file2 = loaded(&["ID", "Name", "Unit"], "ID", &[&["1", "Ann B.", "C-3"]]);
        let result =
            find_duplicates(&file1, &file2, &CompareOptions::default(), &NoProgress).unwrap();
        assert_eq!(
            result.matches.columns(),
            ["ID_File1", "Name_File1", "Standard_ID", "ID_File2", "Name_File2", "Unit"]
        );
        assert_eq!(
            result.notices.last().unwrap().message,
            "Comparison complete! Found 1 duplicate records."
        );
    }

    #[test]
    fn test_existing_standard_id_column_is_overwritten() {
        let file1 = loaded(
            &["ID", "Standard_ID", "Name"],
            "ID",
            &[&[" 7 ", "stale", "Ann"], &["8", "8", "Bob"]],
        );
        let file2 = loaded(&["Key"], "Key", &[&["7"]]);
        let result =
            find_duplicates(&file1, &file2, &CompareOptions::default(), &NoProgress).unwrap();

        assert_eq!(result.matches.columns(), ["ID", "Standard_ID", "Name", "Key"]);
        assert_eq!(
            result.matches.to_string_rows(),
            vec![vec![" 7 ", "7", "Ann", "7"]]
        );
        let unique: HashSet<&String> = result.matches.columns().iter().collect();
        assert_eq!(unique.len(), result.matches.columns().len());
    }

    #[test]
    fn test_chunk_size_does_not_change_result() {
        let expected = find_duplicates(
            &waiting_list(),
            &allocations(),
            &CompareOptions::default(),
            &NoProgress,
        )
        .unwrap();
        for chunk_size in 1..=5 {
            let result = find_duplicates(
                &waiting_list(),
                &allocations(),
                &CompareOptions::default().with_chunk_size(chunk_size),
                &NoProgress,
            )
            .unwrap();
            assert_eq!(result.matches, expected.matches);
        }
    }

    #[test]
    fn test_progress_reaches_total() {
        let reports = RefCell::new(Vec::new());
        let sink = |checked: usize, total: usize| reports.borrow_mut().push((checked, total));
        find_duplicates(
            &waiting_list(),
            &allocations(),
            &CompareOptions::default().with_chunk_size(3),
            &sink,
        )
        .unwrap();
        assert_eq!(*reports.borrow(), vec![(0, 4), (3, 4), (4, 4)]);
    }

    struct StopAfter {
        chunks: Cell<usize>,
    }

    impl ProgressSink for StopAfter {
        fn report(&self, _checked: usize, _total: usize) {}

        fn should_stop(&self) -> bool {
            let remaining = self.chunks.get();
            if remaining == 0 {
                return true;
            }
            self.chunks.set(remaining - 1);
            false
        }
    }

    #[test]
    fn test_stop_between_chunks() {
        let sink = StopAfter {
            chunks: Cell::new(1),
        };
        let err = find_duplicates(
            &waiting_list(),
            &allocations(),
            &CompareOptions::default().with_chunk_size(2),
            &sink,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let err = find_duplicates(
            &waiting_list(),
            &allocations(),
            &CompareOptions::default().with_chunk_size(0),
            &NoProgress,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_missing_id_column_is_error() {
        let mut file1 = waiting_list();
        file1.id_column = "Nope".into();
        let err =
            find_duplicates(&file1, &allocations(), &CompareOptions::default(), &NoProgress)
                .unwrap_err();
        assert!(matches!(err, Error::NoUsableSheets { .. }));
    }

    #[test]
    fn test_merged_columns_no_overlap() {
        let left = vec!["a".to_string()];
        let right = vec!["b".to_string()];
        assert_eq!(merged_columns(&left, &right), vec!["a", "b"]);
    }
}
