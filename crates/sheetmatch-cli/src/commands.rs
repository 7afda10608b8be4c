//! Command handlers for `serve`, `sheets` and `compare`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use sheetmatch_api::Server;
use sheetmatch_core::{
    find_duplicates, write_csv, CompareOptions, Comparison, Error as CoreError, NoticeLevel,
    SheetSelection, SheetmatchConfig, Workbook,
};

use crate::cli::CompareArgs;
use crate::{Error, Result};

/// Output value meaning "write the report to stdout".
pub const STDOUT_TARGET: &str = "-";

// ============================================================================
// serve
// ============================================================================

/// Start the web UI, with optional bind overrides.
pub async fn serve(
    mut config: SheetmatchConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    Server::new(config)?.run().await?;
    Ok(())
}

// ============================================================================
// sheets
// ============================================================================

/// Sheet names of a workbook with the columns of each.
pub fn describe_workbook(path: &Path, header_row: usize) -> Result<Vec<(String, Vec<String>)>> {
    let workbook = Workbook::open(path)?;
    workbook
        .sheet_names()
        .into_iter()
        .map(|sheet| {
            let columns = workbook.columns(&sheet, header_row)?;
            Ok((sheet, columns))
        })
        .collect()
}

/// Print sheets and columns.
pub fn sheets(config: &SheetmatchConfig, file: &Path, header_row: Option<usize>) -> Result<()> {
    let header_row = header_row.unwrap_or(config.compare.header_row);
    for (sheet, columns) in describe_workbook(file, header_row)? {
        println!("{sheet}");
        for column in columns {
            println!("  {column}");
        }
    }
    Ok(())
}

// ============================================================================
// compare
// ============================================================================

/// What `compare` produced.
#[derive(Debug)]
pub struct CompareOutcome {
    /// The comparison itself.
    pub comparison: Comparison,
    /// Where the report went; `None` when nothing was written.
    pub report: Option<String>,
}

/// Resolve the selection for one file, applying the sheet and ID defaults.
fn selection(
    workbook: &Workbook,
    sheets: &[String],
    id_column: Option<&str>,
    all_by_default: bool,
    header_row: usize,
) -> Result<SheetSelection> {
    let available = workbook.sheet_names();
    let sheets: Vec<String> = if !sheets.is_empty() {
        sheets.to_vec()
    } else if all_by_default {
        available
    } else {
        available.into_iter().take(1).collect()
    };
    let Some(first) = sheets.first() else {
        return Err(Error::Usage(format!(
            "'{}' has no sheets to compare",
            workbook.name()
        )));
    };

    let id_column = match id_column {
        Some(column) => column.to_string(),
        None => workbook
            .columns(first, header_row)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::Usage(format!(
                    "Sheet '{first}' of '{}' has no columns; pass the ID column explicitly",
                    workbook.name()
                ))
            })?,
    };
    tracing::debug!(file = workbook.name(), %id_column, ?sheets, "Resolved selection");

    Ok(SheetSelection::new(id_column, sheets).with_header_row(header_row))
}

/// Run a comparison between two files on disk and write the report.
pub fn run_compare(config: &SheetmatchConfig, args: &CompareArgs) -> Result<CompareOutcome> {
    let header_row = args.header_row.unwrap_or(config.compare.header_row);
    let options =
        CompareOptions::default().with_chunk_size(args.chunk_size.unwrap_or(config.compare.chunk_size));

    let workbook1 = Workbook::open(&args.file1)?;
    let workbook2 = Workbook::open(&args.file2)?;
    let selection1 = selection(&workbook1, &args.sheets1, args.id1.as_deref(), false, header_row)?;
    let selection2 = selection(&workbook2, &args.sheets2, args.id2.as_deref(), true, header_row)?;

    let file1 = workbook1.load_selected_sheets(&selection1)?;
    let file2 = workbook2.load_selected_sheets(&selection2)?;

    let progress = |checked: usize, total: usize| {
        tracing::debug!(checked, total, "Comparing");
    };
    let mut comparison = find_duplicates(&file1, &file2, &options, &progress)?;

    let mut notices = file1.notices;
    notices.extend(file2.notices);
    notices.append(&mut comparison.notices);
    comparison.notices = notices;

    let report = if comparison.has_duplicates() {
        write_report(&comparison, &args.output)?;
        Some(args.output.clone())
    } else {
        None
    };

    Ok(CompareOutcome { comparison, report })
}

fn write_report(comparison: &Comparison, output: &str) -> Result<()> {
    if output == STDOUT_TARGET {
        let stdout = std::io::stdout();
        write_csv(&comparison.matches, stdout.lock())?;
        return Ok(());
    }

    let path = PathBuf::from(output);
    let file = File::create(&path).map_err(|e| CoreError::io_with_path(e, &path))?;
    let mut writer = BufWriter::new(file);
    write_csv(&comparison.matches, &mut writer)?;
    writer
        .flush()
        .map_err(|e| CoreError::io_with_path(e, &path))?;
    tracing::info!(path = %path.display(), rows = comparison.matches.len(), "Report written");
    Ok(())
}

/// `sheetmatch compare`: run, then print notices and a summary on stderr.
pub fn compare(config: &SheetmatchConfig, args: &CompareArgs) -> Result<()> {
    let outcome = run_compare(config, args)?;

    for notice in &outcome.comparison.notices {
        match notice.level {
            NoticeLevel::Info => eprintln!("{}", notice.message),
            NoticeLevel::Warning => eprintln!("warning: {}", notice.message),
        }
    }

    let found = outcome.comparison.matches.len();
    match outcome.report {
        Some(target) if target == STDOUT_TARGET => {}
        Some(target) => eprintln!("{found} duplicate record(s) written to {target}"),
        None => eprintln!(
            "Checked {} record(s); no report written",
            outcome.comparison.file1_rows
        ),
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn args(file1: PathBuf, file2: PathBuf, output: PathBuf) -> CompareArgs {
        CompareArgs {
            file1,
            file2,
            id1: None,
            id2: None,
            sheets1: Vec::new(),
            sheets2: Vec::new(),
            chunk_size: None,
            header_row: None,
            output: output.to_str().unwrap().to_string(),
        }
    }

    #[test]
    fn test_describe_csv_workbook() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write(dir.path(), "waiting.csv", "Applicant ID,Name\n1,Ann\n");

        let sheets = describe_workbook(&path, 0).unwrap();
        assert_eq!(
            sheets,
            vec![(
                "waiting".to_string(),
                vec!["Applicant ID".to_string(), "Name".to_string()]
            )]
        );
    }

    #[test]
    fn test_run_compare_defaults_to_first_columns() {
        let dir = tempfile::TempDir::new().unwrap();
        let file1 = write(
            dir.path(),
            "waiting.csv",
            "Applicant ID,Name\n1001,Ann\n1002,Bo\n1003,Cy\n",
        );
        let file2 = write(dir.path(), "allocations.csv", "ID,Unit\n1003,4B\n1001,2A\n");
        let output = dir.path().join("report.csv");

        let outcome = run_compare(
            &SheetmatchConfig::default(),
            &args(file1, file2, output.clone()),
        )
        .unwrap();

        assert_eq!(outcome.comparison.matches.len(), 2);
        assert!(outcome.report.is_some());
        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(
            written,
            "Applicant ID,Name,Standard_ID,ID,Unit\n1001,Ann,1001,1001,2A\n1003,Cy,1003,1003,4B\n"
        );
    }

    #[test]
    fn test_run_compare_no_duplicates_writes_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let file1 = write(dir.path(), "a.csv", "ID,Name\n1,Ann\n");
        let file2 = write(dir.path(), "b.csv", "ID,Unit\n2,4B\n");
        let output = dir.path().join("report.csv");

        let outcome = run_compare(
            &SheetmatchConfig::default(),
            &args(file1, file2, output.clone()),
        )
        .unwrap();

        assert!(!outcome.comparison.has_duplicates());
        assert!(outcome.report.is_none());
        assert!(!output.exists());
        let last = outcome.comparison.notices.last().unwrap();
        assert_eq!(last.message, "Comparison complete! No duplicates were found.");
    }

    #[test]
    fn test_run_compare_missing_id_column() {
        let dir = tempfile::TempDir::new().unwrap();
        let file1 = write(dir.path(), "a.csv", "ID,Name\n1,Ann\n");
        let file2 = write(dir.path(), "b.csv", "ID,Unit\n1,4B\n");
        let mut compare_args = args(file1, file2, dir.path().join("report.csv"));
        compare_args.id1 = Some("Missing".to_string());

        let err = run_compare(&SheetmatchConfig::default(), &compare_args).unwrap_err();
        assert!(err.to_string().contains("ID column 'Missing' not found"));
    }

    #[test]
    fn test_run_compare_unknown_sheet_is_skipped_with_warning() {
        let dir = tempfile::TempDir::new().unwrap();
        let file1 = write(dir.path(), "a.csv", "ID,Name\n1,Ann\n");
        let file2 = write(dir.path(), "b.csv", "ID,Unit\n1,4B\n");
        let mut compare_args = args(file1, file2, dir.path().join("report.csv"));
        compare_args.sheets2 = vec!["b".to_string(), "Other".to_string()];

        let outcome = run_compare(&SheetmatchConfig::default(), &compare_args).unwrap();
        assert_eq!(outcome.comparison.matches.len(), 1);
        assert!(outcome
            .comparison
            .notices
            .iter()
            .any(|n| n.level == NoticeLevel::Warning
                && n.message == "Sheet 'Other' not found in 'b.csv'. Skipping."));
    }

    #[test]
    fn test_run_compare_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let compare_args = args(
            dir.path().join("nope.csv"),
            dir.path().join("nope2.csv"),
            dir.path().join("report.csv"),
        );
        assert!(run_compare(&SheetmatchConfig::default(), &compare_args).is_err());
    }
}
