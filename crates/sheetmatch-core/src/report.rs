//! CSV report output.

use std::io::Write;

use crate::table::Table;
use crate::Result;

/// File name offered for the downloaded report.
pub const REPORT_FILE_NAME: &str = "duplicate_report.csv";

/// MIME type of the report.
pub const REPORT_MIME: &str = "text/csv";

/// Write a table as CSV: a header row, then one line per row. No index
/// column is written.
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(table.columns())?;
    for row in table.rows() {
        out.write_record(row.iter().map(ToString::to_string))?;
    }
    out.flush()?;
    Ok(())
}

/// Render a table as CSV bytes.
pub fn to_csv_bytes(table: &Table) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_csv(table, &mut buf)?;
    Ok(buf)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::table::CellValue;

    #[test]
    fn test_write_csv_header_and_rows() {
        let mut table = Table::new(["ID", "Name", "Score"]);
        table
            .push_row(vec![
                CellValue::from("7"),
                CellValue::from("Smith, Jo"),
                CellValue::Float(3.5),
            ])
            .unwrap();
        table.push_row(vec![CellValue::from("8")]).unwrap();

        let csv = String::from_utf8(to_csv_bytes(&table).unwrap()).unwrap();
        assert_eq!(csv, "ID,Name,Score\n7,\"Smith, Jo\",3.5\n8,,\n");
    }

    #[test]
    fn test_write_csv_empty_table_has_header_only() {
        let table = Table::new(["ID"]);
        let csv = String::from_utf8(to_csv_bytes(&table).unwrap()).unwrap();
        assert_eq!(csv, "ID\n");
    }

    #[test]
    fn test_write_csv_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(REPORT_FILE_NAME);
        let table = Table::new(["A", "B"]);
        write_csv(&table, std::fs::File::create(&path).unwrap()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "A,B\n");
    }
}
