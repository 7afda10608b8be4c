//! End-to-end tests over real xlsx workbooks built in memory.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use rust_xlsxwriter::Workbook as XlsxWriter;
use sheetmatch_core::{
    find_duplicates, report, CompareOptions, NoProgress, NoticeLevel, SheetSelection, Workbook,
};

/// A waiting list with two sheets; IDs are numbers in the first sheet and
/// padded text in the second.
fn waiting_list_xlsx() -> Vec<u8> {
    let mut book = XlsxWriter::new();

    let sheet = book.add_worksheet();
    sheet.set_name("2023").unwrap();
    sheet.write_string(0, 0, "Applicant ID").unwrap();
    sheet.write_string(0, 1, "Name").unwrap();
    sheet.write_number(1, 0, 1001).unwrap();
    sheet.write_string(1, 1, "Ann").unwrap();
    sheet.write_number(2, 0, 1002).unwrap();
    sheet.write_string(2, 1, "Bob").unwrap();

    let sheet = book.add_worksheet();
    sheet.set_name("2024").unwrap();
    sheet.write_string(0, 0, "Applicant ID").unwrap();
    sheet.write_string(0, 1, "Name").unwrap();
    sheet.write_string(0, 2, "Priority").unwrap();
    sheet.write_string(1, 0, " 1003 ").unwrap();
    sheet.write_string(1, 1, "Cy").unwrap();
    sheet.write_string(1, 2, "high").unwrap();

    let sheet = book.add_worksheet();
    sheet.set_name("Notes").unwrap();
    sheet.write_string(0, 0, "Free text").unwrap();

    book.save_to_buffer().unwrap()
}

fn allocations_xlsx() -> Vec<u8> {
    let mut book = XlsxWriter::new();
    let sheet = book.add_worksheet();
    sheet.set_name("Allocations").unwrap();
    sheet.write_string(0, 0, "ID").unwrap();
    sheet.write_string(0, 1, "Name").unwrap();
    sheet.write_string(0, 2, "Unit").unwrap();
    sheet.write_string(1, 0, "1003").unwrap();
    sheet.write_string(1, 1, "Cy D.").unwrap();
    sheet.write_string(1, 2, "4B").unwrap();
    sheet.write_number(2, 0, 1001).unwrap();
    sheet.write_string(2, 1, "Ann A.").unwrap();
    sheet.write_string(2, 2, "2A").unwrap();
    book.save_to_buffer().unwrap()
}

#[test]
fn test_xlsx_sheet_names_and_columns() {
    let wb = Workbook::from_bytes("waiting.xlsx", waiting_list_xlsx()).unwrap();
    assert_eq!(wb.sheet_names(), vec!["2023", "2024", "Notes"]);
    assert_eq!(wb.columns("2023", 0).unwrap(), vec!["Applicant ID", "Name"]);
    assert_eq!(
        wb.columns_union(&wb.sheet_names(), 0),
        vec!["Applicant ID", "Name", "Priority", "Free text"]
    );
}

#[test]
fn test_xlsx_end_to_end_comparison() {
    let file1 = Workbook::from_bytes("waiting.xlsx", waiting_list_xlsx()).unwrap();
    let file2 = Workbook::from_bytes("allocations.xlsx", allocations_xlsx()).unwrap();

    let left = file1
        .load_selected_sheets(&SheetSelection::new(
            "Applicant ID",
            vec!["2023".into(), "2024".into(), "Notes".into()],
        ))
        .unwrap();
    assert_eq!(left.table.len(), 3);
    assert_eq!(
        left.notices
            .iter()
            .filter(|n| n.level == NoticeLevel::Warning)
            .count(),
        1
    );

    let right = file2
        .load_selected_sheets(&SheetSelection::new("ID", vec!["Allocations".into()]))
        .unwrap();

    let result = find_duplicates(&left, &right, &CompareOptions::default(), &NoProgress).unwrap();
    assert_eq!(
        result.matches.columns(),
        [
            "Applicant ID",
            "Name_File1",
            "Priority",
            "Standard_ID",
            "ID",
            "Name_File2",
            "Unit"
        ]
    );
    assert_eq!(
        result.matches.to_string_rows(),
        vec![
            vec!["1001", "Ann", "", "1001", "1001", "Ann A.", "2A"],
            vec!["1003", "Cy", "high", "1003", "1003", "Cy D.", "4B"],
        ]
    );

    let csv = String::from_utf8(report::to_csv_bytes(&result.matches).unwrap()).unwrap();
    assert!(csv.starts_with("Applicant ID,Name_File1,Priority,Standard_ID,ID,Name_File2,Unit\n"));
    assert_eq!(csv.lines().count(), 3);
}

#[test]
fn test_xlsx_open_from_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("allocations.xlsx");
    std::fs::write(&path, allocations_xlsx()).unwrap();

    let wb = Workbook::open(&path).unwrap();
    assert_eq!(wb.name(), "allocations.xlsx");
    assert_eq!(wb.sheet_names(), vec!["Allocations"]);
}
