//! Property-based tests for the duplicate finder.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::compare::{find_duplicates, CompareOptions, NoProgress};
    use crate::ids::standardize_id;
    use crate::table::{CellValue, Table};
    use crate::workbook::LoadedTable;
    use proptest::prelude::*;

    fn id_table(ids: &[u8]) -> LoadedTable {
        let mut table = Table::new(["ID", "Row"]);
        for (row, id) in ids.iter().enumerate() {
            table
                .push_row(vec![CellValue::Int(i64::from(*id)), CellValue::Int(row as i64)])
                .unwrap();
        }
        LoadedTable {
            table,
            id_column: "ID".to_string(),
            notices: vec![],
        }
    }

    proptest! {
        #[test]
        fn test_chunk_size_invariance(
            left in proptest::collection::vec(0u8..20, 0..60),
            right in proptest::collection::vec(0u8..20, 0..60),
            chunk_size in 1usize..70,
        ) {
            let file1 = id_table(&left);
            let file2 = id_table(&right);
            let whole = find_duplicates(&file1, &file2, &CompareOptions::default(), &NoProgress).unwrap();
            let chunked = find_duplicates(
                &file1,
                &file2,
                &CompareOptions::default().with_chunk_size(chunk_size),
                &NoProgress,
            )
            .unwrap();
            prop_assert_eq!(whole.matches, chunked.matches);
        }

        #[test]
        fn test_match_count_is_pair_count(
            left in proptest::collection::vec(0u8..10, 0..40),
            right in proptest::collection::vec(0u8..10, 0..40),
        ) {
            let expected: usize = left
                .iter()
                .map(|l| right.iter().filter(|r| *r == l).count())
                .sum();
            let result = find_duplicates(
                &id_table(&left),
                &id_table(&right),
                &CompareOptions::default(),
                &NoProgress,
            )
            .unwrap();
            prop_assert_eq!(result.matches.len(), expected);
        }

        #[test]
        fn test_standardize_whole_float_matches_int(n in -1_000_000i64..1_000_000) {
            prop_assert_eq!(
                standardize_id(&CellValue::Float(n as f64)),
                standardize_id(&CellValue::Int(n))
            );
        }

        #[test]
        fn test_standardize_is_trimmed(s in "\\PC*") {
            let id = standardize_id(&CellValue::Text(s));
            prop_assert_eq!(id.trim(), id.as_str());
        }
    }
}
