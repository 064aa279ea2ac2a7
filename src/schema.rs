use crate::data::Table;
use crate::dates::parse_date;
use serde::Serialize;

/// Rows inspected by [`detect_date_column`]
pub const DATE_SAMPLE_ROWS: usize = 200;

/// Parse rate above which a column is reported as a date column
pub const DATE_PARSE_THRESHOLD: f64 = 0.6;

/// Advisory result of sampling a column for calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateHint {
    pub is_date: bool,
    pub parse_rate: f64,
}

/// Per-column classification, as reported by `gramreport inspect`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub name: String,
    pub numeric: bool,
    pub date: DateHint,
}

/// Columns in which every cell is empty or a finite number, in header order
pub fn numeric_columns(table: &Table) -> Vec<String> {
    table
        .headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| {
            table
                .rows
                .iter()
                .all(|row| row.get(*idx).map_or(true, |cell| cell.is_numeric_compatible()))
        })
        .map(|(_, name)| name.clone())
        .collect()
}

/// Sample the first rows of a column and estimate whether it holds dates.
///
/// An unknown column or an empty table yields `parse_rate = 0, is_date = false`.
pub fn detect_date_column(table: &Table, column: &str) -> DateHint {
    let Some(cells) = table.column(column) else {
        return DateHint { is_date: false, parse_rate: 0.0 };
    };

    let mut sampled = 0usize;
    let mut parsed = 0usize;
    for cell in cells.take(DATE_SAMPLE_ROWS) {
        sampled += 1;
        if parse_date(cell).is_some() {
            parsed += 1;
        }
    }

    if sampled == 0 {
        return DateHint { is_date: false, parse_rate: 0.0 };
    }

    let parse_rate = parsed as f64 / sampled as f64;
    DateHint {
        is_date: parse_rate > DATE_PARSE_THRESHOLD,
        parse_rate,
    }
}

/// Classify every column of the table
pub fn inspect(table: &Table) -> Vec<ColumnInfo> {
    let numeric = numeric_columns(table);
    table
        .headers
        .iter()
        .map(|name| ColumnInfo {
            name: name.clone(),
            numeric: numeric.contains(name),
            date: detect_date_column(table, name),
        })
        .collect()
}

/// Case-insensitive substring filter over column names
pub fn filter_headers<'a>(headers: &'a [String], query: &str) -> Vec<&'a str> {
    let query = query.to_lowercase();
    headers
        .iter()
        .filter(|h| h.to_lowercase().contains(&query))
        .map(|h| h.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Cell;

    fn make_table() -> Table {
        Table::new(
            vec!["name".into(), "amount".into(), "when".into()],
            vec![
                vec![Cell::Text("a".into()), Cell::Number(1.0), Cell::Text("2024-01-01".into())],
                vec![Cell::Text("b".into()), Cell::Empty, Cell::Text("2024-02-01".into())],
                vec![Cell::Text("c".into()), Cell::Text("2.50".into()), Cell::Text("soon".into())],
            ],
        )
    }

    #[test]
    fn test_numeric_columns() {
        let table = make_table();
        assert_eq!(numeric_columns(&table), vec!["amount".to_string()]);
    }

    #[test]
    fn test_numeric_columns_empty_table() {
        let table = Table::new(vec!["x".into()], vec![]);
        assert_eq!(numeric_columns(&table), vec!["x".to_string()]);
    }

    #[test]
    fn test_detect_date_column() {
        let table = make_table();
        let hint = detect_date_column(&table, "when");
        assert!((hint.parse_rate - 2.0 / 3.0).abs() < 1e-12);
        assert!(hint.is_date);

        let hint = detect_date_column(&table, "name");
        assert_eq!(hint.parse_rate, 0.0);
        assert!(!hint.is_date);
    }

    #[test]
    fn test_detect_date_column_no_rows() {
        let table = Table::new(vec!["when".into()], vec![]);
        assert_eq!(
            detect_date_column(&table, "when"),
            DateHint { is_date: false, parse_rate: 0.0 }
        );
        assert!(!detect_date_column(&make_table(), "missing").is_date);
    }

    #[test]
    fn test_detect_date_column_samples_first_rows() {
        let mut rows = vec![vec![Cell::Text("2020-01-01".into())]; DATE_SAMPLE_ROWS];
        rows.extend(vec![vec![Cell::Text("junk".into())]; 500]);
        let table = Table::new(vec!["d".into()], rows);
        let hint = detect_date_column(&table, "d");
        assert_eq!(hint.parse_rate, 1.0);
    }

    #[test]
    fn test_exactly_threshold_is_not_date() {
        let mut rows = vec![vec![Cell::Text("2020-01-01".into())]; 3];
        rows.extend(vec![vec![Cell::Text("x".into())]; 2]);
        let table = Table::new(vec!["d".into()], rows);
        let hint = detect_date_column(&table, "d");
        assert!((hint.parse_rate - 0.6).abs() < 1e-12);
        assert!(!hint.is_date);
    }

    #[test]
    fn test_filter_headers() {
        let headers = vec!["Region".to_string(), "Sales".to_string(), "region_code".to_string()];
        assert_eq!(filter_headers(&headers, "REG"), vec!["Region", "region_code"]);
        assert_eq!(filter_headers(&headers, ""), vec!["Region", "Sales", "region_code"]);
    }
}
