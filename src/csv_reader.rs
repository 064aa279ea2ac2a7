use crate::data::{Cell, Table};
use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

/// Read a CSV table from stdin
pub fn read_csv_from_stdin() -> Result<Table> {
    let stdin = io::stdin();
    read_csv(stdin.lock())
}

/// Read a CSV table from a file
pub fn read_csv_from_path(path: &Path) -> Result<Table> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open '{}'", path.display()))?;
    read_csv(file).with_context(|| format!("Failed to read CSV from '{}'", path.display()))
}

/// Decode delimited text with a header row into a [`Table`].
///
/// Short rows are padded with empty cells; fields beyond the header width
/// are dropped.
pub fn read_csv<R: Read>(reader: R) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .context("Failed to read CSV header row")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.is_empty() {
        anyhow::bail!("CSV input has no header row");
    }

    let mut rows = Vec::new();
    for (row_idx, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("Failed to parse CSV row {}", row_idx + 1))?;

        if record.len() > headers.len() {
            warn!(
                "Row {} has {} fields, expected {}; extra fields dropped",
                row_idx + 1,
                record.len(),
                headers.len()
            );
        }

        let mut row: Vec<Cell> = record
            .iter()
            .take(headers.len())
            .map(Cell::from_field)
            .collect();
        row.resize(headers.len(), Cell::Empty);
        rows.push(row);
    }

    debug!("Decoded CSV table: {} columns, {} rows", headers.len(), rows.len());

    Ok(Table::new(headers, rows))
}

/// Re-serialize a table as CSV
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&table.headers)
        .context("Failed to write CSV header row")?;
    for row in &table.rows {
        wtr.write_record(row.iter().map(Cell::to_field))
            .context("Failed to write CSV row")?;
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Re-serialize a table as a CSV string
pub fn to_csv_string(table: &Table) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(table, &mut buffer)?;
    String::from_utf8(buffer).context("CSV output is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_csv_basic() {
        let input = "name,amount\nalpha,10\nbeta,2.5\n";
        let table = read_csv(input.as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["name", "amount"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][0], Cell::Text("alpha".into()));
        assert_eq!(table.rows[1][1], Cell::Number(2.5));
    }

    #[test]
    fn test_read_csv_pads_short_rows() {
        let input = "a,b,c\n1,2\n";
        let table = read_csv(input.as_bytes()).unwrap();
        assert_eq!(table.rows[0], vec![Cell::Number(1.0), Cell::Number(2.0), Cell::Empty]);
    }

    #[test]
    fn test_read_csv_empty_fields() {
        let input = "a,b\n,x\n";
        let table = read_csv(input.as_bytes()).unwrap();
        assert_eq!(table.rows[0][0], Cell::Empty);
    }

    #[test]
    fn test_read_csv_header_only() {
        let table = read_csv("a,b\n".as_bytes()).unwrap();
        assert_eq!(table.headers.len(), 2);
        assert!(table.is_empty());
    }

    #[test]
    fn test_round_trip_simple_table() {
        let input = "city,date,sales\nParis,2024-01-05,12\nOslo,2024-02-01,7.50\nRome,,3\n";
        let table = read_csv(input.as_bytes()).unwrap();
        let output = to_csv_string(&table).unwrap();
        assert_eq!(output, input);
    }
}
