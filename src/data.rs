use anyhow::{anyhow, Result};
use serde_json::Value;
use std::fmt;

/// A single table cell, typed once at ingestion.
///
/// The decoder's typing is a hint only: numeric-ness is always re-validated
/// through [`Cell::as_number`], so a `Text("1.50")` cell still aggregates as 1.5.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Classify a raw delimited-text field.
    ///
    /// A field only becomes `Number` when the parsed value renders back to the
    /// exact same text, so re-serializing the table never rewrites a field.
    pub fn from_field(raw: &str) -> Self {
        if raw.is_empty() {
            return Cell::Empty;
        }
        match raw.parse::<f64>() {
            Ok(n) if n.is_finite() && n.to_string() == raw => Cell::Number(n),
            _ => Cell::Text(raw.to_string()),
        }
    }

    /// Convert a JSON value into a cell
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Cell::Empty),
            Value::String(s) if s.is_empty() => Ok(Cell::Empty),
            Value::String(s) => Ok(Cell::Text(s.clone())),
            Value::Number(n) => n
                .as_f64()
                .map(Cell::Number)
                .ok_or_else(|| anyhow!("Number '{}' is not representable as f64", n)),
            Value::Bool(b) => Ok(Cell::Text(b.to_string())),
            _ => Err(anyhow!("Unsupported value type: {}", value)),
        }
    }

    /// The finite number this cell holds, if any
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Empty => None,
            Cell::Number(n) => n.is_finite().then_some(*n),
            Cell::Text(s) => parse_finite(s),
        }
    }

    /// Empty, or convertible to a finite number
    pub fn is_numeric_compatible(&self) -> bool {
        matches!(self, Cell::Empty) || self.as_number().is_some()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Text used when writing the cell back out as a delimited field
    pub fn to_field(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.clone(),
        }
    }
}

/// Category label rendering: empty cells become the literal `null`.
impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => f.write_str("null"),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// Parse trimmed text as a finite f64 ("inf" and "NaN" are rejected)
pub fn parse_finite(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// An in-memory table: ordered column names plus rows sharing that column set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { headers, rows }
    }

    /// Create a Table from a JSON Array of Objects
    pub fn from_json(value: &Value) -> Result<Self> {
        let array = value
            .as_array()
            .ok_or_else(|| anyhow!("Input data must be a JSON array of objects"))?;

        if array.is_empty() {
            return Err(anyhow!("Input data array is empty"));
        }

        // Extract headers from the first object
        let first_obj = array[0]
            .as_object()
            .ok_or_else(|| anyhow!("Items in array must be objects"))?;

        let headers: Vec<String> = first_obj.keys().cloned().collect();

        let mut rows = Vec::with_capacity(array.len());
        for (idx, item) in array.iter().enumerate() {
            let obj = item
                .as_object()
                .ok_or_else(|| anyhow!("Item {} in array is not an object", idx))?;

            let mut row = Vec::with_capacity(headers.len());
            for header in &headers {
                let cell = match obj.get(header) {
                    Some(v) => Cell::from_json(v)
                        .map_err(|e| anyhow!("Field '{}' in item {}: {}", header, idx, e))?,
                    None => Cell::Empty,
                };
                row.push(cell);
            }
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cells of one column in row order; `None` when the column does not exist
    pub fn column<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a Cell> + 'a> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row.get(idx).unwrap_or(&Cell::Empty)))
    }
}
