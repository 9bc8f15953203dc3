//! Raw reference sheet: trimmed headers and nullable text cells

use crate::error::{PricingError, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Cell texts that load as null, matching what spreadsheet exports commonly carry
const NA_MARKERS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "null", "NULL", "None", "#N/A",
];

/// Normalize a raw cell: trim surrounding whitespace, map NA markers to `None`
pub fn normalize_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if NA_MARKERS.contains(&trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse a numeric cell; a trailing `%` divides by 100
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    match text.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f64>().ok().map(|v| v / 100.0),
        None => text.parse::<f64>().ok(),
    }
    .filter(|v| v.is_finite())
}

/// A named sheet of the reference workbook
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    /// Build from already-split cells; headers and cells are normalized
    pub fn new(name: &str, headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let headers = headers.into_iter().map(|h| h.trim().to_string()).collect();
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| cell.and_then(|c| normalize_cell(&c)))
                    .collect()
            })
            .collect();

        Self {
            name: name.to_string(),
            headers,
            rows,
        }
    }

    /// Load a sheet from any CSV reader (string buffer, file, network stream)
    pub fn from_reader<R: Read>(name: &str, reader: R) -> Result<Self> {
        let csv_err = |source| PricingError::Csv {
            table: name.to_string(),
            source,
        };

        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for result in csv_reader.records() {
            let record = result.map_err(csv_err)?;
            rows.push(record.iter().map(normalize_cell).collect());
        }

        log::debug!("Loaded table '{}': {} columns, {} rows", name, headers.len(), rows.len());

        Ok(Self {
            name: name.to_string(),
            headers,
            rows,
        })
    }

    /// Load a sheet from a CSV file
    pub fn from_path(name: &str, path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| PricingError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(name, file)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by exact (trimmed) header name
    pub fn column_index(&self, column: &str) -> Result<usize> {
        let column = column.trim();
        self.headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| PricingError::MissingReferenceColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// Cell text, `None` for null cells or out-of-range positions
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .and_then(|c| c.as_deref())
    }

    /// Parse a cell as a number, failing on null or non-numeric text
    pub fn number(&self, row: usize, column: usize) -> Result<f64> {
        let text = self.cell(row, column).unwrap_or("");
        parse_number(text).ok_or_else(|| PricingError::InvalidReferenceValue {
            table: self.name.clone(),
            row: row + 1,
            column: self.headers.get(column).cloned().unwrap_or_default(),
            value: text.to_string(),
            reason: "expected a number".to_string(),
        })
    }

    /// Index of the first row whose key cell equals `key_value` after trimming
    pub fn find_row(&self, key_column: usize, key_value: &str) -> Option<usize> {
        let key_value = key_value.trim();
        (0..self.rows.len()).find(|&row| self.cell(row, key_column) == Some(key_value))
    }

    /// Read `value_column` from the first row where `key_column` equals `key_value`.
    ///
    /// Raw-sheet accessor: columns are named by their literal headers and cells
    /// are parsed on every call. The engines read through `ReferenceTable`, which
    /// binds columns under a `ColumnPolicy` and validates once at load, with the
    /// same first-match rule. Zero matches is `LookupNotFound`; there is no
    /// default value.
    pub fn value_of(&self, key_column: &str, key_value: &str, value_column: &str) -> Result<f64> {
        let key_idx = self.column_index(key_column)?;
        let value_idx = self.column_index(value_column)?;

        let row = self
            .find_row(key_idx, key_value)
            .ok_or_else(|| PricingError::LookupNotFound {
                table: self.name.clone(),
                column: self.headers[key_idx].clone(),
                key: key_value.trim().to_string(),
            })?;

        self.number(row, value_idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECTORS: &str = " Sektor ,Average Relativity \n\
        Pertanian ,1.10\n\
        Perdagangan,0.95\n\
        Pertanian,2.00\n\
        Konstruksi,NA\n";

    #[test]
    fn test_headers_and_cells_are_trimmed() {
        let table = Table::from_reader("sektor", SECTORS.as_bytes()).unwrap();
        assert_eq!(table.headers(), &["Sektor".to_string(), "Average Relativity".to_string()]);
        assert_eq!(table.cell(0, 0), Some("Pertanian"));
        assert_eq!(table.cell(3, 1), None);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_value_of_first_match_wins() {
        let table = Table::from_reader("sektor", SECTORS.as_bytes()).unwrap();
        let rel = table.value_of("Sektor", "  Pertanian", "Average Relativity").unwrap();
        assert_eq!(rel, 1.10);
    }

    #[test]
    fn test_value_of_not_found_is_an_error() {
        let table = Table::from_reader("sektor", SECTORS.as_bytes()).unwrap();
        let err = table.value_of("Sektor", "Pertambangan", "Average Relativity").unwrap_err();
        assert!(matches!(err, PricingError::LookupNotFound { ref key, .. } if key == "Pertambangan"));
    }

    #[test]
    fn test_value_of_missing_column() {
        let table = Table::from_reader("sektor", SECTORS.as_bytes()).unwrap();
        let err = table.value_of("Sektor", "Pertanian", "Average NPL").unwrap_err();
        assert!(matches!(err, PricingError::MissingReferenceColumn { .. }));
        assert!(err.is_session_fatal());
    }

    #[test]
    fn test_null_value_cell_is_invalid() {
        let table = Table::from_reader("sektor", SECTORS.as_bytes()).unwrap();
        let err = table.value_of("Sektor", "Konstruksi", "Average Relativity").unwrap_err();
        assert!(matches!(err, PricingError::InvalidReferenceValue { row: 4, .. }));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("0.05"), Some(0.05));
        assert!((parse_number("5%").unwrap() - 0.05).abs() < 1e-12);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn test_normalize_cell_markers() {
        assert_eq!(normalize_cell("  "), None);
        assert_eq!(normalize_cell("NaN"), None);
        assert_eq!(normalize_cell(" Sedan "), Some("Sedan".to_string()));
    }
}
