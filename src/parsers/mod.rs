//! CSV input parsing and validation.
//!
//! Loads the mapping CSV and the data CSV into `CsvTable`s, classifies the
//! mapping against the canonical field keys, checks that the data headers
//! agree with the mapping, and re-keys each data row as a `CanonicalRow`.

pub mod entity_mapper;
pub mod header_mapping;
pub mod row_validator;

use std::path::{Path, PathBuf};

use crate::errors::AppError;

/// Header row plus value rows of a CSV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    pub file_path: Option<PathBuf>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Parse CSV bytes into a header row and value rows.
pub fn parse_csv_table(data: &[u8]) -> Result<CsvTable, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::Validation(format!("Invalid CSV headers: {e}")))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|v| v.to_string()).collect());
    }

    Ok(CsvTable {
        file_path: None,
        headers,
        rows,
    })
}

/// Read and parse a CSV file from disk.
pub fn load_csv_table(path: &Path) -> Result<CsvTable, AppError> {
    let data = std::fs::read(path)?;
    let mut table = parse_csv_table(&data)?;
    table.file_path = Some(path.to_path_buf());
    tracing::debug!(
        path = %path.display(),
        headers = table.headers.len(),
        rows = table.rows.len(),
        "Loaded CSV file"
    );
    Ok(table)
}
