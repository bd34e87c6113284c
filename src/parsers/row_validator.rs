//! Data CSV header check against the header mapping.

use std::collections::BTreeSet;

use crate::errors::AppError;
use crate::models::mapping::HeaderMapping;
use crate::parsers::CsvTable;

/// Verify the data header row equals, as a set, the mapping's headers.
pub fn validate_headers(mapping: &HeaderMapping, headers: &[String]) -> Result<(), AppError> {
    let found: BTreeSet<String> = headers.iter().cloned().collect();
    let expected = mapping.header_set();

    if found != expected {
        tracing::warn!(found = ?found, "CSV headers read from file");
        tracing::warn!(expected = ?expected, "Expected headers");
        return Err(AppError::HeaderMismatch { found, expected });
    }

    Ok(())
}

/// Pass a data table through unchanged when its headers match the mapping.
pub fn validate_table(mapping: &HeaderMapping, table: CsvTable) -> Result<CsvTable, AppError> {
    validate_headers(mapping, &table.headers)?;
    Ok(table)
}
