//! Re-keys raw data rows under canonical field keys.

use crate::models::field::FieldKey;
use crate::models::mapping::HeaderMapping;
use crate::models::record::CanonicalRow;

/// Canonical key for each data column, `None` for ignored columns.
pub fn column_keys(mapping: &HeaderMapping, headers: &[String]) -> Vec<Option<FieldKey>> {
    headers
        .iter()
        .map(|header| mapping.get(header).and_then(|target| target.field()))
        .collect()
}

/// Map one raw row using keys resolved by `column_keys`.
///
/// Cells missing from a short row read as "". If two columns target the same
/// key, the later column wins.
pub fn map_columns(columns: &[Option<FieldKey>], row: &[String]) -> CanonicalRow {
    let mut canonical = CanonicalRow::new();

    for (index, key) in columns.iter().enumerate() {
        let Some(key) = key else {
            continue;
        };
        let value = row.get(index).map(String::as_str).unwrap_or("");
        canonical.insert(*key, value);
    }

    canonical
}

/// Map one raw row, aligned to `headers`, into a canonical row.
///
/// `no_mapping` columns and headers absent from the mapping are dropped.
pub fn map_row(mapping: &HeaderMapping, headers: &[String], row: &[String]) -> CanonicalRow {
    map_columns(&column_keys(mapping, headers), row)
}

/// Map every row of a validated table, resolving the header mapping once.
pub fn map_rows(mapping: &HeaderMapping, headers: &[String], rows: &[Vec<String>]) -> Vec<CanonicalRow> {
    let columns = column_keys(mapping, headers);
    rows.iter().map(|row| map_columns(&columns, row)).collect()
}
