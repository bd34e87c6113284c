//! Header mapping validation.
//!
//! A mapping CSV has the raw data headers in row 0 and, in row 1, the
//! canonical key each header should land in. Empty keys mark columns to
//! ignore. Unknown keys are reported to a caller-supplied decision callback,
//! which either downgrades them to `no_mapping` or aborts the load.

use crate::errors::AppError;
use crate::models::field::FieldKey;
use crate::models::mapping::{HeaderMapping, MappingTarget};
use crate::parsers::CsvTable;

/// How a single mapping value relates to the canonical key set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyClassification {
    Known(FieldKey),
    Empty,
    Unknown(String),
}

/// What to do with a header whose mapping value is not a known key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmappedKeyDecision {
    Downgrade,
    Abort,
}

/// Classify one mapping value. Matching is exact.
pub fn classify_key(value: &str) -> KeyClassification {
    if value.is_empty() {
        return KeyClassification::Empty;
    }
    match value.parse::<FieldKey>() {
        Ok(key) => KeyClassification::Known(key),
        Err(_) => KeyClassification::Unknown(value.to_string()),
    }
}

/// Build a header mapping from aligned header and value sequences.
///
/// Values missing at the end of a short value row count as empty.
pub fn build_header_mapping<F>(
    headers: &[String],
    values: &[String],
    mut on_unknown: F,
) -> Result<HeaderMapping, AppError>
where
    F: FnMut(&str, &str) -> UnmappedKeyDecision,
{
    let mut mapping = HeaderMapping::new();

    for (index, header) in headers.iter().enumerate() {
        if mapping.get(header).is_some() {
            tracing::warn!(header = %header, column = index + 1, "Duplicate header in mapping CSV");
            return Err(AppError::Validation(format!(
                "Header <{header}> appears more than once in the headers mapping CSV"
            )));
        }
        let value = values.get(index).map(String::as_str).unwrap_or("");
        let target = match classify_key(value) {
            KeyClassification::Known(key) => MappingTarget::Field(key),
            KeyClassification::Empty => MappingTarget::NoMapping,
            KeyClassification::Unknown(key) => match on_unknown(header, &key) {
                UnmappedKeyDecision::Downgrade => {
                    tracing::warn!(header = %header, key = %key, "Unknown key downgraded to no_mapping");
                    MappingTarget::NoMapping
                }
                UnmappedKeyDecision::Abort => {
                    return Err(AppError::UnmappedHeaderKey {
                        header: header.clone(),
                        key,
                    });
                }
            },
        };
        mapping.insert(header.clone(), target);
    }

    Ok(mapping)
}

/// Build a header mapping from a loaded mapping CSV.
pub fn header_mapping_from_table<F>(
    table: &CsvTable,
    on_unknown: F,
) -> Result<HeaderMapping, AppError>
where
    F: FnMut(&str, &str) -> UnmappedKeyDecision,
{
    let values = table.rows.first().ok_or_else(|| {
        AppError::Validation("Headers mapping CSV has no key row below the header row".to_string())
    })?;
    build_header_mapping(&table.headers, values, on_unknown)
}
