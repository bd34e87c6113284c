//! Stable identifiers for exported findings.
//!
//! A flaw id is a deterministic hash of where the finding sits in the
//! hierarchy and which data row it came from, so re-exporting the same CSV
//! yields the same ids.

use sha2::{Digest, Sha256};

/// Compute the flaw id for a finding.
///
/// Inputs: client grouping key, report grouping key, data row number, title.
pub fn compute_flaw_id(client_key: &str, report_key: &str, row: usize, title: &str) -> String {
    hash(&format!("FLAW:{client_key}\u{1f}{report_key}\u{1f}{row}\u{1f}{title}"))
}

/// SHA-256 hash a string and return hex-encoded digest.
fn hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
