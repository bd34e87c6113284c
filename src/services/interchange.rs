//! Interchange (`.ptrac`) export and re-import.
//!
//! One JSON document per report. Each document carries the owning client's
//! context, the report fields and resolved templates, and every finding keyed
//! by canonical field keys, so it can be imported later without the original
//! mapping or data CSVs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::field::FieldKey;
use crate::models::hierarchy::{Client, Finding, Hierarchy, Report, ReportTemplates};
use crate::services::fingerprint;

/// Version of the document layout written by this crate.
pub const FORMAT_VERSION: &str = "1";

/// File extension for interchange documents.
pub const FILE_EXTENSION: &str = "ptrac";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentDetails {
    pub format_version: String,
    /// API version of the platform instance the document targets.
    pub doc_version: String,
    pub exported_at: DateTime<Utc>,
    pub document_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub key: String,
    pub name: String,
    pub fields: BTreeMap<FieldKey, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportInfo {
    pub key: String,
    pub name: String,
    pub fields: BTreeMap<FieldKey, String>,
    #[serde(default)]
    pub templates: ReportTemplates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlawEntry {
    pub flaw_id: String,
    pub row: usize,
    pub fields: BTreeMap<FieldKey, String>,
}

/// A self-contained export of one report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterchangeDocument {
    pub document_details: DocumentDetails,
    pub client_info: ClientInfo,
    pub report_info: ReportInfo,
    pub flaws_array: Vec<FlawEntry>,
}

impl InterchangeDocument {
    pub fn from_report(client: &Client, report: &Report, doc_version: &str) -> Self {
        let flaws_array = report
            .findings
            .iter()
            .map(|finding| FlawEntry {
                flaw_id: fingerprint::compute_flaw_id(
                    &client.key,
                    &report.key,
                    finding.row,
                    finding.title(),
                ),
                row: finding.row,
                fields: finding.fields.clone(),
            })
            .collect();

        Self {
            document_details: DocumentDetails {
                format_version: FORMAT_VERSION.to_string(),
                doc_version: doc_version.to_string(),
                exported_at: Utc::now(),
                document_id: Uuid::new_v4(),
            },
            client_info: ClientInfo {
                key: client.key.clone(),
                name: client.display_name().to_string(),
                fields: client.fields.clone(),
            },
            report_info: ReportInfo {
                key: report.key.clone(),
                name: report.display_name().to_string(),
                fields: report.fields.clone(),
                templates: report.templates.clone(),
            },
            flaws_array,
        }
    }

    /// Rebuild the client context (without reports) and the report.
    pub fn into_parts(self) -> (Client, Report) {
        let client = Client::new(self.client_info.key, self.client_info.fields);

        let mut report = Report::new(self.report_info.key, self.report_info.fields);
        report.templates = self.report_info.templates;
        report.findings = self
            .flaws_array
            .into_iter()
            .map(|flaw| Finding {
                row: flaw.row,
                fields: flaw.fields,
            })
            .collect();

        (client, report)
    }

    pub fn to_json(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Parse and version-check an interchange document.
pub fn parse_interchange(data: &[u8]) -> Result<InterchangeDocument, AppError> {
    let document: InterchangeDocument = serde_json::from_slice(data)?;
    if document.document_details.format_version != FORMAT_VERSION {
        return Err(AppError::Validation(format!(
            "Unsupported interchange format version '{}'",
            document.document_details.format_version
        )));
    }
    Ok(document)
}

pub fn read_interchange(path: &Path) -> Result<InterchangeDocument, AppError> {
    let data = std::fs::read(path)?;
    parse_interchange(&data)
}

/// Write one report's document into `dir` and return the file path.
pub fn write_report(
    client: &Client,
    report: &Report,
    doc_version: &str,
    dir: &Path,
) -> Result<PathBuf, AppError> {
    std::fs::create_dir_all(dir)?;
    let document = InterchangeDocument::from_report(client, report, doc_version);

    let stem = file_stem(
        client.display_name(),
        report.display_name(),
        &document.document_details.exported_at,
    )?;
    let path = unique_path(dir, &stem);
    std::fs::write(&path, document.to_json()?)?;

    tracing::info!(
        path = %path.display(),
        client = %client.display_name(),
        report = %report.display_name(),
        findings = report.findings.len(),
        "Saved interchange file"
    );
    Ok(path)
}

/// A report whose interchange file could not be written.
#[derive(Debug, Clone, Serialize)]
pub struct ExportFailure {
    /// `client / report` display path.
    pub path: String,
    pub code: String,
    pub message: String,
}

/// Files written by an export, plus the reports that failed.
#[derive(Debug, Default, Serialize)]
pub struct ExportSummary {
    pub written: Vec<PathBuf>,
    pub failures: Vec<ExportFailure>,
}

impl ExportSummary {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Write one document per report. A failed report does not stop the others.
pub fn export_hierarchy(hierarchy: &Hierarchy, doc_version: &str, dir: &Path) -> ExportSummary {
    let mut summary = ExportSummary::default();

    for (client, report) in hierarchy.reports() {
        match write_report(client, report, doc_version, dir) {
            Ok(path) => summary.written.push(path),
            Err(e) => {
                let path = format!("{} / {}", client.display_name(), report.display_name());
                tracing::error!(report = %path, dir = %dir.display(), error = %e, "Export failed");
                summary.failures.push(ExportFailure {
                    path,
                    code: e.code().to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        written = summary.written.len(),
        failures = summary.failures.len(),
        "Export finished"
    );
    summary
}

/// `client_report_timestamp` with anything outside `[A-Za-z0-9._-]` collapsed to `_`.
fn file_stem(client: &str, report: &str, at: &DateTime<Utc>) -> Result<String, AppError> {
    let unsafe_chars =
        Regex::new(r"[^A-Za-z0-9._-]+").map_err(|e| AppError::Internal(e.to_string()))?;
    let raw = format!("{client}_{report}_{}", at.format("%Y%m%d%H%M%S"));
    Ok(unsafe_chars.replace_all(&raw, "_").into_owned())
}

fn unique_path(dir: &Path, stem: &str) -> PathBuf {
    let mut path = dir.join(format!("{stem}.{FILE_EXTENSION}"));
    let mut n = 1;
    while path.exists() {
        n += 1;
        path = dir.join(format!("{stem}_{n}.{FILE_EXTENSION}"));
    }
    path
}
