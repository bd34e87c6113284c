//! Remote platform capabilities used by the pipeline.
//!
//! `TemplateCatalog` lists report templates and findings layouts;
//! `ImportClient` creates clients, reports, and findings. `http` talks to a
//! live instance, `memory` is a deterministic stand-in for tests and dry runs.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::field::FieldKey;
use crate::models::hierarchy::{Client, Finding, Report};
use crate::models::severity::SeverityLevel;

/// Which remote catalog a template name is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogKind {
    ReportTemplate,
    FindingsLayout,
}

impl std::fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReportTemplate => write!(f, "Report Template"),
            Self::FindingsLayout => write!(f, "Findings Layout"),
        }
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateCandidate {
    pub name: String,
    pub id: String,
}

#[async_trait]
pub trait TemplateCatalog: Send + Sync {
    /// List every template of the given kind.
    async fn list_templates(&self, kind: CatalogKind) -> Result<Vec<TemplateCandidate>, AppError>;
}

#[async_trait]
pub trait ImportClient: Send + Sync {
    /// Create a client and return its server-assigned id.
    async fn create_client(&self, client: &ClientPayload) -> Result<String, AppError>;

    /// Create a report under an existing client.
    async fn create_report(&self, client_id: &str, report: &ReportPayload)
        -> Result<String, AppError>;

    /// Create a finding under an existing report.
    async fn create_finding(
        &self,
        client_id: &str,
        report_id: &str,
        finding: &FindingPayload,
    ) -> Result<String, AppError>;
}

/// Both capabilities behind one object, so `main` can pick a backend at runtime.
pub trait Platform: TemplateCatalog + ImportClient {}

impl<T: TemplateCatalog + ImportClient> Platform for T {}

// -- Request payloads --

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientPayload {
    pub name: String,
    pub poc: String,
    pub poc_email: String,
    pub description: String,
    pub tags: Vec<String>,
}

impl From<&Client> for ClientPayload {
    fn from(client: &Client) -> Self {
        let field = |key: FieldKey| client.fields.get(&key).cloned().unwrap_or_default();
        Self {
            name: client.display_name().to_string(),
            poc: field(FieldKey::ClientPoc),
            poc_email: field(FieldKey::ClientPocEmail),
            description: field(FieldKey::ClientDescription),
            tags: split_list(&field(FieldKey::ClientTags)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportPayload {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exec_summary: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields_template: Option<String>,
}

impl From<&Report> for ReportPayload {
    fn from(report: &Report) -> Self {
        let field = |key: FieldKey| non_empty(report.fields.get(&key));
        Self {
            name: report.display_name().to_string(),
            status: field(FieldKey::ReportStatus).unwrap_or_else(|| "Draft".to_string()),
            start_date: field(FieldKey::ReportStartDate),
            end_date: field(FieldKey::ReportEndDate),
            exec_summary: field(FieldKey::ReportExecutiveSummary),
            tags: split_list(&field(FieldKey::ReportTags).unwrap_or_default()),
            template: report.templates.template_id().map(String::from),
            fields_template: report.templates.fields_template_id().map(String::from),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FindingPayload {
    pub title: String,
    pub severity: SeverityLevel,
    pub status: String,
    pub description: String,
    pub recommendations: String,
    pub references: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cvss3_vector: Option<String>,
    pub cve_ids: Vec<String>,
    pub cwe_ids: Vec<String>,
    pub affected_assets: Vec<String>,
}

impl From<&Finding> for FindingPayload {
    fn from(finding: &Finding) -> Self {
        let title = match finding.title() {
            "" => format!("Finding from row {}", finding.row),
            title => title.to_string(),
        };
        let status = match finding.field(FieldKey::FindingStatus) {
            "" => "Open".to_string(),
            status => status.to_string(),
        };
        let severity = finding.severity_level().unwrap_or_else(|| {
            tracing::warn!(
                row = finding.row,
                raw = %finding.severity(),
                "Unrecognized severity, sending as Informational"
            );
            SeverityLevel::Informational
        });
        Self {
            title,
            severity,
            status,
            description: finding.field(FieldKey::FindingDescription).to_string(),
            recommendations: finding.field(FieldKey::FindingRecommendations).to_string(),
            references: finding.field(FieldKey::FindingReferences).to_string(),
            tags: split_list(finding.field(FieldKey::FindingTags)),
            cvss3_vector: non_empty(finding.fields.get(&FieldKey::FindingCvss3Vector)),
            cve_ids: split_list(finding.field(FieldKey::FindingCve)),
            cwe_ids: split_list(finding.field(FieldKey::FindingCwe)),
            affected_assets: split_list(finding.field(FieldKey::FindingAffectedAssets)),
        }
    }
}

/// Split a comma or newline separated cell into trimmed, non-empty items.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split([',', '\n'])
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(String::from)
}
