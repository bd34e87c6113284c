//! Client → report → finding forest assembled from canonical rows.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::field::FieldKey;
use crate::models::severity::SeverityLevel;

/// Name used for a client whose grouping key is empty.
pub const DEFAULT_CLIENT_NAME: &str = "Custom CSV Import";

/// Name used for a report whose grouping key is empty.
pub const DEFAULT_REPORT_NAME: &str = "Custom CSV Import Report";

// -- Templates --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TemplateResolution {
    Resolved { id: String },
    Unresolved { reason: String },
}

/// A named remote template and the outcome of looking it up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateReference {
    pub name: String,
    pub resolution: TemplateResolution,
}

impl TemplateReference {
    pub fn resolved(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resolution: TemplateResolution::Resolved { id: id.into() },
        }
    }

    pub fn unresolved(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resolution: TemplateResolution::Unresolved {
                reason: reason.into(),
            },
        }
    }

    pub fn resolved_id(&self) -> Option<&str> {
        match &self.resolution {
            TemplateResolution::Resolved { id } => Some(id.as_str()),
            TemplateResolution::Unresolved { .. } => None,
        }
    }
}

/// Report template and findings layout attached to a report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTemplates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields_template: Option<TemplateReference>,
}

impl ReportTemplates {
    pub fn template_id(&self) -> Option<&str> {
        self.template.as_ref().and_then(TemplateReference::resolved_id)
    }

    pub fn fields_template_id(&self) -> Option<&str> {
        self.fields_template
            .as_ref()
            .and_then(TemplateReference::resolved_id)
    }
}

// -- Entities --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// 1-based data row number the finding was read from.
    pub row: usize,
    pub fields: BTreeMap<FieldKey, String>,
}

impl Finding {
    pub fn field(&self, key: FieldKey) -> &str {
        self.fields.get(&key).map(String::as_str).unwrap_or("")
    }

    pub fn title(&self) -> &str {
        self.field(FieldKey::FindingTitle)
    }

    pub fn severity(&self) -> &str {
        self.field(FieldKey::FindingSeverity)
    }

    /// `None` when the raw severity is empty or not a known level.
    pub fn severity_level(&self) -> Option<SeverityLevel> {
        SeverityLevel::parse(self.severity())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub key: String,
    pub fields: BTreeMap<FieldKey, String>,
    #[serde(default)]
    pub templates: ReportTemplates,
    pub findings: Vec<Finding>,
}

impl Report {
    pub fn new(key: impl Into<String>, fields: BTreeMap<FieldKey, String>) -> Self {
        Self {
            key: key.into(),
            fields,
            templates: ReportTemplates::default(),
            findings: Vec::new(),
        }
    }

    pub fn display_name(&self) -> &str {
        display_or_default(
            self.fields.get(&FieldKey::ReportName),
            &self.key,
            DEFAULT_REPORT_NAME,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub key: String,
    pub fields: BTreeMap<FieldKey, String>,
    pub reports: Vec<Report>,
}

impl Client {
    pub fn new(key: impl Into<String>, fields: BTreeMap<FieldKey, String>) -> Self {
        Self {
            key: key.into(),
            fields,
            reports: Vec::new(),
        }
    }

    pub fn display_name(&self) -> &str {
        display_or_default(
            self.fields.get(&FieldKey::ClientName),
            &self.key,
            DEFAULT_CLIENT_NAME,
        )
    }

    pub fn finding_count(&self) -> usize {
        self.reports.iter().map(|r| r.findings.len()).sum()
    }
}

/// Prefer the explicit name field, then the grouping key, then the default.
fn display_or_default<'a>(
    name: Option<&'a String>,
    key: &'a str,
    default: &'a str,
) -> &'a str {
    match name.map(String::as_str) {
        Some(name) if !name.is_empty() => name,
        _ if !key.is_empty() => key,
        _ => default,
    }
}

/// Ordered forest of clients built once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hierarchy {
    pub clients: Vec<Client>,
}

impl Hierarchy {
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn report_count(&self) -> usize {
        self.clients.iter().map(|c| c.reports.len()).sum()
    }

    pub fn finding_count(&self) -> usize {
        self.clients.iter().map(Client::finding_count).sum()
    }

    pub fn reports(&self) -> impl Iterator<Item = (&Client, &Report)> {
        self.clients
            .iter()
            .flat_map(|c| c.reports.iter().map(move |r| (c, r)))
    }

    pub fn reports_mut(&mut self) -> impl Iterator<Item = &mut Report> {
        self.clients.iter_mut().flat_map(|c| c.reports.iter_mut())
    }
}
