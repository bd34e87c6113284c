//! Canonical field keys that mapping CSVs may target.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Entity level a canonical field belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FieldScope {
    Client,
    Report,
    Finding,
}

// -- Canonical keys --

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    ClientName,
    ClientPoc,
    ClientPocEmail,
    ClientDescription,
    ClientTags,
    ReportName,
    ReportStatus,
    ReportStartDate,
    ReportEndDate,
    ReportExecutiveSummary,
    ReportTags,
    FindingTitle,
    FindingSeverity,
    FindingStatus,
    FindingDescription,
    FindingRecommendations,
    FindingReferences,
    FindingTags,
    #[serde(rename = "finding_cvss3_vector")]
    FindingCvss3Vector,
    FindingCve,
    FindingCwe,
    FindingAffectedAssets,
}

const ALL_KEYS: [FieldKey; 22] = [
    FieldKey::ClientName,
    FieldKey::ClientPoc,
    FieldKey::ClientPocEmail,
    FieldKey::ClientDescription,
    FieldKey::ClientTags,
    FieldKey::ReportName,
    FieldKey::ReportStatus,
    FieldKey::ReportStartDate,
    FieldKey::ReportEndDate,
    FieldKey::ReportExecutiveSummary,
    FieldKey::ReportTags,
    FieldKey::FindingTitle,
    FieldKey::FindingSeverity,
    FieldKey::FindingStatus,
    FieldKey::FindingDescription,
    FieldKey::FindingRecommendations,
    FieldKey::FindingReferences,
    FieldKey::FindingTags,
    FieldKey::FindingCvss3Vector,
    FieldKey::FindingCve,
    FieldKey::FindingCwe,
    FieldKey::FindingAffectedAssets,
];

impl FieldKey {
    /// Every known canonical key, in declaration order.
    pub fn all() -> &'static [FieldKey] {
        &ALL_KEYS
    }

    /// Identifier used in mapping CSVs and interchange files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientName => "client_name",
            Self::ClientPoc => "client_poc",
            Self::ClientPocEmail => "client_poc_email",
            Self::ClientDescription => "client_description",
            Self::ClientTags => "client_tags",
            Self::ReportName => "report_name",
            Self::ReportStatus => "report_status",
            Self::ReportStartDate => "report_start_date",
            Self::ReportEndDate => "report_end_date",
            Self::ReportExecutiveSummary => "report_executive_summary",
            Self::ReportTags => "report_tags",
            Self::FindingTitle => "finding_title",
            Self::FindingSeverity => "finding_severity",
            Self::FindingStatus => "finding_status",
            Self::FindingDescription => "finding_description",
            Self::FindingRecommendations => "finding_recommendations",
            Self::FindingReferences => "finding_references",
            Self::FindingTags => "finding_tags",
            Self::FindingCvss3Vector => "finding_cvss3_vector",
            Self::FindingCve => "finding_cve",
            Self::FindingCwe => "finding_cwe",
            Self::FindingAffectedAssets => "finding_affected_assets",
        }
    }

    pub fn scope(&self) -> FieldScope {
        match self {
            Self::ClientName
            | Self::ClientPoc
            | Self::ClientPocEmail
            | Self::ClientDescription
            | Self::ClientTags => FieldScope::Client,
            Self::ReportName
            | Self::ReportStatus
            | Self::ReportStartDate
            | Self::ReportEndDate
            | Self::ReportExecutiveSummary
            | Self::ReportTags => FieldScope::Report,
            _ => FieldScope::Finding,
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_KEYS
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("unknown field key '{s}'"))
    }
}
