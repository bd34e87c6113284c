//! Finding severity as the remote platform names it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SeverityLevel {
    Critical,
    High,
    Medium,
    Low,
    Informational,
}

impl SeverityLevel {
    /// Map a free-form CSV severity onto the platform's levels.
    ///
    /// Matching is case-insensitive. `None` for empty or unrecognized values.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "critical" | "crit" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" | "med" | "moderate" => Some(Self::Medium),
            "low" => Some(Self::Low),
            "informational" | "info" => Some(Self::Informational),
            _ => None,
        }
    }

    /// Like `parse`, falling back to Informational.
    pub fn from_raw(raw: &str) -> Self {
        Self::parse(raw).unwrap_or(Self::Informational)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Informational => "Informational",
        }
    }
}
