//! Unified error type for the import pipeline.

use std::collections::BTreeSet;

/// Application error type shared by every pipeline stage.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid API version '{0}': expected three dot-separated components")]
    InvalidVersionFormat(String),

    #[error("Key <{key}> selected for header <{header}> is not a valid key")]
    UnmappedHeaderKey { header: String, key: String },

    #[error("CSV headers don't match the headers mapping (found {found:?}, expected {expected:?})")]
    HeaderMismatch {
        found: BTreeSet<String>,
        expected: BTreeSet<String>,
    },

    #[error("Template name '{name}' matches {count} templates")]
    TemplateAmbiguous { name: String, count: usize },

    #[error("Template name '{0}' does not match any template")]
    TemplateNotFound(String),

    #[error("Failed to create {entity}: {message}")]
    RemoteCreateFailed { entity: String, message: String },

    #[error("Aborted: {0}")]
    Aborted(String),

    #[error("Gave up on {what} after {attempts} attempts")]
    RetriesExhausted { what: String, attempts: u32 },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Conditions the orchestration layer may resolve by asking the operator.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidVersionFormat(_)
                | Self::UnmappedHeaderKey { .. }
                | Self::HeaderMismatch { .. }
                | Self::TemplateAmbiguous { .. }
                | Self::TemplateNotFound(_)
                | Self::RemoteCreateFailed { .. }
        )
    }

    /// Check if this error is an operator abort.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }

    /// Short machine-readable code used in logs and summaries.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidVersionFormat(_) => "INVALID_VERSION_FORMAT",
            Self::UnmappedHeaderKey { .. } => "UNMAPPED_HEADER_KEY",
            Self::HeaderMismatch { .. } => "HEADER_MISMATCH",
            Self::TemplateAmbiguous { .. } => "TEMPLATE_AMBIGUOUS",
            Self::TemplateNotFound(_) => "TEMPLATE_NOT_FOUND",
            Self::RemoteCreateFailed { .. } => "REMOTE_CREATE_FAILED",
            Self::Aborted(_) => "ABORTED",
            Self::RetriesExhausted { .. } => "RETRIES_EXHAUSTED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Csv(_) => "CSV_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "SERIALIZATION_ERROR",
            Self::Http(_) => "HTTP_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
