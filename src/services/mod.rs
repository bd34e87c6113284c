//! Pipeline stages and the orchestration that runs them.

pub mod fingerprint;
pub mod hierarchy;
pub mod importer;
pub mod interchange;
pub mod pipeline;
pub mod templates;
