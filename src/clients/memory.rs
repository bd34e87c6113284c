//! In-memory platform used for tests and offline runs.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::clients::{
    CatalogKind, ClientPayload, FindingPayload, ImportClient, ReportPayload, TemplateCandidate,
    TemplateCatalog,
};
use crate::errors::AppError;

/// A call recorded by the fake, in the order it was made.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Client {
        id: String,
        payload: ClientPayload,
    },
    Report {
        id: String,
        client_id: String,
        payload: ReportPayload,
    },
    Finding {
        id: String,
        client_id: String,
        report_id: String,
        payload: FindingPayload,
    },
}

#[derive(Debug, Default)]
struct State {
    next_id: usize,
    calls: Vec<RecordedCall>,
    attempts: Vec<String>,
}

/// Deterministic stand-in for a platform instance.
///
/// Ids are assigned sequentially (`client-1`, `report-2`, ...). Creation
/// fails for entities whose name or title was registered with one of the
/// `fail_*` builders.
#[derive(Debug, Default)]
pub struct InMemoryPlatform {
    catalogs: HashMap<CatalogKind, Vec<TemplateCandidate>>,
    failing_clients: HashSet<String>,
    failing_reports: HashSet<String>,
    failing_findings: HashSet<String>,
    catalog_unavailable: bool,
    state: Mutex<State>,
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, kind: CatalogKind, name: &str, id: &str) -> Self {
        self.catalogs.entry(kind).or_default().push(TemplateCandidate {
            name: name.to_string(),
            id: id.to_string(),
        });
        self
    }

    pub fn fail_client(mut self, name: &str) -> Self {
        self.failing_clients.insert(name.to_string());
        self
    }

    pub fn fail_report(mut self, name: &str) -> Self {
        self.failing_reports.insert(name.to_string());
        self
    }

    pub fn fail_finding(mut self, title: &str) -> Self {
        self.failing_findings.insert(title.to_string());
        self
    }

    pub fn catalog_unavailable(mut self) -> Self {
        self.catalog_unavailable = true;
        self
    }

    /// Successful creations, in call order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Every creation attempt (successful or not) as `kind:name`.
    pub fn attempts(&self) -> Vec<String> {
        self.lock().attempts.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn attempt(
        &self,
        kind: &str,
        name: &str,
        failing: &HashSet<String>,
    ) -> Result<String, AppError> {
        let mut state = self.lock();
        state.attempts.push(format!("{kind}:{name}"));
        if failing.contains(name) {
            return Err(AppError::RemoteCreateFailed {
                entity: format!("{kind} '{name}'"),
                message: "rejected by in-memory platform".to_string(),
            });
        }
        state.next_id += 1;
        Ok(format!("{kind}-{}", state.next_id))
    }

    fn record(&self, call: RecordedCall) {
        self.lock().calls.push(call);
    }
}

#[async_trait]
impl TemplateCatalog for InMemoryPlatform {
    async fn list_templates(&self, kind: CatalogKind) -> Result<Vec<TemplateCandidate>, AppError> {
        if self.catalog_unavailable {
            return Err(AppError::Internal("template catalog unavailable".to_string()));
        }
        Ok(self.catalogs.get(&kind).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl ImportClient for InMemoryPlatform {
    async fn create_client(&self, client: &ClientPayload) -> Result<String, AppError> {
        let id = self.attempt("client", &client.name, &self.failing_clients)?;
        self.record(RecordedCall::Client {
            id: id.clone(),
            payload: client.clone(),
        });
        Ok(id)
    }

    async fn create_report(
        &self,
        client_id: &str,
        report: &ReportPayload,
    ) -> Result<String, AppError> {
        let id = self.attempt("report", &report.name, &self.failing_reports)?;
        self.record(RecordedCall::Report {
            id: id.clone(),
            client_id: client_id.to_string(),
            payload: report.clone(),
        });
        Ok(id)
    }

    async fn create_finding(
        &self,
        client_id: &str,
        report_id: &str,
        finding: &FindingPayload,
    ) -> Result<String, AppError> {
        let id = self.attempt("finding", &finding.title, &self.failing_findings)?;
        self.record(RecordedCall::Finding {
            id: id.clone(),
            client_id: client_id.to_string(),
            report_id: report_id.to_string(),
            payload: finding.clone(),
        });
        Ok(id)
    }
}
