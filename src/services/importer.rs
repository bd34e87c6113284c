//! Pushes a parsed hierarchy into the remote platform.
//!
//! Walks clients, then their reports, then their findings, threading each
//! server-assigned id into the children's create calls. A failed client skips
//! everything beneath it; a failed report skips only its own findings. All
//! failures are collected into the run summary.

use serde::Serialize;

use crate::clients::{ClientPayload, FindingPayload, ImportClient, ReportPayload};
use crate::errors::AppError;
use crate::models::hierarchy::{Client, Hierarchy, Report};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Client,
    Report,
    Finding,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::Report => write!(f, "report"),
            Self::Finding => write!(f, "finding"),
        }
    }
}

/// A create call that failed.
#[derive(Debug, Clone, Serialize)]
pub struct ImportFailure {
    pub entity: EntityKind,
    /// `client / report / finding` display path of the failed entity.
    pub path: String,
    pub code: String,
    pub message: String,
}

/// End-of-run summary of an import.
#[derive(Debug, Default, Serialize)]
pub struct ImportSummary {
    pub clients_created: usize,
    pub reports_created: usize,
    pub findings_created: usize,
    pub reports_skipped: usize,
    pub findings_skipped: usize,
    pub failures: Vec<ImportFailure>,
}

impl ImportSummary {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed(&self, entity: EntityKind) -> impl Iterator<Item = &ImportFailure> {
        self.failures.iter().filter(move |f| f.entity == entity)
    }

    fn record_failure(&mut self, entity: EntityKind, path: String, err: &AppError) {
        tracing::error!(entity = %entity, path = %path, error = %err, "Import failed");
        self.failures.push(ImportFailure {
            entity,
            path,
            code: err.code().to_string(),
            message: err.to_string(),
        });
    }
}

/// Import every client, report, and finding in order.
pub async fn import_hierarchy<C: ImportClient + ?Sized>(
    api: &C,
    hierarchy: &Hierarchy,
) -> ImportSummary {
    let mut summary = ImportSummary::default();

    for client in &hierarchy.clients {
        import_client(api, client, &mut summary).await;
    }

    tracing::info!(
        clients = summary.clients_created,
        reports = summary.reports_created,
        findings = summary.findings_created,
        reports_skipped = summary.reports_skipped,
        findings_skipped = summary.findings_skipped,
        failures = summary.failures.len(),
        "Import finished"
    );
    summary
}

async fn import_client<C: ImportClient + ?Sized>(
    api: &C,
    client: &Client,
    summary: &mut ImportSummary,
) {
    let name = client.display_name();
    let client_id = match api.create_client(&ClientPayload::from(client)).await {
        Ok(id) => id,
        Err(e) => {
            summary.record_failure(EntityKind::Client, name.to_string(), &e);
            summary.reports_skipped += client.reports.len();
            summary.findings_skipped += client.finding_count();
            return;
        }
    };
    summary.clients_created += 1;
    tracing::info!(client = %name, client_id = %client_id, "Created client");

    for report in &client.reports {
        import_report(api, &client_id, name, report, summary).await;
    }
}

async fn import_report<C: ImportClient + ?Sized>(
    api: &C,
    client_id: &str,
    client_name: &str,
    report: &Report,
    summary: &mut ImportSummary,
) {
    let path = format!("{client_name} / {}", report.display_name());
    let report_id = match api.create_report(client_id, &ReportPayload::from(report)).await {
        Ok(id) => id,
        Err(e) => {
            summary.record_failure(EntityKind::Report, path, &e);
            summary.findings_skipped += report.findings.len();
            return;
        }
    };
    summary.reports_created += 1;
    tracing::info!(report = %path, report_id = %report_id, "Created report");

    for finding in &report.findings {
        let payload = FindingPayload::from(finding);
        match api.create_finding(client_id, &report_id, &payload).await {
            Ok(_) => summary.findings_created += 1,
            Err(e) => summary.record_failure(
                EntityKind::Finding,
                format!("{path} / {} (row {})", payload.title, finding.row),
                &e,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::clients::memory::{InMemoryPlatform, RecordedCall};
    use crate::models::field::FieldKey;
    use crate::models::hierarchy::Finding;

    fn finding(row: usize, title: &str) -> Finding {
        Finding {
            row,
            fields: BTreeMap::from([(FieldKey::FindingTitle, title.to_string())]),
        }
    }

    /// Build a client from `(report name, comma-separated finding titles)` pairs.
    fn client(name: &str, reports: &[(&str, &str)]) -> Client {
        let mut client = Client::new(name, BTreeMap::new());
        let mut row = 0;
        for (report_name, titles) in reports {
            let mut report = Report::new(*report_name, BTreeMap::new());
            for title in titles.split(',') {
                row += 1;
                report.findings.push(finding(row, title));
            }
            client.reports.push(report);
        }
        client
    }

    #[tokio::test]
    async fn ids_are_threaded_to_children() {
        let platform = InMemoryPlatform::new();
        let hierarchy = Hierarchy {
            clients: vec![client("A", &[("r1", "XSS")])],
        };

        let summary = import_hierarchy(&platform, &hierarchy).await;
        assert!(summary.is_clean());

        let calls = platform.calls();
        assert_eq!(calls.len(), 3);
        match (&calls[0], &calls[1], &calls[2]) {
            (
                RecordedCall::Client { id: cid, .. },
                RecordedCall::Report {
                    id: rid,
                    client_id: r_cid,
                    ..
                },
                RecordedCall::Finding {
                    client_id: f_cid,
                    report_id: f_rid,
                    ..
                },
            ) => {
                assert_eq!(r_cid, cid);
                assert_eq!(f_cid, cid);
                assert_eq!(f_rid, rid);
            }
            other => panic!("unexpected call order: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_client_skips_descendants_only() {
        let platform = InMemoryPlatform::new().fail_client("B");
        let hierarchy = Hierarchy {
            clients: vec![
                client("A", &[("a1", "XSS,CSRF"), ("a2", "SQLi")]),
                client("B", &[("b1", "RCE")]),
            ],
        };

        let summary = import_hierarchy(&platform, &hierarchy).await;

        assert_eq!(summary.clients_created, 1);
        assert_eq!(summary.reports_created, 2);
        assert_eq!(summary.findings_created, 3);
        assert_eq!(summary.reports_skipped, 1);
        assert_eq!(summary.findings_skipped, 1);

        let failed: Vec<&str> = summary
            .failed(EntityKind::Client)
            .map(|f| f.path.as_str())
            .collect();
        assert_eq!(failed, vec!["B"]);

        let attempts = platform.attempts();
        assert!(!attempts.contains(&"report:b1".to_string()));
        assert!(!attempts.contains(&"finding:RCE".to_string()));
    }

    #[tokio::test]
    async fn failed_report_does_not_stop_siblings() {
        let platform = InMemoryPlatform::new().fail_report("a1");
        let hierarchy = Hierarchy {
            clients: vec![client("A", &[("a1", "XSS"), ("a2", "SQLi")])],
        };

        let summary = import_hierarchy(&platform, &hierarchy).await;

        assert_eq!(summary.reports_created, 1);
        assert_eq!(summary.findings_created, 1);
        assert_eq!(summary.findings_skipped, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].entity, EntityKind::Report);
        assert_eq!(summary.failures[0].path, "A / a1");
        assert_eq!(summary.failures[0].code, "REMOTE_CREATE_FAILED");
    }

    #[tokio::test]
    async fn failed_finding_is_recorded_and_import_continues() {
        let platform = InMemoryPlatform::new().fail_finding("CSRF");
        let hierarchy = Hierarchy {
            clients: vec![client("A", &[("a1", "XSS,CSRF,SQLi")])],
        };

        let summary = import_hierarchy(&platform, &hierarchy).await;

        assert_eq!(summary.findings_created, 2);
        let failed: Vec<&ImportFailure> = summary.failed(EntityKind::Finding).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].path, "A / a1 / CSRF (row 2)");
    }
}
