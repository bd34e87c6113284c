//! Groups canonical rows into the client → report → finding hierarchy.
//!
//! Grouping keys are compared by exact value. Two rows whose client names
//! differ only in whitespace or case land under different clients.

use std::collections::HashMap;

use crate::models::field::{FieldKey, FieldScope};
use crate::models::hierarchy::{Client, Finding, Hierarchy, Report};
use crate::models::record::CanonicalRow;

/// Separator between the values of a multi-field grouping key.
const KEY_SEPARATOR: char = '\u{1f}';

/// Fields whose values decide client and report identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupingKeys {
    pub client: Vec<FieldKey>,
    pub report: Vec<FieldKey>,
}

impl Default for GroupingKeys {
    fn default() -> Self {
        Self {
            client: vec![FieldKey::ClientName],
            report: vec![FieldKey::ReportName],
        }
    }
}

impl GroupingKeys {
    /// Compute a grouping key. Missing fields contribute "".
    fn key_for(fields: &[FieldKey], row: &CanonicalRow) -> String {
        let mut key = String::new();
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                key.push(KEY_SEPARATOR);
            }
            key.push_str(row.value(*field));
        }
        key
    }

    pub fn client_key(&self, row: &CanonicalRow) -> String {
        Self::key_for(&self.client, row)
    }

    pub fn report_key(&self, row: &CanonicalRow) -> String {
        Self::key_for(&self.report, row)
    }
}

/// Incremental single-pass builder preserving first-appearance order.
#[derive(Debug, Default)]
pub struct HierarchyBuilder {
    grouping: GroupingKeys,
    clients: Vec<Client>,
    client_index: HashMap<String, usize>,
    report_index: HashMap<(usize, String), usize>,
    rows_seen: usize,
}

impl HierarchyBuilder {
    pub fn new(grouping: GroupingKeys) -> Self {
        Self {
            grouping,
            ..Self::default()
        }
    }

    /// Attach one row as a finding, creating its client and report on first sight.
    pub fn push(&mut self, row: &CanonicalRow) {
        self.rows_seen += 1;

        let client_key = self.grouping.client_key(row);
        let report_key = self.grouping.report_key(row);

        let client_idx = match self.client_index.get(&client_key) {
            Some(idx) => *idx,
            None => {
                tracing::debug!(client = %client_key, row = self.rows_seen, "New client");
                let idx = self.clients.len();
                self.clients
                    .push(Client::new(client_key.clone(), row.scoped(FieldScope::Client)));
                self.client_index.insert(client_key, idx);
                idx
            }
        };

        let client = &mut self.clients[client_idx];
        let report_idx = match self.report_index.get(&(client_idx, report_key.clone())) {
            Some(idx) => *idx,
            None => {
                tracing::debug!(
                    client = %client.key,
                    report = %report_key,
                    row = self.rows_seen,
                    "New report"
                );
                let idx = client.reports.len();
                client
                    .reports
                    .push(Report::new(report_key.clone(), row.scoped(FieldScope::Report)));
                self.report_index.insert((client_idx, report_key), idx);
                idx
            }
        };

        client.reports[report_idx].findings.push(Finding {
            row: self.rows_seen,
            fields: row.scoped(FieldScope::Finding),
        });
    }

    pub fn finish(self) -> Hierarchy {
        Hierarchy {
            clients: self.clients,
        }
    }
}

/// Build a hierarchy from rows in file order.
pub fn build_hierarchy(rows: &[CanonicalRow], grouping: &GroupingKeys) -> Hierarchy {
    let mut builder = HierarchyBuilder::new(grouping.clone());
    for row in rows {
        builder.push(row);
    }
    let hierarchy = builder.finish();
    tracing::info!(
        clients = hierarchy.client_count(),
        reports = hierarchy.report_count(),
        findings = hierarchy.finding_count(),
        "Parsed CSV data into hierarchy"
    );
    hierarchy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(FieldKey, &str)]) -> CanonicalRow {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn one_client_default_report_two_findings() {
        let rows = vec![
            row(&[(FieldKey::ClientName, "Acme"), (FieldKey::FindingSeverity, "High")]),
            row(&[(FieldKey::ClientName, "Acme"), (FieldKey::FindingSeverity, "Low")]),
        ];
        let hierarchy = build_hierarchy(&rows, &GroupingKeys::default());

        assert_eq!(hierarchy.client_count(), 1);
        let client = &hierarchy.clients[0];
        assert_eq!(client.display_name(), "Acme");
        assert_eq!(client.reports.len(), 1);

        let report = &client.reports[0];
        assert_eq!(report.key, "");
        let severities: Vec<&str> = report.findings.iter().map(|f| f.severity()).collect();
        assert_eq!(severities, vec!["High", "Low"]);
    }

    #[test]
    fn rows_sharing_keys_land_in_one_report() {
        let rows: Vec<CanonicalRow> = (0..25)
            .map(|_| row(&[(FieldKey::ClientName, "Acme"), (FieldKey::ReportName, "Q3")]))
            .collect();
        let hierarchy = build_hierarchy(&rows, &GroupingKeys::default());

        assert_eq!(hierarchy.report_count(), 1);
        assert_eq!(hierarchy.clients[0].reports[0].findings.len(), 25);
    }

    #[test]
    fn report_keys_are_scoped_to_client() {
        let rows = vec![
            row(&[(FieldKey::ClientName, "Acme"), (FieldKey::ReportName, "Q3")]),
            row(&[(FieldKey::ClientName, "Globex"), (FieldKey::ReportName, "Q3")]),
        ];
        let hierarchy = build_hierarchy(&rows, &GroupingKeys::default());

        assert_eq!(hierarchy.client_count(), 2);
        assert_eq!(hierarchy.report_count(), 2);
    }

    #[test]
    fn first_appearance_order_is_preserved() {
        let rows = vec![
            row(&[(FieldKey::ClientName, "B"), (FieldKey::ReportName, "r2")]),
            row(&[(FieldKey::ClientName, "A"), (FieldKey::ReportName, "r1")]),
            row(&[(FieldKey::ClientName, "B"), (FieldKey::ReportName, "r1")]),
            row(&[(FieldKey::ClientName, "B"), (FieldKey::ReportName, "r2")]),
        ];
        let hierarchy = build_hierarchy(&rows, &GroupingKeys::default());

        let clients: Vec<&str> = hierarchy.clients.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(clients, vec!["B", "A"]);
        let b_reports: Vec<&str> = hierarchy.clients[0]
            .reports
            .iter()
            .map(|r| r.key.as_str())
            .collect();
        assert_eq!(b_reports, vec!["r2", "r1"]);
        let rows_in_r2: Vec<usize> = hierarchy.clients[0].reports[0]
            .findings
            .iter()
            .map(|f| f.row)
            .collect();
        assert_eq!(rows_in_r2, vec![1, 4]);
    }

    #[test]
    fn keys_are_not_normalized() {
        let rows = vec![
            row(&[(FieldKey::ClientName, "Acme")]),
            row(&[(FieldKey::ClientName, "Acme ")]),
            row(&[(FieldKey::ClientName, "acme")]),
        ];
        let hierarchy = build_hierarchy(&rows, &GroupingKeys::default());
        assert_eq!(hierarchy.client_count(), 3);
    }

    #[test]
    fn missing_client_field_groups_under_empty_key() {
        let rows = vec![
            row(&[(FieldKey::FindingTitle, "XSS")]),
            row(&[(FieldKey::FindingTitle, "CSRF")]),
        ];
        let hierarchy = build_hierarchy(&rows, &GroupingKeys::default());
        assert_eq!(hierarchy.client_count(), 1);
        assert_eq!(hierarchy.clients[0].key, "");
        assert_eq!(hierarchy.finding_count(), 2);
    }

    #[test]
    fn entity_fields_split_by_scope() {
        let rows = vec![
            row(&[
                (FieldKey::ClientName, "Acme"),
                (FieldKey::ClientPoc, "Jordan"),
                (FieldKey::ReportName, "Q3"),
                (FieldKey::ReportStartDate, "2024-01-01"),
                (FieldKey::FindingTitle, "XSS"),
            ]),
            row(&[
                (FieldKey::ClientName, "Acme"),
                (FieldKey::ClientPoc, "Someone Else"),
                (FieldKey::ReportName, "Q3"),
                (FieldKey::FindingTitle, "CSRF"),
            ]),
        ];
        let hierarchy = build_hierarchy(&rows, &GroupingKeys::default());
        let client = &hierarchy.clients[0];

        assert_eq!(client.fields[&FieldKey::ClientPoc], "Jordan");
        assert_eq!(client.reports[0].fields[&FieldKey::ReportStartDate], "2024-01-01");
        let finding = &client.reports[0].findings[0];
        assert_eq!(finding.fields.len(), 1);
        assert_eq!(finding.title(), "XSS");
    }

    #[test]
    fn multi_field_grouping() {
        let grouping = GroupingKeys {
            client: vec![FieldKey::ClientName, FieldKey::ClientPoc],
            report: vec![],
        };
        let rows = vec![
            row(&[(FieldKey::ClientName, "Acme"), (FieldKey::ClientPoc, "a")]),
            row(&[(FieldKey::ClientName, "Acme"), (FieldKey::ClientPoc, "b")]),
        ];
        let hierarchy = build_hierarchy(&rows, &grouping);
        assert_eq!(hierarchy.client_count(), 2);
    }
}
