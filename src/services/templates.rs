//! Resolves report template and findings layout names to catalog ids.
//!
//! Names are matched exactly. One match resolves; zero or several leave the
//! reports without a template, and the orchestration layer decides whether
//! that is acceptable.

use std::collections::HashMap;

use crate::clients::{CatalogKind, TemplateCatalog};
use crate::errors::AppError;
use crate::models::hierarchy::{Hierarchy, TemplateReference};

/// Result of looking a name up in one catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateOutcome {
    Resolved(String),
    NotFound,
    Ambiguous(usize),
}

impl TemplateOutcome {
    /// The error kind describing an unresolved outcome, if any.
    pub fn as_error(&self, name: &str) -> Option<AppError> {
        match self {
            Self::Resolved(_) => None,
            Self::NotFound => Some(AppError::TemplateNotFound(name.to_string())),
            Self::Ambiguous(count) => Some(AppError::TemplateAmbiguous {
                name: name.to_string(),
                count: *count,
            }),
        }
    }

    pub fn to_reference(&self, name: &str) -> TemplateReference {
        match self {
            Self::Resolved(id) => TemplateReference::resolved(name, id.clone()),
            Self::NotFound => TemplateReference::unresolved(name, "no matching template"),
            Self::Ambiguous(count) => {
                TemplateReference::unresolved(name, format!("matches {count} templates"))
            }
        }
    }
}

/// Looks each distinct `(kind, name)` pair up at most once per run.
pub struct TemplateResolver<'a, C: TemplateCatalog + ?Sized> {
    catalog: &'a C,
    cache: HashMap<(CatalogKind, String), TemplateOutcome>,
}

impl<'a, C: TemplateCatalog + ?Sized> TemplateResolver<'a, C> {
    pub fn new(catalog: &'a C) -> Self {
        Self {
            catalog,
            cache: HashMap::new(),
        }
    }

    pub async fn resolve(
        &mut self,
        kind: CatalogKind,
        name: &str,
    ) -> Result<TemplateOutcome, AppError> {
        let cache_key = (kind, name.to_string());
        if let Some(outcome) = self.cache.get(&cache_key) {
            return Ok(outcome.clone());
        }

        let candidates = self.catalog.list_templates(kind).await?;
        let matches: Vec<_> = candidates.into_iter().filter(|c| c.name == name).collect();

        let outcome = match matches.as_slice() {
            [] => TemplateOutcome::NotFound,
            [single] => TemplateOutcome::Resolved(single.id.clone()),
            many => TemplateOutcome::Ambiguous(many.len()),
        };
        tracing::info!(kind = %kind, name = %name, outcome = ?outcome, "Template lookup");

        self.cache.insert(cache_key, outcome.clone());
        Ok(outcome)
    }
}

/// Attach a resolved template to every report. Unresolved references are ignored.
pub fn apply_template(hierarchy: &mut Hierarchy, kind: CatalogKind, reference: &TemplateReference) {
    if reference.resolved_id().is_none() {
        return;
    }
    for report in hierarchy.reports_mut() {
        let slot = match kind {
            CatalogKind::ReportTemplate => &mut report.templates.template,
            CatalogKind::FindingsLayout => &mut report.templates.fields_template,
        };
        *slot = Some(reference.clone());
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::clients::memory::InMemoryPlatform;
    use crate::clients::TemplateCandidate;
    use crate::models::hierarchy::{Client, Report};

    fn hierarchy() -> Hierarchy {
        let mut client = Client::new("Acme", BTreeMap::new());
        client.reports.push(Report::new("Q3", BTreeMap::new()));
        client.reports.push(Report::new("Q4", BTreeMap::new()));
        Hierarchy {
            clients: vec![client],
        }
    }

    struct CountingCatalog {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TemplateCatalog for CountingCatalog {
        async fn list_templates(
            &self,
            _kind: CatalogKind,
        ) -> Result<Vec<TemplateCandidate>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![TemplateCandidate {
                name: "Standard".to_string(),
                id: "t-1".to_string(),
            }])
        }
    }

    #[test]
    fn single_match_resolves() {
        let catalog = InMemoryPlatform::new()
            .with_template(CatalogKind::ReportTemplate, "Standard", "t-1")
            .with_template(CatalogKind::ReportTemplate, "Light", "t-2");
        let mut resolver = TemplateResolver::new(&catalog);

        let outcome =
            tokio_test::block_on(resolver.resolve(CatalogKind::ReportTemplate, "Standard")).unwrap();
        assert_eq!(outcome, TemplateOutcome::Resolved("t-1".to_string()));

        let mut hierarchy = hierarchy();
        apply_template(
            &mut hierarchy,
            CatalogKind::ReportTemplate,
            &outcome.to_reference("Standard"),
        );
        for (_, report) in hierarchy.reports() {
            assert_eq!(report.templates.template_id(), Some("t-1"));
            assert!(report.templates.fields_template.is_none());
        }
    }

    #[test]
    fn duplicate_names_are_ambiguous() {
        let catalog = InMemoryPlatform::new()
            .with_template(CatalogKind::ReportTemplate, "Standard", "t-1")
            .with_template(CatalogKind::ReportTemplate, "Standard", "t-2");
        let mut resolver = TemplateResolver::new(&catalog);

        let outcome =
            tokio_test::block_on(resolver.resolve(CatalogKind::ReportTemplate, "Standard")).unwrap();
        assert_eq!(outcome, TemplateOutcome::Ambiguous(2));
        assert!(matches!(
            outcome.as_error("Standard"),
            Some(AppError::TemplateAmbiguous { count: 2, .. })
        ));

        let mut hierarchy = hierarchy();
        apply_template(
            &mut hierarchy,
            CatalogKind::ReportTemplate,
            &outcome.to_reference("Standard"),
        );
        for (_, report) in hierarchy.reports() {
            assert!(report.templates.template.is_none());
        }
    }

    #[test]
    fn no_match_is_not_found() {
        let catalog = InMemoryPlatform::new()
            .with_template(CatalogKind::ReportTemplate, "Standard", "t-1");
        let mut resolver = TemplateResolver::new(&catalog);

        let outcome =
            tokio_test::block_on(resolver.resolve(CatalogKind::FindingsLayout, "Standard")).unwrap();
        assert_eq!(outcome, TemplateOutcome::NotFound);
        assert!(matches!(
            outcome.as_error("Standard"),
            Some(AppError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn name_match_is_exact() {
        let catalog = InMemoryPlatform::new()
            .with_template(CatalogKind::ReportTemplate, "standard", "t-1");
        let mut resolver = TemplateResolver::new(&catalog);
        let outcome =
            tokio_test::block_on(resolver.resolve(CatalogKind::ReportTemplate, "Standard")).unwrap();
        assert_eq!(outcome, TemplateOutcome::NotFound);
    }

    #[tokio::test]
    async fn each_name_looked_up_once() {
        let catalog = CountingCatalog {
            calls: AtomicUsize::new(0),
        };
        let mut resolver = TemplateResolver::new(&catalog);

        resolver.resolve(CatalogKind::ReportTemplate, "Standard").await.unwrap();
        resolver.resolve(CatalogKind::ReportTemplate, "Standard").await.unwrap();
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);

        resolver.resolve(CatalogKind::FindingsLayout, "Standard").await.unwrap();
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn catalog_failure_propagates() {
        let catalog = InMemoryPlatform::new().catalog_unavailable();
        let mut resolver = TemplateResolver::new(&catalog);
        assert!(resolver
            .resolve(CatalogKind::ReportTemplate, "Standard")
            .await
            .is_err());
    }
}
