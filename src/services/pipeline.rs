//! Run orchestration: load inputs, build the hierarchy, resolve templates,
//! then import and/or export on the operator's confirmation.
//!
//! Every operator-facing input goes through `bounded_input`, which retries a
//! fixed number of times before giving up instead of recursing.

use std::path::Path;

use crate::clients::{CatalogKind, ImportClient, TemplateCatalog};
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::hierarchy::{Hierarchy, TemplateReference};
use crate::models::mapping::HeaderMapping;
use crate::parsers::header_mapping::{header_mapping_from_table, UnmappedKeyDecision};
use crate::parsers::{entity_mapper, load_csv_table, row_validator, CsvTable};
use crate::prompt::Prompter;
use crate::services::hierarchy::{build_hierarchy, GroupingKeys};
use crate::services::importer::{import_hierarchy, ImportSummary};
use crate::services::interchange::{self, ExportSummary};
use crate::services::templates::{apply_template, TemplateOutcome, TemplateResolver};

/// State of one operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputState<T> {
    AwaitingInput,
    Validated(T),
    Aborted(String),
}

/// What an input is for and how often it may be retried.
#[derive(Debug, Clone, Copy)]
pub struct InputRequest<'a> {
    pub what: &'a str,
    pub prompt: &'a str,
    pub max_attempts: u32,
}

/// Errors the operator cannot fix by entering a different value.
fn is_fatal(err: &AppError) -> bool {
    matches!(
        err,
        AppError::Aborted(_) | AppError::UnmappedHeaderKey { .. }
    )
}

/// Obtain and validate one input, prompting at most `max_attempts` times.
///
/// `initial` (typically from config) is tried first and counts as an attempt.
/// After a failed attempt the operator is asked whether to retry; declining
/// aborts the run.
pub fn bounded_input<T, F>(
    prompter: &mut dyn Prompter,
    request: InputRequest<'_>,
    initial: Option<String>,
    mut validate: F,
) -> Result<T, AppError>
where
    F: FnMut(&str, &mut dyn Prompter) -> Result<T, AppError>,
{
    let mut pending = initial.filter(|v| !v.trim().is_empty());
    let mut attempts = 0u32;
    let mut state = InputState::AwaitingInput;

    loop {
        state = match state {
            InputState::AwaitingInput => {
                if attempts >= request.max_attempts {
                    return Err(AppError::RetriesExhausted {
                        what: request.what.to_string(),
                        attempts,
                    });
                }
                attempts += 1;

                let raw = match pending.take() {
                    Some(value) => Some(value),
                    None => prompter.ask(request.prompt),
                };

                match raw.map(|raw| validate(raw.trim(), &mut *prompter)) {
                    None => InputState::Aborted(format!("no input for {}", request.what)),
                    Some(Ok(value)) => InputState::Validated(value),
                    Some(Err(e)) if is_fatal(&e) => return Err(e),
                    Some(Err(e)) => {
                        tracing::warn!(input = request.what, attempt = attempts, error = %e, "Invalid input");
                        if attempts >= request.max_attempts || prompter.retry(&e.to_string()) {
                            InputState::AwaitingInput
                        } else {
                            InputState::Aborted(format!("{} not provided: {e}", request.what))
                        }
                    }
                }
            }
            InputState::Validated(value) => return Ok(value),
            InputState::Aborted(reason) => {
                tracing::warn!(reason = %reason, "Aborting");
                return Err(AppError::Aborted(reason));
            }
        };
    }
}

/// Accept exactly three non-empty dot-separated components, e.g. `1.61.0`.
pub fn validate_api_version(value: &str) -> Result<String, AppError> {
    let parts: Vec<&str> = value.split('.').collect();
    if parts.len() == 3 && parts.iter().all(|p| !p.is_empty()) {
        Ok(value.to_string())
    } else {
        Err(AppError::InvalidVersionFormat(value.to_string()))
    }
}

pub fn resolve_api_version(
    prompter: &mut dyn Prompter,
    initial: Option<&str>,
    max_attempts: u32,
) -> Result<String, AppError> {
    if let Some(version) = initial.filter(|v| !v.is_empty()) {
        tracing::info!(api_version = %version, "Using API version from config");
    }
    let version = bounded_input(
        prompter,
        InputRequest {
            what: "API version",
            prompt: "Enter the API version of your instance (shown at the bottom right of the Account Admin page)",
            max_attempts,
        },
        initial.map(String::from),
        |raw, _| validate_api_version(raw),
    )?;
    tracing::info!(api_version = %version, "Set API version");
    Ok(version)
}

/// Load the mapping CSV, asking the operator about every unknown key.
pub fn load_header_mapping(
    prompter: &mut dyn Prompter,
    initial: Option<&Path>,
    max_attempts: u32,
) -> Result<HeaderMapping, AppError> {
    let mapping = bounded_input(
        prompter,
        InputRequest {
            what: "headers mapping CSV",
            prompt: "Enter file path to the CSV mapping headers to data types",
            max_attempts,
        },
        initial.map(|p| p.display().to_string()),
        |raw, prompter| {
            let table = load_csv_table(Path::new(raw))?;
            header_mapping_from_table(&table, |header, key| {
                let message = format!("ERR: Key <{key}> selected for header <{header}> is not a valid key");
                if prompter.confirm(&message) {
                    UnmappedKeyDecision::Downgrade
                } else {
                    UnmappedKeyDecision::Abort
                }
            })
        },
    )?;
    tracing::info!(headers = mapping.len(), mapped = mapping.mapped_keys().len(), "Loaded csv headers mapping");
    Ok(mapping)
}

/// Load the data CSV, retrying with a new path while its headers mismatch.
pub fn load_data_table(
    prompter: &mut dyn Prompter,
    mapping: &HeaderMapping,
    initial: Option<&Path>,
    max_attempts: u32,
) -> Result<CsvTable, AppError> {
    let table = bounded_input(
        prompter,
        InputRequest {
            what: "data CSV",
            prompt: "Enter file path to CSV data to import",
            max_attempts,
        },
        initial.map(|p| p.display().to_string()),
        |raw, _| {
            let table = load_csv_table(Path::new(raw))?;
            row_validator::validate_table(mapping, table)
        },
    )?;
    tracing::info!(rows = table.rows.len(), "Loaded csv data");
    Ok(table)
}

/// Resolve a configured template name and apply it to every report.
///
/// Unresolved names leave reports untouched once the operator agrees to
/// proceed without them; declining aborts.
pub async fn resolve_template<C: TemplateCatalog + ?Sized>(
    prompter: &mut dyn Prompter,
    resolver: &mut TemplateResolver<'_, C>,
    hierarchy: &mut Hierarchy,
    kind: CatalogKind,
    name: &str,
) -> Result<TemplateReference, AppError> {
    let outcome = match resolver.resolve(kind, name).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(kind = %kind, name = %name, error = %e, "Could not list templates");
            TemplateOutcome::NotFound
        }
    };
    let reference = outcome.to_reference(name);

    if let Some(problem) = outcome.as_error(name) {
        let message = match &outcome {
            TemplateOutcome::Ambiguous(count) => format!(
                "{kind} name '{name}' from config matches {count} {kind}s in platform. No {kind} will be added to reports."
            ),
            _ => format!(
                "{kind} name '{name}' from config does not match any {kind}s in platform. No {kind} will be added to reports."
            ),
        };
        if !prompter.confirm(&message) {
            return Err(AppError::Aborted(problem.to_string()));
        }
        tracing::warn!(kind = %kind, name = %name, error = %problem, "Continuing without template");
        return Ok(reference);
    }

    apply_template(hierarchy, kind, &reference);
    tracing::info!(kind = %kind, name = %name, id = ?reference.resolved_id(), "Template added to reports");
    Ok(reference)
}

/// Log client and report counts after parsing.
///
/// Returns how many findings have a severity that will be sent as
/// Informational because it is empty or not a known level.
pub fn log_parser_results(hierarchy: &Hierarchy) -> usize {
    tracing::info!(
        clients = hierarchy.client_count(),
        reports = hierarchy.report_count(),
        findings = hierarchy.finding_count(),
        "Parser results"
    );
    let mut severity_fallbacks = 0;
    for (client, report) in hierarchy.reports() {
        tracing::info!(
            client = %client.display_name(),
            report = %report.display_name(),
            findings = report.findings.len(),
            "Parsed report"
        );
        for finding in &report.findings {
            if finding.severity_level().is_none() {
                severity_fallbacks += 1;
                tracing::warn!(
                    client = %client.display_name(),
                    report = %report.display_name(),
                    row = finding.row,
                    raw = %finding.severity(),
                    "Unrecognized severity, will import as Informational"
                );
            }
        }
    }
    if severity_fallbacks > 0 {
        tracing::warn!(count = severity_fallbacks, "Findings with unrecognized severity");
    }
    severity_fallbacks
}

/// What a full run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub api_version: String,
    pub hierarchy: Hierarchy,
    pub templates: Vec<TemplateReference>,
    pub import: Option<ImportSummary>,
    /// `None` when the operator skipped the export.
    pub export: Option<ExportSummary>,
}

/// Load, validate, and assemble the inputs, then import and/or export.
pub async fn run<P>(
    config: &AppConfig,
    prompter: &mut dyn Prompter,
    platform: &P,
) -> Result<RunOutcome, AppError>
where
    P: TemplateCatalog + ImportClient + ?Sized,
{
    tracing::info!("---Starting data loading---");
    let attempts = config.max_input_attempts;

    let api_version = resolve_api_version(prompter, config.api_version.as_deref(), attempts)?;
    let mapping = load_header_mapping(prompter, config.csv_headers_file_path.as_deref(), attempts)?;
    let table = load_data_table(prompter, &mapping, config.csv_data_file_path.as_deref(), attempts)?;

    let rows = entity_mapper::map_rows(&mapping, &table.headers, &table.rows);
    let mut hierarchy = build_hierarchy(&rows, &GroupingKeys::default());

    let mut templates = Vec::new();
    let mut resolver = TemplateResolver::new(platform);
    let requested = [
        (CatalogKind::ReportTemplate, config.report_template_name.as_deref()),
        (CatalogKind::FindingsLayout, config.findings_layout_name.as_deref()),
    ];
    for (kind, name) in requested {
        let Some(name) = name else { continue };
        tracing::info!(kind = %kind, name = %name, "Using template from config");
        let reference = resolve_template(prompter, &mut resolver, &mut hierarchy, kind, name).await?;
        templates.push(reference);
    }

    let severity_fallbacks = log_parser_results(&hierarchy);
    let severity_note = if severity_fallbacks > 0 {
        format!("\n{severity_fallbacks} finding(s) have an unrecognized severity and will be imported as Informational.")
    } else {
        String::new()
    };

    let import = if prompter.confirm(&format!(
        "IMPORTANT: Data will be imported into the platform.\n\
         Please view the log file generated from parsing to see if there were any errors.\n\
         If the data was not parsed correctly, please exit, fix the data, and re-run.\n\
         This will import data into {} client(s). The more clients you have the harder it will be to undo this import.{severity_note}",
        hierarchy.client_count()
    )) {
        Some(import_hierarchy(platform, &hierarchy).await)
    } else {
        tracing::info!("Import skipped by operator");
        None
    };

    let export = if prompter.confirm(&format!(
        "IMPORTANT: Data will be saved to interchange file(s).\n\
         You can save each parsed report as a .{} file. Client data cannot be imported from these files.\n\
         Would you like to create and save files for {} report(s)?",
        interchange::FILE_EXTENSION,
        hierarchy.report_count()
    )) {
        Some(interchange::export_hierarchy(&hierarchy, &api_version, &config.export_dir))
    } else {
        tracing::info!("Export skipped by operator");
        None
    };

    Ok(RunOutcome {
        api_version,
        hierarchy,
        templates,
        import,
        export,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::memory::InMemoryPlatform;
    use crate::prompt::ScriptedPrompter;

    #[test]
    fn version_format() {
        assert!(validate_api_version("1.61.0").is_ok());
        assert!(validate_api_version("1.61").is_err());
        assert!(validate_api_version("1.61.0.2").is_err());
        assert!(validate_api_version("1..0").is_err());
        assert!(matches!(
            validate_api_version(""),
            Err(AppError::InvalidVersionFormat(_))
        ));
    }

    #[test]
    fn config_version_used_without_prompting() {
        let mut prompter = ScriptedPrompter::new(Vec::<String>::new());
        let version = resolve_api_version(&mut prompter, Some("2.3.4"), 3).unwrap();
        assert_eq!(version, "2.3.4");
        assert!(prompter.transcript().is_empty());
    }

    #[test]
    fn invalid_config_version_reprompts() {
        let mut prompter = ScriptedPrompter::new(["y", "1.2.3"]);
        let version = resolve_api_version(&mut prompter, Some("1.2"), 3).unwrap();
        assert_eq!(version, "1.2.3");
        assert_eq!(prompter.transcript().len(), 2);
    }

    #[test]
    fn declining_retry_aborts() {
        let mut prompter = ScriptedPrompter::new(["bad", "n"]);
        let err = resolve_api_version(&mut prompter, None, 3).unwrap_err();
        assert!(err.is_aborted());
    }

    #[test]
    fn retries_are_bounded() {
        let mut prompter = ScriptedPrompter::new(["a", "y", "b", "y", "c", "y", "1.2.3"]);
        let err = resolve_api_version(&mut prompter, None, 3).unwrap_err();
        match err {
            AppError::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(prompter.remaining(), 2);
    }

    #[test]
    fn closed_input_aborts() {
        let mut prompter = ScriptedPrompter::new(Vec::<String>::new());
        let err = resolve_api_version(&mut prompter, None, 3).unwrap_err();
        assert!(err.is_aborted());
    }

    #[test]
    fn input_state_machine_returns_validated_value() {
        let mut prompter = ScriptedPrompter::new(["42"]);
        let value = bounded_input(
            &mut prompter,
            InputRequest {
                what: "number",
                prompt: "Number",
                max_attempts: 1,
            },
            None,
            |raw, _| {
                raw.parse::<u32>()
                    .map_err(|e| AppError::Validation(e.to_string()))
            },
        )
        .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn ambiguous_template_declined_aborts() {
        let catalog = InMemoryPlatform::new()
            .with_template(CatalogKind::ReportTemplate, "Standard", "t-1")
            .with_template(CatalogKind::ReportTemplate, "Standard", "t-2");
        let mut resolver = TemplateResolver::new(&catalog);
        let mut hierarchy = Hierarchy::default();
        let mut prompter = ScriptedPrompter::new(["n"]);

        let err = resolve_template(
            &mut prompter,
            &mut resolver,
            &mut hierarchy,
            CatalogKind::ReportTemplate,
            "Standard",
        )
        .await
        .unwrap_err();
        assert!(err.is_aborted());
        assert!(prompter.transcript()[0].contains("matches 2"));
    }

    #[tokio::test]
    async fn missing_template_accepted_leaves_reference_unresolved() {
        let catalog = InMemoryPlatform::new();
        let mut resolver = TemplateResolver::new(&catalog);
        let mut hierarchy = Hierarchy::default();
        let mut prompter = ScriptedPrompter::new(["y"]);

        let reference = resolve_template(
            &mut prompter,
            &mut resolver,
            &mut hierarchy,
            CatalogKind::FindingsLayout,
            "Layout",
        )
        .await
        .unwrap();
        assert!(reference.resolved_id().is_none());
    }

    #[test]
    fn unrecognized_severities_are_counted() {
        use std::collections::BTreeMap;

        use crate::models::field::FieldKey;
        use crate::models::hierarchy::{Client, Finding, Report};

        let mut report = Report::new("r", BTreeMap::new());
        for (row, raw) in ["High", "Severe", "P1", "", "info"].into_iter().enumerate() {
            report.findings.push(Finding {
                row: row + 1,
                fields: BTreeMap::from([(FieldKey::FindingSeverity, raw.to_string())]),
            });
        }
        let mut client = Client::new("c", BTreeMap::new());
        client.reports.push(report);
        let hierarchy = Hierarchy {
            clients: vec![client],
        };

        assert_eq!(log_parser_results(&hierarchy), 3);
    }
}
