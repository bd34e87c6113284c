use anyhow::Context;
use csv_report_import::clients::http::{authenticate, PlatformClient};
use csv_report_import::clients::memory::InMemoryPlatform;
use csv_report_import::clients::Platform;
use csv_report_import::config::AppConfig;
use csv_report_import::prompt::{ConsolePrompter, Prompter};
use csv_report_import::services::pipeline;
use csv_report_import::telemetry;
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const BANNER: &str = "\
====================================================================
  CSV REPORT IMPORT
  Imports client, report, and finding data from a CSV file and can
  save each report as a .ptrac interchange file.
====================================================================";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    println!("{BANNER}");

    let config = AppConfig::load().context("Failed to load configuration")?;
    let log_file = telemetry::init(&config.log_dir)?;
    tracing::info!(log_file = %log_file.display(), dry_run = config.dry_run, "Starting CSV report import");

    let mut prompter = ConsolePrompter::stdio();
    let platform = connect(&config, &mut prompter).await?;

    let outcome = pipeline::run(&config, &mut prompter, &*platform).await;
    match outcome {
        Ok(outcome) => {
            if let Some(summary) = &outcome.import {
                println!(
                    "Imported {} client(s), {} report(s), {} finding(s); {} failure(s)",
                    summary.clients_created,
                    summary.reports_created,
                    summary.findings_created,
                    summary.failures.len()
                );
                for failure in &summary.failures {
                    println!("  {} {} failed: {}", failure.entity, failure.path, failure.message);
                }
            }
            if let Some(export) = &outcome.export {
                for path in &export.written {
                    println!("Saved {}", path.display());
                }
                for failure in &export.failures {
                    println!("  export of {} failed: {}", failure.path, failure.message);
                }
            }
        }
        Err(e) if e.is_aborted() => {
            tracing::warn!(reason = %e, "Run aborted by operator");
        }
        Err(e) => {
            tracing::error!(code = e.code(), error = %e, "Run failed");
            println!("Check the log file for details: {}", log_file.display());
            return Err(e.into());
        }
    }

    println!("Log file: {}", log_file.display());
    Ok(())
}

/// Authenticate against the configured instance, or use an in-memory
/// platform for dry runs.
async fn connect(
    config: &AppConfig,
    prompter: &mut dyn Prompter,
) -> anyhow::Result<Box<dyn Platform>> {
    if config.dry_run {
        tracing::warn!("Dry run: nothing will be sent to the platform");
        return Ok(Box::new(InMemoryPlatform::new()));
    }

    let base_url = required(config.base_url.clone(), prompter, "Enter the base URL of your instance")?;
    let username = required(config.username.clone(), prompter, "Enter your username")?;
    let password = required(config.password.clone(), prompter, "Enter your password")?;

    let http = reqwest::Client::new();
    let mut session = authenticate(&http, &base_url, &username, &password).await?;
    if let Some(tenant_id) = &config.tenant_id {
        session.tenant_id = tenant_id.clone();
    }
    Ok(Box::new(PlatformClient::new(http, session)))
}

fn required(
    value: Option<String>,
    prompter: &mut dyn Prompter,
    message: &str,
) -> anyhow::Result<String> {
    value
        .or_else(|| prompter.ask(message).filter(|v| !v.trim().is_empty()))
        .with_context(|| format!("No value given for: {message}"))
}
