//! CLI command implementations.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use flowdoctor_api::types::DebugResponse;
use flowdoctor_api::{ApiConfig, AppState};
use flowdoctor_core::{
    parse_automation_ref, render_report, Assistant, AutomationClient, AutomationSummary,
    Diagnoser, ReportFormat, Settings,
};
use flowdoctor_models::AutomationRecord;
use flowdoctor_telegram::FlowdoctorBot;
use tracing::{debug, info};

use crate::cli::{Commands, OutputFormat};
use crate::error::{CliError, Result};

/// Execute a CLI command.
pub async fn execute(cmd: Commands, settings: &Settings) -> Result<()> {
    match cmd {
        Commands::Diagnose {
            reference,
            file,
            explain,
            format,
        } => {
            let automation = load_automation(reference.as_deref(), file.as_deref(), settings).await?;
            let assistant = if explain {
                Assistant::from_settings(settings)
            } else {
                Assistant::disabled()
            };
            let output = diagnose_output(&automation, &assistant, format).await?;
            println!("{}", output);
            Ok(())
        }
        Commands::Summary {
            reference,
            file,
            format,
        } => {
            let automation = load_automation(reference.as_deref(), file.as_deref(), settings).await?;
            println!("{}", summary_output(&automation, format)?);
            Ok(())
        }
        Commands::Serve {
            host,
            port,
            cors_origins,
        } => serve(settings, host, port, cors_origins).await,
        Commands::Bot => {
            let bot = FlowdoctorBot::from_settings(settings)?;
            let username = bot.get_me().await?;
            println!("Flowdoctor bot running as @{} (Ctrl+C to stop)", username);
            bot.start_polling().await?;
            Ok(())
        }
    }
}

/// Load an automation from a JSON file or from the platform API.
///
/// A file record without an id takes the id from `reference` when given.
pub async fn load_automation(
    reference: Option<&str>,
    file: Option<&Path>,
    settings: &Settings,
) -> Result<AutomationRecord> {
    let id = reference
        .map(|r| parse_automation_ref(r).ok_or_else(|| CliError::InvalidReference(r.to_string())))
        .transpose()?;

    if let Some(path) = file {
        let mut automation = read_automation_file(path)?;
        if automation.id.is_empty() {
            automation.id = id.unwrap_or_default();
        }
        return Ok(automation);
    }

    let id = id.ok_or_else(|| CliError::InvalidReference(String::new()))?;
    let client = AutomationClient::from_settings(settings)?;
    info!(automation_id = %id, endpoint = %client.endpoint(), "Fetching automation");
    Ok(client.fetch(&id).await?)
}

/// Read an automation record from a JSON file.
pub fn read_automation_file(path: &Path) -> Result<AutomationRecord> {
    let raw = std::fs::read_to_string(path).map_err(|source| CliError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let automation: AutomationRecord =
        serde_json::from_str(&raw).map_err(|source| CliError::ParseFile {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(
        path = %path.display(),
        executions = automation.executions.len(),
        "Loaded automation from file"
    );
    Ok(automation)
}

/// Diagnose the latest execution and format the result.
pub async fn diagnose_output(
    automation: &AutomationRecord,
    assistant: &Assistant,
    format: OutputFormat,
) -> Result<String> {
    let diagnosis = Diagnoser::new().diagnose_latest(automation);
    info!(
        automation_id = %automation.id,
        issues = diagnosis.issues.len(),
        severity = %diagnosis.highest_severity(),
        "Diagnosed automation"
    );

    let report_format = match format {
        OutputFormat::Html => ReportFormat::Html,
        OutputFormat::Text | OutputFormat::Json => ReportFormat::Plain,
    };
    let report = render_report(automation, &diagnosis, report_format);

    match format {
        OutputFormat::Json => {
            let analysis = assistant
                .explain_or_fallback(automation, &diagnosis, ReportFormat::Plain)
                .await;
            let response = DebugResponse {
                automation_id: automation.id.clone(),
                analysis,
                report,
                diagnosis,
            };
            Ok(serde_json::to_string_pretty(&response)?)
        }
        OutputFormat::Text | OutputFormat::Html if assistant.is_enabled() => {
            let analysis = assistant
                .explain_or_fallback(automation, &diagnosis, report_format)
                .await;
            Ok(format!("{report}\n\n{analysis}"))
        }
        OutputFormat::Text | OutputFormat::Html => Ok(report),
    }
}

/// Format run statistics for an automation.
pub fn summary_output(automation: &AutomationRecord, format: OutputFormat) -> Result<String> {
    let summary = AutomationSummary::from_record(automation);
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(&summary)?);
    }

    let mut out = String::new();
    let _ = writeln!(out, "Automation: {} ({})", summary.name, summary.automation_id);
    let _ = writeln!(
        out,
        "Runs: {} ({} succeeded, {} failed)",
        summary.total_runs, summary.success_count, summary.failure_count
    );
    let _ = writeln!(out, "Success rate: {}", summary.success_rate);
    if let Some(status) = &summary.latest_status {
        let _ = writeln!(out, "Latest: {}", status);
    }
    if let Some(error) = &summary.latest_error {
        let _ = writeln!(out, "Latest error: {}", error);
    }
    Ok(out.trim_end().to_string())
}

async fn serve(
    settings: &Settings,
    host: String,
    port: u16,
    cors_origins: Vec<String>,
) -> Result<()> {
    let client = AutomationClient::from_settings(settings)?;
    let assistant = Assistant::from_settings(settings);
    let config = ApiConfig::new(host, port).with_cors_origins(cors_origins);

    println!("Flowdoctor API listening on http://{}", config.bind_address());
    println!("   Upstream: {}", client.endpoint());
    println!(
        "   Assistant: {}",
        if assistant.is_enabled() { "enabled" } else { "rule-based" }
    );

    let state = AppState::new(config, Arc::new(client), assistant);
    flowdoctor_api::serve(state).await?;
    Ok(())
}
