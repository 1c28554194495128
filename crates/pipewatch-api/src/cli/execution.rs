//! CLI execution commands: run, resume, recover, list and show.

use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use serde_json::Value;
use uuid::Uuid;

use pipewatch_core::workflow::definition::load_workflow_file;
use pipewatch_infra::filesystem::workflows_dir;
use pipewatch_types::execution::{
    Execution, ExecutionFilter, ExecutionStatus, StepStatus, ValueMap,
};

use crate::state::AppState;

/// Execute a workflow and print the finished execution.
pub async fn run_workflow(
    state: &AppState,
    workflow_id: &str,
    context: Option<&str>,
    file: Option<&Path>,
    json: bool,
) -> Result<()> {
    if let Some(path) = file {
        let def = load_workflow_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?;
        if def.id != workflow_id {
            bail!(
                "{} defines workflow '{}', not '{workflow_id}'",
                path.display(),
                def.id
            );
        }
        if is_within(path, &workflows_dir(&state.data_dir)) {
            state.engine.register(def)?;
        } else {
            state.register_and_save(def).await?;
        }
    }

    let context = parse_context_arg(context)?;
    let execution = state.engine.execute(workflow_id, context).await?;
    print_outcome(&execution, json)
}

/// Resume one running execution.
pub async fn resume_execution(state: &AppState, execution_id: &str, json: bool) -> Result<()> {
    let id = parse_execution_id(execution_id)?;
    let execution = state.engine.resume(id).await?;
    print_outcome(&execution, json)
}

/// Resume every execution still marked running.
pub async fn recover(state: &AppState, json: bool) -> Result<()> {
    let results = state.engine.recover_running().await?;

    if json {
        let report: Vec<Value> = results
            .iter()
            .map(|(id, result)| match result {
                Ok(e) => serde_json::json!({ "id": id, "status": e.status }),
                Err(err) => serde_json::json!({ "id": id, "error": err.to_string() }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    if results.is_empty() {
        println!("  Nothing to recover.");
        println!();
        return Ok(());
    }

    for (id, result) in &results {
        match result {
            Ok(e) => println!("  {} {id} {}", style("*").green(), format_status_text(e.status)),
            Err(err) => println!("  {} {id} {}", style("x").red(), style(err).dim()),
        }
    }
    println!();
    Ok(())
}

/// List executions, newest first.
pub async fn list_executions(
    state: &AppState,
    workflow: Option<String>,
    status: Option<&str>,
    limit: Option<u32>,
    json: bool,
) -> Result<()> {
    let status = status
        .map(str::parse::<ExecutionStatus>)
        .transpose()
        .map_err(|e| anyhow!(e))?;
    let filter = ExecutionFilter {
        workflow_id: workflow,
        status,
        limit: limit.unwrap_or(state.config.engine.default_list_limit),
    };
    let executions = state.engine.find_executions(&filter).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&executions)?);
        return Ok(());
    }

    if executions.is_empty() {
        println!();
        println!("  No executions found.");
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(Color::White),
            Cell::new("Workflow").fg(Color::White),
            Cell::new("Status").fg(Color::White),
            Cell::new("Steps").fg(Color::White),
            Cell::new("Started").fg(Color::White),
            Cell::new("Duration").fg(Color::White),
        ]);

    for e in &executions {
        table.add_row(vec![
            Cell::new(e.id).fg(Color::DarkGrey),
            Cell::new(&e.workflow_id).fg(Color::Cyan),
            format_status(e.status),
            Cell::new(e.steps.len()),
            Cell::new(e.start_time.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(format_duration(e.duration_ms)),
        ]);
    }

    println!("{table}");
    Ok(())
}

/// Show one execution with its step records.
pub async fn show_execution(state: &AppState, execution_id: &str, json: bool) -> Result<()> {
    let id = parse_execution_id(execution_id)?;
    let execution = state.engine.get_execution(id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&execution)?);
        return Ok(());
    }

    print_summary(&execution);

    if !execution.steps.is_empty() {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Step").fg(Color::White),
                Cell::new("Status").fg(Color::White),
                Cell::new("Result / Error").fg(Color::White),
                Cell::new("At").fg(Color::White),
            ]);

        for step in &execution.steps {
            let (status, detail) = match step.status {
                StepStatus::Completed => (
                    Cell::new("completed").fg(Color::Green),
                    step.result.as_ref().map(compact).unwrap_or_default(),
                ),
                StepStatus::Failed => (
                    Cell::new("failed").fg(Color::Red),
                    step.error.clone().unwrap_or_default(),
                ),
            };
            table.add_row(vec![
                Cell::new(&step.id),
                status,
                Cell::new(truncate(&detail, 80)),
                Cell::new(step.timestamp.format("%H:%M:%S%.3f")).fg(Color::DarkGrey),
            ]);
        }
        println!("{table}");
    }

    if !execution.outputs.is_empty() {
        println!();
        println!("  {}", style("── Outputs ──").dim());
        for (name, value) in &execution.outputs {
            println!("  {}: {}", style(name).cyan(), truncate(&compact(value), 100));
        }
    }
    println!();
    Ok(())
}

fn print_outcome(execution: &Execution, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(execution)?);
    } else {
        print_summary(execution);
        println!();
    }
    Ok(())
}

fn print_summary(execution: &Execution) {
    println!();
    println!(
        "  {} {} {}",
        style("Execution").bold(),
        style(execution.id).dim(),
        format_status_text(execution.status)
    );
    println!("  Workflow: {}", style(&execution.workflow_id).cyan());
    println!(
        "  Steps:    {} recorded, cursor {}",
        execution.steps.len(),
        execution.cursor
    );
    println!("  Duration: {}", format_duration(execution.duration_ms));
    if let Some(error) = &execution.error {
        println!("  Error:    {}", style(error).red());
    }
}

/// Parse `--context` into a JSON object. Absent means empty.
pub fn parse_context_arg(raw: Option<&str>) -> Result<ValueMap> {
    let Some(raw) = raw else {
        return Ok(ValueMap::new());
    };
    match serde_json::from_str::<Value>(raw).context("--context is not valid JSON")? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(ValueMap::new()),
        _ => bail!("--context must be a JSON object"),
    }
}

/// Whether `path` already lives under `dir` (and is picked up at start-up).
fn is_within(path: &Path, dir: &Path) -> bool {
    match (path.canonicalize(), dir.canonicalize()) {
        (Ok(path), Ok(dir)) => path.starts_with(dir),
        _ => false,
    }
}

fn parse_execution_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("'{raw}' is not a valid execution id"))
}

fn format_status(status: ExecutionStatus) -> Cell {
    match status {
        ExecutionStatus::Running => Cell::new("running").fg(Color::Yellow),
        ExecutionStatus::Completed => Cell::new("completed").fg(Color::Green),
        ExecutionStatus::Failed => Cell::new("failed").fg(Color::Red),
    }
}

fn format_status_text(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Running => style("running").yellow().to_string(),
        ExecutionStatus::Completed => style("completed").green().to_string(),
        ExecutionStatus::Failed => style("failed").red().to_string(),
    }
}

fn format_duration(ms: Option<u64>) -> String {
    match ms {
        None => "-".to_string(),
        Some(ms) if ms < 1_000 => format!("{ms}ms"),
        Some(ms) if ms < 60_000 => format!("{:.1}s", ms as f64 / 1_000.0),
        Some(ms) => format!("{}m {}s", ms / 60_000, (ms % 60_000) / 1_000),
    }
}

fn compact(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
