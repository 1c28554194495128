//! CLI workflow subcommands: list, show, validate.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use pipewatch_core::agent::registry::AgentRegistry;
use pipewatch_core::workflow::definition::{load_workflow_file, validate_definition};
use pipewatch_types::workflow::WorkflowDefinition;

use crate::state::AppState;

#[derive(Subcommand)]
pub enum WorkflowCommand {
    /// List registered workflows.
    List,

    /// Show a workflow's steps.
    Show {
        /// Workflow id.
        id: String,
    },

    /// Check a definition file without registering it.
    Validate {
        /// Path to a YAML or JSON definition.
        file: PathBuf,
    },
}

pub async fn handle_workflow_command(
    action: WorkflowCommand,
    state: &AppState,
    json: bool,
) -> Result<()> {
    match action {
        WorkflowCommand::List => handle_list(state, json),
        WorkflowCommand::Show { id } => handle_show(state, &id, json),
        WorkflowCommand::Validate { file } => handle_validate(state, &file, json),
    }
}

fn handle_list(state: &AppState, json: bool) -> Result<()> {
    let workflows = state.engine.workflows();

    if json {
        let defs: Vec<&WorkflowDefinition> = workflows.iter().map(|w| w.as_ref()).collect();
        println!("{}", serde_json::to_string_pretty(&defs)?);
        return Ok(());
    }

    if workflows.is_empty() {
        println!();
        println!("  No workflows registered.");
        println!(
            "  Add definitions under {}",
            style(state.data_dir.join("workflows").display()).dim()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(Color::Cyan),
            Cell::new("Name"),
            Cell::new("Steps"),
            Cell::new("Description"),
        ]);

    for w in &workflows {
        table.add_row(vec![
            Cell::new(&w.id),
            Cell::new(w.display_name()),
            Cell::new(w.steps.len()),
            Cell::new(w.description.as_deref().unwrap_or("-")),
        ]);
    }

    println!("{table}");
    Ok(())
}

fn handle_show(state: &AppState, id: &str, json: bool) -> Result<()> {
    let Some(def) = state.engine.workflow(id) else {
        bail!("workflow '{id}' not found");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(def.as_ref())?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {}",
        style("Workflow:").bold(),
        style(def.display_name()).cyan()
    );
    println!("  ID: {}", def.id);
    if let Some(description) = &def.description {
        println!("  {}", style(description).dim());
    }
    println!();

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").fg(Color::Cyan),
            Cell::new("Step"),
            Cell::new("Agent.Action"),
            Cell::new("Output"),
            Cell::new("Condition"),
            Cell::new("On error"),
        ]);

    for (i, step) in def.steps.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&step.id),
            Cell::new(format!("{}.{}", step.agent, step.action)),
            Cell::new(step.output.as_deref().unwrap_or("-")),
            Cell::new(step.condition.as_deref().unwrap_or("-")),
            if step.continue_on_error {
                Cell::new("continue").fg(Color::Yellow)
            } else {
                Cell::new("stop")
            },
        ]);
    }

    println!("{table}");
    Ok(())
}

/// Problems a definition would hit at run time with the current agents.
pub fn check_agents(def: &WorkflowDefinition, agents: &AgentRegistry) -> Vec<String> {
    let mut problems = Vec::new();
    for step in &def.steps {
        match agents.get(&step.agent) {
            None => problems.push(format!(
                "step '{}': agent '{}' is not registered",
                step.id, step.agent
            )),
            Some(agent) if !agent.actions().contains(&step.action) => problems.push(format!(
                "step '{}': agent '{}' has no action '{}'",
                step.id, step.agent, step.action
            )),
            Some(_) => {}
        }
    }
    problems
}

fn handle_validate(state: &AppState, file: &Path, json: bool) -> Result<()> {
    let def = load_workflow_file(file)?;
    validate_definition(&def)?;
    let problems = check_agents(&def, state.engine.agents());

    if json {
        let report = serde_json::json!({
            "id": def.id,
            "steps": def.steps.len(),
            "valid": problems.is_empty(),
            "problems": problems,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if problems.is_empty() {
        println!();
        println!(
            "  {} '{}' is valid ({} steps)",
            style("*").green().bold(),
            style(&def.id).cyan(),
            def.steps.len()
        );
        println!();
    } else {
        println!();
        for problem in &problems {
            println!("  {} {problem}", style("x").red().bold());
        }
        println!();
    }

    if !problems.is_empty() {
        bail!("{} problem(s) in {}", problems.len(), file.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipewatch_core::agent::action::ActionAgent;
    use pipewatch_core::workflow::definition::parse_workflow_yaml;

    #[test]
    fn check_agents_reports_unknown_agents_and_actions() {
        let agents = AgentRegistry::new()
            .with_agent(ActionAgent::new("echo").with_action("run", |v| async move { Ok(v) }));
        let def = parse_workflow_yaml(
            r#"
id: wf
steps:
  - { id: a, agent: echo, action: run }
  - { id: b, agent: echo, action: shout }
  - { id: c, agent: pager, action: page }
"#,
        )
        .unwrap();

        let problems = check_agents(&def, &agents);
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("shout"));
        assert!(problems[1].contains("pager"));
    }
}
