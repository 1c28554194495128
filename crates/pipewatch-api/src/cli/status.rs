//! Engine statistics command.

use anyhow::Result;
use console::style;

use crate::state::AppState;

/// Display engine statistics.
///
/// Persisted counts come from the execution store; the active count only
/// covers executions running in this process.
pub async fn stats(state: &AppState, json: bool) -> Result<()> {
    let stats = state.engine.stats().await?;
    let agents = state.engine.agents().list_names();

    if json {
        let report = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "stats": stats,
            "agents": agents,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!("  {} pipewatch v{}", style("*").bold(), env!("CARGO_PKG_VERSION"));
    println!();

    println!("  {}", style("── Workflows ──").dim());
    println!("  Registered: {}", style(stats.registered_workflows).bold());
    println!("  Agents:     {}", agents.join(", "));
    println!();

    println!("  {}", style("── Executions ──").dim());
    println!("  Total:      {}", style(stats.total_executions).bold());
    println!("  Completed:  {}", style(stats.completed).green());
    if stats.failed > 0 {
        println!("  Failed:     {}", style(stats.failed).red());
    }
    if stats.running > 0 {
        println!("  Running:    {}", style(stats.running).yellow());
    }
    println!("  Active now: {}", stats.active_executions);
    println!();

    println!("  {}", style("── Storage ──").dim());
    println!("  Data dir:   {}", style(state.data_dir.display()).dim());
    println!();

    Ok(())
}
