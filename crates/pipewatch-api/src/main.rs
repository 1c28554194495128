//! pipewatch CLI and REST API entry point.
//!
//! Binary name: `pwatch`
//!
//! Parses CLI arguments, initializes tracing, the execution store and the
//! engine, then dispatches to the command handler or starts the REST API.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    pipewatch_observe::init_tracing(
        pipewatch_observe::filter_for_verbosity(cli.quiet, cli.verbose),
        cli.otel,
    )
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    pipewatch_observe::shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "pwatch", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init().await?;
    let json = cli.json;

    match cli.command {
        Commands::Workflow { action } => {
            cli::workflow::handle_workflow_command(action, &state, json).await?;
        }

        Commands::Run {
            workflow_id,
            context,
            file,
        } => {
            cli::execution::run_workflow(
                &state,
                &workflow_id,
                context.as_deref(),
                file.as_deref(),
                json,
            )
            .await?;
        }

        Commands::Resume { execution_id } => {
            cli::execution::resume_execution(&state, &execution_id, json).await?;
        }

        Commands::Recover => {
            cli::execution::recover(&state, json).await?;
        }

        Commands::Executions {
            workflow,
            status,
            limit,
        } => {
            cli::execution::list_executions(&state, workflow, status.as_deref(), limit, json)
                .await?;
        }

        Commands::Execution { execution_id } => {
            cli::execution::show_execution(&state, &execution_id, json).await?;
        }

        Commands::Stats => {
            cli::status::stats(&state, json).await?;
        }

        Commands::Serve { port, host } => {
            let host = host.unwrap_or_else(|| state.config.server.host.clone());
            let port = port.unwrap_or(state.config.server.port);

            if state.config.engine.recover_on_start {
                let engine = state.engine.clone();
                tokio::spawn(async move {
                    if let Err(e) = engine.recover_running().await {
                        tracing::error!(error = %e, "startup recovery failed");
                    }
                });
            }

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} pipewatch API listening on {}",
                console::style("*").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }

        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
