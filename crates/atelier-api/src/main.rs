//! Atelier CLI and HTTP/WebSocket server entry point.
//!
//! Binary name: `atelier`
//!
//! Parses CLI arguments, wires the flat-file stores and the workflow runner,
//! then dispatches to a command handler or starts the server.

mod cli;
mod http;
mod state;

use std::time::Duration;

use clap::Parser;
use clap_complete::generate;

use atelier_infra::watch::WorkspaceWatcher;
use atelier_observe::{TracingOptions, init_tracing, shutdown_tracing};
use cli::{Cli, Commands};
use state::AppState;

/// Quiet period before a burst of external file changes is reported.
const WATCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = TracingOptions::from_verbosity(cli.verbose, cli.quiet).with_json(cli.json);
    if let Err(e) = init_tracing(&options) {
        eprintln!("Warning: failed to initialize tracing: {e}");
    }

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "atelier", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init().await?;
    let result = dispatch(&state, cli).await;

    shutdown_tracing();
    result
}

async fn dispatch(state: &AppState, cli: Cli) -> anyhow::Result<()> {
    let json = cli.json;
    match cli.command {
        Commands::Serve { host, port } => serve(state, host, port, cli.quiet).await?,

        Commands::Create { name, requirement } => {
            cli::project::create_project(state, name, requirement, json).await?;
        }

        Commands::List => cli::project::list_projects(state, json).await?,

        Commands::Show { project } => cli::project::show_project(state, &project, json).await?,

        Commands::Delete { project, force } => {
            cli::project::delete_project(state, &project, force, json).await?;
        }

        Commands::Run { project, step } => cli::run::run_workflow(state, &project, step, json).await?,

        Commands::Status { project } => cli::status::status(state, &project, json).await?,

        Commands::Log { project, limit } => cli::project::show_log(state, &project, limit, json).await?,

        Commands::Files { project } => cli::project::list_files(state, &project, json).await?,

        Commands::Agents => cli::status::agents(state, json).await?,

        Commands::Reset { project } => cli::run::reset_workflow(state, &project, json).await?,

        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Run the HTTP/WebSocket server until Ctrl+C or SIGTERM.
async fn serve(state: &AppState, host: Option<String>, port: Option<u16>, quiet: bool) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| state.config.server.host.clone());
    let port = port.unwrap_or(state.config.server.port);
    let addr = format!("{host}:{port}");

    // External edits are reported to live previews; the server runs without it.
    let _watcher = match WorkspaceWatcher::start(&state.layout, state.registry.clone(), WATCH_DEBOUNCE) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::warn!(error = %e, "workspace watcher unavailable; external edits will not be pushed");
            None
        }
    };

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    if !quiet {
        println!(
            "  {} Atelier listening on {}",
            console::style("⚡").bold(),
            console::style(format!("http://{addr}")).cyan()
        );
        if state.config.server.api_token.is_some() {
            println!("  {}", console::style("API token required for /api/v1").dim());
        }
        println!("  {}", console::style("Press Ctrl+C to stop").dim());
    }

    run_server(state, listener, shutdown_signal()).await?;

    if !quiet {
        println!("\n  Server stopped.");
    }
    Ok(())
}

/// Serve until `signal` resolves.
///
/// On the signal, live workflow runs are cancelled and `state.shutdown`
/// fires before connections drain, so event streams end instead of holding
/// the server open. Returns once cancelled runs have recorded their outcome.
async fn run_server<F>(state: &AppState, listener: tokio::net::TcpListener, signal: F) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let router = http::router::build_router(state.clone());
    let runner = state.runner.clone();
    let shutdown = state.shutdown.clone();

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            signal.await;
            let cancelled = runner.cancel_all();
            if cancelled > 0 {
                tracing::info!(runs = cancelled, "cancelling active workflow runs on shutdown");
            }
            shutdown.cancel();
        })
        .await?;

    for run in state.runner.active_runs() {
        state.runner.wait(&run.project_id).await;
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
