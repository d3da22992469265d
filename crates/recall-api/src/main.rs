//! Recall CLI and REST API entry point.
//!
//! Binary name: `recall`
//!
//! Parses CLI arguments, initializes tracing, storage and the pipeline,
//! then dispatches to the matching command or starts the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use recall_observe::tracing_setup::{init_tracing, shutdown_tracing, LogFormat};
use tokio_util::sync::CancellationToken;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,recall_core=debug,recall_infra=debug",
        _ => "trace",
    };
    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_tracing(filter, format, cli.otel).map_err(|e| anyhow::anyhow!(e))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Initialize application state (DB, classifier, cache)
    let state = AppState::init().await?;

    match cli.command {
        Commands::Ingest { file, sweep } => {
            cli::ingest::ingest(&state, &file, sweep, cli.json).await?;
        }

        Commands::Search { embedding, user } => {
            cli::search::search(&state, &embedding, &user, cli.json).await?;
        }

        Commands::Show { turn_id } => {
            cli::turn::show_turn(&state, &turn_id, cli.json).await?;
        }

        Commands::Session { id, limit } => {
            cli::turn::list_session(&state, id, limit, cli.json).await?;
        }

        Commands::Status => {
            cli::status::status(&state, cli.json).await?;
        }

        Commands::Serve { port, host } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} Recall API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let cancel = CancellationToken::new();
            let sweeper = state.start_sweeper(cancel.clone());
            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            cancel.cancel();
            if let Some(sweeper) = sweeper {
                if let Err(e) = sweeper.await {
                    tracing::warn!(error = %e, "Cache sweeper task failed");
                }
            }

            println!("\n  Server stopped.");
        }
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
