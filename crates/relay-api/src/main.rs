//! Relay CLI and server entry point.
//!
//! Binary name: `relayd`
//!
//! Parses CLI arguments, resolves configuration, initializes the session
//! core, then dispatches to the command handler or starts the server.

mod cli;
mod http;
mod state;

use std::time::Duration;

use clap::Parser;
use clap_complete::generate;
use secrecy::SecretString;

use relay_infra::config::{default_config_path, load_config};
use relay_observe::{TracingOptions, init_tracing, shutdown_tracing};
use relay_types::protocol::OutboundFrame;

use cli::{Cli, Commands, SessionCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need config or state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "relayd", &mut std::io::stdout());
        return Ok(());
    }

    let (host, port) = match &cli.command {
        Commands::Serve { host, port } => (host.clone(), *port),
        _ => (None, None),
    };
    let (api_key, overrides) = cli.overrides.into_parts(host, port);

    let mut config = match cli.config.clone().or_else(default_config_path) {
        Some(path) => load_config(&path).await,
        None => Default::default(),
    };
    overrides.apply(&mut config);

    let serving = matches!(cli.command, Commands::Serve { .. });
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 if config.debug => "info,relay_core=debug,relay_infra=debug,relayd=debug",
        0 if serving => "info",
        0 => "warn",
        1 => "info,relay_core=debug,relay_infra=debug,relayd=debug",
        _ => "trace",
    };
    init_tracing(&TracingOptions {
        default_filter: filter.to_string(),
        json: cli.log_json,
        otel: cli.otel,
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let state = AppState::init(config, api_key.map(SecretString::from)).await?;

    let result = match cli.command {
        Commands::Serve { .. } => serve(state).await,
        Commands::Session {
            command: SessionCommand::Show { id },
        } => cli::session::show_session(&state, &id, cli.json).await,
        Commands::Check => cli::check::check(&state, cli.json).await,
        Commands::Completions { .. } => Ok(()),
    };

    shutdown_tracing();
    result
}

/// Run the server until Ctrl+C / SIGTERM, then close sessions and drain summaries.
async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!(
        "  {} relayd listening on {}",
        console::style("⚡").bold(),
        console::style(format!("ws://{addr}/ws/session/new")).cyan()
    );
    println!("  {}", console::style("Press Ctrl+C to stop").dim());
    tracing::info!(%addr, "server started");

    let router = http::router::build_router(state.clone());
    let on_shutdown = {
        let state = state.clone();
        async move {
            shutdown_signal().await;
            let notified = state
                .coordinator
                .registry()
                .broadcast(&OutboundFrame::System {
                    content: "Server shutting down".to_string(),
                    session_id: None,
                })
                .await;
            tracing::info!(sessions = notified, "shutting down");
            state.shutdown.cancel();
        }
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(on_shutdown)
        .await?;

    let drain = Duration::from_secs(state.config.session.summary_drain_secs);
    state.sessions.close();
    if tokio::time::timeout(drain, state.sessions.wait()).await.is_err() {
        tracing::warn!("sessions still closing after {drain:?}");
    }
    if !state.coordinator.summarizer().drain(drain).await {
        tracing::warn!(
            pending = state.coordinator.summarizer().pending(),
            "shutdown with summaries still pending"
        );
    }

    println!("\n  Server stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {e}");
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
                tracing::error!("failed to install SIGTERM handler: {e}");
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
