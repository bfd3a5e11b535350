use std::sync::Arc;

use agentcore_core::agent::AgentHandle;
use agentcore_server::context::DEFAULT_ACTOR_ID;
use agentcore_server::{router, AgentSettings, AppContext, EntrypointMode};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "agentcore-server")]
#[command(about = "Serve an agent on the AgentCore runtime contract (/invocations, /ping)")]
struct Cli {
    /// Host to bind the server to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to bind the server to
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Reply shape when the caller does not send `Accept: text/event-stream`
    #[arg(long, env = "ENTRYPOINT_MODE", value_enum, default_value_t = EntrypointMode::Sync)]
    mode: EntrypointMode,

    /// Actor id used when the runtime does not send one
    #[arg(long, env = "ACTOR_ID", default_value = DEFAULT_ACTOR_ID)]
    actor_id: String,

    /// Session id used when the runtime does not send one; random per process otherwise
    #[arg(long, env = "SESSION_ID")]
    session_id: Option<String>,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run(Cli::parse()).await {
        tracing::error!(error = %format!("{e:#}"), "agentcore-server failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = AgentSettings::from_env()?;
    tracing::debug!(?settings, "Loaded settings");

    let agent = settings.build_agent().await?;
    let descriptor = agent.describe().await;

    let mut ctx = AppContext::new(Arc::new(agent))
        .with_mode(cli.mode)
        .with_default_actor(cli.actor_id);
    if let Some(session_id) = cli.session_id {
        ctx = ctx.with_default_session(session_id);
    }

    let bind_addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(
        addr = %bind_addr,
        agent = %descriptor.name,
        version = %descriptor.version,
        mode = ?cli.mode,
        "Server ready"
    );

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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

    tracing::info!("Shutdown signal received, stopping server");
}
