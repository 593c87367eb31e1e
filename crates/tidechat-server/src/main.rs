//! Tidechat server - streaming chat completions over HTTP
//!
//! Fronts multiple LLM providers with quota/balance fallback, best-effort
//! title generation, and SQLite-backed chat persistence.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tidechat_core::storage::Database;
use tidechat_core::ProviderClient;
use tidechat_server::{routes, AppState};

/// Tidechat HTTP server
#[derive(Parser)]
#[command(name = "tidechat-server")]
#[command(about = "Streaming chat completion gateway with provider fallback", long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// Path to the SQLite database file
    #[arg(long, default_value = "tidechat.db")]
    database: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let db = Database::open_shared(&cli.database)?;
    let backend = Arc::new(ProviderClient::from_env());
    let state = AppState::new(backend, db);

    let app = routes::router(state);
    let listener = tokio::net::TcpListener::bind(cli.bind).await?;
    info!("Listening on {}", cli.bind);

    axum::serve(listener, app).await?;
    Ok(())
}
