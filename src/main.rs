use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use secrecy::SecretString;

use couch_core::persona::Persona;
use couch_engine::{IdentityResolver, SessionOrchestrator};
use couch_llm::{AlwaysGateway, GoogleGateway, ModelGateway, TimeoutGateway};
use couch_server::{AppState, ServerConfig};
use couch_store::Database;

#[derive(Parser, Debug)]
#[command(name = "couch", about = "Conversation session server for persona chat")]
struct Args {
    /// Port to listen on.
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// SQLite database path. Defaults to ~/.couch/database/couch.db.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Model to generate persona replies with.
    #[arg(long, default_value = "gemini-2.0-flash")]
    model: String,

    /// Per-request timeout budget in seconds.
    #[arg(long, default_value_t = 120)]
    request_timeout_secs: u64,

    /// Serve canned replies instead of calling the model API.
    #[arg(long)]
    mock: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    tracing::info!("Starting couch server");

    let db_path = match args.db {
        Some(path) => path,
        None => dirs_home().join(".couch").join("database").join("couch.db"),
    };
    let db = Database::open(&db_path).context("open database")?;
    tracing::info!(path = %db_path.display(), "Database opened");

    let gateway: Arc<dyn ModelGateway> = if args.mock {
        tracing::warn!("Running with a mock gateway; replies are canned");
        Arc::new(AlwaysGateway::new("(He looks up briefly, then away) Okay."))
    } else {
        let api_key = std::env::var("GEMINI_API_KEY")
            .context("GEMINI_API_KEY must be set (or pass --mock)")?;
        let google = GoogleGateway::new(SecretString::from(api_key), args.model.clone());
        // Leave headroom under the HTTP-layer timeout so a slow model call
        // surfaces as a gateway timeout, not a dropped connection.
        let model_budget = Duration::from_secs(args.request_timeout_secs.saturating_sub(10).max(1));
        Arc::new(TimeoutGateway::new(google, model_budget))
    };

    let orchestrator = SessionOrchestrator::new(db.clone(), gateway, Persona::pritam());
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        identity: Arc::new(IdentityResolver::new(db)),
        model_name: args.model,
    };

    let config = ServerConfig {
        port: args.port,
        request_timeout_secs: args.request_timeout_secs,
    };
    let handle = couch_server::start(config, state)
        .await
        .context("start server")?;

    tracing::info!(port = handle.port, "couch server ready");

    tokio::signal::ctrl_c()
        .await
        .context("listen for ctrl+c")?;

    tracing::info!("Shutting down");
    Ok(())
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
