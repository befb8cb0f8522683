// ============================================================================
// chatmem - HTTP chat service with session-scoped vector memory
// ============================================================================
// Usage:
//   chatmem [serve]                 Serve POST /chat (default)
//   chatmem --port 8080 serve       Override the listening port
//   chatmem stats                   Show memory collection statistics
// ============================================================================

use anyhow::Result;
use chatmem_core::{ChatConfig, TurnStore};
use chatmem_server::{build_chat_service, build_turn_store, router, AppState};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Chat service with session-scoped memory
#[derive(Parser)]
#[command(name = "chatmem", version, about = "Memory-augmented chat service")]
struct Cli {
    /// Host to bind (default: $HOST or 0.0.0.0)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Port to listen on (default: $PORT or 5000)
    #[arg(long, global = true)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the chat API
    Serve,

    /// Show memory collection statistics
    Stats,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,chatmem_core=debug,chatmem_server=debug,tower_http=debug")
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Could not load .env file: {}", e);
    }

    init_tracing();

    let cli = Cli::parse();
    let mut config = ChatConfig::from_env()?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => cmd_serve(config).await,
        Commands::Stats => cmd_stats(config).await,
    }
}

async fn cmd_serve(config: ChatConfig) -> Result<()> {
    info!("Starting chatmem");

    let chat = build_chat_service(&config).await?;
    let app = router(AppState::new(chat));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn cmd_stats(config: ChatConfig) -> Result<()> {
    let store = build_turn_store(&config, config.embedding_dim).await?;
    let stats = store.stats().await?;

    println!("=== chatmem Memory Stats ===");
    println!("Backend:    {:?}", config.memory_backend);
    println!("Collection: {}", config.collection);
    println!("Turns:      {}", stats.points_count);

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
