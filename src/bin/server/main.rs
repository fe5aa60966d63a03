//! Scholar Analytics HTTP Server
//!
//! Serves the analytics endpoints over an in-memory document store seeded
//! from a JSON file.
//!
//! # Endpoints
//!
//! - `GET /api/v1/fe/{dimension}/{view}` - Analytics views
//! - `GET /api/v1/cache/stats` - Response cache statistics
//! - `GET /health` - Health check
//! - `GET /metrics` - Prometheus metrics
//!
//! # CLI Commands
//!
//! - `start` - Start the HTTP server (default if no command specified)
//! - `check-config` - Validate configuration and print a summary
//!
//! # Configuration
//!
//! The server reads configuration from:
//! 1. `--config` flag or `ANALYTICS_CONFIG` environment variable
//! 2. `./analytics.toml` in current directory
//! 3. Default configuration

use clap::{Parser, Subcommand};
use scholar_analytics::config::Config;
use scholar_analytics::pipeline::DIMENSIONS;
use scholar_analytics::server::{build_router, AppState};
use scholar_analytics::store::{DocumentStore, InMemoryStore, AUTHORS, PAPERS, VENUES};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{debug, info, warn};

// =============================================================================
// CLI Definition
// =============================================================================

/// Scholar Analytics - aggregation engine for a scholarly paper corpus
#[derive(Parser)]
#[command(name = "scholar-analytics")]
#[command(version)]
#[command(about = "Analytics and aggregation API over scholarly paper metadata", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file (overrides ANALYTICS_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override listen address (e.g., 0.0.0.0:8080)
    #[arg(short, long, global = true)]
    listen: Option<String>,

    /// Override seed file path
    #[arg(short, long, global = true)]
    seed: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Start,

    /// Validate configuration without starting the server
    CheckConfig,
}

/// Load configuration and apply CLI overrides
fn load_config(cli: &Cli) -> Result<(Config, Option<PathBuf>), Box<dyn std::error::Error>> {
    let (mut config, source) = Config::load(cli.config.as_deref())?;

    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen.clone();
    }
    if let Some(seed) = &cli.seed {
        config.store.seed_path = Some(seed.clone());
    }
    config.validate()?;

    Ok((config, source))
}

// =============================================================================
// CLI Command Handlers
// =============================================================================

/// Validate configuration and print summary
fn cmd_check_config(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let (config, source) = load_config(cli)?;

    println!("Configuration is valid!");
    match &source {
        Some(path) => println!("  Source: {}", path.display()),
        None => println!("  Source: defaults"),
    }
    println!();
    println!("Server Settings:");
    println!("  Listen address: {}", config.server.listen_addr);
    println!("  Log level: {}", config.server.log_level);
    if config.server.cors_allowed_origins.is_empty() {
        println!("  CORS origins: any");
    } else {
        println!("  CORS origins: {}", config.server.cors_allowed_origins.join(", "));
    }
    println!();
    println!("Cache Settings:");
    println!("  Enabled: {}", config.cache.enabled);
    match config.cache.ttl_secs {
        0 => println!("  TTL: never expire"),
        ttl => println!("  TTL: {}s", ttl),
    }
    match config.cache.max_entries {
        0 => println!("  Max entries: unbounded"),
        n => println!("  Max entries: {} per dimension", n),
    }
    println!("  Normalize keys: {}", config.cache.normalize_keys);
    println!();
    println!("Analytics Settings:");
    println!(
        "  Year domain: {}..={}",
        config.analytics.min_year, config.analytics.max_year
    );
    println!("  List limit: {}", config.analytics.list_limit);
    println!(
        "  Dimensions: {}",
        DIMENSIONS
            .iter()
            .map(|d| d.name)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();
    println!("Store Settings:");
    match &config.store.seed_path {
        Some(path) => println!("  Seed file: {}", path.display()),
        None => println!("  Seed file: none (empty store)"),
    }
    println!();
    println!("Monitoring Settings:");
    println!("  Metrics enabled: {}", config.monitoring.metrics_enabled);

    Ok(())
}

// =============================================================================
// Server Setup
// =============================================================================

/// Graceful shutdown signal handler
///
/// A failed signal registration is logged and that signal is ignored.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {},
            Err(e) => {
                warn!(
                    error = %e,
                    "Ctrl+C handler installation failed - graceful shutdown unavailable"
                );
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(e) => {
                warn!(
                    error = %e,
                    "SIGTERM handler installation failed - SIGTERM shutdown unavailable"
                );
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

/// Build the document store
fn init_store(config: &Config) -> Result<Arc<InMemoryStore>, Box<dyn std::error::Error>> {
    let store = match &config.store.seed_path {
        Some(path) => InMemoryStore::from_seed_file(path)?,
        None => {
            warn!("No seed file configured, serving an empty store");
            InMemoryStore::new()
        },
    };
    info!(
        papers = store.len(PAPERS),
        authors = store.len(AUTHORS),
        venues = store.len(VENUES),
        "Document store ready"
    );
    Ok(Arc::new(store))
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::CheckConfig) => return cmd_check_config(&cli),
        Some(Commands::Start) | None => {},
    }

    let (config, source) = load_config(&cli)?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.server.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    info!("Starting Scholar Analytics Server v{}", env!("CARGO_PKG_VERSION"));
    debug!(
        source = ?source,
        listen_addr = %config.server.listen_addr,
        cache_ttl_secs = config.cache.ttl_secs,
        "Configuration loaded"
    );

    scholar_analytics::metrics::init();

    let store = init_store(&config)?;
    let store: Arc<dyn DocumentStore> = store;
    let state = Arc::new(AppState::from_config(&config, store));

    let app = build_router(state);

    let addr = config.listen_addr()?;
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
