use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::post;
use axum::Router;
use clap::Parser;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber;

use rategate::config::GatewayConfig;
use rategate::http::HttpServer;
use rategate::ratelimit::{spawn_reload, RateLimitEngine, RedisCounterStore, RuleStore};

/// rategate - Distributed HTTP rate limiting gateway
#[derive(Parser, Debug)]
#[command(name = "rategate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the gateway configuration file
    #[arg(short = 'c', long = "config")]
    config: Option<String>,

    /// Path to the rate limit rules document
    #[arg(short = 'r', long = "rules")]
    rules: Option<String>,

    /// HTTP server address
    #[arg(short = 'a', long = "addr")]
    addr: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("Starting rategate");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration: defaults, then environment, then file, then CLI
    let mut config = GatewayConfig::default();
    config.apply_env();
    if let Some(ref path) = args.config {
        config = GatewayConfig::from_file(path)?;
    }

    if let Some(rules_path) = args.rules {
        config.rules.path = rules_path;
    }
    let addr: std::net::SocketAddr = args
        .addr
        .unwrap_or_else(|| config.server.addr())
        .parse()?;

    info!(addr = %addr, rules = %config.rules.path, "Configuration loaded");

    // Connect to the counter store; refusing to start without one beats
    // serving unlimited traffic.
    let counter_store = Arc::new(RedisCounterStore::connect(&config.redis.url()).await?);

    // Initial rule load is fatal; reload failures later are not.
    let rule_store = Arc::new(RuleStore::new());
    let count = rule_store.load_from_file(&config.rules.path)?;
    info!(rule_count = count, "Rules loaded");

    let _reload_task = spawn_reload(
        rule_store.clone(),
        PathBuf::from(&config.rules.path),
        Duration::from_secs(config.rules.reload_interval_secs),
    );

    let engine = Arc::new(RateLimitEngine::new(rule_store, counter_store));

    let app = Router::new()
        .route("/api/auth/login", post(|| async { "Hello, World!" }))
        .layer(TraceLayer::new_for_http());

    let server = HttpServer::new(addr, engine);
    server.serve_with_shutdown(app, shutdown_signal(addr)).await?;

    info!("rategate stopped");
    Ok(())
}

/// Resolve once the process is asked to stop, then let the server drain.
async fn shutdown_signal(addr: std::net::SocketAddr) {
    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = signal::ctrl_c() => {
            result.expect("failed to install Ctrl+C handler");
            info!(addr = %addr, "Ctrl+C received, draining gateway connections");
        }
        _ = terminate => {
            info!(addr = %addr, "SIGTERM received, draining gateway connections");
        }
    }
}
