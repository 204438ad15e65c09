//! Sanctum - guild portal gateway

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sanctum::{config::Args, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("sanctum={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Sanctum - Guild Portal Gateway");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Groupware: {}{}", args.groupware_url, args.groupware_api_prefix);
    if let Some(ref host) = args.groupware_host {
        info!("Groupware host header: {}", host);
    }
    info!("Account service: {}", args.account_api_url);
    info!(
        "Timeouts: api {}ms, upload {}ms, avatar {}ms",
        args.request_timeout_ms, args.upload_timeout_ms, args.avatar_timeout_ms
    );
    info!("======================================");

    // Create application state
    let state = Arc::new(server::AppState::new(args));

    // Run the server
    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
