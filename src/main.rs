//! medline-search: HTTP search gateway for the MedlinePlus topics table
//!
//! This is the main entry point for the application.

use anyhow::{Context, Result};
use medline_search::{
    config,
    source::PostgrestSource,
    web::{create_router, AppState},
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let Some(config_path) = parse_args() else {
        return Ok(());
    };

    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Starting medline-search v{}", medline_search::VERSION);

    // Load configuration
    let settings = config::load(config_path.as_deref())?;
    settings.validate()?;
    info!(
        "Using table {} at {}",
        settings.source.table, settings.source.url
    );

    // Initialize data source client
    let source = PostgrestSource::with_settings(&settings.source)
        .context("failed to build data source client")?;
    info!("Data source client initialized");

    let addr = SocketAddr::new(
        settings.server.bind_address.parse()?,
        settings.server.port,
    );

    // Create application state and router
    let state = AppState::new(settings, Arc::new(source));
    let app = create_router(state)?;

    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Parse command line arguments.
///
/// Returns `None` when the process should exit after printing help or version.
fn parse_args() -> Option<Option<PathBuf>> {
    let mut args = std::env::args().skip(1);
    let mut config_path = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => config_path = args.next().map(PathBuf::from),
            "-h" | "--help" => {
                print_usage();
                return None;
            }
            "-V" | "--version" => {
                println!("medline-search {}", medline_search::VERSION);
                return None;
            }
            other => eprintln!("Ignoring unknown argument: {}", other),
        }
    }

    Some(config_path)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Print usage information
fn print_usage() {
    println!(
        r#"
medline-search v{}
A search gateway over the MedlinePlus health topics table

USAGE:
    medline-search [OPTIONS]

OPTIONS:
    -c, --config <FILE>    Path to configuration file
    -h, --help             Print help information
    -V, --version          Print version information

ENVIRONMENT VARIABLES:
    MEDLINE_SETTINGS_PATH    Path to settings.yml
    MEDLINE_PORT             Server port
    MEDLINE_BIND_ADDRESS     Bind address
    MEDLINE_ALLOWED_ORIGINS  Comma-separated CORS origins
    SUPABASE_URL             Data source endpoint (required)
    SUPABASE_KEY             Data source access key (required)
    SUPABASE_TABLE           Table name (default MEDLINEPLUS)
    RUST_LOG                 Log filter (default info)
"#,
        medline_search::VERSION
    );
}
