//! correlog sample service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id ─▶ catch panic ─▶ request span ─▶ /logging/* handlers
//!                                                      │                 │
//!                                                      │ Context         │ Logger
//!                                                      ▼                 ▼
//!                                               TracerProvider    HandlerRegistry
//!                                                      │                 │
//!                                                      ▼                 ▼
//!                                            BatchSpanProcessor    Formatter → stdout
//!                                                      │
//!                                                      ▼
//!                                           OTLP/HTTP collector
//! ```
//!
//! Third-party `tracing` output (hyper, tower_http, axum) is bridged into the
//! same registry so every line on stdout shares one format.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use correlog::config::loader;
use correlog::{configure, HttpServer, Level, Shutdown};

#[derive(Debug, Parser)]
#[command(name = "correlog", version, about = "Sample service with log/trace correlation")]
struct Cli {
    /// Optional TOML configuration file; environment variables override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the configuration.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = loader::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }

    let telemetry = configure(&config)?;

    // Level filtering happens in the registry; the env filter only keeps
    // callsites below the configured level from firing at all.
    let directive = if config.logging.level <= Level::Debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| directive.into()))
        .with(telemetry.bridge_layer())
        .init();
    telemetry.install_panic_hook();

    tracing::info!(
        service = %config.tracing.service_name,
        version = env!("CARGO_PKG_VERSION"),
        "correlog starting"
    );
    tracing::info!(
        format = ?config.logging.format,
        export = config.tracing.export_enabled(),
        endpoint = %config.tracing.otlp_endpoint,
        "Telemetry configured"
    );

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            // Keep the sender alive so the server is not stopped by the drop.
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
        shutdown.trigger();
    });

    HttpServer::new(&telemetry).run(listener, signal).await?;

    telemetry.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
