//! lexi-import - CSV import service for legal content
//!
//! Hosts import wizards (articles, commentaires, décisions, legislations
//! and combined legislation files) over HTTP and submits the results to the
//! CMS bulk-import endpoints.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use lexi_common::config::{CliOverrides, ConfigResolver};
use lexi_common::logging::init_tracing;
use lexi_common::AuthContext;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use lexi_import::cms::CmsClient;
use lexi_import::AppState;

/// Command-line arguments for lexi-import
#[derive(Parser, Debug)]
#[command(name = "lexi-import")]
#[command(about = "CSV import wizards for the legal-content CMS")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "LEXI_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (host:port)
    #[arg(short, long, env = "LEXI_BIND")]
    bind: Option<String>,

    /// CMS base URL
    #[arg(long, env = "LEXI_CMS_URL")]
    cms_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolver = ConfigResolver::new(CliOverrides {
        config_path: args.config,
        bind_address: args.bind,
        cms_base_url: args.cms_url,
    });
    let config = resolver
        .resolve()
        .context("Failed to resolve configuration")?;

    init_tracing(&config.log_level);

    info!("Starting lexi-import v{}", env!("CARGO_PKG_VERSION"));
    info!("CMS: {} (imports under /{})", config.cms.base_url, config.cms.import_namespace);

    let default_auth = AuthContext::from_env();
    if !default_auth.is_authenticated() {
        warn!("No default CMS token; requests must send their own Authorization header to submit imports");
    }

    let client = CmsClient::new(config.cms.clone()).context("Failed to create CMS client")?;
    let state = AppState::new(Arc::new(client), default_auth, config.cms.page_size);
    state.wizards.spawn_idle_sweep(config.wizard_idle_timeout);
    info!("Idle wizards dropped after {}s", config.wizard_idle_timeout.as_secs());

    let app = lexi_import::build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_address))?;
    info!("Listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
