//! Memo Cache - demo host service
//!
//! Runs a report service with cached operations and mounts the cache
//! inspector under the configured path.

mod demo;

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memo_cache::{create_router, AppState, CacheContext, Config};

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache context and the demo service
/// 4. Nest the inspector router under the configured path
/// 5. Start HTTP server on configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memo_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Memo Cache demo service");

    let config = Config::from_env();
    info!(
        "Configuration loaded: port={}, inspector_path={}, estimate_memory={}, track_owners={}, oplock_timeout={}ms",
        config.server_port,
        config.inspector_path,
        config.estimate_memory,
        config.track_owners,
        config.oplock_timeout_ms
    );

    let context = CacheContext::builder()
        .track_owners(config.track_owners)
        .build();
    let service = demo::ReportService::new(&context, &config)
        .context("failed to configure cached operations")?;

    let inspector = create_router(AppState::from_config(context, &config));
    // Layered before nesting: the inspector routes keep only their own trace layer
    let app = demo::router(service)
        .layer(TraceLayer::new_for_http())
        .nest(&config.inspector_path, inspector);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);
    info!("Cache inspector at http://{}{}/stats", addr, config.inspector_path);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
