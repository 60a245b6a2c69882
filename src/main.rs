//! Edge API gateway for the profile service.
//!
//! This is the entry point for the gateway. It initializes the
//! configuration, builds the per-operation dispatch stacks over the
//! configured backend instances, and starts the HTTP server.

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt;

use profile_gateway::{
    auth::{StaticTokenVerifier, TokenVerifier},
    config::Config,
    dispatch::Directory,
    error::Result,
    reliability::GracefulShutdown,
    server::{create_router, AppState, ProfileEndpoints},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .json()
        .init();

    // Load configuration
    let config = Config::load()?;

    info!(
        instances = config.backend_instances.len(),
        retry_max_attempts = config.retry_max_attempts,
        "Gateway configuration loaded"
    );

    // The configured instance list is a fixed directory; a discovery-backed
    // implementation would push updates through the same channel.
    let directory = Directory::fixed(config.backend_instances.clone());

    let verifier: Arc<dyn TokenVerifier> = Arc::new(StaticTokenVerifier::from_config(&config));

    // One dispatch stack per profile operation, all tracking the directory.
    let endpoints = ProfileEndpoints::from_config(&config, &directory);

    // Create application state and router
    let state = Arc::new(AppState::new(endpoints, verifier));
    let app = create_router(state.clone());

    // Start server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let shutdown = GracefulShutdown::new();
    shutdown.wait_for_signal();
    let mut shutdown_rx = shutdown.subscribe();

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await?;

    // The listener has drained; release every live backend handle.
    state.endpoints.shutdown();
    info!("closing api-gateway");

    Ok(())
}
