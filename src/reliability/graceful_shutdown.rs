//! Graceful shutdown handling for production reliability.
//!
//! Provides utilities to handle shutdown signals gracefully, allowing active
//! requests to complete and resources to be cleaned up properly.

use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Handle for managing graceful shutdown.
#[derive(Clone)]
pub struct GracefulShutdown {
    /// Sender for shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GracefulShutdown {
    /// Create a new graceful shutdown handler.
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self { shutdown_tx }
    }

    /// Get a receiver for shutdown signals.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Trigger graceful shutdown.
    pub fn shutdown(&self) {
        info!("Initiating graceful shutdown");
        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal: {}", e);
        }
    }

    /// Wait for shutdown signals (SIGINT, SIGTERM) in a background task.
    pub fn wait_for_signal(&self) {
        let shutdown_tx = self.shutdown_tx.clone();

        tokio::spawn(async move {
            let ctrl_c = async {
                if let Err(e) = signal::ctrl_c().await {
                    error!("Failed to install Ctrl+C handler: {}", e);
                }
            };

            #[cfg(unix)]
            let terminate = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut stream) => {
                        stream.recv().await;
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
                    info!("Received Ctrl+C signal");
                },
                _ = terminate => {
                    info!("Received SIGTERM signal");
                }
            }

            info!("Shutdown signal received, initiating graceful shutdown");
            if let Err(e) = shutdown_tx.send(()) {
                error!("Failed to broadcast shutdown signal: {}", e);
            }
        });
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}
