//! Graceful shutdown handling for the queue service.
//!
//! On Ctrl+C or SIGTERM:
//! 1. Every queue is closed, releasing producers blocked on a full buffer
//!    and consumers blocked in a long-poll
//! 2. Listeners stop accepting connections and drain in-flight requests

use std::future::Future;
use std::sync::Arc;

use tokio::signal;
use tokio::sync::broadcast;

use crate::queue::QueueRegistry;

/// Fans a single shutdown trigger out to every listener
#[derive(Clone)]
pub struct GracefulShutdown {
    registry: Arc<QueueRegistry>,
    shutdown_tx: broadcast::Sender<()>,
}

impl GracefulShutdown {
    pub fn new(registry: Arc<QueueRegistry>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            registry,
            shutdown_tx,
        }
    }

    /// Future that resolves once shutdown has been triggered.
    ///
    /// Suitable for `axum::serve(..).with_graceful_shutdown(..)`.
    pub fn signaled(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.shutdown_tx.subscribe();
        let registry = self.registry.clone();
        async move {
            if registry.is_closed() {
                return;
            }
            let _ = rx.recv().await;
        }
    }

    /// Close all queues, then tell the listeners to stop
    pub fn trigger(&self, reason: &str) {
        tracing::info!(reason = %reason, "Starting graceful shutdown");
        let closed = self.registry.close_all();
        let _ = self.shutdown_tx.send(());
        tracing::info!(queues_closed = closed, "Shutdown signaled to listeners");
    }

    /// Wait for an OS signal, then trigger shutdown
    pub async fn run(self) {
        let reason = wait_for_signal().await;
        self.trigger(reason);
    }
}

async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
            "ctrl_c"
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
            "terminate"
        }
    }
}
