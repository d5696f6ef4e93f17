use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use longpoll_mq::config::{Cli, Settings};
use longpoll_mq::server::{create_admin_app, create_app, AppState};
use longpoll_mq::shutdown::GracefulShutdown;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.json_logs());

    // Load configuration
    let mut settings = Settings::new()?;
    cli.apply(&mut settings);
    tracing::info!(
        max_queue_size = settings.queue.max_size,
        max_queue_readers = settings.queue.max_readers,
        queue_rps = settings.queue.rps,
        queue_burst = settings.queue.burst,
        "Configuration loaded"
    );

    // Create application state
    let state = AppState::new(settings.clone());
    let shutdown = GracefulShutdown::new(state.registry.clone());

    // Optional admin listener for health, stats and metrics
    let admin_handle = match settings.admin_addr() {
        Some(addr) => {
            let listener = TcpListener::bind(&addr).await?;
            tracing::info!("Admin listening on {}", addr);
            let app = create_admin_app(state.clone());
            let signaled = shutdown.signaled();
            Some(tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, app)
                    .with_graceful_shutdown(signaled)
                    .await
                {
                    tracing::error!(error = %e, "Admin server failed");
                }
            }))
        }
        None => None,
    };

    // Create Axum app
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    let signaled = shutdown.signaled();
    tokio::spawn(shutdown.run());

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(signaled)
        .await?;

    if let Some(handle) = admin_handle {
        let _ = handle.await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
