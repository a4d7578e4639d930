//! perms server: the HTTP front end over a permission backend
//!
//! Configuration selects one backend at startup; every request is served
//! from that single instance.

use tokio::net::TcpListener;
use tracing::{info, warn};

pub mod api;
pub mod config;
pub mod error;
pub mod factory;

pub use api::build_router;
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use factory::{create_backend, BackendKind};

/// Install the global `fmt` subscriber. `RUST_LOG` wins over `log_level`.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // A subscriber may already be installed (tests, embedding binaries)
    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}

/// Install logging, build the configured backend and serve until ctrl-c
pub async fn run(config: ServerConfig) -> ServerResult<()> {
    init_tracing(&config.log_level);
    info!(backend = %config.backend, log_level = %config.log_level, "Starting perms server");

    let backend = create_backend(&config)?;
    let app = build_router(backend);

    let listener = TcpListener::bind((config.bind_address.as_str(), config.port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Cannot listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
