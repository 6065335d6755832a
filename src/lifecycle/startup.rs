//! Startup orchestration.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::EngineConfig;
use crate::dispatch::RequestDispatcher;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Bring the engine up and serve until a termination signal arrives.
pub async fn run(config: EngineConfig) -> Result<(), StartupError> {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        model_path = %config.model.path.display(),
        max_paths = config.analyze.max_paths,
        rate_limit_rpm = config.rate_limit.requests_per_minute,
        rate_limit_backend = config.rate_limit.backend.as_str(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let dispatcher = Arc::new(RequestDispatcher::from_config(&config));
    let health = dispatcher.health();
    if let Some(error) = &health.error {
        tracing::error!(error = %error, "Engine starting unhealthy");
    }
    if let Some(warning) = &health.warning {
        tracing::warn!(warning = %warning, "Engine starting degraded");
    }

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config.listener.clone(), dispatcher);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        signals::wait_for_termination().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
