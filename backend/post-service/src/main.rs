use post_service::telemetry::init_tracing;
use post_service::{build_repository, Config, PostManager};
use std::io;

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler, waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Post Service
///
/// Loads configuration, installs tracing, builds the configured post storage
/// and keeps the manager alive until SIGTERM or Ctrl+C.
#[tokio::main]
async fn main() -> io::Result<()> {
    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_tracing(&config.logging) {
        eprintln!("WARNING: tracing subscriber already installed: {}", e);
    }

    tracing::info!("Starting post-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        env = %config.app.env,
        backend = ?config.storage.backend,
        database = ?config.storage.database,
        "Configuration loaded"
    );

    let repo = build_repository(&config.storage).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to initialize post storage");
        io::Error::new(io::ErrorKind::Other, e.to_string())
    })?;

    let manager = PostManager::new(repo);
    manager.repository().health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Post storage health check failed");
        io::Error::new(io::ErrorKind::Other, e.to_string())
    })?;

    let posts = manager
        .get_all()
        .await
        .map(|posts| posts.len())
        .unwrap_or_default();
    tracing::info!(posts, "post-service ready");

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping post-service");
    Ok(())
}
