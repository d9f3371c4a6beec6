mod locks;
mod memory;
mod postgres;
mod r#trait;

pub use locks::{PostLockGuard, PostLocks};
pub use memory::InMemoryPostRepository;
pub use postgres::PostgresPostRepository;
pub use r#trait::PostRepository;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::RepositoryError;
use std::sync::Arc;
use tracing::info;

/// Build the repository selected by configuration.
///
/// The PostgreSQL backend connects, verifies the connection and applies the
/// bundled migrations before it is handed out.
pub async fn build_repository(
    config: &StorageConfig,
) -> Result<Arc<dyn PostRepository>, RepositoryError> {
    match config.backend {
        StorageBackend::Memory => {
            info!("Using in-memory post storage");
            Ok(Arc::new(InMemoryPostRepository::new()))
        }
        StorageBackend::Postgres => {
            let repo = PostgresPostRepository::connect(&config.database).await?;
            repo.migrate().await?;
            info!("Using PostgreSQL post storage");
            Ok(Arc::new(repo))
        }
    }
}
