/// Post Service Library
///
/// Owns the post aggregate (posts with their comments and up/down votes) and the
/// vote tally that keeps score and upvote percentage consistent under concurrent
/// mutation. The same business logic runs against an in-process store or a
/// durable PostgreSQL document store.
///
/// # Modules
///
/// - `models`: Post, Comment, Vote and the creation inputs
/// - `domain`: Tally policy (score and upvote percentage arithmetic)
/// - `repository`: Storage capability trait with memory and PostgreSQL backends
/// - `services`: Post manager enforcing existence checks and vote semantics
/// - `error`: Error types and HTTP status mapping
/// - `config`: Configuration management
/// - `telemetry`: Tracing subscriber setup
pub mod config;
pub mod domain;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod telemetry;

pub use config::Config;
pub use error::{PostError, RepositoryError, Result};
pub use repository::{build_repository, InMemoryPostRepository, PostRepository, PostgresPostRepository};
pub use services::PostManager;
