use super::PostLocks;
use crate::error::RepositoryError;
use crate::models::{Comment, Post, UserId, Vote};

/// Trait defining the storage capabilities the post manager relies on.
/// Both InMemoryPostRepository and PostgresPostRepository implement this, and
/// the shared conformance suite in `tests/common` runs against each of them.
///
/// Score and upvote percentage are never computed here; the manager computes
/// them and persists them through `update_stat`.
#[async_trait::async_trait]
pub trait PostRepository: Send + Sync {
    /// Per-post lock table shared by every manager built on this repository
    fn locks(&self) -> &PostLocks;

    /// All posts in the backend's native order
    async fn get_all(&self) -> Result<Vec<Post>, RepositoryError>;

    /// Posts whose author has the given username
    async fn filter_by_author(&self, username: &str) -> Result<Vec<Post>, RepositoryError>;

    /// Persist a new post, assigning its identity. Returns the stored post.
    async fn add(&self, post: Post) -> Result<Post, RepositoryError>;

    /// Absent (including malformed ids) is `Ok(None)`, not an error
    async fn get_by_id(&self, post_id: &str) -> Result<Option<Post>, RepositoryError>;

    /// Number of posts removed; 0 means not found
    async fn delete(&self, post_id: &str) -> Result<u64, RepositoryError>;

    /// Append a comment to the post's comment sequence
    async fn add_comment(&self, post_id: &str, comment: &Comment) -> Result<(), RepositoryError>;

    /// Remove a comment; unknown comment ids are ignored
    async fn delete_comment(&self, post_id: &str, comment_id: &str)
        -> Result<(), RepositoryError>;

    /// Upsert the user's vote (pull any previous vote, then push the new one)
    async fn vote(&self, post_id: &str, vote: &Vote) -> Result<(), RepositoryError>;

    /// Remove the user's vote; no-op when the user has none
    async fn delete_vote(&self, post_id: &str, user_id: UserId) -> Result<(), RepositoryError>;

    /// Persist manager-computed aggregate fields
    async fn update_stat(
        &self,
        post_id: &str,
        upvote_percentage: i64,
        score: i64,
    ) -> Result<(), RepositoryError>;

    /// Atomically bump the view counter and return the updated post
    async fn increment_views(&self, post_id: &str) -> Result<Post, RepositoryError>;

    /// Health check
    async fn health_check(&self) -> Result<(), RepositoryError>;
}
