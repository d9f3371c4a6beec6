/// Post manager - business rules on top of a PostRepository
///
/// Handles existence checks, author attribution, comment identity and the
/// vote tally. Comment, vote and delete sequences run under the post's lock so
/// the read, the write and the stat update act as one logical unit. The lock
/// table belongs to the repository: any number of managers (one per worker,
/// or clones of one) may share a repository.
use crate::domain::{Tally, VoteChange};
use crate::error::{PostError, RepositoryError, Result};
use crate::models::{Author, Comment, CommentInput, Post, PostInput, UserId, Vote};
use crate::repository::PostRepository;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use validator::Validate;

#[derive(Clone)]
pub struct PostManager {
    repo: Arc<dyn PostRepository>,
}

impl PostManager {
    pub fn new(repo: Arc<dyn PostRepository>) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &Arc<dyn PostRepository> {
        &self.repo
    }

    /// All posts
    pub async fn get_all(&self) -> Result<Vec<Post>> {
        self.repo
            .get_all()
            .await
            .map_err(|e| storage_failure("Cant fetch posts", e))
    }

    /// Posts by author username; an empty result is not an error
    pub async fn filter_by_author(&self, username: &str) -> Result<Vec<Post>> {
        self.repo
            .filter_by_author(username)
            .await
            .map_err(|e| storage_failure("Cant fetch posts by author", e))
    }

    /// Create a post attributed to `author`
    pub async fn create(&self, author: Author, input: PostInput) -> Result<Post> {
        input.validate()?;

        let post = self
            .repo
            .add(Post::new(author, input))
            .await
            .map_err(|e| storage_failure("Repo error during post creation", e))?;

        info!(post_id = %post.id, author = %post.author.username, "Post created");
        Ok(post)
    }

    /// Fetch a post and count the view.
    ///
    /// A failed view increment is logged and the fetched post is returned as is.
    pub async fn get(&self, post_id: &str) -> Result<Post> {
        let post = self.fetch(post_id).await?;

        match self.repo.increment_views(post_id).await {
            Ok(updated) => Ok(updated),
            Err(e) => {
                warn!(%post_id, error = %e, "Cant increment post views");
                Ok(post)
            }
        }
    }

    pub async fn create_comment(
        &self,
        post_id: &str,
        author: Author,
        input: CommentInput,
    ) -> Result<Post> {
        let _guard = self.repo.locks().lock(post_id).await;
        let mut post = self.fetch(post_id).await?;

        let comment = Comment::new(author, input.comment);
        self.repo
            .add_comment(post_id, &comment)
            .await
            .map_err(|e| storage_failure("Cant add comment", e))?;

        debug!(%post_id, comment_id = %comment.id, "Comment added");
        post.push_comment(comment);
        Ok(post)
    }

    /// Deleting an unknown comment id is a silent no-op
    pub async fn delete_comment(&self, post_id: &str, comment_id: &str) -> Result<Post> {
        let _guard = self.repo.locks().lock(post_id).await;
        let mut post = self.fetch(post_id).await?;

        self.repo
            .delete_comment(post_id, comment_id)
            .await
            .map_err(|e| storage_failure("Cant delete comment", e))?;

        if !post.remove_comment(comment_id) {
            debug!(%post_id, %comment_id, "Comment not present, nothing deleted");
        }
        Ok(post)
    }

    /// Delete a post, returning its last state
    pub async fn delete_post(&self, post_id: &str) -> Result<Post> {
        let _guard = self.repo.locks().lock(post_id).await;
        let post = self.fetch(post_id).await?;

        let deleted = self
            .repo
            .delete(post_id)
            .await
            .map_err(|e| storage_failure("Cant delete post", e))?;

        // Someone else removed it between our read and the delete
        if deleted == 0 {
            info!(%post_id, "Post already deleted");
            return Err(PostError::NotFound);
        }

        info!(%post_id, "Post deleted");
        Ok(post)
    }

    pub async fn upvote(&self, post_id: &str, user_id: UserId) -> Result<Post> {
        self.vote(post_id, Vote::up(user_id)).await
    }

    pub async fn downvote(&self, post_id: &str, user_id: UserId) -> Result<Post> {
        self.vote(post_id, Vote::down(user_id)).await
    }

    /// Remove the user's vote; a user without a vote gets the post back untouched
    pub async fn unvote(&self, post_id: &str, user_id: UserId) -> Result<Post> {
        let _guard = self.repo.locks().lock(post_id).await;
        let mut post = self.fetch(post_id).await?;

        if post.remove_vote(user_id).is_none() {
            debug!(%post_id, user_id, "No vote to remove");
            return Ok(post);
        }

        self.repo
            .delete_vote(post_id, user_id)
            .await
            .map_err(|e| storage_failure("Cant remove vote", e))?;

        self.persist_tally(&mut post).await?;
        Ok(post)
    }

    async fn vote(&self, post_id: &str, vote: Vote) -> Result<Post> {
        let _guard = self.repo.locks().lock(post_id).await;
        let mut post = self.fetch(post_id).await?;

        let change = VoteChange::classify(post.find_vote(vote.user_id).map(|v| v.vote), vote.vote);
        if change.is_noop() {
            debug!(%post_id, user_id = vote.user_id, "Vote not changed");
            return Ok(post);
        }

        self.repo
            .vote(post_id, &vote)
            .await
            .map_err(|e| storage_failure("Cant record vote", e))?;

        post.upsert_vote(vote);
        self.persist_tally(&mut post).await?;

        debug!(
            %post_id,
            user_id = vote.user_id,
            ?change,
            score = post.score,
            upvote_percentage = post.upvote_percentage,
            "Vote recorded"
        );
        Ok(post)
    }

    /// Recompute score and percentage from the post's votes and store them.
    /// A failure here fails the whole vote operation.
    async fn persist_tally(&self, post: &mut Post) -> Result<()> {
        let tally = Tally::from_votes(&post.votes);
        post.apply_tally(&tally);

        self.repo
            .update_stat(&post.id, post.upvote_percentage, post.score)
            .await
            .map_err(|e| storage_failure("Cant update post stats", e))
    }

    async fn fetch(&self, post_id: &str) -> Result<Post> {
        match self.repo.get_by_id(post_id).await {
            Ok(Some(post)) => Ok(post),
            Ok(None) => {
                info!(%post_id, "Item not found");
                Err(PostError::NotFound)
            }
            Err(e) => Err(storage_failure("Repo error during post fetching", e)),
        }
    }
}

/// Classify a repository error: a vanished post is the not-found sentinel,
/// everything else is logged and wrapped.
fn storage_failure(context: &str, err: RepositoryError) -> PostError {
    match err {
        RepositoryError::PostNotFound(post_id) => {
            info!(%post_id, "{}: post no longer exists", context);
            PostError::NotFound
        }
        other => {
            error!(error = %other, "{}", context);
            PostError::Internal(format!("{}: {}", context, other))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PostKind;
    use crate::repository::PostLocks;
    use async_trait::async_trait;
    use mockall::mock;
    use mockall::predicate::eq;
    use std::time::Duration;

    mock! {
        pub Repo {}

        #[async_trait]
        impl PostRepository for Repo {
            fn locks(&self) -> &PostLocks;
            async fn get_all(&self) -> std::result::Result<Vec<Post>, RepositoryError>;
            async fn filter_by_author(&self, username: &str) -> std::result::Result<Vec<Post>, RepositoryError>;
            async fn add(&self, post: Post) -> std::result::Result<Post, RepositoryError>;
            async fn get_by_id(&self, post_id: &str) -> std::result::Result<Option<Post>, RepositoryError>;
            async fn delete(&self, post_id: &str) -> std::result::Result<u64, RepositoryError>;
            async fn add_comment(&self, post_id: &str, comment: &Comment) -> std::result::Result<(), RepositoryError>;
            async fn delete_comment(&self, post_id: &str, comment_id: &str) -> std::result::Result<(), RepositoryError>;
            async fn vote(&self, post_id: &str, vote: &Vote) -> std::result::Result<(), RepositoryError>;
            async fn delete_vote(&self, post_id: &str, user_id: UserId) -> std::result::Result<(), RepositoryError>;
            async fn update_stat(&self, post_id: &str, upvote_percentage: i64, score: i64) -> std::result::Result<(), RepositoryError>;
            async fn increment_views(&self, post_id: &str) -> std::result::Result<Post, RepositoryError>;
            async fn health_check(&self) -> std::result::Result<(), RepositoryError>;
        }
    }

    fn mock_repo() -> MockRepo {
        let mut repo = MockRepo::new();
        repo.expect_locks().return_const(PostLocks::new());
        repo
    }

    fn stored_post() -> Post {
        let mut post = Post::new(
            Author::new(1, "alice"),
            PostInput {
                kind: PostKind::Link,
                title: "rust".to_string(),
                category: "programming".to_string(),
                text: None,
                url: Some("https://www.rust-lang.org".to_string()),
            },
        );
        post.id = "p1".to_string();
        post
    }

    fn timeout(operation: &'static str) -> RepositoryError {
        RepositoryError::Timeout {
            operation,
            timeout: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_view_increment_failure_is_swallowed() {
        let mut repo = mock_repo();
        repo.expect_get_by_id()
            .returning(|_| Ok(Some(stored_post())));
        repo.expect_increment_views()
            .times(1)
            .returning(|_| Err(timeout("increment_views")));

        let manager = PostManager::new(Arc::new(repo));
        let post = manager.get("p1").await.unwrap();
        assert_eq!(post.views, 0);
        assert_eq!(post.id, "p1");
    }

    #[tokio::test]
    async fn test_vote_write_failure_is_internal_error() {
        let mut repo = mock_repo();
        repo.expect_get_by_id()
            .returning(|_| Ok(Some(stored_post())));
        repo.expect_vote()
            .returning(|_, _| Err(timeout("vote")));
        repo.expect_update_stat().never();

        let manager = PostManager::new(Arc::new(repo));
        let err = manager.upvote("p1", 9).await.unwrap_err();
        assert!(matches!(err, PostError::Internal(msg) if msg.contains("Cant record vote")));
    }

    #[tokio::test]
    async fn test_stat_failure_fails_the_vote() {
        let mut repo = mock_repo();
        repo.expect_get_by_id()
            .returning(|_| Ok(Some(stored_post())));
        repo.expect_vote().times(1).returning(|_, _| Ok(()));
        repo.expect_update_stat()
            .with(eq("p1"), eq(100_i64), eq(1_i64))
            .times(1)
            .returning(|_, _, _| Err(timeout("update_stat")));

        let manager = PostManager::new(Arc::new(repo));
        let err = manager.upvote("p1", 9).await.unwrap_err();
        assert!(matches!(err, PostError::Internal(_)));
    }

    #[tokio::test]
    async fn test_unchanged_vote_does_not_touch_storage() {
        let mut repo = mock_repo();
        repo.expect_get_by_id().returning(|_| {
            let mut post = stored_post();
            post.upsert_vote(Vote::down(4));
            post.apply_tally(&post.tally());
            Ok(Some(post))
        });
        repo.expect_vote().never();
        repo.expect_update_stat().never();

        let manager = PostManager::new(Arc::new(repo));
        let post = manager.downvote("p1", 4).await.unwrap();
        assert_eq!(post.score, -1);
        assert_eq!(post.votes.len(), 1);
    }

    #[tokio::test]
    async fn test_vanished_post_maps_to_not_found() {
        let mut repo = mock_repo();
        repo.expect_get_by_id()
            .returning(|_| Ok(Some(stored_post())));
        repo.expect_add_comment()
            .returning(|post_id, _| Err(RepositoryError::PostNotFound(post_id.to_string())));

        let manager = PostManager::new(Arc::new(repo));
        let err = manager
            .create_comment(
                "p1",
                Author::new(2, "bob"),
                CommentInput {
                    comment: "late".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_internal_not_not_found() {
        let mut repo = mock_repo();
        repo.expect_get_by_id()
            .returning(|_| Err(timeout("get_by_id")));

        let manager = PostManager::new(Arc::new(repo));
        let err = manager.delete_post("p1").await.unwrap_err();
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_delete_race_reports_not_found() {
        let mut repo = mock_repo();
        repo.expect_get_by_id()
            .returning(|_| Ok(Some(stored_post())));
        repo.expect_delete().returning(|_| Ok(0));

        let manager = PostManager::new(Arc::new(repo));
        assert!(manager.delete_post("p1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_storage() {
        let mut repo = mock_repo();
        repo.expect_add().never();

        let manager = PostManager::new(Arc::new(repo));
        let err = manager
            .create(
                Author::new(1, "alice"),
                PostInput {
                    kind: PostKind::Text,
                    title: "empty".to_string(),
                    category: "misc".to_string(),
                    text: None,
                    url: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PostError::Validation(_)));
    }
}
