//! PostgreSQL post storage
//!
//! PostgreSQL is used as a document store: one `posts` row per aggregate, with
//! author, votes and comments held as JSONB documents. Comment and vote
//! mutations are single-statement partial updates of those documents, so two
//! users voting on the same post never overwrite each other's comments.
//!
//! Every statement runs under `query_timeout` and reports
//! `RepositoryError::Timeout` when it expires.

use super::{PostLocks, PostRepository};
use crate::config::DatabaseConfig;
use crate::error::RepositoryError;
use crate::models::{Author, Comment, Post, UserId, Vote};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgQueryResult};
use sqlx::types::Json;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

macro_rules! select_posts {
    ($tail:literal) => {
        concat!(
            "SELECT id, kind, title, category, body_text, url, author, views, score, ",
            "upvote_percentage, votes, comments, created_at FROM posts ",
            $tail
        )
    };
}

const RETURNING_POST: &str = "RETURNING id, kind, title, category, body_text, url, author, views, \
                              score, upvote_percentage, votes, comments, created_at";

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    kind: String,
    title: String,
    category: String,
    body_text: Option<String>,
    url: Option<String>,
    author: Json<Author>,
    views: i64,
    score: i64,
    upvote_percentage: i64,
    votes: Json<Vec<Vote>>,
    comments: Json<Vec<Comment>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PostRow> for Post {
    type Error = RepositoryError;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        Ok(Post {
            id: row.id.to_string(),
            views: row.views,
            kind: row.kind.parse().map_err(RepositoryError::Decode)?,
            title: row.title,
            category: row.category,
            text: row.body_text,
            url: row.url,
            score: row.score,
            upvote_percentage: row.upvote_percentage,
            votes: row.votes.0,
            author: row.author.0,
            comments: row.comments.0,
            created: row.created_at,
        })
    }
}

/// PostgreSQL-backed post repository
#[derive(Clone)]
pub struct PostgresPostRepository {
    pool: PgPool,
    query_timeout: Duration,
    locks: PostLocks,
}

impl PostgresPostRepository {
    pub fn new(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
            locks: PostLocks::new(),
        }
    }

    /// Create a pool from configuration and verify it with `SELECT 1`
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, RepositoryError> {
        let connect_timeout = Duration::from_secs(config.connect_timeout_secs);

        debug!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            acquire_timeout_secs = config.acquire_timeout_secs,
            "Creating PostgreSQL pool for posts"
        );

        let connect = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .test_before_acquire(true)
            .connect(&config.url);

        let pool = match tokio::time::timeout(connect_timeout, connect).await {
            Ok(pool) => pool?,
            Err(_) => {
                error!(
                    timeout_secs = config.connect_timeout_secs,
                    "Database connection timeout"
                );
                return Err(RepositoryError::Timeout {
                    operation: "connect",
                    timeout: connect_timeout,
                });
            }
        };

        let repo = Self::new(pool, config.query_timeout());
        repo.health_check().await?;
        info!("PostgreSQL pool created and verified successfully");
        Ok(repo)
    }

    /// Apply the bundled schema migrations
    pub async fn migrate(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Post storage migrations completed successfully");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, RepositoryError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(result) => result.map_err(RepositoryError::from),
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.query_timeout.as_millis() as u64,
                    "PostgreSQL statement timed out"
                );
                Err(RepositoryError::Timeout {
                    operation,
                    timeout: self.query_timeout,
                })
            }
        }
    }

    /// Sub-operations on a post that does not exist touch zero rows
    fn ensure_updated(result: PgQueryResult, post_id: &str) -> Result<(), RepositoryError> {
        if result.rows_affected() == 0 {
            return Err(RepositoryError::PostNotFound(post_id.to_string()));
        }
        Ok(())
    }

    fn require_id(post_id: &str) -> Result<Uuid, RepositoryError> {
        Uuid::parse_str(post_id).map_err(|_| RepositoryError::PostNotFound(post_id.to_string()))
    }
}

#[async_trait::async_trait]
impl PostRepository for PostgresPostRepository {
    fn locks(&self) -> &PostLocks {
        &self.locks
    }

    async fn get_all(&self) -> Result<Vec<Post>, RepositoryError> {
        let rows = self
            .bounded(
                "get_all",
                sqlx::query_as::<_, PostRow>(select_posts!("ORDER BY seq")).fetch_all(&self.pool),
            )
            .await?;

        rows.into_iter().map(Post::try_from).collect()
    }

    async fn filter_by_author(&self, username: &str) -> Result<Vec<Post>, RepositoryError> {
        let rows = self
            .bounded(
                "filter_by_author",
                sqlx::query_as::<_, PostRow>(select_posts!(
                    "WHERE author->>'username' = $1 ORDER BY seq"
                ))
                .bind(username)
                .fetch_all(&self.pool),
            )
            .await?;

        rows.into_iter().map(Post::try_from).collect()
    }

    async fn add(&self, post: Post) -> Result<Post, RepositoryError> {
        let sql = format!(
            r#"
            INSERT INTO posts (kind, title, category, body_text, url, author, views, score,
                               upvote_percentage, votes, comments, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            {}
            "#,
            RETURNING_POST
        );

        let row = self
            .bounded(
                "add",
                sqlx::query_as::<_, PostRow>(&sql)
                    .bind(post.kind.as_str())
                    .bind(&post.title)
                    .bind(&post.category)
                    .bind(&post.text)
                    .bind(&post.url)
                    .bind(Json(&post.author))
                    .bind(post.views)
                    .bind(post.score)
                    .bind(post.upvote_percentage)
                    .bind(Json(&post.votes))
                    .bind(Json(&post.comments))
                    .bind(post.created)
                    .fetch_one(&self.pool),
            )
            .await?;

        let stored = Post::try_from(row)?;
        debug!(post_id = %stored.id, "Inserted post into PostgreSQL");
        Ok(stored)
    }

    async fn get_by_id(&self, post_id: &str) -> Result<Option<Post>, RepositoryError> {
        let Ok(id) = Uuid::parse_str(post_id) else {
            return Ok(None);
        };

        let row = self
            .bounded(
                "get_by_id",
                sqlx::query_as::<_, PostRow>(select_posts!("WHERE id = $1"))
                    .bind(id)
                    .fetch_optional(&self.pool),
            )
            .await?;

        row.map(Post::try_from).transpose()
    }

    async fn delete(&self, post_id: &str) -> Result<u64, RepositoryError> {
        let Ok(id) = Uuid::parse_str(post_id) else {
            return Ok(0);
        };

        let result = self
            .bounded(
                "delete",
                sqlx::query("DELETE FROM posts WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool),
            )
            .await?;

        Ok(result.rows_affected())
    }

    async fn add_comment(&self, post_id: &str, comment: &Comment) -> Result<(), RepositoryError> {
        let id = Self::require_id(post_id)?;

        let result = self
            .bounded(
                "add_comment",
                sqlx::query("UPDATE posts SET comments = comments || $2 WHERE id = $1")
                    .bind(id)
                    .bind(Json(std::slice::from_ref(comment)))
                    .execute(&self.pool),
            )
            .await?;

        Self::ensure_updated(result, post_id)
    }

    async fn delete_comment(
        &self,
        post_id: &str,
        comment_id: &str,
    ) -> Result<(), RepositoryError> {
        let id = Self::require_id(post_id)?;

        let result = self
            .bounded(
                "delete_comment",
                sqlx::query(
                    r#"
                    UPDATE posts
                    SET comments = COALESCE(
                        (SELECT jsonb_agg(c.elem ORDER BY c.ord)
                         FROM jsonb_array_elements(comments) WITH ORDINALITY AS c(elem, ord)
                         WHERE c.elem->>'id' <> $2),
                        '[]'::jsonb
                    )
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .bind(comment_id)
                .execute(&self.pool),
            )
            .await?;

        Self::ensure_updated(result, post_id)
    }

    async fn vote(&self, post_id: &str, vote: &Vote) -> Result<(), RepositoryError> {
        let id = Self::require_id(post_id)?;

        // Pull the user's previous vote and push the new one in one statement
        let result = self
            .bounded(
                "vote",
                sqlx::query(
                    r#"
                    UPDATE posts
                    SET votes = COALESCE(
                        (SELECT jsonb_agg(v.elem ORDER BY v.ord)
                         FROM jsonb_array_elements(votes) WITH ORDINALITY AS v(elem, ord)
                         WHERE (v.elem->>'user')::bigint <> $2),
                        '[]'::jsonb
                    ) || $3
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .bind(vote.user_id)
                .bind(Json(std::slice::from_ref(vote)))
                .execute(&self.pool),
            )
            .await?;

        Self::ensure_updated(result, post_id)
    }

    async fn delete_vote(&self, post_id: &str, user_id: UserId) -> Result<(), RepositoryError> {
        let id = Self::require_id(post_id)?;

        let result = self
            .bounded(
                "delete_vote",
                sqlx::query(
                    r#"
                    UPDATE posts
                    SET votes = COALESCE(
                        (SELECT jsonb_agg(v.elem ORDER BY v.ord)
                         FROM jsonb_array_elements(votes) WITH ORDINALITY AS v(elem, ord)
                         WHERE (v.elem->>'user')::bigint <> $2),
                        '[]'::jsonb
                    )
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .bind(user_id)
                .execute(&self.pool),
            )
            .await?;

        Self::ensure_updated(result, post_id)
    }

    async fn update_stat(
        &self,
        post_id: &str,
        upvote_percentage: i64,
        score: i64,
    ) -> Result<(), RepositoryError> {
        let id = Self::require_id(post_id)?;

        let result = self
            .bounded(
                "update_stat",
                sqlx::query("UPDATE posts SET upvote_percentage = $2, score = $3 WHERE id = $1")
                    .bind(id)
                    .bind(upvote_percentage)
                    .bind(score)
                    .execute(&self.pool),
            )
            .await?;

        Self::ensure_updated(result, post_id)
    }

    async fn increment_views(&self, post_id: &str) -> Result<Post, RepositoryError> {
        let id = Self::require_id(post_id)?;
        let sql = format!(
            "UPDATE posts SET views = views + 1 WHERE id = $1 {}",
            RETURNING_POST
        );

        let row = self
            .bounded(
                "increment_views",
                sqlx::query_as::<_, PostRow>(&sql)
                    .bind(id)
                    .fetch_optional(&self.pool),
            )
            .await?;

        match row {
            Some(row) => Post::try_from(row),
            None => Err(RepositoryError::PostNotFound(post_id.to_string())),
        }
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        self.bounded(
            "health_check",
            sqlx::query("SELECT 1").execute(&self.pool),
        )
        .await?;
        Ok(())
    }
}
