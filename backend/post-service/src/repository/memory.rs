//! In-process post storage
//!
//! Posts live in an arena: a slot vector of post handles plus an id → slot
//! index, both behind one structural `RwLock` (insert, remove, scan). Each
//! handle owns its post behind its own `Mutex`, so comment/vote/view
//! mutations on different posts never wait on each other.

use super::{PostLocks, PostRepository};
use crate::error::RepositoryError;
use crate::models::{Comment, Post, UserId, Vote};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

/// Concurrency-safe handle owning one stored post. Callers only ever see
/// cloned snapshots; the lock stays private to this module.
struct PostHandle {
    id: String,
    post: Mutex<Post>,
}

impl PostHandle {
    fn new(post: Post) -> Self {
        Self {
            id: post.id.clone(),
            post: Mutex::new(post),
        }
    }

    async fn snapshot(&self) -> Post {
        self.post.lock().await.clone()
    }

    /// Run `f` with the post locked for the whole read-modify-write
    async fn update<R>(&self, f: impl FnOnce(&mut Post) -> R) -> R {
        let mut post = self.post.lock().await;
        f(&mut post)
    }
}

#[derive(Default)]
struct PostArena {
    slots: Vec<Arc<PostHandle>>,
    index: HashMap<String, usize>,
}

impl PostArena {
    fn get(&self, post_id: &str) -> Option<Arc<PostHandle>> {
        self.index.get(post_id).map(|&idx| self.slots[idx].clone())
    }

    fn contains(&self, post_id: &str) -> bool {
        self.index.contains_key(post_id)
    }

    fn insert(&mut self, handle: Arc<PostHandle>) {
        self.index.insert(handle.id.clone(), self.slots.len());
        self.slots.push(handle);
    }

    /// O(1) removal: the last slot is moved into the freed one
    fn remove(&mut self, post_id: &str) -> Option<Arc<PostHandle>> {
        let idx = self.index.remove(post_id)?;
        let removed = self.slots.swap_remove(idx);
        if let Some(moved) = self.slots.get(idx) {
            self.index.insert(moved.id.clone(), idx);
        }
        Some(removed)
    }

    fn handles(&self) -> Vec<Arc<PostHandle>> {
        self.slots.clone()
    }
}

/// In-memory repository, shared by reference across request tasks
#[derive(Default)]
pub struct InMemoryPostRepository {
    arena: RwLock<PostArena>,
    locks: PostLocks,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.arena.read().await.slots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn handle(&self, post_id: &str) -> Result<Arc<PostHandle>, RepositoryError> {
        self.arena
            .read()
            .await
            .get(post_id)
            .ok_or_else(|| RepositoryError::PostNotFound(post_id.to_string()))
    }

    async fn snapshots(&self) -> Vec<Post> {
        let handles = self.arena.read().await.handles();
        let mut posts = Vec::with_capacity(handles.len());
        for handle in handles {
            posts.push(handle.snapshot().await);
        }
        posts
    }
}

#[async_trait::async_trait]
impl PostRepository for InMemoryPostRepository {
    fn locks(&self) -> &PostLocks {
        &self.locks
    }

    async fn get_all(&self) -> Result<Vec<Post>, RepositoryError> {
        Ok(self.snapshots().await)
    }

    async fn filter_by_author(&self, username: &str) -> Result<Vec<Post>, RepositoryError> {
        Ok(self
            .snapshots()
            .await
            .into_iter()
            .filter(|post| post.author.username == username)
            .collect())
    }

    async fn add(&self, mut post: Post) -> Result<Post, RepositoryError> {
        let mut arena = self.arena.write().await;

        // Identity is assigned under the structural write lock
        let mut id = Uuid::new_v4().to_string();
        while arena.contains(&id) {
            id = Uuid::new_v4().to_string();
        }
        post.id = id;

        arena.insert(Arc::new(PostHandle::new(post.clone())));
        debug!(post_id = %post.id, "Stored post in memory");
        Ok(post)
    }

    async fn get_by_id(&self, post_id: &str) -> Result<Option<Post>, RepositoryError> {
        let handle = self.arena.read().await.get(post_id);
        match handle {
            Some(handle) => Ok(Some(handle.snapshot().await)),
            None => Ok(None),
        }
    }

    async fn delete(&self, post_id: &str) -> Result<u64, RepositoryError> {
        let removed = self.arena.write().await.remove(post_id);
        Ok(removed.map_or(0, |_| 1))
    }

    async fn add_comment(&self, post_id: &str, comment: &Comment) -> Result<(), RepositoryError> {
        let handle = self.handle(post_id).await?;
        handle.update(|post| post.push_comment(comment.clone())).await;
        Ok(())
    }

    async fn delete_comment(
        &self,
        post_id: &str,
        comment_id: &str,
    ) -> Result<(), RepositoryError> {
        let handle = self.handle(post_id).await?;
        handle.update(|post| post.remove_comment(comment_id)).await;
        Ok(())
    }

    async fn vote(&self, post_id: &str, vote: &Vote) -> Result<(), RepositoryError> {
        let handle = self.handle(post_id).await?;
        handle.update(|post| post.upsert_vote(*vote)).await;
        Ok(())
    }

    async fn delete_vote(&self, post_id: &str, user_id: UserId) -> Result<(), RepositoryError> {
        let handle = self.handle(post_id).await?;
        handle.update(|post| post.remove_vote(user_id)).await;
        Ok(())
    }

    async fn update_stat(
        &self,
        post_id: &str,
        upvote_percentage: i64,
        score: i64,
    ) -> Result<(), RepositoryError> {
        let handle = self.handle(post_id).await?;
        handle
            .update(|post| {
                post.upvote_percentage = upvote_percentage;
                post.score = score;
            })
            .await;
        Ok(())
    }

    async fn increment_views(&self, post_id: &str) -> Result<Post, RepositoryError> {
        let handle = self.handle(post_id).await?;
        Ok(handle
            .update(|post| {
                post.views += 1;
                post.clone()
            })
            .await)
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
