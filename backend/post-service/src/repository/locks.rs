//! Keyed per-post locks
//!
//! Owned by each repository, so every manager sharing that repository also
//! shares its locks. The manager holds a post's lock across the whole
//! read-modify-write of a comment, vote or delete sequence. Different posts
//! use different locks.
//! An entry is dropped from the table as soon as nobody holds or waits on it.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockTable = DashMap<String, Arc<Mutex<()>>>;

#[derive(Clone, Default)]
pub struct PostLocks {
    table: Arc<LockTable>,
}

impl PostLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `post_id`
    pub async fn lock(&self, post_id: &str) -> PostLockGuard {
        let mutex = self
            .table
            .entry(post_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let guard = mutex.lock_owned().await;

        PostLockGuard {
            post_id: post_id.to_string(),
            table: self.table.clone(),
            guard: Some(guard),
        }
    }

    /// Number of posts with a live lock entry
    pub fn active(&self) -> usize {
        self.table.len()
    }
}

pub struct PostLockGuard {
    post_id: String,
    table: Arc<LockTable>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for PostLockGuard {
    fn drop(&mut self) {
        // Release first so the table's Arc is the only one left when idle
        self.guard.take();
        self.table
            .remove_if(&self.post_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
