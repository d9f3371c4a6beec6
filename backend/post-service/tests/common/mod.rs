//! Shared repository conformance checks
//!
//! Every backend must pass the same checks, so each function here takes an
//! `Arc<dyn PostRepository>` and is called from the per-backend test files.
//! Usernames are randomized so the checks can share a database with other runs.

#![allow(dead_code)]

use post_service::error::RepositoryError;
use post_service::models::{Author, Comment, CommentInput, Post, PostInput, PostKind, Vote};
use post_service::{PostManager, PostRepository};
use rand::Rng;
use serde_json::{json, Value};
use std::sync::Arc;

pub type Repo = Arc<dyn PostRepository>;

pub fn unique_username(prefix: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!("{}_{:08x}", prefix, suffix)
}

pub fn text_input(title: &str) -> PostInput {
    PostInput {
        kind: PostKind::Text,
        title: title.to_string(),
        category: "music".to_string(),
        text: Some(format!("{} body", title)),
        url: None,
    }
}

pub fn link_input(title: &str) -> PostInput {
    PostInput {
        kind: PostKind::Link,
        title: title.to_string(),
        category: "programming".to_string(),
        text: None,
        url: Some("https://docs.rs".to_string()),
    }
}

pub fn comment(body: &str) -> CommentInput {
    CommentInput {
        comment: body.to_string(),
    }
}

async fn seed(repo: &Repo, username: &str, title: &str) -> Post {
    repo.add(Post::new(Author::new(7, username), text_input(title)))
        .await
        .expect("add post")
}

/// Snapshot without backend-assigned identities and timestamps
pub fn normalize(post: &Post) -> Value {
    let mut value = serde_json::to_value(post).expect("serialize post");
    if let Some(obj) = value.as_object_mut() {
        obj.remove("id");
        obj.remove("created");
        if let Some(Value::Array(comments)) = obj.get_mut("comments") {
            for comment in comments {
                if let Some(c) = comment.as_object_mut() {
                    c.remove("id");
                    c.remove("created");
                }
            }
        }
    }
    value
}

pub async fn add_assigns_identity(repo: Repo) {
    let username = unique_username("ident");
    let first = seed(&repo, &username, "first").await;
    let second = seed(&repo, &username, "second").await;

    assert!(!first.id.is_empty());
    assert_ne!(first.id, second.id);

    let fetched = repo.get_by_id(&first.id).await.unwrap().expect("stored");
    assert_eq!(fetched, first);
    assert_eq!(fetched.views, 0);
    assert_eq!(fetched.score, 0);
    assert_eq!(fetched.upvote_percentage, 0);
    assert!(fetched.votes.is_empty());
    assert!(fetched.comments.is_empty());
}

pub async fn link_post_keeps_only_url(repo: Repo) {
    let username = unique_username("link");
    let stored = repo
        .add(Post::new(Author::new(3, &username), link_input("crates")))
        .await
        .unwrap();

    let fetched = repo.get_by_id(&stored.id).await.unwrap().unwrap();
    assert_eq!(fetched.kind, PostKind::Link);
    assert_eq!(fetched.url.as_deref(), Some("https://docs.rs"));
    assert_eq!(fetched.text, None);
}

pub async fn listing_and_author_filter(repo: Repo) {
    let alice = unique_username("alice");
    let bob = unique_username("bob");
    let a1 = seed(&repo, &alice, "a1").await;
    let b1 = seed(&repo, &bob, "b1").await;
    let a2 = seed(&repo, &alice, "a2").await;

    let all: Vec<String> = repo.get_all().await.unwrap().into_iter().map(|p| p.id).collect();
    for id in [&a1.id, &b1.id, &a2.id] {
        assert!(all.contains(id));
    }

    let by_alice: Vec<String> = repo
        .filter_by_author(&alice)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.title)
        .collect();
    assert_eq!(by_alice, vec!["a1", "a2"]);

    let nobody = repo.filter_by_author(&unique_username("nobody")).await.unwrap();
    assert!(nobody.is_empty());
}

pub async fn missing_and_malformed_ids_are_absent(repo: Repo) {
    assert!(repo.get_by_id("not-a-post-id").await.unwrap().is_none());
    assert!(repo
        .get_by_id("00000000-0000-4000-8000-000000000000")
        .await
        .unwrap()
        .is_none());
    assert_eq!(repo.delete("not-a-post-id").await.unwrap(), 0);
}

pub async fn delete_reports_count(repo: Repo) {
    let post = seed(&repo, &unique_username("del"), "gone").await;

    assert_eq!(repo.delete(&post.id).await.unwrap(), 1);
    assert_eq!(repo.delete(&post.id).await.unwrap(), 0);
    assert!(repo.get_by_id(&post.id).await.unwrap().is_none());
}

pub async fn comments_keep_order(repo: Repo) {
    let post = seed(&repo, &unique_username("comm"), "thread").await;
    let author = Author::new(11, "commenter");
    let c1 = Comment::new(author.clone(), "one");
    let c2 = Comment::new(author.clone(), "two");
    let c3 = Comment::new(author, "three");

    for c in [&c1, &c2, &c3] {
        repo.add_comment(&post.id, c).await.unwrap();
    }
    repo.delete_comment(&post.id, &c2.id).await.unwrap();
    // unknown comment ids are ignored
    repo.delete_comment(&post.id, "no-such-comment").await.unwrap();

    let stored = repo.get_by_id(&post.id).await.unwrap().unwrap();
    let bodies: Vec<&str> = stored.comments.iter().map(|c| c.body.as_str()).collect();
    assert_eq!(bodies, vec!["one", "three"]);
    assert_eq!(stored.comments[0].id, c1.id);
    assert_eq!(stored.comments[1].author.username, "commenter");
}

pub async fn vote_upsert_replaces_previous(repo: Repo) {
    let post = seed(&repo, &unique_username("vote"), "poll").await;

    repo.vote(&post.id, &Vote::up(1)).await.unwrap();
    repo.vote(&post.id, &Vote::up(2)).await.unwrap();
    repo.vote(&post.id, &Vote::down(1)).await.unwrap();

    let stored = repo.get_by_id(&post.id).await.unwrap().unwrap();
    assert_eq!(stored.votes, vec![Vote::up(2), Vote::down(1)]);

    repo.delete_vote(&post.id, 2).await.unwrap();
    // removing a vote the user does not have is a no-op
    repo.delete_vote(&post.id, 99).await.unwrap();

    let stored = repo.get_by_id(&post.id).await.unwrap().unwrap();
    assert_eq!(stored.votes, vec![Vote::down(1)]);
}

pub async fn stats_and_views_persist(repo: Repo) {
    let post = seed(&repo, &unique_username("stat"), "stats").await;

    repo.update_stat(&post.id, 67, 1).await.unwrap();
    let viewed = repo.increment_views(&post.id).await.unwrap();
    assert_eq!(viewed.views, 1);
    assert_eq!(viewed.upvote_percentage, 67);
    assert_eq!(viewed.score, 1);

    let viewed = repo.increment_views(&post.id).await.unwrap();
    assert_eq!(viewed.views, 2);
    assert_eq!(repo.get_by_id(&post.id).await.unwrap().unwrap().views, 2);
}

pub async fn mutating_missing_post_is_not_found(repo: Repo) {
    let post = seed(&repo, &unique_username("miss"), "short-lived").await;
    repo.delete(&post.id).await.unwrap();

    let c = Comment::new(Author::new(1, "late"), "too late");
    let results = vec![
        repo.add_comment(&post.id, &c).await,
        repo.delete_comment(&post.id, &c.id).await,
        repo.vote(&post.id, &Vote::up(1)).await,
        repo.delete_vote(&post.id, 1).await,
        repo.update_stat(&post.id, 100, 1).await,
    ];
    for result in results {
        assert!(matches!(result, Err(RepositoryError::PostNotFound(_))));
    }
    assert!(matches!(
        repo.increment_views(&post.id).await,
        Err(RepositoryError::PostNotFound(_))
    ));
}

pub async fn health_check_passes(repo: Repo) {
    repo.health_check().await.unwrap();
}

/// Drive a fixed sequence of manager operations and return the normalized
/// final post. Two backends are equivalent when their results compare equal.
pub async fn reference_script(repo: Repo, username: &str) -> Value {
    let manager = PostManager::new(repo);

    let post = manager
        .create(Author::new(1, username), text_input("reference"))
        .await
        .unwrap();
    let id = post.id;

    for (user, body) in [(2, "first"), (3, "second"), (4, "third")] {
        manager
            .create_comment(&id, Author::new(user, "commenter"), comment(body))
            .await
            .unwrap();
    }

    manager.upvote(&id, 1).await.unwrap();
    manager.upvote(&id, 2).await.unwrap();
    let post = manager.downvote(&id, 3).await.unwrap();
    assert_eq!((post.score, post.upvote_percentage), (1, 67));

    let post = manager.downvote(&id, 1).await.unwrap();
    assert_eq!((post.score, post.upvote_percentage), (-1, 33));

    let second_id = post.comments[1].id.clone();
    let post = manager.delete_comment(&id, &second_id).await.unwrap();
    assert_eq!(post.comments.len(), 2);

    let post = manager.unvote(&id, 3).await.unwrap();
    assert_eq!((post.score, post.upvote_percentage), (0, 50));

    let post = manager.get(&id).await.unwrap();
    normalize(&post)
}

/// The normalized post `reference_script` must leave behind on every backend
pub fn expected_reference_snapshot(username: &str) -> Value {
    json!({
        "views": 1,
        "type": "text",
        "title": "reference",
        "category": "music",
        "text": "reference body",
        "url": null,
        "score": 0,
        "upvotePercentage": 50,
        "votes": [
            { "user": 2, "vote": 1 },
            { "user": 1, "vote": -1 }
        ],
        "author": { "username": username, "id": 1 },
        "comments": [
            { "author": { "username": "commenter", "id": 2 }, "body": "first" },
            { "author": { "username": "commenter", "id": 4 }, "body": "third" }
        ]
    })
}
