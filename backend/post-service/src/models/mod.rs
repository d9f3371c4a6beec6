/// Data models for post-service
///
/// This module defines structures for:
/// - Post: the aggregate root owning its comments and votes
/// - Comment: a comment attached to exactly one post
/// - Vote: one user's +1/-1 on a post
/// - PostInput / CommentInput: creation payloads from the delivery layer
mod input;
mod post;

pub use input::{CommentInput, PostInput};
pub use post::{Author, Comment, Post, PostKind, UserId, Vote, VoteValue};
