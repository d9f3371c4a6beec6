use crate::domain::tally::Tally;
use crate::models::PostInput;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a user in the relational credential store
pub type UserId = i64;

/// Attribution of a post or comment, supplied by the request layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub username: String,
    pub id: UserId,
}

impl Author {
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            id,
        }
    }
}

/// Post type: a text post carries a body, a link post carries a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Text,
    Link,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostKind::Text => "text",
            PostKind::Link => "link",
        }
    }
}

impl fmt::Display for PostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(PostKind::Text),
            "link" => Ok(PostKind::Link),
            other => Err(format!("unknown post type '{}'", other)),
        }
    }
}

/// Direction of a vote. Persisted and serialized as `1` / `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum VoteValue {
    Up,
    Down,
}

impl VoteValue {
    pub fn as_i64(self) -> i64 {
        match self {
            VoteValue::Up => 1,
            VoteValue::Down => -1,
        }
    }
}

impl From<VoteValue> for i64 {
    fn from(value: VoteValue) -> Self {
        value.as_i64()
    }
}

impl TryFrom<i64> for VoteValue {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(VoteValue::Up),
            -1 => Ok(VoteValue::Down),
            other => Err(format!("vote must be 1 or -1, got {}", other)),
        }
    }
}

/// A single user's vote on a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "user")]
    pub user_id: UserId,
    pub vote: VoteValue,
}

impl Vote {
    pub fn up(user_id: UserId) -> Self {
        Self {
            user_id,
            vote: VoteValue::Up,
        }
    }

    pub fn down(user_id: UserId) -> Self {
        Self {
            user_id,
            vote: VoteValue::Down,
        }
    }
}

/// Comment owned by a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: Author,
    pub body: String,
    pub created: DateTime<Utc>,
}

impl Comment {
    pub fn new(author: Author, body: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            author,
            body: body.into(),
            created: Utc::now(),
        }
    }
}

/// Post aggregate: the unit of mutation and locking.
///
/// Score and upvote percentage are stored alongside the votes; they are always
/// derived from `votes` through [`Tally`] and written back with [`Post::apply_tally`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub views: i64,
    #[serde(rename = "type")]
    pub kind: PostKind,
    pub title: String,
    pub category: String,
    pub text: Option<String>,
    pub url: Option<String>,
    pub score: i64,
    pub upvote_percentage: i64,
    pub votes: Vec<Vote>,
    pub author: Author,
    pub comments: Vec<Comment>,
    pub created: DateTime<Utc>,
}

impl Post {
    /// Build a fresh, not yet persisted post. The id is assigned by the repository.
    pub fn new(author: Author, input: PostInput) -> Self {
        let (text, url) = match input.kind {
            PostKind::Text => (input.text, None),
            PostKind::Link => (None, input.url),
        };

        Self {
            id: String::new(),
            views: 0,
            kind: input.kind,
            title: input.title,
            category: input.category,
            text,
            url,
            score: 0,
            upvote_percentage: 0,
            votes: Vec::new(),
            author,
            comments: Vec::new(),
            created: Utc::now(),
        }
    }

    pub fn find_vote(&self, user_id: UserId) -> Option<&Vote> {
        self.votes.iter().find(|v| v.user_id == user_id)
    }

    /// Replace any previous vote of the same user, appending the new one
    pub fn upsert_vote(&mut self, vote: Vote) {
        self.votes.retain(|v| v.user_id != vote.user_id);
        self.votes.push(vote);
    }

    /// Returns the removed vote, if the user had one
    pub fn remove_vote(&mut self, user_id: UserId) -> Option<Vote> {
        let idx = self.votes.iter().position(|v| v.user_id == user_id)?;
        Some(self.votes.remove(idx))
    }

    pub fn push_comment(&mut self, comment: Comment) {
        self.comments.push(comment);
    }

    /// Order-preserving removal; unknown ids are ignored
    pub fn remove_comment(&mut self, comment_id: &str) -> bool {
        let before = self.comments.len();
        self.comments.retain(|c| c.id != comment_id);
        self.comments.len() != before
    }

    pub fn tally(&self) -> Tally {
        Tally::from_votes(&self.votes)
    }

    pub fn apply_tally(&mut self, tally: &Tally) {
        self.score = tally.score();
        self.upvote_percentage = tally.upvote_percentage();
    }
}
