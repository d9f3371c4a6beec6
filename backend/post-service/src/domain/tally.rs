//! Vote tally policy
//!
//! Score and upvote percentage are recomputed from the full vote set after
//! every mutation. Running up/down counters are never kept between mutations,
//! so a vote flip or removal cannot leave the buckets out of sync with the
//! stored votes.

use crate::models::{Vote, VoteValue};

/// Up/down bucket totals derived from a vote set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub upvotes: i64,
    pub downvotes: i64,
}

impl Tally {
    pub fn from_votes<'a, I>(votes: I) -> Self
    where
        I: IntoIterator<Item = &'a Vote>,
    {
        votes
            .into_iter()
            .fold(Tally::default(), |mut tally, vote| {
                match vote.vote {
                    VoteValue::Up => tally.upvotes += 1,
                    VoteValue::Down => tally.downvotes += 1,
                }
                tally
            })
    }

    pub fn total(&self) -> i64 {
        self.upvotes + self.downvotes
    }

    pub fn score(&self) -> i64 {
        self.upvotes - self.downvotes
    }

    /// `upvotes / total * 100`, rounded half up; 0 when there are no votes
    pub fn upvote_percentage(&self) -> i64 {
        let total = self.total();
        if total == 0 {
            return 0;
        }
        (self.upvotes * 200 + total) / (2 * total)
    }
}

/// How an incoming vote relates to the user's current vote on the post
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteChange {
    /// User had no vote
    New,
    /// Same direction as the stored vote; nothing to persist
    Unchanged,
    /// Direction switched
    Flipped,
}

impl VoteChange {
    pub fn classify(existing: Option<VoteValue>, incoming: VoteValue) -> Self {
        match existing {
            None => VoteChange::New,
            Some(current) if current == incoming => VoteChange::Unchanged,
            Some(_) => VoteChange::Flipped,
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, VoteChange::Unchanged)
    }
}
