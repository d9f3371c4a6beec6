pub mod tally;

pub use tally::{Tally, VoteChange};
