//! Sequential matching of compiled directives against an input.
//!
//! Labels are located first and split the input into blocks. Inside a
//! block, ordered directives move a cursor strictly forward, DAG groups
//! match in any order, and NOT directives are checked in the gaps between
//! positive matches.

mod error;
mod matcher;
mod record;

pub use error::{MatchError, MatchFailure};
pub use matcher::{MatchOptions, SequentialMatcher};
pub use record::{MatchRecord, MatchReport};
