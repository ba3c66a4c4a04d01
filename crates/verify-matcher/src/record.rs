use std::ops::Range;
use verify_common::Location;
use verify_directive::DirectiveId;
use verify_pattern::Bindings;

/// Where one directive matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    pub directive: DirectiveId,
    /// Byte range in the input.
    pub range: Range<usize>,
    /// Start of the match.
    pub location: Location,
}

/// The outcome of a successful run.
#[derive(Debug, Clone, Default)]
pub struct MatchReport {
    /// One record per positive match, in the order they were made.
    pub matches: Vec<MatchRecord>,
    /// Bindings in effect when the last block finished.
    pub bindings: Bindings,
}

impl MatchReport {
    /// Records for one directive (several for `COUNT`).
    pub fn for_directive(&self, id: DirectiveId) -> impl Iterator<Item = &MatchRecord> {
        self.matches.iter().filter(move |m| m.directive == id)
    }
}
