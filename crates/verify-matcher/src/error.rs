use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;
use verify_common::{Location, Note};
use verify_pattern::PatternError;

/// The input does not satisfy the directives.
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum MatchFailure {
    #[error("{directive} on line {line}: expected string not found in input")]
    #[diagnostic(code(verify::matching::not_found))]
    NotFound {
        directive: String,
        pattern: String,
        line: u32,
        /// Last successful cursor position.
        cursor: Location,
        #[label("scanning from here")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
        #[help]
        help: Option<String>,
        #[related]
        notes: Vec<Note>,
    },

    #[error("{directive} on line {line}: label not found in input")]
    #[diagnostic(code(verify::matching::label_not_found))]
    LabelNotFound {
        directive: String,
        pattern: String,
        line: u32,
        cursor: Location,
        #[label("scanning from here")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
        #[related]
        notes: Vec<Note>,
    },

    #[error("{directive} on line {line}: excluded string found in input")]
    #[diagnostic(code(verify::matching::excluded_found))]
    NotViolation {
        directive: String,
        pattern: String,
        line: u32,
        cursor: Location,
        found_at: Location,
        #[label("scanning from here")]
        span: SourceSpan,
        #[label("excluded pattern found here")]
        found: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
        #[related]
        notes: Vec<Note>,
    },

    #[error("{directive} on line {line}: match is not {expected}")]
    #[diagnostic(code(verify::matching::wrong_line))]
    WrongLine {
        directive: String,
        pattern: String,
        line: u32,
        expected: &'static str,
        cursor: Location,
        found_at: Location,
        #[label("previous match ended here")]
        span: SourceSpan,
        #[label("found here")]
        found: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
        #[related]
        notes: Vec<Note>,
    },

    #[error("{directive} on line {line}: the line after the previous match is not empty")]
    #[diagnostic(code(verify::matching::not_empty))]
    NotEmpty {
        directive: String,
        line: u32,
        cursor: Location,
        #[label("expected an empty line here")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
        #[related]
        notes: Vec<Note>,
    },

    #[error("input '{input}' is empty")]
    #[diagnostic(
        code(verify::matching::empty_input),
        help("pass --allow-empty to accept an empty input")
    )]
    EmptyInput { input: String },
}

impl MatchFailure {
    /// Name of the directive that failed, e.g. `CHECK-NOT`.
    pub fn directive(&self) -> Option<&str> {
        match self {
            MatchFailure::NotFound { directive, .. }
            | MatchFailure::LabelNotFound { directive, .. }
            | MatchFailure::NotViolation { directive, .. }
            | MatchFailure::WrongLine { directive, .. }
            | MatchFailure::NotEmpty { directive, .. } => Some(directive),
            MatchFailure::EmptyInput { .. } => None,
        }
    }

    /// The expected (or excluded) pattern text.
    pub fn pattern(&self) -> Option<&str> {
        match self {
            MatchFailure::NotFound { pattern, .. }
            | MatchFailure::LabelNotFound { pattern, .. }
            | MatchFailure::NotViolation { pattern, .. }
            | MatchFailure::WrongLine { pattern, .. } => Some(pattern),
            MatchFailure::NotEmpty { .. } | MatchFailure::EmptyInput { .. } => None,
        }
    }

    /// Line of the directive in the directives file.
    pub fn directive_line(&self) -> Option<u32> {
        match self {
            MatchFailure::NotFound { line, .. }
            | MatchFailure::LabelNotFound { line, .. }
            | MatchFailure::NotViolation { line, .. }
            | MatchFailure::WrongLine { line, .. }
            | MatchFailure::NotEmpty { line, .. } => Some(*line),
            MatchFailure::EmptyInput { .. } => None,
        }
    }

    /// Last successful cursor position in the input.
    pub fn cursor(&self) -> Option<Location> {
        match self {
            MatchFailure::NotFound { cursor, .. }
            | MatchFailure::LabelNotFound { cursor, .. }
            | MatchFailure::NotViolation { cursor, .. }
            | MatchFailure::WrongLine { cursor, .. }
            | MatchFailure::NotEmpty { cursor, .. } => Some(*cursor),
            MatchFailure::EmptyInput { .. } => None,
        }
    }

    /// Where the offending text was found, for failures that have one.
    pub fn found_at(&self) -> Option<Location> {
        match self {
            MatchFailure::NotViolation { found_at, .. } | MatchFailure::WrongLine { found_at, .. } => {
                Some(*found_at)
            }
            _ => None,
        }
    }
}

/// Anything that stops a matching run.
#[derive(Error, Debug, Diagnostic)]
pub enum MatchError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Failure(#[from] MatchFailure),

    /// A pattern could not be instantiated with the bindings at hand.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Pattern(#[from] PatternError),
}
