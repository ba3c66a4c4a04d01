use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// A malformed directive in a directives file.
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ParseError {
    #[error("line {line}: unknown directive '{name}'")]
    #[diagnostic(
        code(verify::parse::unknown_directive),
        help("known suffixes are NEXT, SAME, EMPTY, DAG, NOT, LABEL and COUNT-<n>")
    )]
    UnknownDirective {
        name: String,
        line: u32,
        #[label("not a directive")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("line {line}: '{name}' must be followed by ':'")]
    #[diagnostic(code(verify::parse::missing_colon))]
    MissingColon {
        name: String,
        line: u32,
        #[label("expected ':' after this")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("line {line}: invalid count in '{name}'")]
    #[diagnostic(
        code(verify::parse::invalid_count),
        help("write COUNT-<n> with n >= 1")
    )]
    InvalidCount {
        name: String,
        line: u32,
        #[label("count must be a positive integer")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("line {line}: found empty pattern in '{name}'")]
    #[diagnostic(
        code(verify::parse::empty_pattern),
        help("use {{{{*}}}} to match anything, or the EMPTY suffix to match an empty line")
    )]
    EmptyPattern {
        name: String,
        line: u32,
        #[label("pattern expected here")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("line {line}: '{name}' does not take a pattern")]
    #[diagnostic(code(verify::parse::unexpected_pattern))]
    UnexpectedPattern {
        name: String,
        line: u32,
        #[label("remove this text")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("line {line}: found '{name}' without a previous positive directive")]
    #[diagnostic(code(verify::parse::no_previous_match))]
    NoPreviousMatch {
        name: String,
        line: u32,
        #[label("nothing to be adjacent to")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("no check directives found (prefixes: {prefixes})")]
    #[diagnostic(code(verify::parse::no_directives))]
    NoDirectives {
        prefixes: String,
        #[source_code]
        src: NamedSource<String>,
    },
}

impl ParseError {
    /// The 1-based line the error refers to.
    pub fn line(&self) -> Option<u32> {
        match self {
            ParseError::UnknownDirective { line, .. }
            | ParseError::MissingColon { line, .. }
            | ParseError::InvalidCount { line, .. }
            | ParseError::EmptyPattern { line, .. }
            | ParseError::UnexpectedPattern { line, .. }
            | ParseError::NoPreviousMatch { line, .. } => Some(*line),
            ParseError::NoDirectives { .. } => None,
        }
    }
}
