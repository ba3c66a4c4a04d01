use crate::syntax::{SyntaxError, SyntaxErrorKind};
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;
use verify_common::{SourceFile, Span, Symbol};

/// Failure to turn a pattern into a regex with the current bindings.
#[derive(Error, Debug)]
pub enum InstantiateError {
    #[error("variable is not bound")]
    Unbound(Symbol),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

/// A malformed pattern.
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum PatternError {
    #[error("line {line}: unclosed '{delimiter}'")]
    #[diagnostic(code(verify::pattern::unclosed))]
    Unclosed {
        delimiter: &'static str,
        line: u32,
        #[label("opened here")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("line {line}: empty regular expression")]
    #[diagnostic(code(verify::pattern::empty_regex))]
    EmptyRegex {
        line: u32,
        #[label("nothing to match")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("line {line}: invalid regular expression")]
    #[diagnostic(code(verify::pattern::invalid_regex))]
    InvalidRegex {
        message: String,
        line: u32,
        #[label("{message}")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("line {line}: invalid variable name '{name}'")]
    #[diagnostic(
        code(verify::pattern::invalid_name),
        help("names are letters, digits and '_', not starting with a digit; a leading '$' makes them global")
    )]
    InvalidName {
        name: String,
        line: u32,
        #[label("invalid name")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("line {line}: invalid line expression '{expr}'")]
    #[diagnostic(
        code(verify::pattern::invalid_line_expr),
        help("use @LINE, @LINE+n or @LINE-n")
    )]
    InvalidLineExpr {
        expr: String,
        line: u32,
        #[label("not a line expression")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("line {line}: use of undefined variable '{name}'")]
    #[diagnostic(
        code(verify::pattern::undefined_variable),
        help("variables must be captured by an earlier directive in the same block, or be '$'-prefixed globals")
    )]
    UndefinedVariable {
        name: String,
        line: u32,
        #[label("not defined before this point")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("line {line}: '{directive}' cannot use variable '{name}' this way")]
    #[diagnostic(
        code(verify::pattern::variable_not_allowed),
        help("NOT directives may only reference variables; LABEL directives may not use variables at all")
    )]
    VariableNotAllowed {
        name: String,
        directive: String,
        line: u32,
        #[label("not allowed here")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },
}

impl PatternError {
    /// Translate a syntax error inside the pattern at `pattern_span`.
    pub(crate) fn from_syntax(
        err: SyntaxError,
        file: &SourceFile,
        pattern_span: Span,
        line: u32,
    ) -> Self {
        let span = sub_span(pattern_span, &err.range);
        let src = file.to_named_source();
        match err.kind {
            SyntaxErrorKind::Unclosed(delimiter) => PatternError::Unclosed {
                delimiter,
                line,
                span,
                src,
            },
            SyntaxErrorKind::EmptyRegex => PatternError::EmptyRegex { line, span, src },
            SyntaxErrorKind::InvalidRegex(message) => PatternError::InvalidRegex {
                message,
                line,
                span,
                src,
            },
            SyntaxErrorKind::InvalidName(name) => PatternError::InvalidName {
                name,
                line,
                span,
                src,
            },
            SyntaxErrorKind::InvalidLineExpr(expr) => PatternError::InvalidLineExpr {
                expr,
                line,
                span,
                src,
            },
        }
    }

    /// A variable that has no value when a pattern is about to be matched.
    pub fn unbound(name: &str, file: &SourceFile, pattern_span: Span, line: u32) -> Self {
        PatternError::UndefinedVariable {
            name: name.to_string(),
            line,
            span: pattern_span.into(),
            src: file.to_named_source(),
        }
    }

    /// A pattern whose instantiated regex was rejected.
    pub fn invalid_regex(
        err: &regex::Error,
        file: &SourceFile,
        pattern_span: Span,
        line: u32,
    ) -> Self {
        PatternError::InvalidRegex {
            message: err.to_string(),
            line,
            span: pattern_span.into(),
            src: file.to_named_source(),
        }
    }

    /// The 1-based line the error refers to.
    pub fn line(&self) -> u32 {
        match self {
            PatternError::Unclosed { line, .. }
            | PatternError::EmptyRegex { line, .. }
            | PatternError::InvalidRegex { line, .. }
            | PatternError::InvalidName { line, .. }
            | PatternError::InvalidLineExpr { line, .. }
            | PatternError::UndefinedVariable { line, .. }
            | PatternError::VariableNotAllowed { line, .. } => *line,
        }
    }
}

/// Span of `range` (relative to the pattern text) inside the file.
pub(crate) fn sub_span(pattern_span: Span, range: &std::ops::Range<usize>) -> SourceSpan {
    SourceSpan::new(
        (pattern_span.start as usize + range.start).into(),
        range.end - range.start,
    )
}
