//! Secondary diagnostics, such as the "directive written here" note that
//! points from a match failure back into the directives file.

use crate::source::SourceFile;
use crate::span::Span;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// A note attached to another diagnostic through `#[related]`.
///
/// Carries its own source so it can point into a different file than the
/// diagnostic it is attached to.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(severity(Advice))]
pub struct Note {
    pub message: String,
    #[label("{label}")]
    pub span: Option<SourceSpan>,
    pub label: String,
    #[source_code]
    pub source_code: Option<NamedSource<String>>,
}

impl Note {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: None,
            label: String::new(),
            source_code: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Attach the file the span points into.
    pub fn in_file(mut self, file: &SourceFile) -> Self {
        self.source_code = Some(file.to_named_source());
        self
    }
}
