use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;
use verify_config::ConfigError;
use verify_directive::ParseError;
use verify_matcher::{MatchError, MatchFailure};
use verify_pattern::PatternError;

/// Everything that can end a verification run.
#[derive(Error, Debug, Diagnostic)]
pub enum VerifyError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read '{}'", path.display())]
    #[diagnostic(code(verify::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Match(#[from] MatchFailure),
}

impl From<MatchError> for VerifyError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::Failure(failure) => VerifyError::Match(failure),
            MatchError::Pattern(err) => VerifyError::Pattern(err),
        }
    }
}

impl VerifyError {
    /// Process exit code: 1 when the input does not match, 2 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            VerifyError::Match(_) => 1,
            _ => 2,
        }
    }

    /// Short category name used in machine-readable reports.
    pub fn kind(&self) -> &'static str {
        match self {
            VerifyError::Config(_) => "config",
            VerifyError::Io { .. } => "io",
            VerifyError::Parse(_) => "parse",
            VerifyError::Pattern(_) => "pattern",
            VerifyError::Match(_) => "match",
        }
    }

    /// The match failure, if the input was the problem.
    pub fn as_failure(&self) -> Option<&MatchFailure> {
        match self {
            VerifyError::Match(failure) => Some(failure),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let failure = VerifyError::Match(MatchFailure::EmptyInput {
            input: "out.sil".to_string(),
        });
        assert_eq!(failure.exit_code(), 1);
        assert_eq!(failure.kind(), "match");

        let io = VerifyError::Io {
            path: PathBuf::from("missing.swift"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(io.exit_code(), 2);
        assert_eq!(io.to_string(), "failed to read 'missing.swift'");

        let config = VerifyError::from(ConfigError::Validation("bad".to_string()));
        assert_eq!(config.exit_code(), 2);
        assert!(config.as_failure().is_none());
    }
}
