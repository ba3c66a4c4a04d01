//! Machine-readable and one-line text reports.
//!
//! Failures in text mode are rendered by miette in the binary; this module
//! only builds what miette does not.

use crate::error::VerifyError;
use crate::session::{Session, Verified};
use indexmap::IndexMap;
use miette::Diagnostic;
use serde::Serialize;
use std::path::Path;
use verify_common::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Fail,
    Error,
}

/// The JSON document printed by `--format json`.
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    pub status: Status,
    pub exit_code: u8,
    pub directives: String,
    pub input: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<MatchEntry>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub bindings: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchEntry {
    pub directive: String,
    pub line: u32,
    pub pattern: String,
    pub at: Location,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureEntry {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directive: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found_at: Option<Location>,
}

impl JsonReport {
    pub fn pass(session: &Session, verified: &Verified) -> Self {
        let matches = verified
            .report
            .matches
            .iter()
            .map(|record| {
                let directive = verified.check.get(record.directive);
                MatchEntry {
                    directive: directive.name(),
                    line: directive.line,
                    pattern: directive.pattern.clone(),
                    at: record.location,
                    start: record.range.start,
                    end: record.range.end,
                }
            })
            .collect();
        let bindings = verified
            .report
            .bindings
            .iter()
            .map(|(name, binding)| {
                (
                    session.interner().resolve(name).to_string(),
                    binding.value.clone(),
                )
            })
            .collect();

        Self {
            status: Status::Pass,
            exit_code: 0,
            directives: verified.directives.display_name(),
            input: verified.input.display_name(),
            matches,
            bindings,
            failure: None,
        }
    }

    pub fn fail(directives: &Path, input: &Path, err: &VerifyError) -> Self {
        let failure = err.as_failure();
        let line = match err {
            VerifyError::Parse(err) => err.line(),
            VerifyError::Pattern(err) => Some(err.line()),
            VerifyError::Match(failure) => failure.directive_line(),
            VerifyError::Config(_) | VerifyError::Io { .. } => None,
        };

        Self {
            status: if failure.is_some() {
                Status::Fail
            } else {
                Status::Error
            },
            exit_code: err.exit_code(),
            directives: directives.display().to_string(),
            input: input.display().to_string(),
            matches: Vec::new(),
            bindings: IndexMap::new(),
            failure: Some(FailureEntry {
                kind: err.kind(),
                code: err.code().map(|code| code.to_string()),
                message: err.to_string(),
                directive: failure.and_then(|f| f.directive()).map(str::to_string),
                pattern: failure.and_then(|f| f.pattern()).map(str::to_string),
                line,
                cursor: failure.and_then(|f| f.cursor()),
                found_at: failure.and_then(|f| f.found_at()),
            }),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Verified {
    /// `test.swift: 12 directives matched against out.sil`
    pub fn summary(&self) -> String {
        format!(
            "{}: {} directives matched against {}",
            self.directives.display_name(),
            self.check.len(),
            self.input.display_name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verify_config::Config;

    fn verify(session: &mut Session, directives: &str, input: &str) -> Result<Verified, VerifyError> {
        session.verify_text(
            Path::new("test.swift"),
            directives.to_string(),
            Path::new("out.txt"),
            input.to_string(),
        )
    }

    #[test]
    fn test_pass_report_json() {
        let mut session = Session::new(Config::default()).unwrap();
        let verified = verify(
            &mut session,
            "// CHECK: a [[X:[0-9]+]]\n// CHECK-NEXT: b\n",
            "a 1\nb\n",
        )
        .unwrap();
        assert_eq!(verified.summary(), "test.swift: 2 directives matched against out.txt");

        let json = JsonReport::pass(&session, &verified).to_json().unwrap();
        insta::assert_snapshot!(json, @r###"
        {
          "status": "pass",
          "exit_code": 0,
          "directives": "test.swift",
          "input": "out.txt",
          "matches": [
            {
              "directive": "CHECK",
              "line": 1,
              "pattern": "a [[X:[0-9]+]]",
              "at": {
                "line": 1,
                "column": 1
              },
              "start": 0,
              "end": 3
            },
            {
              "directive": "CHECK-NEXT",
              "line": 2,
              "pattern": "b",
              "at": {
                "line": 2,
                "column": 1
              },
              "start": 4,
              "end": 5
            }
          ],
          "bindings": {
            "X": "1"
          }
        }
        "###);
    }

    #[test]
    fn test_fail_report_names_directive() {
        let mut session = Session::new(Config::default()).unwrap();
        let err = verify(
            &mut session,
            "// CHECK: foo\n// CHECK-NOT: bar\n// CHECK: baz\n",
            "foo bar baz",
        )
        .unwrap_err();

        let report = JsonReport::fail(Path::new("test.swift"), Path::new("out.txt"), &err);
        assert_eq!(report.status, Status::Fail);
        assert_eq!(report.exit_code, 1);
        let failure = report.failure.unwrap();
        assert_eq!(failure.kind, "match");
        assert_eq!(failure.code.as_deref(), Some("verify::matching::excluded_found"));
        assert_eq!(failure.directive.as_deref(), Some("CHECK-NOT"));
        assert_eq!(failure.line, Some(2));
        assert_eq!(failure.found_at, Some(Location { line: 1, column: 5 }));
    }

    #[test]
    fn test_error_report_for_parse_error() {
        let mut session = Session::new(Config::default()).unwrap();
        let err = verify(&mut session, "// CHECK: a\n// CHECK-NEXT b\n", "a\nb\n").unwrap_err();

        let report = JsonReport::fail(Path::new("test.swift"), Path::new("out.txt"), &err);
        assert_eq!(report.status, Status::Error);
        assert_eq!(report.exit_code, 2);
        let failure = report.failure.unwrap();
        assert_eq!(failure.kind, "parse");
        assert_eq!(failure.line, Some(2));
        assert!(failure.directive.is_none());
    }
}
