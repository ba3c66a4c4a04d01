use crate::directive::{CheckFile, Directive, DirectiveId, DirectiveKind};
use crate::error::ParseError;
use miette::SourceSpan;
use smol_str::SmolStr;
use tracing::{debug, trace};
use verify_common::{SourceFile, Span};
use verify_config::PrefixConfig;

/// Scan `file` for directives using the given prefixes.
pub fn scan(file: &SourceFile, prefixes: &PrefixConfig) -> Result<CheckFile, ParseError> {
    Scanner::new(prefixes).scan(file)
}

/// Extracts directives from the lines of a directives file.
pub struct Scanner {
    /// Longest first, so `CHECK-SIL` wins over `CHECK` followed by a verb.
    check_prefixes: Vec<SmolStr>,
    comment_prefixes: Vec<SmolStr>,
}

/// A directive found on one line, before file-level validation.
struct RawDirective {
    kind: DirectiveKind,
    prefix: SmolStr,
    pattern: String,
    keyword: (u32, u32),
    pattern_range: (u32, u32),
}

impl Scanner {
    pub fn new(prefixes: &PrefixConfig) -> Self {
        let mut check_prefixes: Vec<SmolStr> = prefixes.check.iter().map(SmolStr::new).collect();
        check_prefixes.sort_by(|a, b| b.len().cmp(&a.len()));
        Self {
            check_prefixes,
            comment_prefixes: prefixes.comment.iter().map(SmolStr::new).collect(),
        }
    }

    pub fn scan(&self, file: &SourceFile) -> Result<CheckFile, ParseError> {
        let mut directives = Vec::new();
        let mut has_anchor = false;

        for (line_idx, line_start, text) in file.lines() {
            let Some(raw) = self.scan_line(file, line_idx + 1, line_start, text)? else {
                continue;
            };
            let line = line_idx + 1;
            let name = match raw.kind.verb() {
                Some(verb) => format!("{}-{}", raw.prefix, verb),
                None => raw.prefix.to_string(),
            };
            let keyword_span = Span::new(file.id, raw.keyword.0, raw.keyword.1);
            let pattern_span = Span::new(file.id, raw.pattern_range.0, raw.pattern_range.1);

            match raw.kind {
                DirectiveKind::Empty if !raw.pattern.is_empty() => {
                    return Err(ParseError::UnexpectedPattern {
                        name,
                        line,
                        span: pattern_span.into(),
                        src: file.to_named_source(),
                    });
                }
                DirectiveKind::Empty => {}
                _ if raw.pattern.is_empty() => {
                    return Err(ParseError::EmptyPattern {
                        name,
                        line,
                        span: keyword_span.into(),
                        src: file.to_named_source(),
                    });
                }
                _ => {}
            }

            if raw.kind.is_adjacent() && !has_anchor {
                return Err(ParseError::NoPreviousMatch {
                    name,
                    line,
                    span: keyword_span.into(),
                    src: file.to_named_source(),
                });
            }
            has_anchor |= raw.kind.is_positive();

            let directive = Directive {
                id: DirectiveId(directives.len() as u32),
                kind: raw.kind,
                prefix: raw.prefix,
                pattern: raw.pattern,
                line,
                pattern_span,
                keyword_span,
            };
            trace!(line, directive = %directive, "scanned directive");
            directives.push(directive);
        }

        if directives.is_empty() {
            return Err(ParseError::NoDirectives {
                prefixes: self
                    .check_prefixes
                    .iter()
                    .map(SmolStr::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
                src: file.to_named_source(),
            });
        }

        debug!(
            file = %file.display_name(),
            count = directives.len(),
            "scanned directives"
        );
        Ok(CheckFile {
            source: file.id,
            directives,
        })
    }

    /// Find the first directive on a line, if any.
    fn scan_line(
        &self,
        file: &SourceFile,
        line: u32,
        line_start: u32,
        text: &str,
    ) -> Result<Option<RawDirective>, ParseError> {
        for (pos, _) in text.char_indices() {
            let Some(comment) = self
                .comment_prefixes
                .iter()
                .find(|c| text[pos..].starts_with(c.as_str()))
            else {
                continue;
            };

            let after_comment = pos + comment.len();
            let rest = &text[after_comment..];
            let start = after_comment + (rest.len() - rest.trim_start_matches([' ', '\t']).len());

            if let Some(raw) = self.scan_directive(file, line, line_start, text, start)? {
                return Ok(Some(raw));
            }
        }
        Ok(None)
    }

    /// Try to read `PREFIX[-VERB]: pattern` at byte `start` of `text`.
    fn scan_directive(
        &self,
        file: &SourceFile,
        line: u32,
        line_start: u32,
        text: &str,
        start: usize,
    ) -> Result<Option<RawDirective>, ParseError> {
        let rest = &text[start..];
        for prefix in &self.check_prefixes {
            let Some(after) = rest.strip_prefix(prefix.as_str()) else {
                continue;
            };
            let prefix_end = start + prefix.len();

            let (kind, colon) = match after.chars().next() {
                Some(':') => (DirectiveKind::Plain, prefix_end),
                Some('-') => {
                    let verb_text = &after[1..];
                    let verb_len = verb_text
                        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
                        .unwrap_or(verb_text.len());
                    let verb = &verb_text[..verb_len];
                    let verb_end = prefix_end + 1 + verb_len;
                    let name = format!("{prefix}-{verb}");
                    let span = offset_span(line_start, start, verb_end);

                    let followed_by_colon = verb_text[verb_len..].starts_with(':');
                    match DirectiveKind::from_verb(verb) {
                        Some(kind) if followed_by_colon => (kind, verb_end),
                        Some(_) => {
                            return Err(ParseError::MissingColon {
                                name,
                                line,
                                span,
                                src: file.to_named_source(),
                            });
                        }
                        None if verb.starts_with("COUNT") => {
                            if followed_by_colon || verb.starts_with("COUNT-") {
                                return Err(ParseError::InvalidCount {
                                    name,
                                    line,
                                    span,
                                    src: file.to_named_source(),
                                });
                            }
                            continue;
                        }
                        None if followed_by_colon => {
                            return Err(ParseError::UnknownDirective {
                                name,
                                line,
                                span,
                                src: file.to_named_source(),
                            });
                        }
                        // Prose such as `// CHECK-ing the output`.
                        None => continue,
                    }
                }
                _ => continue,
            };

            let body = &text[colon + 1..];
            let leading = body.len() - body.trim_start().len();
            let pattern = body.trim();
            let pattern_start = colon + 1 + leading;

            return Ok(Some(RawDirective {
                kind,
                prefix: prefix.clone(),
                pattern: pattern.to_string(),
                keyword: (line_start + start as u32, line_start + colon as u32 + 1),
                pattern_range: (
                    line_start + pattern_start as u32,
                    line_start + (pattern_start + pattern.len()) as u32,
                ),
            }));
        }
        Ok(None)
    }
}

fn offset_span(line_start: u32, start: usize, end: usize) -> SourceSpan {
    SourceSpan::new((line_start as usize + start).into(), end - start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use verify_common::{SourceId, SourceKind};

    fn file(content: &str) -> SourceFile {
        SourceFile::new(
            SourceId::from_u32(0),
            PathBuf::from("test.swift"),
            content.to_string(),
            SourceKind::Directives,
        )
    }

    fn scan_default(content: &str) -> Result<CheckFile, ParseError> {
        scan(&file(content), &PrefixConfig::default())
    }

    fn kinds(check: &CheckFile) -> Vec<DirectiveKind> {
        check.iter().map(|d| d.kind).collect()
    }

    #[test]
    fn test_scan_basic_directives() {
        let check = scan_default(
            "// CHECK-LABEL: sil hidden @main\n\
             func main() {\n\
             \x20 // CHECK: function_ref @foo\n\
             \x20 // CHECK-NOT: nilLiteral\n\
             } // CHECK: } // end sil function 'main'\n",
        )
        .unwrap();

        assert_eq!(
            kinds(&check),
            vec![
                DirectiveKind::Label,
                DirectiveKind::Plain,
                DirectiveKind::Not,
                DirectiveKind::Plain,
            ]
        );
        assert_eq!(check.directives[0].pattern, "sil hidden @main");
        assert_eq!(check.directives[1].line, 3);
        assert_eq!(check.directives[3].pattern, "} // end sil function 'main'");
        assert_eq!(check.directives[3].line, 5);
    }

    #[test]
    fn test_pattern_span_points_at_pattern() {
        let f = file("x // CHECK:   foo bar  \n");
        let check = scan(&f, &PrefixConfig::default()).unwrap();
        let d = &check.directives[0];
        assert_eq!(&f.content[d.pattern_span.range()], "foo bar");
        assert_eq!(&f.content[d.keyword_span.range()], "CHECK:");
    }

    #[test]
    fn test_lines_without_directives_ignored() {
        let check = scan_default(
            "CHECK: not behind a comment\n\
             // just a comment mentioning CHECK\n\
             // CHECKS are fun\n\
             // CHECK-ing prose\n\
             # CHECK: real\n",
        )
        .unwrap();
        assert_eq!(check.len(), 1);
        assert_eq!(check.directives[0].pattern, "real");
        assert_eq!(check.directives[0].line, 5);
    }

    #[test]
    fn test_all_verbs() {
        let check = scan_default(
            "// CHECK: a\n\
             // CHECK-NEXT: b\n\
             // CHECK-SAME: c\n\
             // CHECK-EMPTY:\n\
             // CHECK-DAG: d\n\
             // CHECK-NOT: e\n\
             // CHECK-LABEL: f\n\
             // CHECK-COUNT-4: g\n",
        )
        .unwrap();
        assert_eq!(
            kinds(&check),
            vec![
                DirectiveKind::Plain,
                DirectiveKind::Next,
                DirectiveKind::Same,
                DirectiveKind::Empty,
                DirectiveKind::Dag,
                DirectiveKind::Not,
                DirectiveKind::Label,
                DirectiveKind::Count(4),
            ]
        );
        assert_eq!(check.directives[3].pattern, "");
    }

    #[test]
    fn test_unknown_verb_is_error() {
        let err = scan_default("// CHECK: a\n// CHECK-NXET: b\n").unwrap_err();
        assert!(matches!(err, ParseError::UnknownDirective { ref name, .. } if name == "CHECK-NXET"));
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn test_missing_colon_is_error() {
        let err = scan_default("// CHECK: a\n// CHECK-NOT b\n").unwrap_err();
        assert!(matches!(err, ParseError::MissingColon { line: 2, .. }));
    }

    #[test]
    fn test_invalid_count() {
        let err = scan_default("// CHECK-COUNT-0: a\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidCount { line: 1, .. }));
        let err = scan_default("// CHECK-COUNT: a\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidCount { .. }));
    }

    #[test]
    fn test_empty_pattern_rules() {
        let err = scan_default("// CHECK:\n").unwrap_err();
        assert!(matches!(err, ParseError::EmptyPattern { .. }));

        let err = scan_default("// CHECK: a\n// CHECK-EMPTY: b\n").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedPattern { line: 2, .. }));
    }

    #[test]
    fn test_adjacent_needs_previous_match() {
        let err = scan_default("// CHECK-NEXT: a\n").unwrap_err();
        assert!(matches!(err, ParseError::NoPreviousMatch { .. }));

        let err = scan_default("// CHECK-NOT: a\n// CHECK-SAME: b\n").unwrap_err();
        assert!(matches!(err, ParseError::NoPreviousMatch { line: 2, .. }));

        assert!(scan_default("// CHECK-LABEL: a\n// CHECK-NEXT: b\n").is_ok());
    }

    #[test]
    fn test_no_directives() {
        let err = scan_default("just text\n").unwrap_err();
        assert!(matches!(err, ParseError::NoDirectives { ref prefixes, .. } if prefixes == "CHECK"));
        assert_eq!(err.line(), None);
    }

    #[test]
    fn test_custom_prefixes() {
        let prefixes = PrefixConfig {
            check: vec!["CHECK".to_string(), "CHECK-SIL".to_string()],
            comment: vec![";".to_string()],
        };
        let check = scan(
            &file("; CHECK-SIL: sil\n; CHECK-SIL-NOT: bad\n// CHECK: ignored\n; CHECK: plain\n"),
            &prefixes,
        )
        .unwrap();
        assert_eq!(check.len(), 3);
        assert_eq!(check.directives[0].prefix, "CHECK-SIL");
        assert_eq!(check.directives[0].kind, DirectiveKind::Plain);
        assert_eq!(check.directives[1].kind, DirectiveKind::Not);
        assert_eq!(check.directives[1].name(), "CHECK-SIL-NOT");
        assert_eq!(check.directives[2].prefix, "CHECK");
    }

    #[test]
    fn test_render_snapshot() {
        let check = scan_default(
            "// CHECK-LABEL: sil hidden @f\n\
             foo() // CHECK:   call   @g\n\
             // CHECK-EMPTY:\n\
             // CHECK-COUNT-2: ret\n",
        )
        .unwrap();
        insta::assert_snapshot!(check.render("//"), @r"
        // CHECK-LABEL: sil hidden @f
        // CHECK: call   @g
        // CHECK-EMPTY:
        // CHECK-COUNT-2: ret
        ");
    }

    #[test]
    fn test_render_then_scan_is_idempotent() {
        let original = scan_default(
            "// CHECK-LABEL: sil hidden @_T0{{[_0-9a-zA-Z]*}}F\n\
             \x20 // CHECK: objc_method [[SELF:%[0-9]+]] : $Gizmo\n\
             \x20 // CHECK-NOT: nilLiteral\n\
             \x20 // CHECK-DAG: a\n\
             \x20 // CHECK-SAME: b\n\
             } // CHECK: } // end sil function\n",
        )
        .unwrap();

        let rendered = original.render("//");
        let rescanned = scan_default(&rendered).unwrap();
        assert_eq!(rescanned.render("//"), rendered);

        let summary = |c: &CheckFile| {
            c.iter()
                .map(|d| (d.kind, d.prefix.clone(), d.pattern.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(summary(&rescanned), summary(&original));
    }
}
