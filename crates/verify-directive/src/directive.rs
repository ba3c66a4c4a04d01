use smol_str::SmolStr;
use std::fmt;
use verify_common::{SourceId, Span};

/// What a directive asks of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    /// `CHECK:` ordered positive match.
    Plain,
    /// `CHECK-NEXT:` match on the line after the previous match.
    Next,
    /// `CHECK-SAME:` match on the same line as the previous match.
    Same,
    /// `CHECK-EMPTY:` the line after the previous match is empty.
    Empty,
    /// `CHECK-DAG:` unordered positive match.
    Dag,
    /// `CHECK-NOT:` negative match.
    Not,
    /// `CHECK-LABEL:` block boundary.
    Label,
    /// `CHECK-COUNT-n:` n consecutive ordered matches.
    Count(u32),
}

impl DirectiveKind {
    /// The verb as written after the prefix, if any.
    pub fn verb(&self) -> Option<String> {
        match self {
            DirectiveKind::Plain => None,
            DirectiveKind::Next => Some("NEXT".to_string()),
            DirectiveKind::Same => Some("SAME".to_string()),
            DirectiveKind::Empty => Some("EMPTY".to_string()),
            DirectiveKind::Dag => Some("DAG".to_string()),
            DirectiveKind::Not => Some("NOT".to_string()),
            DirectiveKind::Label => Some("LABEL".to_string()),
            DirectiveKind::Count(n) => Some(format!("COUNT-{n}")),
        }
    }

    /// Parse a verb (the part between `PREFIX-` and `:`).
    pub fn from_verb(verb: &str) -> Option<Self> {
        let kind = match verb {
            "NEXT" => DirectiveKind::Next,
            "SAME" => DirectiveKind::Same,
            "EMPTY" => DirectiveKind::Empty,
            "DAG" => DirectiveKind::Dag,
            "NOT" => DirectiveKind::Not,
            "LABEL" => DirectiveKind::Label,
            _ => {
                let n = verb.strip_prefix("COUNT-")?.parse::<u32>().ok()?;
                if n == 0 {
                    return None;
                }
                DirectiveKind::Count(n)
            }
        };
        Some(kind)
    }

    /// Positive directives consume input and move the cursor.
    pub fn is_positive(&self) -> bool {
        !matches!(self, DirectiveKind::Not)
    }

    /// Directives whose match position is constrained by the previous match.
    pub fn is_adjacent(&self) -> bool {
        matches!(
            self,
            DirectiveKind::Next | DirectiveKind::Same | DirectiveKind::Empty
        )
    }

    /// Whether this kind may define variables.
    pub fn can_capture(&self) -> bool {
        !matches!(self, DirectiveKind::Not | DirectiveKind::Label)
    }
}

/// Index of a directive within its [`CheckFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirectiveId(pub u32);

impl DirectiveId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single check directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub id: DirectiveId,
    pub kind: DirectiveKind,
    /// The check prefix this directive was written with.
    pub prefix: SmolStr,
    /// Pattern text with surrounding whitespace removed.
    pub pattern: String,
    /// 1-based line in the directives file.
    pub line: u32,
    /// Span of the pattern text in the directives file.
    pub pattern_span: Span,
    /// Span of `PREFIX-VERB:`.
    pub keyword_span: Span,
}

impl Directive {
    /// `CHECK-NOT` style name.
    pub fn name(&self) -> String {
        match self.kind.verb() {
            Some(verb) => format!("{}-{}", self.prefix, verb),
            None => self.prefix.to_string(),
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pattern.is_empty() {
            write!(f, "{}:", self.name())
        } else {
            write!(f, "{}: {}", self.name(), self.pattern)
        }
    }
}

/// All directives found in one directives file, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckFile {
    pub source: SourceId,
    pub directives: Vec<Directive>,
}

impl CheckFile {
    pub fn get(&self, id: DirectiveId) -> &Directive {
        &self.directives[id.index()]
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Directive> {
        self.directives.iter()
    }

    /// Render one directive per line, each behind `comment`.
    ///
    /// Scanning the result with `comment` as a comment prefix gives back
    /// the same directives.
    pub fn render(&self, comment: &str) -> String {
        let mut out = String::new();
        for directive in &self.directives {
            out.push_str(comment);
            out.push(' ');
            out.push_str(&directive.to_string());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_verb() {
        assert_eq!(DirectiveKind::from_verb("NOT"), Some(DirectiveKind::Not));
        assert_eq!(
            DirectiveKind::from_verb("COUNT-12"),
            Some(DirectiveKind::Count(12))
        );
        assert_eq!(DirectiveKind::from_verb("COUNT-0"), None);
        assert_eq!(DirectiveKind::from_verb("COUNT"), None);
        assert_eq!(DirectiveKind::from_verb("NOPE"), None);
    }

    #[test]
    fn test_verb_roundtrip() {
        for kind in [
            DirectiveKind::Next,
            DirectiveKind::Same,
            DirectiveKind::Empty,
            DirectiveKind::Dag,
            DirectiveKind::Not,
            DirectiveKind::Label,
            DirectiveKind::Count(3),
        ] {
            let verb = kind.verb().unwrap();
            assert_eq!(DirectiveKind::from_verb(&verb), Some(kind));
        }
        assert_eq!(DirectiveKind::Plain.verb(), None);
    }

    #[test]
    fn test_kind_properties() {
        assert!(!DirectiveKind::Not.is_positive());
        assert!(DirectiveKind::Dag.is_positive());
        assert!(DirectiveKind::Same.is_adjacent());
        assert!(!DirectiveKind::Label.can_capture());
        assert!(DirectiveKind::Count(2).can_capture());
    }
}
