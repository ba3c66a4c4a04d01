use crate::bindings::Bindings;
use crate::error::InstantiateError;
use crate::syntax::{LocatedPart, Part};
use regex::Regex;
use std::borrow::Cow;
use std::ops::Range;
use tracing::trace;
use verify_common::{Span, Symbol};
use verify_config::MatchingConfig;

/// Options that change how pattern text is turned into a regex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternOptions {
    pub strict_whitespace: bool,
    pub match_full_lines: bool,
}

impl From<&MatchingConfig> for PatternOptions {
    fn from(config: &MatchingConfig) -> Self {
        Self {
            strict_whitespace: config.strict_whitespace,
            match_full_lines: config.match_full_lines,
        }
    }
}

/// A compiled directive pattern.
///
/// Patterns without references compile to a regex once; patterns that
/// reference bound variables are instantiated per match attempt.
///
/// A reference to a variable captured earlier in the same pattern splits it
/// into stages. Each stage after the first is built from the text the
/// previous stages captured and must start where they ended.
#[derive(Debug, Clone)]
pub struct Pattern {
    text: String,
    span: Span,
    parts: Vec<LocatedPart>,
    options: PatternOptions,
    /// `(group name, variable, global)` for every capture, in order.
    groups: Vec<(String, Symbol, bool)>,
    stages: Vec<Stage>,
    fixed: Option<Regex>,
}

/// A run of parts matched by one regex.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Stage {
    parts: Range<usize>,
    groups: Range<usize>,
}

/// A text a capture produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureValue {
    pub name: Symbol,
    pub global: bool,
    pub value: String,
}

/// One match of a pattern in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub range: Range<usize>,
    pub captures: Vec<CaptureValue>,
}

/// A pattern with all outer references replaced by their current values.
#[derive(Debug)]
pub struct Matcher<'p> {
    pattern: &'p Pattern,
    first: Cow<'p, Regex>,
    /// Values of variables bound before this pattern that later stages read.
    outer: Vec<(Symbol, String)>,
}

impl Pattern {
    /// Build a pattern from parsed parts. Callers validate variable scoping.
    pub(crate) fn from_parts(
        text: &str,
        span: Span,
        parts: Vec<LocatedPart>,
        options: PatternOptions,
    ) -> Result<Self, regex::Error> {
        let groups = parts
            .iter()
            .filter_map(|p| match &p.part {
                Part::Capture { name, global, .. } => Some((*name, *global)),
                _ => None,
            })
            .enumerate()
            .map(|(i, (name, global))| (format!("__verify_v{i}"), name, global))
            .collect();
        let stages = split_stages(&parts);

        let mut pattern = Self {
            text: text.to_string(),
            span,
            parts,
            options,
            groups,
            stages,
            fixed: None,
        };
        if pattern.references().next().is_none() {
            let source = pattern.regex_source(&pattern.stages[0], |_| None);
            trace!(pattern = %pattern.text, regex = %source, "compiled pattern");
            pattern.fixed = Some(Regex::new(&source)?);
        }
        Ok(pattern)
    }

    /// The pattern text as written.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Span of the pattern text in its source file.
    pub fn span(&self) -> Span {
        self.span
    }

    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter().map(|p| &p.part)
    }

    /// Variables this pattern reads.
    pub fn references(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.parts().filter_map(|p| match p {
            Part::Reference(name) => Some(*name),
            _ => None,
        })
    }

    /// Variables this pattern binds.
    pub fn captures(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.groups.iter().map(|(_, name, _)| *name)
    }

    /// Substitute the current bindings and get something that can search.
    pub fn instantiate(&self, bindings: &Bindings) -> Result<Matcher<'_>, InstantiateError> {
        if let Some(regex) = &self.fixed {
            return Ok(Matcher {
                pattern: self,
                first: Cow::Borrowed(regex),
                outer: Vec::new(),
            });
        }

        // References that precede any capture of the same name read the
        // bindings from earlier directives.
        let mut captured = Vec::new();
        let mut outer: Vec<(Symbol, String)> = Vec::new();
        for part in self.parts() {
            match part {
                Part::Capture { name, .. } => captured.push(*name),
                Part::Reference(name) if !captured.contains(name) => {
                    let value = bindings.get(*name).ok_or(InstantiateError::Unbound(*name))?;
                    outer.push((*name, value.to_string()));
                }
                _ => {}
            }
        }

        let source = self.regex_source(&self.stages[0], |name| value_in(&outer, name));
        trace!(pattern = %self.text, regex = %source, "instantiated pattern");
        let regex = Regex::new(&source)?;
        Ok(Matcher {
            pattern: self,
            first: Cow::Owned(regex),
            outer,
        })
    }

    fn regex_source<'b>(&self, stage: &Stage, lookup: impl Fn(Symbol) -> Option<&'b str>) -> String {
        let mut out = String::new();
        let mut group = stage.groups.start;
        for located in &self.parts[stage.parts.clone()] {
            match &located.part {
                Part::Literal(text) => self.push_literal(&mut out, text),
                Part::Wildcard => out.push_str("(?:.+?)"),
                Part::Regex(regex) => {
                    out.push_str("(?:");
                    out.push_str(regex);
                    out.push(')');
                }
                Part::Capture { regex, .. } => {
                    out.push_str("(?P<");
                    out.push_str(&self.groups[group].0);
                    out.push('>');
                    out.push_str(regex);
                    out.push(')');
                    group += 1;
                }
                Part::Reference(name) => {
                    if let Some(value) = lookup(*name) {
                        self.push_literal(&mut out, value);
                    }
                }
            }
        }

        if !self.options.match_full_lines {
            return out;
        }
        // CRLF mode so `$` also holds before `\r\n`.
        let blank = if self.options.strict_whitespace {
            ""
        } else {
            "[ \\t]*"
        };
        let mut anchored = String::from("(?mR)");
        if stage.parts.start == 0 {
            anchored.push('^');
            anchored.push_str(blank);
        }
        anchored.push_str(&out);
        if stage.parts.end == self.parts.len() {
            anchored.push_str(blank);
            anchored.push('$');
        }
        anchored
    }

    fn push_literal(&self, out: &mut String, text: &str) {
        if self.options.strict_whitespace {
            out.push_str(&regex::escape(text));
            return;
        }
        let mut rest = text;
        while !rest.is_empty() {
            let blank = rest.len() - rest.trim_start_matches([' ', '\t']).len();
            if blank > 0 {
                out.push_str("[ \\t]+");
                rest = &rest[blank..];
                continue;
            }
            let word = rest.find([' ', '\t']).unwrap_or(rest.len());
            out.push_str(&regex::escape(&rest[..word]));
            rest = &rest[word..];
        }
    }
}

/// Split before every reference to a name captured earlier in the same stage.
fn split_stages(parts: &[LocatedPart]) -> Vec<Stage> {
    let mut stages = Vec::new();
    let mut start = 0;
    let mut group_start = 0;
    let mut group = 0;
    let mut captured = Vec::new();
    for (i, located) in parts.iter().enumerate() {
        match &located.part {
            Part::Capture { name, .. } => {
                captured.push(*name);
                group += 1;
            }
            Part::Reference(name) if captured.contains(name) => {
                stages.push(Stage {
                    parts: start..i,
                    groups: group_start..group,
                });
                start = i;
                group_start = group;
                captured.clear();
            }
            _ => {}
        }
    }
    stages.push(Stage {
        parts: start..parts.len(),
        groups: group_start..group,
    });
    stages
}

fn value_in(values: &[(Symbol, String)], name: Symbol) -> Option<&str> {
    values
        .iter()
        .rev()
        .find(|(n, _)| *n == name)
        .map(|(_, value)| value.as_str())
}

impl Matcher<'_> {
    /// First match starting at or after `start`.
    pub fn find_at(&self, haystack: &str, start: usize) -> Option<PatternMatch> {
        let stages = &self.pattern.stages;
        let mut from = start;
        loop {
            let found = self.search(&self.first, &stages[0], haystack, from)?;
            if stages.len() == 1 {
                return Some(found);
            }
            let at = found.range.start;
            if let Some(found) = self.continue_stages(haystack, found) {
                return Some(found);
            }
            // Later stages failed; retry from the next start position.
            from = at + haystack[at..].chars().next().map_or(1, char::len_utf8);
            if from > haystack.len() {
                return None;
            }
        }
    }

    /// Whether the pattern occurs anywhere in `haystack[start..end]`.
    pub fn find_within(&self, haystack: &str, range: Range<usize>) -> Option<PatternMatch> {
        if range.start > range.end {
            return None;
        }
        self.find_at(&haystack[..range.end], range.start)
    }

    fn continue_stages(&self, haystack: &str, mut found: PatternMatch) -> Option<PatternMatch> {
        for stage in &self.pattern.stages[1..] {
            let source = self.pattern.regex_source(stage, |name| {
                found
                    .captures
                    .iter()
                    .rev()
                    .find(|c| c.name == name)
                    .map(|c| c.value.as_str())
                    .or_else(|| value_in(&self.outer, name))
            });
            trace!(pattern = %self.pattern.text, regex = %source, "instantiated stage");
            let regex = Regex::new(&source).ok()?;
            // Leftmost-first: a match at `end` exists iff the search returns one there.
            let next = self.search(&regex, stage, haystack, found.range.end)?;
            if next.range.start != found.range.end {
                return None;
            }
            found.range.end = next.range.end;
            found.captures.extend(next.captures);
        }
        Some(found)
    }

    fn search(
        &self,
        regex: &Regex,
        stage: &Stage,
        haystack: &str,
        from: usize,
    ) -> Option<PatternMatch> {
        let groups = &self.pattern.groups[stage.groups.clone()];
        if groups.is_empty() {
            let m = regex.find_at(haystack, from)?;
            return Some(PatternMatch {
                range: m.range(),
                captures: Vec::new(),
            });
        }

        let caps = regex.captures_at(haystack, from)?;
        let range = caps.get(0)?.range();
        let captures = groups
            .iter()
            .filter_map(|(group, name, global)| {
                caps.name(group).map(|m| CaptureValue {
                    name: *name,
                    global: *global,
                    value: m.as_str().to_string(),
                })
            })
            .collect();
        Some(PatternMatch { range, captures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;
    use verify_common::{SourceId, SymbolInterner};

    fn compile(text: &str, options: PatternOptions, interner: &mut SymbolInterner) -> Pattern {
        let parts = parse(text, 1, interner).unwrap();
        let span = Span::new(SourceId::from_u32(0), 0, text.len() as u32);
        Pattern::from_parts(text, span, parts, options).unwrap()
    }

    fn find(pattern: &Pattern, haystack: &str) -> Option<PatternMatch> {
        pattern
            .instantiate(&Bindings::new())
            .unwrap()
            .find_at(haystack, 0)
    }

    #[test]
    fn test_literal_escaping() {
        let mut interner = SymbolInterner::new();
        let p = compile("#Gizmo.doTheThing!1.foreign", PatternOptions::default(), &mut interner);
        let m = find(&p, "objc_method %0 : $Gizmo, #Gizmo.doTheThing!1.foreign").unwrap();
        assert_eq!(m.range, 25..52);
        assert!(find(&p, "#GizmoXdoTheThing!1.foreign").is_none());
    }

    #[test]
    fn test_whitespace_folding() {
        let mut interner = SymbolInterner::new();
        let loose = compile("a b", PatternOptions::default(), &mut interner);
        assert!(find(&loose, "a \t  b").is_some());
        assert!(find(&loose, "ab").is_none());

        let strict = compile(
            "a b",
            PatternOptions {
                strict_whitespace: true,
                ..Default::default()
            },
            &mut interner,
        );
        assert!(find(&strict, "a  b").is_none());
        assert!(find(&strict, "a b").is_some());
    }

    #[test]
    fn test_wildcard_is_non_empty_and_single_line() {
        let mut interner = SymbolInterner::new();
        let p = compile("foo{{*}}bar", PatternOptions::default(), &mut interner);
        assert!(find(&p, "foobar").is_none());
        assert!(find(&p, "foo\nbar").is_none());
        assert_eq!(find(&p, "foo-bar bar").unwrap().range, 0..7);
    }

    #[test]
    fn test_capture_values() {
        let mut interner = SymbolInterner::new();
        let p = compile(
            "objc_method [[SELF:%[0-9]+]] : $Gizmo",
            PatternOptions::default(),
            &mut interner,
        );
        let m = find(&p, "  %7 = objc_method %12 : $Gizmo, #Gizmo.x").unwrap();
        assert_eq!(m.captures.len(), 1);
        assert_eq!(m.captures[0].value, "%12");
        assert_eq!(m.captures[0].name, interner.get("SELF").unwrap());
        assert!(!m.captures[0].global);
    }

    #[test]
    fn test_reference_needs_binding() {
        let mut interner = SymbolInterner::new();
        let p = compile("use [[X]]", PatternOptions::default(), &mut interner);
        let x = interner.get("X").unwrap();

        let mut bindings = Bindings::new();
        assert!(matches!(
            p.instantiate(&bindings),
            Err(InstantiateError::Unbound(name)) if name == x
        ));

        bindings.bind(x, "%1.a".to_string(), false);
        let matcher = p.instantiate(&bindings).unwrap();
        assert!(matcher.find_at("use %1xa", 0).is_none());
        assert_eq!(matcher.find_at("use %1.a", 0).unwrap().range, 0..8);
    }

    #[test]
    fn test_full_line_matching() {
        let mut interner = SymbolInterner::new();
        let p = compile(
            "return",
            PatternOptions {
                match_full_lines: true,
                ..Default::default()
            },
            &mut interner,
        );
        assert!(find(&p, "return %0").is_none());
        assert!(find(&p, "x\n  return  \ny").is_some());
    }

    #[test]
    fn test_reference_to_capture_in_same_pattern() {
        let mut interner = SymbolInterner::new();
        let p = compile("[[X:[a-z]+]]=[[X]]", PatternOptions::default(), &mut interner);
        let x = interner.get("X").unwrap();
        assert!(p.fixed.is_none());

        let m = find(&p, "ab=cd foo=foo").unwrap();
        assert_eq!(m.range, 6..13);
        assert_eq!(m.captures.len(), 1);
        assert_eq!((m.captures[0].name, m.captures[0].value.as_str()), (x, "foo"));
        assert!(find(&p, "ab=cd foo=bar").is_none());
    }

    #[test]
    fn test_later_stage_captures() {
        let mut interner = SymbolInterner::new();
        let p = compile(
            "[[X:[0-9]+]] [[X]] [[Y:[a-z]+]]",
            PatternOptions::default(),
            &mut interner,
        );
        let m = find(&p, "1 2 3 3 q").unwrap();
        assert_eq!(m.range, 4..9);
        let values: Vec<_> = m.captures.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, vec!["3", "q"]);
    }

    #[test]
    fn test_reference_before_recapture_reads_old_value() {
        let mut interner = SymbolInterner::new();
        let p = compile("[[X]] [[X:[0-9]+]]", PatternOptions::default(), &mut interner);
        let x = interner.get("X").unwrap();
        let mut bindings = Bindings::new();
        bindings.bind(x, "7".to_string(), false);

        let m = p.instantiate(&bindings).unwrap().find_at("1 2 7 42", 0).unwrap();
        assert_eq!(m.range, 4..8);
        assert_eq!(m.captures[0].value, "42");
    }

    #[test]
    fn test_full_line_matching_with_crlf() {
        let mut interner = SymbolInterner::new();
        let p = compile(
            "return",
            PatternOptions {
                match_full_lines: true,
                ..Default::default()
            },
            &mut interner,
        );
        assert_eq!(find(&p, "return\r\n").unwrap().range, 0..6);
        assert_eq!(find(&p, "x\r\nreturn\r\ny").unwrap().range, 3..9);
        assert!(find(&p, "return %0\r\n").is_none());
    }

    #[test]
    fn test_find_within_bounds() {
        let mut interner = SymbolInterner::new();
        let p = compile("bar", PatternOptions::default(), &mut interner);
        let matcher = p.instantiate(&Bindings::new()).unwrap();
        let text = "foo bar baz";
        assert!(matcher.find_within(text, 0..5).is_none());
        assert!(matcher.find_within(text, 0..7).is_some());
        assert!(matcher.find_within(text, 5..7).is_none());
        assert!(matcher.find_within(text, 7..3).is_none());
    }
}
