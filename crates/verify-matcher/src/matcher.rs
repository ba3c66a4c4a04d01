use crate::error::{MatchError, MatchFailure};
use crate::record::{MatchRecord, MatchReport};
use miette::SourceSpan;
use std::ops::Range;
use tracing::{debug, trace};
use verify_common::{Location, Note, SourceFile, SymbolInterner};
use verify_config::MatchingConfig;
use verify_directive::{CheckFile, Directive, DirectiveId, DirectiveKind};
use verify_pattern::{
    InstantiateError, Matcher, Pattern, PatternError, PatternMatch, PatternSet,
};

/// Run-time options that are not part of pattern compilation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    pub allow_empty: bool,
}

impl From<&MatchingConfig> for MatchOptions {
    fn from(config: &MatchingConfig) -> Self {
        Self {
            allow_empty: config.allow_empty,
        }
    }
}

/// Matches one check file against one input.
///
/// The matcher owns the cursor and the bindings; nothing is shared between
/// runs.
pub struct SequentialMatcher<'a> {
    check: &'a CheckFile,
    patterns: &'a PatternSet,
    directives: &'a SourceFile,
    input: &'a SourceFile,
    implicit: Option<&'a SourceFile>,
    interner: &'a SymbolInterner,
    options: MatchOptions,
    report: MatchReport,
}

/// Where a NOT pattern came from.
#[derive(Debug, Clone, Copy)]
enum NotSource {
    Directive(DirectiveId),
    Implicit(usize),
}

/// A NOT pattern waiting for the next positive match.
struct PendingNot<'p> {
    source: NotSource,
    matcher: Matcher<'p>,
}

/// Cursor state inside one label block.
struct Block {
    region: Range<usize>,
    /// Where the next ordered search starts.
    cursor: usize,
    /// End of the last positive match, for NEXT/SAME/EMPTY.
    last_end: usize,
}

impl<'a> SequentialMatcher<'a> {
    pub fn new(
        check: &'a CheckFile,
        patterns: &'a PatternSet,
        directives: &'a SourceFile,
        input: &'a SourceFile,
        interner: &'a SymbolInterner,
    ) -> Self {
        Self {
            check,
            patterns,
            directives,
            input,
            implicit: None,
            interner,
            options: MatchOptions::default(),
            report: MatchReport::default(),
        }
    }

    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    /// The file the patterns in [`PatternSet::implicit_not`] were read from.
    pub fn with_implicit_source(mut self, file: &'a SourceFile) -> Self {
        self.implicit = Some(file);
        self
    }

    pub fn run(mut self) -> Result<MatchReport, MatchError> {
        let text = self.text();
        if text.is_empty() && !self.options.allow_empty {
            return Err(MatchFailure::EmptyInput {
                input: self.input.display_name(),
            }
            .into());
        }

        let labels = self.locate_labels()?;

        // Directive index range, input region and the label opening the block.
        let mut blocks = Vec::with_capacity(labels.len() + 1);
        let mut first_directive = 0;
        let mut region_start = 0;
        let mut opening: Option<(DirectiveId, Range<usize>)> = None;
        for (id, range) in labels {
            blocks.push((
                first_directive..id.index(),
                region_start..range.start,
                opening.take(),
            ));
            first_directive = id.index() + 1;
            region_start = range.end;
            opening = Some((id, range));
        }
        blocks.push((first_directive..self.check.len(), region_start..text.len(), opening));

        let check = self.check;
        for (directives, region, opening) in blocks {
            if let Some((id, range)) = opening {
                self.report.bindings.clear_locals();
                self.record(check.get(id), range);
            }
            self.match_block(directives, region)?;
        }

        debug!(
            matches = self.report.matches.len(),
            bindings = self.report.bindings.len(),
            "all directives satisfied"
        );
        Ok(self.report)
    }

    fn text(&self) -> &'a str {
        &self.input.content
    }

    fn location(&self, offset: usize) -> Location {
        self.input.location(offset as u32)
    }

    fn line_of(&self, offset: usize) -> u32 {
        self.input.line_col(offset as u32).0
    }

    /// Find every label in order; each search starts where the last ended.
    fn locate_labels(&self) -> Result<Vec<(DirectiveId, Range<usize>)>, MatchError> {
        let text = self.text();
        let mut cursor = 0;
        let mut labels = Vec::new();
        for directive in self.check.iter().filter(|d| d.kind == DirectiveKind::Label) {
            let matcher = self.instantiate(directive)?;
            let Some(found) = matcher.find_at(text, cursor) else {
                return Err(MatchFailure::LabelNotFound {
                    directive: directive.name(),
                    pattern: directive.pattern.clone(),
                    line: directive.line,
                    cursor: self.location(cursor),
                    span: point(cursor),
                    src: self.input.to_named_source(),
                    notes: vec![self.directive_note(directive)],
                }
                .into());
            };
            trace!(directive = %directive, at = %self.location(found.range.start), "located label");
            cursor = found.range.end;
            labels.push((directive.id, found.range));
        }
        Ok(labels)
    }

    fn match_block(
        &mut self,
        directives: Range<usize>,
        region: Range<usize>,
    ) -> Result<(), MatchError> {
        let check = self.check;
        let mut block = Block {
            cursor: region.start,
            last_end: region.start,
            region,
        };
        let mut pending: Vec<PendingNot<'a>> = Vec::new();

        let mut i = directives.start;
        while i < directives.end {
            let directive = &check.directives[i];
            match directive.kind {
                DirectiveKind::Not => {
                    pending.push(PendingNot {
                        source: NotSource::Directive(directive.id),
                        matcher: self.instantiate(directive)?,
                    });
                    i += 1;
                }
                DirectiveKind::Dag => {
                    let end = (i..directives.end)
                        .find(|&j| check.directives[j].kind != DirectiveKind::Dag)
                        .unwrap_or(directives.end);
                    self.match_dag_group(&check.directives[i..end], &mut block, &mut pending)?;
                    i = end;
                }
                DirectiveKind::Empty => {
                    self.match_empty(directive, &mut block, &mut pending)?;
                    i += 1;
                }
                DirectiveKind::Plain
                | DirectiveKind::Next
                | DirectiveKind::Same
                | DirectiveKind::Count(_) => {
                    self.match_ordered(directive, &mut block, &mut pending)?;
                    i += 1;
                }
                // Labels were matched up front and bound the block.
                DirectiveKind::Label => i += 1,
            }
        }

        self.check_nots(&pending, block.cursor..block.region.end, block.cursor)
    }

    fn match_ordered(
        &mut self,
        directive: &'a Directive,
        block: &mut Block,
        pending: &mut Vec<PendingNot<'a>>,
    ) -> Result<(), MatchError> {
        let text = self.text();
        let matcher = self.instantiate(directive)?;
        let repeats = match directive.kind {
            DirectiveKind::Count(n) => n,
            _ => 1,
        };
        let gap_start = block.cursor;

        for occurrence in 0..repeats {
            let Some(found) = matcher.find_within(text, block.cursor..block.region.end) else {
                let help = (repeats > 1)
                    .then(|| format!("found {occurrence} of {repeats} required matches"));
                return Err(self.not_found(directive, block.cursor, help).into());
            };

            if occurrence == 0 {
                self.check_adjacency(directive, block, &found)?;
                self.check_nots(pending, gap_start..found.range.start, gap_start)?;
                pending.clear();
            }

            self.apply(directive, &found);
            block.cursor = found.range.end;
            block.last_end = found.range.end;
        }
        Ok(())
    }

    fn check_adjacency(
        &self,
        directive: &Directive,
        block: &Block,
        found: &PatternMatch,
    ) -> Result<(), MatchFailure> {
        let (expected, delta) = match directive.kind {
            DirectiveKind::Next => ("on the next line", 1),
            DirectiveKind::Same => ("on the same line", 0),
            _ => return Ok(()),
        };
        let previous = self.line_of(block.last_end);
        if self.line_of(found.range.start) == previous + delta {
            return Ok(());
        }
        Err(MatchFailure::WrongLine {
            directive: directive.name(),
            pattern: directive.pattern.clone(),
            line: directive.line,
            expected,
            cursor: self.location(block.last_end),
            found_at: self.location(found.range.start),
            span: point(block.last_end),
            found: to_source_span(&found.range),
            src: self.input.to_named_source(),
            notes: vec![self.directive_note(directive)],
        })
    }

    fn match_empty(
        &mut self,
        directive: &'a Directive,
        block: &mut Block,
        pending: &mut Vec<PendingNot<'a>>,
    ) -> Result<(), MatchError> {
        let text = self.text();
        let from = block.last_end;
        let next_line = text[from..].find('\n').map(|i| from + i + 1);
        let empty_line = next_line.filter(|&start| {
            start < block.region.end
                && (text[start..].starts_with('\n') || text[start..].starts_with("\r\n"))
        });

        let Some(start) = empty_line else {
            let at = next_line.unwrap_or(from);
            return Err(MatchFailure::NotEmpty {
                directive: directive.name(),
                line: directive.line,
                cursor: self.location(block.cursor),
                span: point(at),
                src: self.input.to_named_source(),
                notes: vec![self.directive_note(directive)],
            }
            .into());
        };

        self.check_nots(pending, block.cursor..start, block.cursor)?;
        pending.clear();
        self.record(directive, start..start);
        block.cursor = start;
        block.last_end = start;
        Ok(())
    }

    /// Match a run of DAG directives in any order without overlaps.
    fn match_dag_group(
        &mut self,
        group: &'a [Directive],
        block: &mut Block,
        pending: &mut Vec<PendingNot<'a>>,
    ) -> Result<(), MatchError> {
        let text = self.text();
        let group_start = block.cursor;
        let mut taken: Vec<Range<usize>> = Vec::with_capacity(group.len());

        for directive in group {
            let matcher = self.instantiate(directive)?;
            let mut pos = group_start;
            let found = loop {
                let Some(found) = matcher.find_within(text, pos..block.region.end) else {
                    return Err(self.not_found(directive, group_start, None).into());
                };
                match taken.iter().find(|r| overlaps(r, &found.range)) {
                    Some(r) => pos = r.end.max(next_char_boundary(text, found.range.start)),
                    None => break found,
                }
            };
            self.apply(directive, &found);
            taken.push(found.range);
        }

        let first_start = taken.iter().map(|r| r.start).min().unwrap_or(group_start);
        let last_end = taken.iter().map(|r| r.end).max().unwrap_or(group_start);
        self.check_nots(pending, group_start..first_start, group_start)?;
        pending.clear();
        block.cursor = block.cursor.max(last_end);
        block.last_end = last_end;
        Ok(())
    }

    /// Fail if any pending or implicit NOT pattern occurs in `gap`.
    fn check_nots(
        &self,
        pending: &[PendingNot<'a>],
        gap: Range<usize>,
        cursor: usize,
    ) -> Result<(), MatchError> {
        let text = self.text();
        for not in pending {
            if let Some(found) = not.matcher.find_within(text, gap.clone()) {
                return Err(self.not_violation(not.source, &found, cursor).into());
            }
        }

        let Some(implicit_file) = self.implicit else {
            return Ok(());
        };
        for (idx, pattern) in self.patterns.implicit_not().iter().enumerate() {
            let line = implicit_file.location(pattern.span().start).line;
            let matcher = self.instantiate_pattern(pattern, implicit_file, line)?;
            if let Some(found) = matcher.find_within(text, gap.clone()) {
                return Err(self
                    .not_violation(NotSource::Implicit(idx), &found, cursor)
                    .into());
            }
        }
        Ok(())
    }

    fn apply(&mut self, directive: &Directive, found: &PatternMatch) {
        for capture in &found.captures {
            trace!(
                name = self.interner.resolve(capture.name),
                value = %capture.value,
                "bound variable"
            );
            self.report
                .bindings
                .bind(capture.name, capture.value.clone(), capture.global);
        }
        self.record(directive, found.range.clone());
    }

    fn record(&mut self, directive: &Directive, range: Range<usize>) {
        let location = self.location(range.start);
        debug!(directive = %directive, at = %location, "matched");
        self.report.matches.push(MatchRecord {
            directive: directive.id,
            range,
            location,
        });
    }

    fn instantiate(&self, directive: &Directive) -> Result<Matcher<'a>, MatchError> {
        let patterns: &'a PatternSet = self.patterns;
        // Only EMPTY directives lack a pattern, and they are never instantiated.
        let Some(pattern) = patterns.get(directive.id) else {
            return Err(MatchFailure::NotFound {
                directive: directive.name(),
                pattern: directive.pattern.clone(),
                line: directive.line,
                cursor: self.location(0),
                span: point(0),
                src: self.input.to_named_source(),
                help: None,
                notes: vec![self.directive_note(directive)],
            }
            .into());
        };
        self.instantiate_pattern(pattern, self.directives, directive.line)
    }

    fn instantiate_pattern(
        &self,
        pattern: &'a Pattern,
        file: &SourceFile,
        line: u32,
    ) -> Result<Matcher<'a>, MatchError> {
        pattern
            .instantiate(&self.report.bindings)
            .map_err(|err| match err {
                InstantiateError::Unbound(name) => PatternError::unbound(
                    self.interner.resolve(name),
                    file,
                    pattern.span(),
                    line,
                ),
                InstantiateError::Regex(err) => {
                    PatternError::invalid_regex(&err, file, pattern.span(), line)
                }
            })
            .map_err(MatchError::from)
    }

    fn not_found(
        &self,
        directive: &Directive,
        cursor: usize,
        help: Option<String>,
    ) -> MatchFailure {
        let help = match (help, self.variable_values(directive)) {
            (Some(a), Some(b)) => Some(format!("{a}; {b}")),
            (a, b) => a.or(b),
        };
        MatchFailure::NotFound {
            directive: directive.name(),
            pattern: directive.pattern.clone(),
            line: directive.line,
            cursor: self.location(cursor),
            span: point(cursor),
            src: self.input.to_named_source(),
            help,
            notes: vec![self.directive_note(directive)],
        }
    }

    fn not_violation(&self, source: NotSource, found: &PatternMatch, cursor: usize) -> MatchFailure {
        let (directive, pattern, line, note) = match source {
            NotSource::Directive(id) => {
                let d = self.check.get(id);
                (d.name(), d.pattern.clone(), d.line, self.directive_note(d))
            }
            NotSource::Implicit(idx) => {
                let pattern = &self.patterns.implicit_not()[idx];
                let mut note = Note::new("implicit-check-not pattern")
                    .with_span(pattern.span())
                    .with_label("excluded everywhere");
                let mut line = 0;
                if let Some(file) = self.implicit {
                    line = file.location(pattern.span().start).line;
                    note = note.in_file(file);
                }
                (
                    "implicit-check-not".to_string(),
                    pattern.text().to_string(),
                    line,
                    note,
                )
            }
        };
        MatchFailure::NotViolation {
            directive,
            pattern,
            line,
            cursor: self.location(cursor),
            found_at: self.location(found.range.start),
            span: point(cursor),
            found: to_source_span(&found.range),
            src: self.input.to_named_source(),
            notes: vec![note],
        }
    }

    fn directive_note(&self, directive: &Directive) -> Note {
        Note::new(format!("{} written here", directive.name()))
            .with_span(directive.keyword_span.merge(directive.pattern_span))
            .with_label("directive")
            .in_file(self.directives)
    }

    /// `with "X" equal to "%1"` for each variable the directive references.
    fn variable_values(&self, directive: &Directive) -> Option<String> {
        let pattern = self.patterns.get(directive.id)?;
        let values: Vec<String> = pattern
            .references()
            .filter_map(|name| {
                let value = self.report.bindings.get(name)?;
                Some(format!(
                    "with \"{}\" equal to \"{}\"",
                    self.interner.resolve(name),
                    value
                ))
            })
            .collect();
        (!values.is_empty()).then(|| values.join(", "))
    }
}

fn point(offset: usize) -> SourceSpan {
    SourceSpan::new(offset.into(), 0)
}

fn to_source_span(range: &Range<usize>) -> SourceSpan {
    SourceSpan::new(range.start.into(), range.end - range.start)
}

/// Whether two matches share input. An empty match overlaps a range that
/// strictly contains its position.
fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end.max(b.start + 1) && b.start < a.end.max(a.start + 1)
}

fn next_char_boundary(text: &str, offset: usize) -> usize {
    let mut next = offset + 1;
    while next < text.len() && !text.is_char_boundary(next) {
        next += 1;
    }
    next.min(text.len())
}
