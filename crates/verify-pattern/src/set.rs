use crate::error::{sub_span, PatternError};
use crate::pattern::{Pattern, PatternOptions};
use crate::syntax::{self, Part};
use rustc_hash::FxHashMap;
use tracing::debug;
use verify_common::{SourceFile, Span, Symbol, SymbolInterner};
use verify_directive::{CheckFile, DirectiveId, DirectiveKind};

/// Compiled patterns for every directive of a check file.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    /// Indexed by directive id; `None` for `EMPTY` directives.
    patterns: Vec<Option<Pattern>>,
    implicit_not: Vec<Pattern>,
}

/// What a single compilation is allowed to do.
struct Rules<'a> {
    directive: &'a str,
    can_capture: bool,
    can_reference: bool,
    /// Variables defined before this directive, with their globalness.
    defined: &'a FxHashMap<Symbol, bool>,
}

impl PatternSet {
    /// Compile every directive pattern in `check`, which was scanned from
    /// `file`.
    ///
    /// Variable references are checked against the directive order: a
    /// reference must follow a capture of the same name in the same label
    /// block, unless the name is global.
    pub fn compile(
        check: &CheckFile,
        file: &SourceFile,
        options: PatternOptions,
        interner: &mut SymbolInterner,
    ) -> Result<Self, PatternError> {
        let mut defined: FxHashMap<Symbol, bool> = FxHashMap::default();
        let mut patterns = Vec::with_capacity(check.len());

        for directive in check.iter() {
            if directive.kind == DirectiveKind::Label {
                defined.retain(|_, global| *global);
            }
            if directive.kind == DirectiveKind::Empty {
                patterns.push(None);
                continue;
            }

            let options = if directive.kind.is_positive() {
                options
            } else {
                PatternOptions {
                    match_full_lines: false,
                    ..options
                }
            };
            let name = directive.name();
            let pattern = compile_one(
                &directive.pattern,
                directive.pattern_span,
                directive.line,
                file,
                options,
                interner,
                Rules {
                    directive: &name,
                    can_capture: directive.kind.can_capture(),
                    can_reference: directive.kind != DirectiveKind::Label,
                    defined: &defined,
                },
            )?;
            for part in pattern.parts() {
                if let Part::Capture { name, global, .. } = part {
                    defined.insert(*name, *global);
                }
            }
            patterns.push(Some(pattern));
        }

        debug!(count = patterns.len(), "compiled directive patterns");
        Ok(Self {
            patterns,
            implicit_not: Vec::new(),
        })
    }

    /// Add patterns that must not occur between any two positive matches.
    ///
    /// `file` holds one pattern per line; blank lines are skipped.
    pub fn with_implicit_not(
        mut self,
        file: &SourceFile,
        options: PatternOptions,
        interner: &mut SymbolInterner,
    ) -> Result<Self, PatternError> {
        let none = FxHashMap::default();
        let options = PatternOptions {
            match_full_lines: false,
            ..options
        };
        for (line_idx, line_start, text) in file.lines() {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }
            let leading = (text.len() - text.trim_start().len()) as u32;
            let start = line_start + leading;
            let span = Span::new(file.id, start, start + trimmed.len() as u32);
            let pattern = compile_one(
                trimmed,
                span,
                line_idx + 1,
                file,
                options,
                interner,
                Rules {
                    directive: "implicit-check-not",
                    can_capture: false,
                    can_reference: true,
                    defined: &none,
                },
            )?;
            self.implicit_not.push(pattern);
        }
        Ok(self)
    }

    pub fn get(&self, id: DirectiveId) -> Option<&Pattern> {
        self.patterns.get(id.index()).and_then(Option::as_ref)
    }

    pub fn implicit_not(&self) -> &[Pattern] {
        &self.implicit_not
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn compile_one(
    text: &str,
    span: Span,
    line: u32,
    file: &SourceFile,
    options: PatternOptions,
    interner: &mut SymbolInterner,
    rules: Rules<'_>,
) -> Result<Pattern, PatternError> {
    let parts = syntax::parse(text, line, interner)
        .map_err(|err| PatternError::from_syntax(err, file, span, line))?;

    // Captures are visible to references later in the same pattern.
    let mut captured = Vec::new();
    for located in &parts {
        let name = match &located.part {
            Part::Capture { name, .. } if rules.can_capture => {
                captured.push(*name);
                continue;
            }
            Part::Reference(name) if rules.can_reference => {
                if captured.contains(name) || rules.defined.contains_key(name) {
                    continue;
                }
                return Err(PatternError::UndefinedVariable {
                    name: interner.resolve(*name).to_string(),
                    line,
                    span: sub_span(span, &located.range),
                    src: file.to_named_source(),
                });
            }
            Part::Capture { name, .. } | Part::Reference(name) => name,
            _ => continue,
        };
        return Err(PatternError::VariableNotAllowed {
            name: interner.resolve(*name).to_string(),
            directive: rules.directive.to_string(),
            line,
            span: sub_span(span, &located.range),
            src: file.to_named_source(),
        });
    }

    Pattern::from_parts(text, span, parts, options)
        .map_err(|err| PatternError::invalid_regex(&err, file, span, line))
}
