//! Splits pattern text into literal, regex and variable parts.

use std::fmt;
use std::ops::Range;
use verify_common::{Symbol, SymbolInterner};

/// One piece of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// Text matched literally (modulo whitespace folding).
    Literal(String),
    /// `{{*}}`
    Wildcard,
    /// `{{regex}}`
    Regex(String),
    /// `[[NAME:regex]]`
    Capture {
        name: Symbol,
        global: bool,
        regex: String,
    },
    /// `[[NAME]]`
    Reference(Symbol),
}

/// A part together with its byte range in the pattern text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LocatedPart {
    pub part: Part,
    pub range: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SyntaxErrorKind {
    Unclosed(&'static str),
    EmptyRegex,
    InvalidRegex(String),
    InvalidName(String),
    InvalidLineExpr(String),
}

impl fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unclosed(open) => write!(f, "unclosed '{open}'"),
            Self::EmptyRegex => write!(f, "empty regular expression"),
            Self::InvalidRegex(msg) => write!(f, "invalid regular expression: {msg}"),
            Self::InvalidName(name) => write!(f, "invalid variable name '{name}'"),
            Self::InvalidLineExpr(expr) => write!(f, "invalid line expression '{expr}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub range: Range<usize>,
}

/// Whether `name` is usable as a variable name (`$?[A-Za-z_][A-Za-z0-9_]*`).
pub fn is_valid_name(name: &str) -> bool {
    let name = name.strip_prefix('$').unwrap_or(name);
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse pattern text written on 1-based directive line `line`.
pub(crate) fn parse(
    text: &str,
    line: u32,
    interner: &mut SymbolInterner,
) -> Result<Vec<LocatedPart>, SyntaxError> {
    Parser {
        text,
        line,
        interner,
        pos: 0,
        parts: Vec::new(),
        literal_start: 0,
    }
    .run()
}

struct Parser<'a> {
    text: &'a str,
    line: u32,
    interner: &'a mut SymbolInterner,
    pos: usize,
    parts: Vec<LocatedPart>,
    literal_start: usize,
}

impl Parser<'_> {
    fn run(mut self) -> Result<Vec<LocatedPart>, SyntaxError> {
        while self.pos < self.text.len() {
            let rest = &self.text[self.pos..];
            if rest.starts_with("{{") {
                self.flush_literal();
                self.parse_regex_block()?;
            } else if rest.starts_with("[[") {
                self.flush_literal();
                self.parse_variable_block()?;
            } else {
                // Advance by one char; literal text accumulates lazily.
                let width = rest.chars().next().map_or(1, char::len_utf8);
                self.pos += width;
            }
        }
        self.flush_literal();
        Ok(self.parts)
    }

    fn flush_literal(&mut self) {
        if self.literal_start < self.pos {
            let range = self.literal_start..self.pos;
            let text = self.text[range.clone()].to_string();
            self.parts.push(LocatedPart {
                part: Part::Literal(text),
                range,
            });
        }
        self.literal_start = self.pos;
    }

    fn push(&mut self, part: Part, range: Range<usize>) {
        self.parts.push(LocatedPart { part, range });
        self.literal_start = self.pos;
    }

    /// `{{...}}` starting at `self.pos`.
    fn parse_regex_block(&mut self) -> Result<(), SyntaxError> {
        let start = self.pos;
        let body_start = start + 2;
        let Some(mut close) = self.text[body_start..].find("}}") else {
            return Err(SyntaxError {
                kind: SyntaxErrorKind::Unclosed("{{"),
                range: start..start + 2,
            });
        };
        // In a run such as `}}}` the last two braces close the block.
        let run = &self.text[body_start + close..];
        close += run.len() - run.trim_start_matches('}').len() - 2;
        let body = &self.text[body_start..body_start + close];
        let end = body_start + close + 2;
        let range = start..end;

        let part = match body {
            "*" => Part::Wildcard,
            "" => {
                return Err(SyntaxError {
                    kind: SyntaxErrorKind::EmptyRegex,
                    range,
                })
            }
            _ => {
                check_regex(body, range.clone())?;
                Part::Regex(body.to_string())
            }
        };
        self.pos = end;
        self.push(part, range);
        Ok(())
    }

    /// `[[...]]` starting at `self.pos`.
    fn parse_variable_block(&mut self) -> Result<(), SyntaxError> {
        let start = self.pos;
        let body_start = start + 2;
        let Some(close) = find_variable_close(&self.text[body_start..]) else {
            return Err(SyntaxError {
                kind: SyntaxErrorKind::Unclosed("[["),
                range: start..start + 2,
            });
        };
        let body = &self.text[body_start..body_start + close];
        let end = body_start + close + 2;
        let range = start..end;

        let part = if let Some(expr) = body.strip_prefix('@') {
            let line = self.line_expr(expr).ok_or_else(|| SyntaxError {
                kind: SyntaxErrorKind::InvalidLineExpr(body.to_string()),
                range: range.clone(),
            })?;
            Part::Literal(line.to_string())
        } else if let Some((name, regex)) = body.split_once(':') {
            if !is_valid_name(name) {
                return Err(SyntaxError {
                    kind: SyntaxErrorKind::InvalidName(name.to_string()),
                    range,
                });
            }
            if regex.is_empty() {
                return Err(SyntaxError {
                    kind: SyntaxErrorKind::EmptyRegex,
                    range,
                });
            }
            check_regex(regex, range.clone())?;
            Part::Capture {
                name: self.interner.intern(name),
                global: name.starts_with('$'),
                regex: regex.to_string(),
            }
        } else {
            if !is_valid_name(body) {
                return Err(SyntaxError {
                    kind: SyntaxErrorKind::InvalidName(body.to_string()),
                    range,
                });
            }
            Part::Reference(self.interner.intern(body))
        };

        self.pos = end;
        self.push(part, range);
        Ok(())
    }

    /// `LINE`, `LINE+n` or `LINE-n`.
    fn line_expr(&self, expr: &str) -> Option<u32> {
        let rest = expr.strip_prefix("LINE")?;
        let line = i64::from(self.line);
        let value = if rest.is_empty() {
            line
        } else if let Some(n) = rest.strip_prefix('+') {
            line + n.trim().parse::<i64>().ok()?
        } else if let Some(n) = rest.strip_prefix('-') {
            line - n.trim().parse::<i64>().ok()?
        } else {
            return None;
        };
        u32::try_from(value).ok()
    }
}

/// Offset of the `]]` closing a variable block, skipping bracket
/// expressions such as `[0-9]` inside the regex.
fn find_variable_close(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'[' => depth += 1,
            b']' if depth > 0 => depth -= 1,
            b']' if bytes.get(i + 1) == Some(&b']') => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

fn check_regex(regex: &str, range: Range<usize>) -> Result<(), SyntaxError> {
    regex::Regex::new(regex).map(|_| ()).map_err(|err| SyntaxError {
        kind: SyntaxErrorKind::InvalidRegex(err.to_string()),
        range,
    })
}
