//! Pattern compilation for check directives.
//!
//! # Pattern syntax
//!
//! | Token              | Meaning                                              |
//! |--------------------|------------------------------------------------------|
//! | plain text         | Literal text                                         |
//! | `{{*}}`            | Any non-empty span within one line                   |
//! | `{{regex}}`        | Embedded regular expression                          |
//! | `[[NAME:regex]]`   | Match `regex` and bind the text to `NAME`            |
//! | `[[NAME]]`         | Match the text previously bound to `NAME`            |
//! | `[[@LINE]]`        | The directive's own line number                      |
//! | `[[@LINE+n]]`      | The directive's line number plus (or minus) `n`      |
//!
//! Names starting with `$` are global: they survive `LABEL` boundaries.
//! Unless whitespace is strict, a run of blanks in literal text matches
//! any run of blanks in the input.

mod bindings;
mod error;
mod pattern;
mod set;
mod syntax;

pub use bindings::{Binding, Bindings};
pub use error::{InstantiateError, PatternError};
pub use pattern::{CaptureValue, Matcher, Pattern, PatternMatch, PatternOptions};
pub use set::PatternSet;
pub use syntax::{is_valid_name, Part};
