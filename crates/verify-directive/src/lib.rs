//! Check directive scanning.
//!
//! A directive is a comment-prefixed line such as
//!
//! ```text
//! // CHECK-LABEL: sil hidden @main
//! } // CHECK: } // end sil function 'main'
//! ```
//!
//! Lines without a directive are ignored. The scanner produces a
//! [`CheckFile`]: the ordered list of directives found in one file.

mod directive;
mod error;
mod scanner;

pub use directive::{CheckFile, Directive, DirectiveId, DirectiveKind};
pub use error::ParseError;
pub use scanner::{scan, Scanner};
