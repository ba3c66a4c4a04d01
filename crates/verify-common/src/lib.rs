mod span;
mod symbol;
mod source;
mod diagnostic;

pub use span::Span;
pub use symbol::{Symbol, SymbolInterner};
pub use source::{Location, SourceFile, SourceId, SourceKind, SourceMap};
pub use diagnostic::Note;
