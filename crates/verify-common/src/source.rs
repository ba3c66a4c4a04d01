use miette::NamedSource;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Unique identifier for a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(u32);

impl SourceId {
    pub fn from_u32(id: u32) -> Self {
        SourceId(id)
    }
}

/// The role a source file plays in a verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// The file carrying check directives.
    Directives,
    /// The text being verified.
    Input,
}

/// A 1-based line/column position, as shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A source file with its contents.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: SourceId,
    pub path: PathBuf,
    pub content: String,
    pub kind: SourceKind,
    line_starts: Vec<u32>,
}

impl SourceFile {
    pub fn new(id: SourceId, path: PathBuf, content: String, kind: SourceKind) -> Self {
        let line_starts = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(i, _)| i as u32 + 1))
            .collect();

        Self {
            id,
            path,
            content,
            kind,
            line_starts,
        }
    }

    /// Get line and column (0-indexed) from byte offset.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let col = offset - self.line_starts[line];
        (line as u32, col)
    }

    /// Get the 1-based location of a byte offset.
    pub fn location(&self, offset: u32) -> Location {
        let (line, col) = self.line_col(offset);
        Location {
            line: line + 1,
            column: col + 1,
        }
    }

    /// Get the content of a specific line (0-indexed), without its newline.
    pub fn line(&self, line: u32) -> &str {
        let start = self.line_starts[line as usize] as usize;
        let end = self
            .line_starts
            .get(line as usize + 1)
            .map(|&e| e as usize)
            .unwrap_or(self.content.len());
        self.content[start..end].trim_end_matches('\n')
    }

    /// Byte offset where a line (0-indexed) starts.
    pub fn line_start(&self, line: u32) -> u32 {
        self.line_starts[line as usize]
    }

    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }

    /// Iterate over `(line index, byte offset of line start, line text)`.
    pub fn lines(&self) -> impl Iterator<Item = (u32, u32, &str)> + '_ {
        (0..self.line_count()).map(move |i| (i, self.line_start(i), self.line(i)))
    }

    pub fn display_name(&self) -> String {
        self.path.display().to_string()
    }

    pub fn to_named_source(&self) -> NamedSource<String> {
        NamedSource::new(self.display_name(), self.content.clone())
    }
}

/// Registry of all source files in a session.
#[derive(Debug, Default)]
pub struct SourceMap {
    files: Vec<Arc<SourceFile>>,
    path_to_id: FxHashMap<PathBuf, SourceId>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file. A later file with the same path shadows the earlier
    /// one in [`SourceMap::get_by_path`].
    pub fn add_file(
        &mut self,
        path: impl AsRef<Path>,
        content: String,
        kind: SourceKind,
    ) -> Arc<SourceFile> {
        let path = path.as_ref().to_path_buf();

        let id = SourceId(self.files.len() as u32);
        let file = Arc::new(SourceFile::new(id, path.clone(), content, kind));
        self.files.push(Arc::clone(&file));
        self.path_to_id.insert(path, id);

        file
    }

    pub fn get(&self, id: SourceId) -> Option<Arc<SourceFile>> {
        self.files.get(id.0 as usize).cloned()
    }

    pub fn get_by_path(&self, path: impl AsRef<Path>) -> Option<Arc<SourceFile>> {
        let id = self.path_to_id.get(path.as_ref())?;
        self.get(*id)
    }

    /// Forget every file. Ids handed out earlier are reused afterwards.
    pub fn clear(&mut self) {
        self.files.clear();
        self.path_to_id.clear();
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(content: &str) -> SourceFile {
        SourceFile::new(
            SourceId(0),
            PathBuf::from("test.txt"),
            content.to_string(),
            SourceKind::Input,
        )
    }

    #[test]
    fn test_line_col() {
        let f = file("abc\ndef\n\nxyz");
        assert_eq!(f.line_col(0), (0, 0));
        assert_eq!(f.line_col(5), (1, 1));
        assert_eq!(f.line_col(8), (2, 0));
        assert_eq!(f.location(9), Location { line: 4, column: 1 });
        assert_eq!(f.line_count(), 4);
    }

    #[test]
    fn test_line_text() {
        let f = file("first\nsecond\n");
        assert_eq!(f.line(0), "first");
        assert_eq!(f.line(1), "second");
        assert_eq!(f.line(2), "");
        assert_eq!(f.line_start(1), 6);
    }

    #[test]
    fn test_source_map_lookup() {
        let mut map = SourceMap::new();
        let a = map.add_file("a.swift", "// CHECK: x".to_string(), SourceKind::Directives);
        let b = map.add_file("b.sil", "x".to_string(), SourceKind::Input);
        assert_ne!(a.id, b.id);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(b.id).unwrap().kind, SourceKind::Input);
        assert_eq!(map.get_by_path("a.swift").unwrap().id, a.id);
        assert!(map.get_by_path("missing").is_none());

        map.clear();
        assert!(map.is_empty());
        assert!(map.get_by_path("a.swift").is_none());
        let c = map.add_file("c.sil", "y".to_string(), SourceKind::Input);
        assert_eq!(c.id, a.id);
    }
}
