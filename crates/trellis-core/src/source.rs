//! Source files, spans and line lookup.
//!
//! Every element read from disk remembers where it came from through an
//! [`Origin`]: the [`SourceId`] of its file in the [`SourceMap`], the byte
//! [`Span`] of its start tag and the 1-based line number. Diagnostics use the
//! origin to point back at the file that caused a failure, even after the
//! element has been cloned into another part of the document.

use std::{
    fmt,
    ops::Range,
    path::{Path, PathBuf},
};

/// A byte range in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    start: usize,
    end: usize,
}

impl Span {
    /// Create a new span from a byte range.
    pub fn new(range: Range<usize>) -> Self {
        Self {
            start: range.start,
            end: range.end.max(range.start),
        }
    }

    /// Get the start offset of the span
    pub fn start(&self) -> usize {
        self.start
    }

    /// Get the end offset of the span
    pub fn end(&self) -> usize {
        self.end
    }

    /// Get the length of the span
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the span is empty
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Create a union of two spans (encompassing both)
    pub fn union(&self, other: Span) -> Span {
        Span::new(self.start.min(other.start)..self.end.max(other.end))
    }
}

/// Identifier of a file registered in a [`SourceMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(usize);

impl SourceId {
    /// Index of the file inside its [`SourceMap`].
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Where an element was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    source: Option<SourceId>,
    span: Span,
    line: usize,
}

impl Origin {
    /// Create an origin inside a registered source file.
    pub fn new(source: SourceId, span: Span, line: usize) -> Self {
        Self {
            source: Some(source),
            span,
            line,
        }
    }

    /// Create an origin for markup that did not come from a file,
    /// e.g. a fragment produced by an expression.
    pub fn detached(span: Span, line: usize) -> Self {
        Self {
            source: None,
            span,
            line,
        }
    }

    /// The file this element came from, if any.
    pub fn source(&self) -> Option<SourceId> {
        self.source
    }

    /// Byte span of the element's start tag.
    pub fn span(&self) -> Span {
        self.span
    }

    /// 1-based line number of the element's start tag.
    pub fn line(&self) -> usize {
        self.line
    }
}

/// Byte offsets of line starts, for offset → line conversion.
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Index the line starts of `text`.
    pub fn new(text: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(offset, _)| offset + 1))
            .collect();
        Self { line_starts }
    }

    /// 1-based line containing the byte `offset`.
    pub fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(index) => index + 1,
            Err(index) => index,
        }
    }
}

/// A file loaded into the document.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    text: String,
    lines: LineIndex,
}

impl SourceFile {
    /// Path the file was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full text of the file.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// 1-based line containing the byte `offset`.
    pub fn line_of(&self, offset: usize) -> usize {
        self.lines.line_of(offset)
    }
}

/// All files read during a run, addressed by [`SourceId`].
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    /// Create an empty source map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file and return its id.
    pub fn add(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> SourceId {
        let text = text.into();
        let lines = LineIndex::new(&text);
        self.files.push(SourceFile {
            path: path.into(),
            text,
            lines,
        });
        SourceId(self.files.len() - 1)
    }

    /// Look up a registered file.
    pub fn get(&self, id: SourceId) -> Option<&SourceFile> {
        self.files.get(id.0)
    }

    /// Number of registered files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no file has been registered.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over all registered files.
    pub fn iter(&self) -> impl Iterator<Item = (SourceId, &SourceFile)> {
        self.files
            .iter()
            .enumerate()
            .map(|(index, file)| (SourceId(index), file))
    }

    /// Render `file:line` for an origin, falling back to `line N`.
    pub fn describe(&self, origin: &Origin) -> String {
        match origin.source().and_then(|id| self.get(id)) {
            Some(file) => format!("{}:{}", file.path().display(), origin.line()),
            None => format!("line {}", origin.line()),
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_union() {
        let a = Span::new(4..8);
        let b = Span::new(10..12);
        assert_eq!(a.union(b), Span::new(4..12));
        assert_eq!(a.len(), 4);
        assert!(Span::default().is_empty());
    }

    #[test]
    fn test_line_index() {
        let index = LineIndex::new("<a>\n  <b/>\n</a>\n");
        assert_eq!(index.line_of(0), 1);
        assert_eq!(index.line_of(3), 1);
        assert_eq!(index.line_of(4), 2);
        assert_eq!(index.line_of(6), 2);
        assert_eq!(index.line_of(11), 3);
    }

    #[test]
    fn test_source_map_describe() {
        let mut sources = SourceMap::new();
        let id = sources.add("main.xml", "<a>\n<b/>\n</a>");
        let origin = Origin::new(id, Span::new(4..8), 2);

        assert_eq!(sources.len(), 1);
        assert_eq!(sources.describe(&origin), "main.xml:2");
        assert_eq!(
            sources.describe(&Origin::detached(Span::default(), 1)),
            "line 1"
        );
    }
}
