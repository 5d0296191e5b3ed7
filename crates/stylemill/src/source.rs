//! Source text bookkeeping.
//!
//! Every file parsed during a compile is registered in a [`SourceMap`] and
//! assigned a range of global offsets. Tree nodes only store a global offset,
//! so a single `usize` is enough to recover the file, line and column of any
//! node even after imported rules have been spliced into another stylesheet.

use std::sync::Arc;

/// A single parsed source file.
#[derive(Debug)]
pub struct SourceFile {
    name: Option<String>,
    text: String,
    start: usize,
}

/// Line and column of an offset within a [`SourceFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (0-indexed, in characters).
    pub column: usize,
}

impl SourceFile {
    /// The file name, if the source came from a named file.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The normalized source text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Global offset of the first byte of this file.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Global offset one past the last byte of this file.
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }

    /// Whether a global offset falls inside this file.
    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index <= self.end()
    }

    /// Line and column of a file-local byte offset.
    pub fn location(&self, local: usize) -> Location {
        let local = floor_char_boundary(&self.text, local.min(self.text.len()));
        let before = &self.text[..local];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        Location {
            line,
            column: before[line_start..].chars().count(),
        }
    }

    /// Text of a 1-indexed line, if it exists.
    pub fn line(&self, line: usize) -> Option<&str> {
        if line == 0 {
            return None;
        }
        self.text.split('\n').nth(line - 1)
    }

    /// The line before, the line itself, and the line after `line`.
    pub fn extract(&self, line: usize) -> [Option<String>; 3] {
        [
            line.checked_sub(1).and_then(|l| self.line(l)).map(str::to_owned),
            self.line(line).map(str::to_owned),
            self.line(line + 1).map(str::to_owned),
        ]
    }
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// All files parsed during one compile, each with its own offset range.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    files: Vec<Arc<SourceFile>>,
}

impl SourceMap {
    /// Create an empty source map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file and return it. `\r\n` line endings are normalized.
    pub fn add(&mut self, name: Option<String>, text: &str) -> Arc<SourceFile> {
        let start = self.files.last().map_or(0, |f| f.end() + 1);
        let file = Arc::new(SourceFile {
            name,
            text: text.replace("\r\n", "\n"),
            start,
        });
        self.files.push(Arc::clone(&file));
        file
    }

    /// Find the file containing a global offset, with the file-local offset.
    pub fn lookup(&self, index: usize) -> Option<(&Arc<SourceFile>, usize)> {
        self.files
            .iter()
            .find(|f| f.contains(index))
            .map(|f| (f, index - f.start))
    }

    /// Registered files in registration order.
    pub fn files(&self) -> &[Arc<SourceFile>] {
        &self.files
    }

    /// Number of registered files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no file has been registered.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_get_disjoint_ranges() {
        let mut map = SourceMap::new();
        let a = map.add(Some("a.less".into()), "abc");
        let b = map.add(Some("b.less".into()), "de");

        assert_eq!(a.start(), 0);
        assert_eq!(b.start(), 4);

        let (file, local) = map.lookup(5).unwrap();
        assert_eq!(file.name(), Some("b.less"));
        assert_eq!(local, 1);
    }

    #[test]
    fn test_location_and_extract() {
        let mut map = SourceMap::new();
        let file = map.add(None, "a {\r\n  b: c;\r\n}\r\n");
        assert_eq!(file.text(), "a {\n  b: c;\n}\n");

        let loc = file.location(6);
        assert_eq!(loc, Location { line: 2, column: 2 });

        let extract = file.extract(loc.line);
        assert_eq!(extract[0].as_deref(), Some("a {"));
        assert_eq!(extract[1].as_deref(), Some("  b: c;"));
        assert_eq!(extract[2].as_deref(), Some("}"));
    }

    #[test]
    fn test_extract_at_first_line_has_no_previous() {
        let mut map = SourceMap::new();
        let file = map.add(None, "only");
        let extract = file.extract(1);
        assert_eq!(extract[0], None);
        assert_eq!(extract[1].as_deref(), Some("only"));
        assert_eq!(extract[2], None);
    }
}
