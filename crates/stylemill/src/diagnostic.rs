//! Located, caller-facing error reports.

use std::fmt;

use crate::error::{Error, ErrorKind};
use crate::source::SourceMap;

/// An [`Error`] resolved against the sources it came from.
///
/// This is what [`Parser::parse`](crate::Parser::parse) and
/// [`Stylesheet::to_css`](crate::Stylesheet::to_css) hand back on failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// What went wrong.
    pub kind: ErrorKind,
    /// The rendered message.
    pub message: String,
    /// Name of the file containing the error, if known.
    pub filename: Option<String>,
    /// Byte offset of the error within its file.
    pub index: Option<usize>,
    /// Line number (1-indexed).
    pub line: Option<usize>,
    /// Column number (0-indexed).
    pub column: Option<usize>,
    /// The line before, the offending line, and the line after.
    pub extract: [Option<String>; 3],
    /// Line of the mixin call the error escaped through.
    pub call_line: Option<usize>,
    /// Text of the line holding that mixin call.
    pub call_extract: Option<String>,
}

impl Diagnostic {
    /// Resolve an error against the compile's sources.
    pub fn new(error: &Error, sources: &SourceMap) -> Self {
        let mut diagnostic = Self {
            kind: error.kind().clone(),
            message: error.kind().to_string(),
            filename: None,
            index: None,
            line: None,
            column: None,
            extract: [None, None, None],
            call_line: None,
            call_extract: None,
        };

        if let Some((file, local)) = error.index().and_then(|i| sources.lookup(i)) {
            let location = file.location(local);
            diagnostic.filename = file.name().map(str::to_owned);
            diagnostic.index = Some(local);
            diagnostic.line = Some(location.line);
            diagnostic.column = Some(location.column);
            diagnostic.extract = file.extract(location.line);
        }

        if let Some((file, local)) = error.call().and_then(|i| sources.lookup(i)) {
            let location = file.location(local);
            diagnostic.call_line = Some(location.line);
            diagnostic.call_extract = file.line(location.line).map(str::to_owned);
        }

        diagnostic
    }

    /// Short category name, e.g. `Parse` or `Name`.
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Error: {}", self.name(), self.message)?;
        if let Some(filename) = &self.filename {
            write!(f, " in {filename}")?;
        }
        if let (Some(line), Some(column)) = (self.line, self.column) {
            write!(f, " on line {line}, column {column}:")?;
            for (offset, text) in self.extract.iter().enumerate() {
                if let Some(text) = text {
                    write!(f, "\n{} {}", line + offset - 1, text)?;
                }
            }
        }
        if let (Some(line), Some(text)) = (self.call_line, &self.call_extract) {
            write!(f, "\nfrom line {line}:\n{line} {text}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}
