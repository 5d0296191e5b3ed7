//! Parsing: source text to a [`Stylesheet`].
//!
//! A [`Parser`] owns the options and the importer. Each call to
//! [`Parser::parse`] starts a fresh session holding the source map, the
//! import queue and the first error seen; imported files are parsed inside
//! the same session so their own imports join the same queue.

mod chunker;
mod entities;
mod grammar;
pub(crate) mod input;

use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::diagnostic::Diagnostic;
use crate::error::{Error, ErrorKind, Result};
use crate::import::{ImportQueue, ImportedFile, Importer};
use crate::logging::targets;
use crate::options::ParseOptions;
use crate::source::SourceMap;
use crate::stylesheet::Stylesheet;
use crate::tree::{Import, Ruleset};

use grammar::Grammar;
use input::ParserInput;

/// Parses stylesheets, fetching imports through an optional [`Importer`].
///
/// # Example
///
/// ```ignore
/// let parser = Parser::new(ParseOptions::new().with_filename("site.less"))
///     .with_importer(Arc::new(FileImporter::new()));
/// let sheet = parser.parse_sync(&source)?;
/// let css = sheet.to_css(&RenderOptions::default())?;
/// ```
#[derive(Clone)]
pub struct Parser {
    options: ParseOptions,
    importer: Option<Arc<dyn Importer>>,
}

impl Parser {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            importer: None,
        }
    }

    /// Fetch `@import`ed files through `importer`.
    ///
    /// Without an importer, any import that is not plain CSS fails the parse.
    pub fn with_importer(mut self, importer: Arc<dyn Importer>) -> Self {
        self.importer = Some(importer);
        self
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parse `source` and report the result through `on_complete`.
    ///
    /// `on_complete` runs exactly once: before this returns when the source
    /// has no imports or the importer answers synchronously, otherwise on
    /// whichever thread delivers the last import.
    pub fn parse<F>(&self, source: &str, on_complete: F)
    where
        F: FnOnce(std::result::Result<Stylesheet, Diagnostic>) + Send + 'static,
    {
        let session = Arc::new(ParseSession {
            options: self.options.clone(),
            importer: self.importer.clone(),
            sources: Mutex::new(SourceMap::new()),
            queue: ImportQueue::new(),
            error: Mutex::new(None),
        });

        let root = match session.parse_file(self.options.filename.clone(), source) {
            Ok(root) => root,
            Err(err) => {
                on_complete(Err(session.diagnostic(&err)));
                return;
            }
        };

        // The queue lives inside the session, so the completion step only
        // holds it weakly.
        let weak = Arc::downgrade(&session);
        session.queue.on_finish(move || {
            if let Some(session) = weak.upgrade() {
                on_complete(session.finish(root));
            }
        });
    }

    /// Parse `source`, blocking until every import has resolved.
    pub fn parse_sync(&self, source: &str) -> std::result::Result<Stylesheet, Diagnostic> {
        let (tx, rx) = mpsc::channel();
        self.parse(source, move |result| {
            let _ = tx.send(result);
        });
        rx.recv().unwrap_or_else(|_| {
            let error = Error::new(ErrorKind::Import(
                "an import callback was dropped before it was called".into(),
            ));
            Err(Diagnostic::new(&error, &SourceMap::new()))
        })
    }
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("options", &self.options)
            .field("importer", &self.importer.is_some())
            .finish()
    }
}

/// State shared by every file parsed for one [`Parser::parse`] call.
struct ParseSession {
    options: ParseOptions,
    importer: Option<Arc<dyn Importer>>,
    sources: Mutex<SourceMap>,
    queue: ImportQueue,
    /// The first error wins.
    error: Mutex<Option<Error>>,
}

impl ParseSession {
    /// Register, chunk and parse one file, then request its imports.
    fn parse_file(self: &Arc<Self>, name: Option<String>, text: &str) -> Result<Ruleset> {
        let file = self.sources.lock().add(name, text);
        let base = file.start();
        let text = file.text();

        let chunks = if self.options.chunking() {
            chunker::chunk(text, base)?
        } else {
            vec![text.len()]
        };
        let mut grammar = Grammar::new(ParserInput::new(text, chunks), base, &self.options);
        let rules = grammar.primary()?;
        if !grammar.is_eof() {
            return Err(Error::parse("Unrecognised input", grammar.furthest()));
        }

        let imports = grammar.take_imports();
        debug!(
            target: targets::PARSER,
            file = file.name().unwrap_or("<input>"),
            chunks = grammar.chunk_count(),
            rules = rules.len(),
            imports = imports.len(),
            "parsed file"
        );

        let paths = self.search_paths(file.name());
        // Every import is queued before any is requested, so a synchronous
        // importer cannot drain the queue while this file still has some
        // outstanding.
        for import in &imports {
            self.queue.push(import.path.clone());
        }
        for import in imports {
            self.request(import, &paths);
        }

        Ok(Ruleset::root(rules))
    }

    /// The configured search paths, preceded by the directory of `file`.
    fn search_paths(&self, file: Option<&str>) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(self.options.paths.len() + 1);
        if let Some(dir) = file.and_then(|f| Path::new(f).parent()) {
            if !dir.as_os_str().is_empty() {
                paths.push(dir.to_path_buf());
            }
        }
        paths.extend(self.options.paths.iter().cloned());
        paths
    }

    fn request(self: &Arc<Self>, import: Import, paths: &[PathBuf]) {
        let Some(importer) = self.importer.clone() else {
            self.fail(Error::import(&import.path, import.index));
            self.queue.complete(&import.path);
            return;
        };

        trace!(target: targets::IMPORT, path = %import.path, "requesting import");
        let session = Arc::clone(self);
        let path = import.path.clone();
        importer.import(
            &path,
            paths,
            Box::new(move |file: Option<ImportedFile>| session.resolve(import, file)),
        );
    }

    fn resolve(self: &Arc<Self>, import: Import, file: Option<ImportedFile>) {
        match file {
            Some(file) => match self.parse_file(Some(file.name), &file.contents) {
                Ok(root) => import.resolve(Arc::new(root)),
                Err(err) => self.fail(err),
            },
            None => self.fail(Error::import(&import.path, import.index)),
        }
        self.queue.complete(&import.path);
    }

    fn fail(&self, error: Error) {
        let mut slot = self.error.lock();
        if slot.is_none() {
            debug!(target: targets::PARSER, error = %error, "parse failed");
            *slot = Some(error);
        }
    }

    fn diagnostic(&self, error: &Error) -> Diagnostic {
        Diagnostic::new(error, &self.sources.lock())
    }

    fn finish(&self, root: Ruleset) -> std::result::Result<Stylesheet, Diagnostic> {
        if let Some(error) = self.error.lock().take() {
            return Err(self.diagnostic(&error));
        }
        let sources = self.sources.lock().clone();
        debug!(target: targets::PARSER, files = sources.len(), "parse complete");
        Ok(Stylesheet::new(root, sources, self.options.dialect))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::import::ImportCallback;
    use crate::tree::Node;

    fn stub(files: &[(&str, &str)]) -> Arc<dyn Importer> {
        let files: HashMap<String, String> = files
            .iter()
            .map(|(name, text)| ((*name).to_owned(), (*text).to_owned()))
            .collect();
        Arc::new(move |path: &str, _paths: &[PathBuf], done: ImportCallback| {
            done(files.get(path).map(|text| ImportedFile::new(path, text.clone())));
        })
    }

    #[test]
    fn test_parses_without_imports() {
        let sheet = Parser::new(ParseOptions::new()).parse_sync(".a { b: c; }").unwrap();
        assert_eq!(sheet.root().rules().len(), 1);
        assert_eq!(sheet.sources().len(), 1);
    }

    #[test]
    fn test_unrecognised_input_reports_location() {
        let err = Parser::new(ParseOptions::new().with_filename("bad.less"))
            .parse_sync(".a { b: c; }\n.d { e: f; } }")
            .unwrap_err();
        assert_eq!(err.name(), "Parse");
        assert_eq!(err.filename.as_deref(), Some("bad.less"));
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn test_grammar_stops_early_without_chunking() {
        let err = Parser::new(ParseOptions::new().with_optimization(0))
            .parse_sync(".a { b: c; }\n%%%")
            .unwrap_err();
        assert_eq!(err.message, "Unrecognised input");
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn test_nested_imports_are_parsed_in_the_same_session() {
        let importer = stub(&[
            ("a.less", "@import \"b.less\";\n.a { w: 1; }"),
            ("b.less", ".b { w: 2; }"),
        ]);
        let sheet = Parser::new(ParseOptions::new())
            .with_importer(importer)
            .parse_sync("@import \"a.less\";")
            .unwrap();

        assert_eq!(sheet.sources().len(), 3);
        let Node::Import(import) = &sheet.root().rules()[0] else {
            panic!("expected an import");
        };
        let nested = import.root().unwrap();
        assert!(matches!(&nested.rules()[0], Node::Import(i) if i.root().is_some()));
    }

    #[test]
    fn test_missing_import_fails_the_parse() {
        let err = Parser::new(ParseOptions::new().with_filename("main.less"))
            .with_importer(stub(&[]))
            .parse_sync(".a { w: 1; }\n@import \"gone.less\";")
            .unwrap_err();
        assert_eq!(err.message, "Error parsing `gone.less`");
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn test_imports_without_an_importer_fail() {
        let err = Parser::new(ParseOptions::new())
            .parse_sync("@import \"x.less\";")
            .unwrap_err();
        assert_eq!(err.name(), "Import");
    }

    #[test]
    fn test_css_imports_are_not_fetched() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let importer = Arc::new(move |_: &str, _: &[PathBuf], done: ImportCallback| {
            counter.fetch_add(1, Ordering::SeqCst);
            done(None);
        });
        let sheet = Parser::new(ParseOptions::new())
            .with_importer(importer)
            .parse_sync("@import \"reset.css\";")
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(matches!(&sheet.root().rules()[0], Node::Import(i) if i.css));
    }

    #[test]
    fn test_errors_in_imported_files_name_that_file() {
        let importer = stub(&[("broken.less", ".x {\n  y: z;\n")]);
        let err = Parser::new(ParseOptions::new())
            .with_importer(importer)
            .parse_sync("@import \"broken.less\";")
            .unwrap_err();
        assert_eq!(err.filename.as_deref(), Some("broken.less"));
        assert_eq!(err.line, Some(1));
    }

    #[test]
    fn test_dropped_callbacks_abandon_the_parse() {
        let importer = Arc::new(|_: &str, _: &[PathBuf], done: ImportCallback| drop(done));
        let err = Parser::new(ParseOptions::new())
            .with_importer(importer)
            .parse_sync("@import \"a.less\";")
            .unwrap_err();
        assert_eq!(err.name(), "Import");
    }
}
