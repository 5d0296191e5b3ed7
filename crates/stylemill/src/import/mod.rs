//! Import resolution.
//!
//! The parser never reads files. Every `@import` that is not plain CSS is
//! handed to an [`Importer`] together with the search paths, and the
//! importer calls back with the file's text whenever it has it. Callbacks may
//! arrive in any order and on any thread. The [`ImportQueue`] tracks the
//! paths still outstanding and runs the completion step exactly once, after
//! the last of them (including imports discovered inside imported files)
//! has called back.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::logging::targets;

/// A file produced by an [`Importer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedFile {
    /// Name used in diagnostics and for resolving the file's own imports.
    pub name: String,
    /// Source text.
    pub contents: String,
}

impl ImportedFile {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

/// Called once by an importer with the fetched file, or `None` on failure.
pub type ImportCallback = Box<dyn FnOnce(Option<ImportedFile>) + Send>;

/// Fetches imported stylesheets.
///
/// Implementations may call `done` before returning or later from another
/// thread. `done` must be called at most once; dropping it without calling
/// it abandons the compile.
pub trait Importer: Send + Sync {
    fn import(&self, path: &str, paths: &[PathBuf], done: ImportCallback);
}

impl<F> Importer for F
where
    F: Fn(&str, &[PathBuf], ImportCallback) + Send + Sync,
{
    fn import(&self, path: &str, paths: &[PathBuf], done: ImportCallback) {
        self(path, paths, done)
    }
}

/// Reads imports from disk, synchronously.
///
/// The path is tried against each search path in order, then as given.
/// A path without an extension also tries the `.less` extension.
#[derive(Debug, Clone, Default)]
pub struct FileImporter {
    paths: Vec<PathBuf>,
}

impl FileImporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Search `path` before the paths supplied with each import.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    /// Locate `path` without reading it.
    pub fn resolve(&self, path: &str, paths: &[PathBuf]) -> Option<PathBuf> {
        let candidates = candidate_names(path);
        self.paths
            .iter()
            .chain(paths)
            .map(PathBuf::as_path)
            .chain(std::iter::once(Path::new("")))
            .flat_map(|dir| candidates.iter().map(move |name| dir.join(name)))
            .find(|candidate| candidate.is_file())
    }
}

fn candidate_names(path: &str) -> Vec<PathBuf> {
    let path = PathBuf::from(path);
    if path.extension().is_some() {
        vec![path]
    } else {
        vec![path.with_extension("less"), path]
    }
}

impl Importer for FileImporter {
    fn import(&self, path: &str, paths: &[PathBuf], done: ImportCallback) {
        let Some(found) = self.resolve(path, paths) else {
            debug!(target: targets::IMPORT, path, "import not found on any search path");
            done(None);
            return;
        };
        match fs::read_to_string(&found) {
            Ok(contents) => done(Some(ImportedFile::new(found.to_string_lossy(), contents))),
            Err(err) => {
                debug!(target: targets::IMPORT, path = %found.display(), error = %err, "failed to read import");
                done(None);
            }
        }
    }
}

type Finish = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct QueueState {
    pending: Vec<String>,
    finish: Option<Finish>,
}

/// Outstanding imports of one compile.
#[derive(Default)]
pub struct ImportQueue {
    state: Mutex<QueueState>,
}

impl ImportQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an import that has been requested but not yet resolved.
    pub fn push(&self, path: impl Into<String>) {
        let path = path.into();
        let mut state = self.state.lock();
        state.pending.push(path);
        trace!(target: targets::IMPORT, pending = state.pending.len(), "import queued");
    }

    /// Mark one request for `path` as resolved.
    ///
    /// If that empties the queue and a completion step is waiting, it runs
    /// now, outside the lock.
    pub fn complete(&self, path: &str) {
        let finish = {
            let mut state = self.state.lock();
            if let Some(i) = state.pending.iter().position(|p| p == path) {
                state.pending.swap_remove(i);
            }
            trace!(target: targets::IMPORT, path, pending = state.pending.len(), "import resolved");
            if state.pending.is_empty() {
                state.finish.take()
            } else {
                None
            }
        };
        if let Some(finish) = finish {
            debug!(target: targets::IMPORT, "import queue drained");
            finish();
        }
    }

    /// Run `finish` once the queue is empty: immediately if it already is.
    pub fn on_finish(&self, finish: impl FnOnce() + Send + 'static) {
        {
            let mut state = self.state.lock();
            if !state.pending.is_empty() {
                state.finish = Some(Box::new(finish));
                return;
            }
        }
        finish();
    }

    /// Number of imports still outstanding.
    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }
}
