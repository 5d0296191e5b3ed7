//! A compiler for a CSS superset, with a map-styling dialect.
//!
//! Stylesheets may use:
//!
//! - **Variables** with lexical scoping (`@accent: #336699;`)
//! - **Nesting** of rulesets, joined into full selector paths on output
//! - **Mixins** with parameters, defaults, pattern matching and guards
//! - **Operations** on numbers, units and colours (`@base * 2`, `#fff - #111`)
//! - **Imports** fetched through a pluggable [`Importer`]
//! - **Built-in functions** for colour manipulation and value inspection
//!
//! In the [`Dialect::Map`] dialect selectors also carry `[key op value]`
//! filters and `::attachment` names, and a stylesheet compiles to XML style
//! rules instead of CSS.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use stylemill::prelude::*;
//!
//! let parser = Parser::new(ParseOptions::new().with_filename("site.less"))
//!     .with_importer(Arc::new(FileImporter::new()));
//! let sheet = parser.parse_sync(&std::fs::read_to_string("site.less")?)?;
//!
//! let css = sheet.to_css(&RenderOptions::compressed())?;
//! ```

pub mod functions;
pub mod import;
pub mod logging;
pub mod map;
pub mod options;
pub mod parser;
pub mod render;
pub mod source;
pub mod tree;

mod diagnostic;
mod error;
mod eval;
mod stylesheet;

pub use diagnostic::Diagnostic;
pub use error::{Error, ErrorKind, Result};
pub use eval::{EvalContext, Frame};
pub use import::{FileImporter, ImportedFile, Importer};
pub use options::{Dialect, MathMode, ParseOptions, RenderOptions};
pub use parser::Parser;
pub use source::SourceMap;
pub use stylesheet::Stylesheet;

/// Parse and render `source` in one step.
///
/// Imports are not available: use a [`Parser`] with an [`Importer`] for
/// stylesheets that have them.
pub fn compile(
    source: &str,
    parse: &ParseOptions,
    render: &RenderOptions,
) -> std::result::Result<String, Diagnostic> {
    Parser::new(parse.clone()).parse_sync(source)?.to_css(render)
}

/// Prelude module with commonly used types.
pub mod prelude {
    pub use crate::import::{FileImporter, ImportCallback, ImportedFile, Importer};
    pub use crate::map::{Definition, Filter, FilterOp, Filterset, Specificity};
    pub use crate::options::{Dialect, MathMode, ParseOptions, RenderOptions};
    pub use crate::{Diagnostic, Error, ErrorKind, Parser, Stylesheet, compile};
}
