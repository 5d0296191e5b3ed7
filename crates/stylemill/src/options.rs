//! Parse and render configuration.

use std::path::PathBuf;

/// Which flavour of the language the grammar accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// Stylesheets that compile to CSS.
    #[default]
    Css,
    /// Map-styling stylesheets: selectors carry `[key op value]` filters and
    /// `::attachment` names, and compile to XML style rules.
    Map,
}

/// When arithmetic operators are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MathMode {
    /// Every operator is evaluated.
    #[default]
    Always,
    /// Division is only evaluated inside parentheses, so `font: 12px/1.5`
    /// passes through untouched.
    ParensDivision,
}

/// Options controlling how source text is parsed.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Name reported in diagnostics and used to resolve relative imports.
    pub filename: Option<String>,
    /// Directories the importer should search.
    pub paths: Vec<PathBuf>,
    /// Grammar dialect.
    pub dialect: Dialect,
    /// `0` parses the input as a single chunk, `1` enables brace-aware
    /// chunking, `2` additionally stores plain declaration values verbatim.
    pub optimization: u8,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            filename: None,
            paths: Vec::new(),
            dialect: Dialect::Css,
            optimization: 1,
        }
    }
}

impl ParseOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the file name.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Add an import search path.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    /// Set the dialect.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set the optimization level.
    pub fn with_optimization(mut self, level: u8) -> Self {
        self.optimization = level;
        self
    }

    pub(crate) fn chunking(&self) -> bool {
        self.optimization >= 1
    }

    pub(crate) fn literal_values(&self) -> bool {
        self.optimization >= 2
    }
}

/// Options controlling evaluation and output.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Strip insignificant whitespace and comments from the output.
    pub compress: bool,
    /// When operators are evaluated.
    pub math: MathMode,
    /// Maximum nesting of mixin expansions.
    pub max_mixin_depth: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            compress: false,
            math: MathMode::Always,
            max_mixin_depth: 64,
        }
    }
}

impl RenderOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with compression enabled.
    pub fn compressed() -> Self {
        Self::default().with_compress(true)
    }

    /// Enable or disable compression.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Set the math mode.
    pub fn with_math(mut self, math: MathMode) -> Self {
        self.math = math;
        self
    }

    /// Set the maximum mixin nesting depth.
    pub fn with_max_mixin_depth(mut self, depth: usize) -> Self {
        self.max_mixin_depth = depth;
        self
    }
}
