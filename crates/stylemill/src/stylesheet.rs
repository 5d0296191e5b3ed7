//! Parsed stylesheets.

use std::sync::Arc;

use tracing::debug;

use crate::diagnostic::Diagnostic;
use crate::error::Result;
use crate::eval::EvalContext;
use crate::logging::targets;
use crate::map::{self, Definition};
use crate::options::{Dialect, RenderOptions};
use crate::render::CssWriter;
use crate::source::SourceMap;
use crate::tree::Ruleset;

/// The result of a successful parse, with every import resolved.
///
/// Evaluation does not modify the tree, so one stylesheet can be rendered
/// any number of times with different [`RenderOptions`].
#[derive(Debug, Clone)]
pub struct Stylesheet {
    root: Arc<Ruleset>,
    sources: SourceMap,
    dialect: Dialect,
}

impl Stylesheet {
    pub(crate) fn new(root: Ruleset, sources: SourceMap, dialect: Dialect) -> Self {
        Self {
            root: Arc::new(root),
            sources,
            dialect,
        }
    }

    /// The unevaluated root ruleset.
    pub fn root(&self) -> &Ruleset {
        &self.root
    }

    /// Every file read for this stylesheet, the main file first.
    pub fn sources(&self) -> &SourceMap {
        &self.sources
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Evaluate variables, operations, functions and mixins.
    pub fn eval(&self, options: &RenderOptions) -> std::result::Result<Ruleset, Diagnostic> {
        self.evaluate(options)
            .map_err(|err| Diagnostic::new(&err, &self.sources))
    }

    /// Evaluate and serialize as CSS.
    pub fn to_css(&self, options: &RenderOptions) -> std::result::Result<String, Diagnostic> {
        let root = self.eval(options)?;
        Ok(CssWriter::new(options.compress).write(&root))
    }

    /// Evaluate and flatten a map stylesheet into definitions, most
    /// specific first.
    pub fn definitions(&self) -> std::result::Result<Vec<Definition>, Diagnostic> {
        let root = self.eval(&RenderOptions::default())?;
        Ok(map::flatten(&root))
    }

    /// Evaluate a map stylesheet and render its rules as XML styles named
    /// after `name`.
    pub fn to_xml(&self, name: &str) -> std::result::Result<String, Diagnostic> {
        let definitions = self.definitions()?;
        let groups = map::inherit_definitions(&definitions);
        debug!(
            target: targets::MAP,
            definitions = definitions.len(),
            attachments = groups.len(),
            "resolved inheritance"
        );
        Ok(map::styles_to_xml(name, &groups))
    }

    fn evaluate(&self, options: &RenderOptions) -> Result<Ruleset> {
        let mut ctx = EvalContext::new(options);
        self.root.eval(&mut ctx)
    }
}

#[cfg(test)]
mod tests {
    use crate::options::{MathMode, ParseOptions};
    use crate::{Parser, RenderOptions};

    fn parse(source: &str) -> crate::Stylesheet {
        Parser::new(ParseOptions::new()).parse_sync(source).unwrap()
    }

    #[test]
    fn test_renders_repeatedly_with_different_options() {
        let sheet = parse(".a { font: 12px/2; w: (4px / 2); }");

        let always = sheet.to_css(&RenderOptions::default()).unwrap();
        assert_eq!(always, ".a {\n  font: 6px;\n  w: 2px;\n}\n");

        let parens = sheet
            .to_css(&RenderOptions::compressed().with_math(MathMode::ParensDivision))
            .unwrap();
        assert_eq!(parens, ".a{font:12px/2;w:2px;}");
    }

    #[test]
    fn test_evaluation_errors_carry_location() {
        let sheet = parse(".a {\n  w: @missing;\n}");
        let err = sheet.to_css(&RenderOptions::default()).unwrap_err();
        assert_eq!(err.message, "variable @missing is undefined");
        assert_eq!(err.line, Some(2));
        assert_eq!(err.extract[1].as_deref(), Some("  w: @missing;"));
    }
}
