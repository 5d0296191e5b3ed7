//! At-rules other than `@import`.

use std::sync::Arc;

use super::entity::Entity;
use super::ruleset::Ruleset;
use crate::error::Result;
use crate::eval::EvalContext;

/// `@media screen { ... }`, `@font-face { ... }`, `@charset "utf-8";` and
/// the like.
///
/// Block directives carry `rules`; statement directives carry a `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    /// Name including the `@`.
    pub name: String,
    /// Text between the name and the block, e.g. the media query.
    pub prelude: Option<String>,
    pub rules: Option<Arc<Ruleset>>,
    pub value: Option<Entity>,
    pub index: usize,
}

impl Directive {
    pub fn block(
        name: impl Into<String>,
        prelude: Option<String>,
        rules: Ruleset,
        index: usize,
    ) -> Self {
        Self {
            name: name.into(),
            prelude,
            rules: Some(Arc::new(rules)),
            value: None,
            index,
        }
    }

    pub fn statement(name: impl Into<String>, value: Entity, index: usize) -> Self {
        Self {
            name: name.into(),
            prelude: None,
            rules: None,
            value: Some(value),
            index,
        }
    }

    /// `@media` blocks bubble up through enclosing rulesets when rendered.
    pub fn is_media(&self) -> bool {
        self.name == "@media"
    }

    pub fn header(&self) -> String {
        match &self.prelude {
            Some(prelude) if !prelude.is_empty() => format!("{} {}", self.name, prelude),
            _ => self.name.clone(),
        }
    }

    pub fn eval(&self, ctx: &mut EvalContext<'_>) -> Result<Directive> {
        let rules = match &self.rules {
            Some(rules) => Some(Arc::new(rules.eval(ctx)?)),
            None => None,
        };
        let value = match &self.value {
            Some(value) => Some(value.eval(ctx).map_err(|e| e.or_at(self.index))?),
            None => None,
        };
        Ok(Directive {
            name: self.name.clone(),
            prelude: self.prelude.clone(),
            rules,
            value,
            index: self.index,
        })
    }

    /// Statement form, e.g. `@charset "utf-8";`.
    pub fn statement_css(&self, compress: bool) -> Option<String> {
        let value = self.value.as_ref()?;
        Some(format!("{} {};", self.name, value.to_css(compress)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Quoted;

    #[test]
    fn test_headers_and_statements() {
        let media = Directive::block("@media", Some("screen".into()), Ruleset::new(vec![], vec![]), 0);
        assert!(media.is_media());
        assert_eq!(media.header(), "@media screen");

        let font = Directive::block("@font-face", None, Ruleset::new(vec![], vec![]), 0);
        assert_eq!(font.header(), "@font-face");

        let charset = Directive::statement(
            "@charset",
            Entity::Quoted(Quoted::new(Some('"'), "utf-8", 0)),
            0,
        );
        assert_eq!(charset.statement_css(false).as_deref(), Some("@charset \"utf-8\";"));
        assert!(font.statement_css(false).is_none());
    }
}
