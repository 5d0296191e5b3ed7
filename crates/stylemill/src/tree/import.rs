//! `@import` statements.

use std::sync::{Arc, LazyLock, OnceLock};

use regex::Regex;

use super::entity::Entity;
use super::ruleset::Ruleset;

static CSS_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"css([?;].*)?$").expect("valid css path pattern"));

/// An `@import` of another stylesheet.
///
/// Imports of plain `.css` files are kept in the output as-is. Everything
/// else is fetched by the importer while parsing continues, and the parsed
/// root is filled in once it arrives.
#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    /// Path text with quotes and `url()` removed.
    pub path: String,
    /// The path as written, for CSS passthrough.
    pub source: Entity,
    /// Media query following the path.
    pub media: Option<String>,
    pub css: bool,
    pub index: usize,
    root: Arc<OnceLock<Arc<Ruleset>>>,
}

impl Import {
    pub fn new(path: impl Into<String>, source: Entity, media: Option<String>, index: usize) -> Self {
        let path = path.into();
        Self {
            css: CSS_PATH.is_match(&path),
            path,
            source,
            media,
            index,
            root: Arc::new(OnceLock::new()),
        }
    }

    /// The imported stylesheet's root, once resolved.
    pub fn root(&self) -> Option<&Arc<Ruleset>> {
        self.root.get()
    }

    /// Fill in the imported root. Clones of this node share the slot.
    pub(crate) fn resolve(&self, root: Arc<Ruleset>) {
        let _ = self.root.set(root);
    }

    pub fn to_css(&self, compress: bool) -> String {
        match &self.media {
            Some(media) => format!("@import {} {};", self.source.to_css(compress), media),
            None => format!("@import {};", self.source.to_css(compress)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Quoted;

    #[test]
    fn test_css_imports_are_detected() {
        let css = Import::new("reset.css", Entity::Quoted(Quoted::new(Some('"'), "reset.css", 0)), None, 0);
        assert!(css.css);
        assert_eq!(css.to_css(false), "@import \"reset.css\";");

        let query = Import::new("style.css?v=2", Entity::Anonymous("style.css?v=2".into()), None, 0);
        assert!(query.css);

        let less = Import::new("mixins.less", Entity::Anonymous("mixins.less".into()), None, 0);
        assert!(!less.css);
    }

    #[test]
    fn test_clones_share_the_resolved_root() {
        let import = Import::new("a.less", Entity::Anonymous("a.less".into()), None, 0);
        let copy = import.clone();
        assert!(copy.root().is_none());

        import.resolve(Arc::new(Ruleset::root(vec![])));
        assert!(copy.root().is_some_and(|root| root.is_root()));
    }
}
