//! CSS serialization of an evaluated tree.
//!
//! Nested rulesets are flattened into full selector paths: every parent
//! path is combined with every child selector. A ruleset's own
//! declarations are written before the rulesets nested in it, the root
//! included, and blocks with nothing to show are left out. `@media` blocks
//! found inside a ruleset are written after it with the enclosing paths
//! applied to their contents.

use tracing::debug;

use crate::logging::targets;
use crate::tree::{Directive, Node, Ruleset, Selector};

/// Writes an evaluated [`Ruleset`] as CSS text.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssWriter {
    compress: bool,
}

impl CssWriter {
    pub fn new(compress: bool) -> Self {
        Self { compress }
    }

    /// Render a root ruleset.
    ///
    /// Like any other block, the root's own lines (statement directives,
    /// CSS imports, comments) come before its rulesets, so `@charset` and
    /// `@import` always lead the output.
    pub fn write(&self, root: &Ruleset) -> String {
        let css = self.block(root.rules(), &[]);
        debug!(target: targets::RENDER, bytes = css.len(), compress = self.compress, "rendered css");
        css
    }

    /// Render the contents of a block whose selectors resolved to `paths`.
    ///
    /// With no paths (the body of an at-rule) declarations are written bare.
    fn block(&self, rules: &[Node], paths: &[String]) -> String {
        let mut own = Vec::new();
        let mut nested = String::new();
        for rule in rules {
            match rule {
                Node::Ruleset(ruleset) => {
                    let child = join_paths(paths, ruleset.selectors(), self.compress);
                    nested.push_str(&self.block(ruleset.rules(), &child));
                }
                Node::Directive(directive) if directive.rules.is_some() => {
                    let scope: &[String] = if directive.is_media() { paths } else { &[] };
                    nested.push_str(&self.directive(directive, scope));
                }
                other => own.extend(self.line(other)),
            }
        }

        let mut css = String::new();
        if !own.is_empty() {
            if paths.is_empty() {
                for line in &own {
                    css.push_str(line);
                    if !self.compress {
                        css.push('\n');
                    }
                }
            } else {
                css.push_str(&self.selector_block(paths, &own));
            }
        }
        css.push_str(&nested);
        css
    }

    fn selector_block(&self, paths: &[String], lines: &[String]) -> String {
        let selectors: Vec<&str> = paths.iter().map(|p| p.trim()).collect();
        if self.compress {
            return format!("{}{{{}}}", selectors.join(","), lines.concat());
        }
        let separator = if selectors.len() > 3 { ",\n" } else { ", " };
        let mut css = selectors.join(separator);
        css.push_str(" {\n");
        for line in lines {
            css.push_str("  ");
            css.push_str(line);
            css.push('\n');
        }
        css.push_str("}\n");
        css
    }

    fn directive(&self, directive: &Directive, paths: &[String]) -> String {
        let body = directive
            .rules
            .as_ref()
            .map(|rules| self.block(rules.rules(), paths))
            .unwrap_or_default();
        if body.is_empty() {
            return String::new();
        }
        if self.compress {
            return format!("{}{{{}}}", directive.header(), body);
        }
        let mut css = directive.header();
        css.push_str(" {\n");
        for line in body.lines() {
            if !line.is_empty() {
                css.push_str("  ");
                css.push_str(line);
            }
            css.push('\n');
        }
        css.push_str("}\n");
        css
    }

    /// Single-line output for everything that is not a block.
    fn line(&self, node: &Node) -> Option<String> {
        match node {
            Node::Declaration(decl) if !decl.is_variable() => Some(decl.to_css(self.compress)),
            Node::Comment(comment) if !comment.silent && !self.compress => {
                Some(comment.text.clone())
            }
            Node::Import(import) if import.css => Some(import.to_css(self.compress)),
            Node::Directive(directive) => directive.statement_css(self.compress),
            _ => None,
        }
    }
}

/// Combine every parent path with every selector.
fn join_paths(parents: &[String], selectors: &[Selector], compress: bool) -> Vec<String> {
    if parents.is_empty() {
        return selectors.iter().map(|s| s.to_css(compress)).collect();
    }
    parents
        .iter()
        .flat_map(|parent| {
            selectors
                .iter()
                .map(move |selector| format!("{parent}{}", selector.to_css(compress)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::tree::{Combinator, Comment, Declaration, Element, Entity, Quoted};

    fn sel(parts: &[(Combinator, &str)]) -> Selector {
        Selector::new(parts.iter().map(|(c, v)| Element::new(*c, *v)).collect(), 0)
    }

    fn decl(name: &str, value: &str) -> Node {
        Node::Declaration(Declaration::new(name, Entity::Keyword(value.into()), false, 0))
    }

    fn ruleset(selectors: Vec<Selector>, rules: Vec<Node>) -> Node {
        Node::Ruleset(Arc::new(Ruleset::new(selectors, rules)))
    }

    #[test]
    fn test_nested_paths_are_joined() {
        let inner = ruleset(
            vec![
                sel(&[(Combinator::None, ".b")]),
                sel(&[(Combinator::Parent, ":hover")]),
            ],
            vec![decl("color", "red")],
        );
        let outer = ruleset(
            vec![sel(&[(Combinator::None, ".a")]), sel(&[(Combinator::None, "p")])],
            vec![inner, decl("width", "auto")],
        );
        let css = CssWriter::new(false).write(&Ruleset::root(vec![outer]));
        assert_eq!(
            css,
            ".a, p {\n  width: auto;\n}\n.a .b,\n.a:hover,\np .b,\np:hover {\n  color: red;\n}\n"
        );
    }

    #[test]
    fn test_root_statements_lead_the_output() {
        let rule = ruleset(vec![sel(&[(Combinator::None, ".a")])], vec![decl("color", "red")]);
        let charset = Node::Directive(Directive::statement(
            "@charset",
            Entity::Quoted(Quoted::new(Some('"'), "utf-8", 0)),
            0,
        ));
        let root = Ruleset::root(vec![rule, charset]);
        assert_eq!(
            CssWriter::new(false).write(&root),
            "@charset \"utf-8\";\n.a {\n  color: red;\n}\n"
        );
    }

    #[test]
    fn test_long_selector_lists_break_lines() {
        let names = [".a", ".b", ".c"];
        let short = ruleset(
            names.iter().map(|n| sel(&[(Combinator::None, *n)])).collect(),
            vec![decl("w", "1")],
        );
        let long = ruleset(
            [".a", ".b", ".c", ".d"].iter().map(|n| sel(&[(Combinator::None, *n)])).collect(),
            vec![decl("w", "2")],
        );
        let css = CssWriter::new(false).write(&Ruleset::root(vec![short, long]));
        assert_eq!(css, ".a, .b, .c {\n  w: 1;\n}\n.a,\n.b,\n.c,\n.d {\n  w: 2;\n}\n");
    }

    #[test]
    fn test_empty_rulesets_are_dropped() {
        let empty = ruleset(vec![sel(&[(Combinator::None, ".a")])], vec![decl("@x", "1")]);
        assert_eq!(CssWriter::new(false).write(&Ruleset::root(vec![empty])), "");
    }

    #[test]
    fn test_media_bubbles_with_enclosing_paths() {
        let media = Node::Directive(Directive::block(
            "@media",
            Some("print".into()),
            Ruleset::new(vec![], vec![decl("display", "none")]),
            0,
        ));
        let outer = ruleset(
            vec![sel(&[(Combinator::None, ".nav")])],
            vec![media, decl("display", "block")],
        );
        let root = Ruleset::root(vec![outer]);

        assert_eq!(
            CssWriter::new(false).write(&root),
            ".nav {\n  display: block;\n}\n@media print {\n  .nav {\n    display: none;\n  }\n}\n"
        );
        assert_eq!(
            CssWriter::new(true).write(&root),
            ".nav{display:block;}@media print{.nav{display:none;}}"
        );
    }

    #[test]
    fn test_comments_follow_compression() {
        let loud = Node::Comment(Comment {
            text: "/* keep */".into(),
            silent: false,
        });
        let silent = Node::Comment(Comment {
            text: "// drop".into(),
            silent: true,
        });
        let rule = ruleset(vec![sel(&[(Combinator::None, "a")])], vec![decl("b", "c")]);
        let root = Ruleset::root(vec![loud, silent, rule]);

        assert_eq!(CssWriter::new(false).write(&root), "/* keep */\na {\n  b: c;\n}\n");
        assert_eq!(CssWriter::new(true).write(&root), "a{b:c;}");
    }

    #[test]
    fn test_child_combinators_compress() {
        let inner = ruleset(vec![sel(&[(Combinator::Child, "li")])], vec![decl("margin", "0")]);
        let outer = ruleset(vec![sel(&[(Combinator::None, "ul")])], vec![inner]);
        let root = Ruleset::root(vec![outer]);
        assert_eq!(CssWriter::new(false).write(&root), "ul > li {\n  margin: 0;\n}\n");
        assert_eq!(CssWriter::new(true).write(&root), "ul>li{margin:0;}");
    }
}
