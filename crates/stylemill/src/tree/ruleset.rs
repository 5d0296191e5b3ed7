//! Rulesets: selectors plus a block of rules.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use super::declaration::Declaration;
use super::directive::Directive;
use super::mixin::{Mixin, find_in};
use super::selector::Selector;
use super::Node;
use crate::error::{Error, Result};
use crate::eval::{EvalContext, Frame};
use crate::logging::targets;

/// A block of rules with the selectors it applies to.
///
/// The root of a stylesheet is a ruleset with no selectors and the `root`
/// flag set; it never renders braces of its own.
pub struct Ruleset {
    selectors: Vec<Selector>,
    rules: Vec<Node>,
    root: bool,
    /// Address of the ruleset this one was evaluated from, for frames.
    origin: Option<usize>,
    variables: OnceLock<HashMap<String, usize>>,
    lookups: Mutex<HashMap<String, Vec<Mixin>>>,
}

impl Ruleset {
    pub fn new(selectors: Vec<Selector>, rules: Vec<Node>) -> Self {
        Self::build(selectors, rules, false)
    }

    /// The root ruleset of a stylesheet.
    pub fn root(rules: Vec<Node>) -> Self {
        Self::build(Vec::new(), rules, true)
    }

    fn build(selectors: Vec<Selector>, rules: Vec<Node>, root: bool) -> Self {
        Self {
            selectors,
            rules,
            root,
            origin: None,
            variables: OnceLock::new(),
            lookups: Mutex::new(HashMap::new()),
        }
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    pub fn rules(&self) -> &[Node] {
        &self.rules
    }

    pub fn into_rules(self) -> Vec<Node> {
        self.rules
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    /// Whether this block is `ruleset` itself or a frame evaluated from it.
    pub fn is_evaluating(&self, ruleset: &Arc<Ruleset>) -> bool {
        let address = Arc::as_ptr(ruleset) as usize;
        self.origin == Some(address) || std::ptr::eq(self, Arc::as_ptr(ruleset))
    }

    /// The declaration binding `name` in this block; the last one wins.
    pub fn variable(&self, name: &str) -> Option<&Declaration> {
        let index = self.variables.get_or_init(|| variable_index(&self.rules));
        match self.rules.get(*index.get(name)?) {
            Some(Node::Declaration(decl)) => Some(decl),
            _ => None,
        }
    }

    /// Nested rulesets and mixin definitions matching `selector`.
    ///
    /// Results are cached per ruleset, keyed by the selector text.
    pub fn find(&self, selector: &Selector) -> Vec<Mixin> {
        let key = selector.to_css(false);
        if let Some(found) = self.lookups.lock().get(&key) {
            return found.clone();
        }
        let found = find_in(&self.rules, selector);
        self.lookups.lock().insert(key, found.clone());
        found
    }

    /// Evaluate the block into a new ruleset.
    ///
    /// Imports are replaced by the rules they resolved to and mixin calls by
    /// their expansions before anything else is evaluated, so variables and
    /// mixins contributed that way are visible to the whole block.
    pub fn eval(&self, ctx: &mut EvalContext<'_>) -> Result<Ruleset> {
        let origin = Some(self.origin.unwrap_or(self as *const Ruleset as usize));
        let rules = splice_imports(&self.rules)?;
        let frame = Arc::new(Ruleset {
            origin,
            ..Ruleset::build(self.selectors.clone(), rules, self.root)
        });
        let mut scope = ctx.push_frame(Frame::Ruleset(Arc::clone(&frame)));

        let mut expanded: Vec<(Node, bool)> = Vec::with_capacity(frame.rules.len());
        let mut calls = 0usize;
        for rule in &frame.rules {
            match rule {
                Node::MixinCall(call) => {
                    calls += 1;
                    let contributed = call.eval(&mut scope)?;
                    expanded.extend(contributed.into_iter().map(|node| (node, true)));
                }
                other => expanded.push((other.clone(), false)),
            }
        }

        if calls > 0 {
            tracing::trace!(target: targets::EVAL, calls, rules = expanded.len(), "expanded mixin calls");
            let rules = expanded.iter().map(|(node, _)| node.clone()).collect();
            scope.replace_frame(Frame::Ruleset(Arc::new(Ruleset {
                origin,
                ..Ruleset::build(self.selectors.clone(), rules, self.root)
            })));
        }

        let mut rules = Vec::with_capacity(expanded.len());
        for (rule, evaluated) in expanded {
            rules.push(if evaluated { rule } else { rule.eval(&mut scope)? });
        }
        Ok(Ruleset::build(self.selectors.clone(), rules, self.root))
    }
}

fn variable_index(rules: &[Node]) -> HashMap<String, usize> {
    rules
        .iter()
        .enumerate()
        .filter_map(|(i, rule)| match rule {
            Node::Declaration(decl) if decl.is_variable() => Some((decl.name.clone(), i)),
            _ => None,
        })
        .collect()
}

/// Replace resolved imports with the rules of the stylesheet they point to.
fn splice_imports(rules: &[Node]) -> Result<Vec<Node>> {
    if !rules.iter().any(|r| matches!(r, Node::Import(import) if !import.css)) {
        return Ok(rules.to_vec());
    }

    let mut out = Vec::with_capacity(rules.len());
    for rule in rules {
        match rule {
            Node::Import(import) if !import.css => {
                let root = import
                    .root()
                    .ok_or_else(|| Error::import(&import.path, import.index))?;
                let imported = splice_imports(root.rules())?;
                match &import.media {
                    Some(media) => out.push(Node::Directive(Directive::block(
                        "@media",
                        Some(media.clone()),
                        Ruleset::new(Vec::new(), imported),
                        import.index,
                    ))),
                    None => out.extend(imported),
                }
            }
            other => out.push(other.clone()),
        }
    }
    Ok(out)
}

impl Clone for Ruleset {
    fn clone(&self) -> Self {
        Self::build(self.selectors.clone(), self.rules.clone(), self.root)
    }
}

impl PartialEq for Ruleset {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.selectors == other.selectors && self.rules == other.rules
    }
}

impl fmt::Debug for Ruleset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ruleset")
            .field("selectors", &self.selectors)
            .field("rules", &self.rules)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RenderOptions;
    use crate::tree::{Combinator, Dimension, Element, Entity, Variable};

    fn decl(name: &str, value: Entity) -> Node {
        Node::Declaration(Declaration::new(name, value, false, 0))
    }

    fn num(v: f64) -> Entity {
        Entity::Dimension(Dimension::number(v))
    }

    fn sel(name: &str) -> Selector {
        Selector::new(vec![Element::new(Combinator::None, name)], 0)
    }

    #[test]
    fn test_last_variable_binding_wins() {
        let rs = Ruleset::new(vec![], vec![decl("@x", num(1.0)), decl("@x", num(2.0))]);
        assert_eq!(rs.variable("@x").unwrap().value, num(2.0));
        assert!(rs.variable("@y").is_none());
    }

    #[test]
    fn test_find_caches_by_selector_text() {
        let inner = Arc::new(Ruleset::new(vec![sel(".m")], vec![decl("w", num(1.0))]));
        let rs = Ruleset::new(vec![], vec![Node::Ruleset(inner)]);

        assert_eq!(rs.find(&sel(".m")).len(), 1);
        assert_eq!(rs.lookups.lock().len(), 1);
        assert_eq!(rs.find(&sel(".m")).len(), 1);
        assert!(rs.find(&sel(".other")).is_empty());
        assert_eq!(rs.lookups.lock().len(), 2);
    }

    #[test]
    fn test_eval_resolves_nearest_variable() {
        let inner = Ruleset::new(
            vec![sel(".b")],
            vec![decl("w", Entity::Variable(Variable::new("@x", 0)))],
        );
        let outer = Ruleset::new(
            vec![sel(".a")],
            vec![decl("@x", num(2.0)), Node::Ruleset(Arc::new(inner))],
        );
        let root = Ruleset::root(vec![decl("@x", num(1.0)), Node::Ruleset(Arc::new(outer))]);

        let options = RenderOptions::default();
        let mut ctx = EvalContext::new(&options);
        let evaluated = root.eval(&mut ctx).unwrap();
        assert!(ctx.frames().is_empty());

        let Node::Ruleset(a) = &evaluated.rules()[1] else { panic!("expected .a") };
        let Node::Ruleset(b) = &a.rules()[1] else { panic!("expected .b") };
        let Node::Declaration(w) = &b.rules()[0] else { panic!("expected w") };
        assert_eq!(w.value, num(2.0));
    }

    #[test]
    fn test_unresolved_import_is_an_error() {
        let import = crate::tree::Import::new("missing.less", Entity::Anonymous("missing.less".into()), None, 5);
        let root = Ruleset::root(vec![Node::Import(import)]);
        let options = RenderOptions::default();
        let mut ctx = EvalContext::new(&options);

        let err = root.eval(&mut ctx).unwrap_err();
        assert_eq!(err.to_string(), "Error parsing `missing.less`");
        assert_eq!(err.index(), Some(5));
    }
}
