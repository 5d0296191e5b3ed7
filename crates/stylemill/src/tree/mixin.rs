//! Mixin definitions, mixin calls and the lookup that connects them.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use super::declaration::Declaration;
use super::entity::Entity;
use super::guard::Guard;
use super::ruleset::Ruleset;
use super::selector::{Combinator, Element, Selector};
use super::Node;
use crate::error::{Error, Result};
use crate::eval::{EvalContext, Frame};
use crate::logging::targets;

/// Something a mixin call can expand: a parametric definition, or a plain
/// ruleset used as a mixin.
#[derive(Debug, Clone)]
pub enum Mixin {
    Ruleset(Arc<Ruleset>),
    Definition(Arc<MixinDefinition>),
}

impl Mixin {
    pub fn selectors(&self) -> &[Selector] {
        match self {
            Self::Ruleset(ruleset) => ruleset.selectors(),
            Self::Definition(definition) => &definition.selectors,
        }
    }

    pub fn find(&self, selector: &Selector) -> Vec<Mixin> {
        match self {
            Self::Ruleset(ruleset) => ruleset.find(selector),
            Self::Definition(definition) => definition.find(selector),
        }
    }

    /// Whether a call with these evaluated arguments selects this mixin.
    /// Plain rulesets only accept calls without arguments.
    pub fn matches(&self, args: &[Entity], ctx: &mut EvalContext<'_>) -> Result<bool> {
        match self {
            Self::Ruleset(_) => Ok(args.is_empty()),
            Self::Definition(definition) => definition.matches(args, ctx),
        }
    }

    /// The evaluated rules this mixin contributes to the calling block.
    pub fn expand(&self, args: &[Entity], ctx: &mut EvalContext<'_>) -> Result<Vec<Node>> {
        match self {
            Self::Ruleset(ruleset) => Ok(ruleset.eval(ctx)?.into_rules()),
            Self::Definition(definition) => MixinDefinition::expand(definition, args, ctx),
        }
    }
}

/// Collect the mixins among `rules` that a call to `selector` reaches.
///
/// A candidate whose selector matches only a prefix of the call is searched
/// for the rest, which is how namespaced calls like `#ns > .m` resolve.
pub(crate) fn find_in(rules: &[Node], selector: &Selector) -> Vec<Mixin> {
    let mut found = Vec::new();
    for rule in rules {
        let candidate = match rule {
            Node::Ruleset(ruleset) => Mixin::Ruleset(Arc::clone(ruleset)),
            Node::MixinDefinition(definition) => Mixin::Definition(Arc::clone(definition)),
            _ => continue,
        };
        let Some(depth) = candidate
            .selectors()
            .iter()
            .find(|s| selector.matches(s))
            .map(|s| s.elements.len())
        else {
            continue;
        };
        if selector.elements.len() > depth {
            found.extend(candidate.find(&selector.tail(depth)));
        } else {
            found.push(candidate);
        }
    }
    found
}

/// A mixin parameter.
///
/// Named parameters bind `@name`, optionally with a default. A parameter
/// without a name is a literal pattern the argument in its position must
/// equal for the definition to match.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Option<String>,
    pub value: Option<Entity>,
}

impl Param {
    pub fn named(name: impl Into<String>, default: Option<Entity>) -> Self {
        Self {
            name: Some(name.into()),
            value: default,
        }
    }

    pub fn pattern(value: Entity) -> Self {
        Self {
            name: None,
            value: Some(value),
        }
    }
}

/// `.name(@a, @b: default) when (guard) { ... }`.
pub struct MixinDefinition {
    pub name: String,
    pub params: Vec<Param>,
    pub condition: Option<Guard>,
    pub index: usize,
    selectors: Vec<Selector>,
    rules: Vec<Node>,
    required: usize,
    variables: OnceLock<HashMap<String, usize>>,
}

impl MixinDefinition {
    pub fn new(
        name: impl Into<String>,
        params: Vec<Param>,
        rules: Vec<Node>,
        condition: Option<Guard>,
        index: usize,
    ) -> Self {
        let name = name.into();
        let required = params
            .iter()
            .filter(|p| p.name.is_none() || p.value.is_none())
            .count();
        let selectors = vec![Selector::new(
            vec![Element::new(Combinator::None, name.clone())],
            index,
        )];
        Self {
            name,
            params,
            condition,
            index,
            selectors,
            rules,
            required,
            variables: OnceLock::new(),
        }
    }

    pub fn rules(&self) -> &[Node] {
        &self.rules
    }

    /// Parameters that must be supplied by a call.
    pub fn required(&self) -> usize {
        self.required
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn variable(&self, name: &str) -> Option<&Declaration> {
        let index = self.variables.get_or_init(|| {
            self.rules
                .iter()
                .enumerate()
                .filter_map(|(i, rule)| match rule {
                    Node::Declaration(decl) if decl.is_variable() => Some((decl.name.clone(), i)),
                    _ => None,
                })
                .collect()
        });
        match self.rules.get(*index.get(name)?) {
            Some(Node::Declaration(decl)) => Some(decl),
            _ => None,
        }
    }

    pub fn find(&self, selector: &Selector) -> Vec<Mixin> {
        find_in(&self.rules, selector)
    }

    pub fn matches(&self, args: &[Entity], ctx: &mut EvalContext<'_>) -> Result<bool> {
        if args.len() < self.required {
            return Ok(false);
        }
        if self.required > 0 && args.len() > self.params.len() {
            return Ok(false);
        }

        for (param, arg) in self.params.iter().zip(args) {
            if let (None, Some(pattern)) = (&param.name, &param.value) {
                if pattern.eval(ctx)?.to_css(false) != arg.to_css(false) {
                    return Ok(false);
                }
            }
        }

        let Some(guard) = &self.condition else {
            return Ok(true);
        };
        let bound = self.bind(args, ctx)?;
        let mut frames = ctx.frames().to_vec();
        frames.push(Frame::Ruleset(Arc::new(bound)));
        let mut scope = ctx.with_frames(frames);
        guard.eval(&mut scope)
    }

    /// Bind parameters to arguments, plus `@arguments` to all of them.
    fn bind(&self, args: &[Entity], ctx: &mut EvalContext<'_>) -> Result<Ruleset> {
        let mut rules = Vec::with_capacity(self.params.len() + 1);
        let mut arguments = Vec::with_capacity(args.len().max(self.params.len()));

        for (i, param) in self.params.iter().enumerate() {
            let value = match (args.get(i), &param.value) {
                (Some(arg), _) => arg.clone(),
                (None, Some(default)) => default.eval(ctx)?,
                (None, None) => {
                    return Err(Error::argument_count(
                        &self.name,
                        args.len(),
                        self.required,
                        self.params.len(),
                    )
                    .at(self.index));
                }
            };
            if let Some(name) = &param.name {
                rules.push(Node::Declaration(Declaration::new(
                    name.clone(),
                    value.clone(),
                    false,
                    self.index,
                )));
            }
            arguments.push(value);
        }
        arguments.extend(args.iter().skip(self.params.len()).cloned());
        rules.push(Node::Declaration(Declaration::new(
            "@arguments",
            Entity::Expression(arguments),
            false,
            self.index,
        )));

        Ok(Ruleset::new(Vec::new(), rules))
    }

    /// Evaluate the body with parameters bound, in the caller's scope.
    pub fn expand(this: &Arc<Self>, args: &[Entity], ctx: &mut EvalContext<'_>) -> Result<Vec<Node>> {
        let bound = this.bind(args, ctx)?;
        let mut frames = ctx.frames().to_vec();
        frames.push(Frame::Ruleset(Arc::new(bound)));
        frames.push(Frame::Mixin(Arc::clone(this)));

        let mut scope = ctx.with_frames(frames);
        let body = Ruleset::new(Vec::new(), this.rules.clone());
        Ok(body.eval(&mut scope)?.into_rules())
    }
}

impl PartialEq for MixinDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.params == other.params
            && self.condition == other.condition
            && self.rules == other.rules
    }
}

impl fmt::Debug for MixinDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MixinDefinition")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("condition", &self.condition)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

/// `.selector(args) !important;` inside a block.
#[derive(Debug, Clone, PartialEq)]
pub struct MixinCall {
    pub selector: Selector,
    pub args: Vec<Entity>,
    pub important: bool,
    pub index: usize,
}

impl MixinCall {
    pub fn new(selector: Selector, args: Vec<Entity>, important: bool, index: usize) -> Self {
        Self {
            selector,
            args,
            important,
            index,
        }
    }

    /// Expand into the rules of every matching mixin in the nearest scope
    /// that has one.
    ///
    /// A plain ruleset is never expanded from inside its own evaluation, so
    /// `.a { .a; }` reaches an outer `.a` instead of recursing.
    pub fn eval(&self, ctx: &mut EvalContext<'_>) -> Result<Vec<Node>> {
        let args = self
            .args
            .iter()
            .map(|arg| arg.eval(ctx))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| e.or_at(self.index))?;

        let mut scope = ctx.enter_mixin().map_err(|e| e.or_at(self.index))?;
        let frames: Vec<Frame> = scope.frames().iter().rev().cloned().collect();

        let mut found_any = false;
        for frame in &frames {
            let mixins = frame.find(&self.selector);
            if mixins.is_empty() {
                continue;
            }
            found_any = true;

            let mut rules = Vec::new();
            let mut matched = 0usize;
            for mixin in &mixins {
                if matches!(mixin, Mixin::Ruleset(r) if frames.iter().any(|f| f.is_evaluating(r))) {
                    continue;
                }
                if !mixin.matches(&args, &mut scope)? {
                    continue;
                }
                matched += 1;
                let expansion = if self.important {
                    let mut important = scope.important();
                    mixin.expand(&args, &mut important)
                } else {
                    mixin.expand(&args, &mut scope)
                };
                rules.extend(expansion.map_err(|e| e.or_at(self.index).within_call(self.index))?);
            }

            if matched == 0 {
                continue;
            }
            tracing::trace!(
                target: targets::EVAL,
                selector = %self.selector,
                found = mixins.len(),
                matched,
                "mixin call"
            );
            return Ok(rules);
        }

        if found_any {
            Err(Error::no_matching_definition(self.describe(&args), self.index))
        } else {
            Err(Error::undefined_mixin(self.selector.to_string(), self.index))
        }
    }

    fn describe(&self, args: &[Entity]) -> String {
        let args = args
            .iter()
            .map(|a| a.to_css(false))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}({})", self.selector, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::options::RenderOptions;
    use crate::tree::{Dimension, Variable};

    fn px(v: f64) -> Entity {
        Entity::Dimension(Dimension::new(v, Some("px")))
    }

    fn sel(name: &str) -> Selector {
        Selector::new(vec![Element::new(Combinator::None, name)], 0)
    }

    fn width_of(param: &str) -> Node {
        Node::Declaration(Declaration::new(
            "width",
            Entity::Variable(Variable::new(param, 0)),
            false,
            0,
        ))
    }

    fn root_with(definition: MixinDefinition) -> Frame {
        Frame::Ruleset(Arc::new(Ruleset::root(vec![Node::MixinDefinition(
            Arc::new(definition),
        )])))
    }

    fn rendered(rules: &[Node]) -> Vec<String> {
        rules
            .iter()
            .filter_map(|r| match r {
                Node::Declaration(d) if !d.is_variable() => Some(d.to_css(false)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_required_counts_unnamed_and_undefaulted() {
        let def = MixinDefinition::new(
            ".m",
            vec![
                Param::pattern(Entity::Keyword("dark".into())),
                Param::named("@a", None),
                Param::named("@b", Some(px(1.0))),
            ],
            vec![],
            None,
            0,
        );
        assert_eq!(def.required(), 2);
        assert_eq!(def.arity(), 3);
    }

    #[test]
    fn test_defaults_fill_missing_arguments() {
        let options = RenderOptions::default();
        let mut ctx = EvalContext::new(&options);
        let def = MixinDefinition::new(
            ".m",
            vec![Param::named("@w", Some(px(5.0)))],
            vec![width_of("@w")],
            None,
            0,
        );
        let mut scope = ctx.push_frame(root_with(def));

        let call = MixinCall::new(sel(".m"), vec![], false, 0);
        assert_eq!(rendered(&call.eval(&mut scope).unwrap()), ["width: 5px;"]);

        let call = MixinCall::new(sel(".m"), vec![px(2.0)], false, 0);
        assert_eq!(rendered(&call.eval(&mut scope).unwrap()), ["width: 2px;"]);
    }

    #[test]
    fn test_pattern_mismatch_is_reported() {
        let options = RenderOptions::default();
        let mut ctx = EvalContext::new(&options);
        let def = MixinDefinition::new(
            ".m",
            vec![
                Param::pattern(Entity::Keyword("dark".into())),
                Param::named("@w", None),
            ],
            vec![width_of("@w")],
            None,
            0,
        );
        let mut scope = ctx.push_frame(root_with(def));

        let call = MixinCall::new(
            sel(".m"),
            vec![Entity::Keyword("light".into()), px(1.0)],
            false,
            9,
        );
        let err = call.eval(&mut scope).unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::NoMatchingDefinition(".m(light, 1px)".into())
        );
        assert_eq!(err.index(), Some(9));
    }

    #[test]
    fn test_unknown_selector_is_undefined() {
        let options = RenderOptions::default();
        let mut ctx = EvalContext::new(&options);
        let mut scope = ctx.push_frame(Frame::Ruleset(Arc::new(Ruleset::root(vec![]))));

        let err = MixinCall::new(sel(".nope"), vec![], false, 3)
            .eval(&mut scope)
            .unwrap_err();
        assert_eq!(err.to_string(), "`.nope` is undefined");
    }

    #[test]
    fn test_arguments_variable_collects_everything() {
        let options = RenderOptions::default();
        let mut ctx = EvalContext::new(&options);
        let def = MixinDefinition::new(
            ".shadow",
            vec![Param::named("@x", None), Param::named("@y", Some(px(2.0)))],
            vec![Node::Declaration(Declaration::new(
                "box-shadow",
                Entity::Variable(Variable::new("@arguments", 0)),
                false,
                0,
            ))],
            None,
            0,
        );
        let mut scope = ctx.push_frame(root_with(def));

        let rules = MixinCall::new(sel(".shadow"), vec![px(1.0)], false, 0)
            .eval(&mut scope)
            .unwrap();
        assert_eq!(rendered(&rules), ["box-shadow: 1px 2px;"]);
    }

    #[test]
    fn test_important_call_marks_expansion() {
        let options = RenderOptions::default();
        let mut ctx = EvalContext::new(&options);
        let def = MixinDefinition::new(
            ".m",
            vec![],
            vec![Node::Declaration(Declaration::new(
                "color",
                Entity::Keyword("red".into()),
                false,
                0,
            ))],
            None,
            0,
        );
        let mut scope = ctx.push_frame(root_with(def));

        let rules = MixinCall::new(sel(".m"), vec![], true, 0)
            .eval(&mut scope)
            .unwrap();
        assert_eq!(rendered(&rules), ["color: red !important;"]);
        assert!(!scope.is_important());
    }

    #[test]
    fn test_runaway_recursion_hits_the_limit() {
        let options = RenderOptions::default().with_max_mixin_depth(8);
        let mut ctx = EvalContext::new(&options);
        let def = MixinDefinition::new(
            ".loop",
            vec![],
            vec![Node::MixinCall(MixinCall::new(sel(".loop"), vec![], false, 4))],
            None,
            0,
        );
        let mut scope = ctx.push_frame(root_with(def));

        let err = MixinCall::new(sel(".loop"), vec![], false, 1)
            .eval(&mut scope)
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::RecursionLimit(8));
        assert_eq!(err.call(), Some(1));
    }

    #[test]
    fn test_ruleset_being_evaluated_is_skipped() {
        let decl = |v: f64| {
            Node::Declaration(Declaration::new("w", Entity::Dimension(Dimension::number(v)), false, 0))
        };
        let call = Node::MixinCall(MixinCall::new(sel(".a"), vec![], false, 3));
        let inner = Ruleset::new(vec![sel(".a")], vec![call]);
        let x = Ruleset::new(vec![sel(".x")], vec![Node::Ruleset(Arc::new(inner))]);
        let outer = Ruleset::new(vec![sel(".a")], vec![decl(1.0)]);
        let root = Ruleset::root(vec![Node::Ruleset(Arc::new(outer)), Node::Ruleset(Arc::new(x))]);

        let options = RenderOptions::default().with_max_mixin_depth(8);
        let mut ctx = EvalContext::new(&options);
        let evaluated = root.eval(&mut ctx).unwrap();

        let Node::Ruleset(x) = &evaluated.rules()[1] else { panic!("expected .x") };
        let Node::Ruleset(a) = &x.rules()[0] else { panic!("expected .a") };
        assert_eq!(rendered(a.rules()), ["w: 1;"]);
    }

    #[test]
    fn test_namespaced_lookup_descends() {
        let inner = MixinDefinition::new(".m", vec![], vec![width_of("@w")], None, 0);
        let ns = Ruleset::new(
            vec![sel("#ns")],
            vec![Node::MixinDefinition(Arc::new(inner))],
        );
        let rules = vec![Node::Ruleset(Arc::new(ns))];
        let call = Selector::new(
            vec![
                Element::new(Combinator::None, "#ns"),
                Element::new(Combinator::Child, ".m"),
            ],
            0,
        );

        let found = find_in(&rules, &call);
        assert_eq!(found.len(), 1);
        assert!(matches!(&found[0], Mixin::Definition(d) if d.name == ".m"));
    }
}
