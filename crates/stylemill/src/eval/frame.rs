use std::sync::Arc;

use crate::tree::{Entity, Mixin, MixinDefinition, Ruleset, Selector};

/// One lexical scope on the evaluation stack.
#[derive(Debug, Clone)]
pub enum Frame {
    Ruleset(Arc<Ruleset>),
    Mixin(Arc<MixinDefinition>),
}

impl Frame {
    /// The unevaluated value bound to `name` in this scope.
    pub fn variable(&self, name: &str) -> Option<Entity> {
        match self {
            Self::Ruleset(ruleset) => ruleset.variable(name).map(|d| d.value.clone()),
            Self::Mixin(mixin) => mixin.variable(name).map(|d| d.value.clone()),
        }
    }

    /// Rulesets and mixin definitions in this scope matching `selector`.
    pub fn find(&self, selector: &Selector) -> Vec<Mixin> {
        match self {
            Self::Ruleset(ruleset) => ruleset.find(selector),
            Self::Mixin(mixin) => mixin.find(selector),
        }
    }

    /// Whether this scope is the evaluation of `ruleset`.
    pub fn is_evaluating(&self, ruleset: &Arc<Ruleset>) -> bool {
        match self {
            Self::Ruleset(frame) => frame.is_evaluating(ruleset),
            Self::Mixin(_) => false,
        }
    }
}
