//! The syntax tree produced by the parser and consumed by evaluation.
//!
//! Values ([`Entity`]) and rules ([`Node`]) are both immutable once built:
//! evaluating a node returns a new node, so a parsed tree can be evaluated
//! any number of times with different render options.

mod call;
mod color;
mod declaration;
mod dimension;
mod directive;
mod entity;
mod guard;
mod import;
mod mixin;
mod operation;
mod ruleset;
mod selector;

use std::sync::Arc;

pub use call::Call;
pub use color::{Color, Hsla};
pub use declaration::Declaration;
pub use dimension::{Dimension, format_number};
pub use directive::Directive;
pub use entity::{Entity, Quoted, Variable};
pub use guard::{Comparison, Condition, Guard};
pub use import::Import;
pub use mixin::{Mixin, MixinCall, MixinDefinition, Param};
pub use operation::{Operation, Operator, operate};
pub use ruleset::Ruleset;
pub use selector::{Combinator, Element, Selector};

use crate::error::Result;
use crate::eval::EvalContext;

/// A comment kept in the tree.
///
/// `//` comments are silent and never reach the output.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub text: String,
    pub silent: bool,
}

/// One rule inside a block.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Ruleset(Arc<Ruleset>),
    Declaration(Declaration),
    MixinDefinition(Arc<MixinDefinition>),
    MixinCall(MixinCall),
    Comment(Comment),
    Directive(Directive),
    Import(Import),
}

impl Node {
    /// Evaluate a rule that is not a mixin call.
    ///
    /// Mixin calls and imports are replaced by the enclosing
    /// [`Ruleset::eval`] before its rules are evaluated, so they are passed
    /// through unchanged here, along with definitions and comments.
    pub fn eval(&self, ctx: &mut EvalContext<'_>) -> Result<Node> {
        match self {
            Self::Ruleset(ruleset) => Ok(Self::Ruleset(Arc::new(ruleset.eval(ctx)?))),
            Self::Declaration(decl) => Ok(Self::Declaration(decl.eval(ctx)?)),
            Self::Directive(directive) => Ok(Self::Directive(directive.eval(ctx)?)),
            Self::MixinDefinition(_) | Self::MixinCall(_) | Self::Comment(_) | Self::Import(_) => {
                Ok(self.clone())
            }
        }
    }
}
