//! Evaluation context: the scope stack and the state that travels with it.
//!
//! Scopes are entered through methods returning a [`Scope`] guard. The guard
//! dereferences to the context and undoes its change when dropped, so the
//! stack stays balanced when an error propagates out of a scope body.

mod frame;

pub use frame::Frame;

use std::ops::{Deref, DerefMut};

use crate::error::{Error, ErrorKind, Result};
use crate::options::RenderOptions;
use crate::tree::Entity;

/// State shared by every node evaluated during one pass.
pub struct EvalContext<'o> {
    options: &'o RenderOptions,
    /// Outermost scope first.
    frames: Vec<Frame>,
    parens: usize,
    important: bool,
    depth: usize,
    resolving: Vec<String>,
}

impl<'o> EvalContext<'o> {
    pub fn new(options: &'o RenderOptions) -> Self {
        Self {
            options,
            frames: Vec::new(),
            parens: 0,
            important: false,
            depth: 0,
            resolving: Vec::new(),
        }
    }

    pub fn options(&self) -> &'o RenderOptions {
        self.options
    }

    /// Scopes currently visible, outermost first.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Whether evaluation is inside parentheses.
    pub fn in_parens(&self) -> bool {
        self.parens > 0
    }

    /// Whether declarations evaluated now are forced to `!important`.
    pub fn is_important(&self) -> bool {
        self.important
    }

    /// Enter a nested scope.
    pub fn push_frame(&mut self, frame: Frame) -> Scope<'_, 'o> {
        self.frames.push(frame);
        Scope {
            ctx: self,
            restore: Restore::Pop,
        }
    }

    /// Replace the innermost scope, e.g. once mixin calls in it have expanded.
    pub fn replace_frame(&mut self, frame: Frame) {
        match self.frames.last_mut() {
            Some(last) => *last = frame,
            None => self.frames.push(frame),
        }
    }

    /// Swap in an entirely different scope stack.
    pub fn with_frames(&mut self, frames: Vec<Frame>) -> Scope<'_, 'o> {
        let previous = std::mem::replace(&mut self.frames, frames);
        Scope {
            ctx: self,
            restore: Restore::Frames(previous),
        }
    }

    /// Enter a parenthesised sub-expression.
    pub fn parens(&mut self) -> Scope<'_, 'o> {
        self.parens += 1;
        Scope {
            ctx: self,
            restore: Restore::Parens,
        }
    }

    /// Enter a region whose declarations are all `!important`.
    pub fn important(&mut self) -> Scope<'_, 'o> {
        let previous = std::mem::replace(&mut self.important, true);
        Scope {
            ctx: self,
            restore: Restore::Important(previous),
        }
    }

    /// Enter a mixin expansion, failing once the nesting limit is reached.
    pub fn enter_mixin(&mut self) -> Result<Scope<'_, 'o>> {
        if self.depth >= self.options.max_mixin_depth {
            return Err(Error::new(ErrorKind::RecursionLimit(
                self.options.max_mixin_depth,
            )));
        }
        self.depth += 1;
        Ok(Scope {
            ctx: self,
            restore: Restore::Depth,
        })
    }

    /// Resolve a variable in the nearest scope that defines it and evaluate
    /// its value in the current context.
    pub fn variable(&mut self, name: &str, index: usize) -> Result<Entity> {
        let value = self
            .frames
            .iter()
            .rev()
            .find_map(|frame| frame.variable(name))
            .ok_or_else(|| Error::undefined_variable(name, index))?;

        if self.resolving.iter().any(|n| n == name) {
            return Err(Error::new(ErrorKind::RecursiveVariable(name.to_owned())).at(index));
        }
        self.resolving.push(name.to_owned());
        let mut scope = Scope {
            ctx: self,
            restore: Restore::Resolving,
        };
        value.eval(&mut scope)
    }
}

enum Restore {
    Pop,
    Frames(Vec<Frame>),
    Parens,
    Important(bool),
    Depth,
    Resolving,
}

/// Guard returned when entering a scope; leaving it restores the context.
pub struct Scope<'a, 'o> {
    ctx: &'a mut EvalContext<'o>,
    restore: Restore,
}

impl<'o> Deref for Scope<'_, 'o> {
    type Target = EvalContext<'o>;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl DerefMut for Scope<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

impl Drop for Scope<'_, '_> {
    fn drop(&mut self) {
        match &mut self.restore {
            Restore::Pop => {
                self.ctx.frames.pop();
            }
            Restore::Frames(previous) => {
                self.ctx.frames = std::mem::take(previous);
            }
            Restore::Parens => self.ctx.parens -= 1,
            Restore::Important(previous) => self.ctx.important = *previous,
            Restore::Depth => self.ctx.depth -= 1,
            Restore::Resolving => {
                self.ctx.resolving.pop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::tree::{Declaration, Dimension, Node, Ruleset};

    fn frame(name: &str, value: f64) -> Frame {
        let decl = Declaration::new(name, Entity::Dimension(Dimension::number(value)), false, 0);
        Frame::Ruleset(Arc::new(Ruleset::new(vec![], vec![Node::Declaration(decl)])))
    }

    #[test]
    fn test_innermost_binding_wins() {
        let options = RenderOptions::default();
        let mut ctx = EvalContext::new(&options);
        let mut outer = ctx.push_frame(frame("@x", 1.0));
        let mut inner = outer.push_frame(frame("@x", 2.0));

        let value = inner.variable("@x", 0).unwrap();
        assert_eq!(value, Entity::Dimension(Dimension::number(2.0)));
    }

    #[test]
    fn test_frames_pop_on_error_paths() {
        let options = RenderOptions::default();
        let mut ctx = EvalContext::new(&options);

        let failed: Result<Entity> = (|| {
            let mut scope = ctx.push_frame(frame("@x", 1.0));
            scope.variable("@missing", 7)
        })();

        let err = failed.unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UndefinedVariable("@missing".into()));
        assert_eq!(err.index(), Some(7));
        assert!(ctx.frames().is_empty());
    }

    #[test]
    fn test_state_scopes_restore() {
        let options = RenderOptions::default().with_max_mixin_depth(1);
        let mut ctx = EvalContext::new(&options);
        {
            let mut scope = ctx.important();
            assert!(scope.is_important());
            let parens = scope.parens();
            assert!(parens.in_parens());
        }
        assert!(!ctx.is_important());
        assert!(!ctx.in_parens());

        let mut depth = ctx.enter_mixin().unwrap();
        assert!(matches!(
            depth.enter_mixin().map(|_| ()).unwrap_err().kind(),
            ErrorKind::RecursionLimit(1)
        ));
    }

    #[test]
    fn test_self_reference_is_reported() {
        let options = RenderOptions::default();
        let mut ctx = EvalContext::new(&options);
        let decl = Declaration::new(
            "@a",
            Entity::Variable(crate::tree::Variable::new("@a", 3)),
            false,
            0,
        );
        let rs = Ruleset::new(vec![], vec![Node::Declaration(decl)]);
        let mut scope = ctx.push_frame(Frame::Ruleset(Arc::new(rs)));

        let err = scope.variable("@a", 0).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::RecursiveVariable("@a".into()));
    }
}
