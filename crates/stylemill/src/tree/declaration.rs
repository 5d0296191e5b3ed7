//! Property and variable declarations.

use super::entity::Entity;
use crate::error::Result;
use crate::eval::EvalContext;

/// `name: value;` where `name` is a property or an `@variable`.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub value: Entity,
    pub important: bool,
    pub index: usize,
}

impl Declaration {
    pub fn new(name: impl Into<String>, value: Entity, important: bool, index: usize) -> Self {
        Self {
            name: name.into(),
            value,
            important,
            index,
        }
    }

    /// Whether this binds a variable rather than setting a property.
    pub fn is_variable(&self) -> bool {
        self.name.starts_with('@')
    }

    pub fn eval(&self, ctx: &mut EvalContext<'_>) -> Result<Declaration> {
        let value = self.value.eval(ctx).map_err(|e| e.or_at(self.index))?;
        Ok(Declaration {
            name: self.name.clone(),
            value,
            important: self.important || ctx.is_important(),
            index: self.index,
        })
    }

    pub fn to_css(&self, compress: bool) -> String {
        let value = self.value.to_css(compress);
        match (compress, self.important) {
            (false, false) => format!("{}: {};", self.name, value),
            (false, true) => format!("{}: {} !important;", self.name, value),
            (true, false) => format!("{}:{};", self.name, value),
            (true, true) => format!("{}:{}!important;", self.name, value),
        }
    }
}
