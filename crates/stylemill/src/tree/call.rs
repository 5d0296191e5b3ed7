//! Function calls.

use super::entity::Entity;
use crate::error::Result;
use crate::eval::EvalContext;
use crate::functions;

/// `name(arg, arg, ...)`.
///
/// Calls to built-in functions evaluate to their result; anything else is
/// kept as a plain CSS function with evaluated arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
    pub args: Vec<Entity>,
    pub index: usize,
}

impl Call {
    pub fn new(name: impl Into<String>, args: Vec<Entity>, index: usize) -> Self {
        Self {
            name: name.into(),
            args,
            index,
        }
    }

    pub fn eval(&self, ctx: &mut EvalContext<'_>) -> Result<Entity> {
        let args = self
            .args
            .iter()
            .map(|arg| arg.eval(ctx))
            .collect::<Result<Vec<_>>>()?;

        match functions::call(&self.name, &args).map_err(|e| e.or_at(self.index))? {
            Some(result) => Ok(result),
            None => Ok(Entity::Call(Call::new(self.name.clone(), args, self.index))),
        }
    }

    pub fn to_css(&self, compress: bool) -> String {
        let separator = if compress { "," } else { ", " };
        let args = self
            .args
            .iter()
            .map(|a| a.to_css(compress))
            .collect::<Vec<_>>()
            .join(separator);
        format!("{}({})", self.name, args)
    }
}
