//! Binary arithmetic.

use std::fmt;

use super::entity::Entity;
use crate::error::{Error, Result};
use crate::eval::EvalContext;
use crate::options::MathMode;

/// An arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Add),
            '-' => Some(Self::Subtract),
            '*' => Some(Self::Multiply),
            '/' => Some(Self::Divide),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Add => '+',
            Self::Subtract => '-',
            Self::Multiply => '*',
            Self::Divide => '/',
        }
    }

    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Subtract => a - b,
            Self::Multiply => a * b,
            Self::Divide => a / b,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// `left op right`.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub op: Operator,
    pub left: Entity,
    pub right: Entity,
}

impl Operation {
    pub fn new(op: Operator, left: Entity, right: Entity) -> Self {
        Self { op, left, right }
    }

    pub fn eval(&self, ctx: &mut EvalContext<'_>) -> Result<Entity> {
        let left = self.left.eval(ctx)?;
        let right = self.right.eval(ctx)?;

        if self.op == Operator::Divide
            && ctx.options().math == MathMode::ParensDivision
            && !ctx.in_parens()
        {
            return Ok(Entity::Operation(Box::new(Operation::new(
                self.op, left, right,
            ))));
        }

        operate(self.op, &left, &right)
    }

    pub fn to_css(&self, compress: bool) -> String {
        let left = self.left.to_css(compress);
        let right = self.right.to_css(compress);
        if self.op == Operator::Divide || compress {
            format!("{left}{}{right}", self.op)
        } else {
            format!("{left} {} {right}", self.op)
        }
    }
}

/// Apply `op` to two evaluated operands.
///
/// A number on the left of a colour is only allowed for `+` and `*`, where the
/// operands can be swapped.
pub fn operate(op: Operator, left: &Entity, right: &Entity) -> Result<Entity> {
    match (left, right) {
        (Entity::Dimension(a), Entity::Dimension(b)) => Ok(Entity::Dimension(a.operate(op, b)?)),
        (Entity::Color(a), Entity::Color(b)) => Ok(Entity::Color(a.operate(op, b))),
        (Entity::Color(a), Entity::Dimension(b)) => Ok(Entity::Color(a.operate(op, &b.to_color()))),
        (Entity::Dimension(a), Entity::Color(b)) => match op {
            Operator::Add | Operator::Multiply => Ok(Entity::Color(b.operate(op, &a.to_color()))),
            Operator::Subtract | Operator::Divide => Err(Error::operation(
                "Can't subtract or divide a color from a number",
            )),
        },
        _ => Err(Error::operation(format!(
            "Operation on an invalid type: `{} {} {}`",
            left.to_css(false),
            op,
            right.to_css(false)
        ))),
    }
}
