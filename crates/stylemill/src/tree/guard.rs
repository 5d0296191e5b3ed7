//! Mixin guards: `when (@a > 0) and (@b = dark), not (@c)`.

use std::cmp::Ordering;

use super::entity::Entity;
use crate::error::Result;
use crate::eval::EvalContext;

/// Comparison operator inside a guard condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl Comparison {
    pub fn parse(op: &str) -> Option<Self> {
        match op {
            "<" => Some(Self::Lt),
            "=<" | "<=" => Some(Self::Le),
            "=" => Some(Self::Eq),
            ">=" => Some(Self::Ge),
            ">" => Some(Self::Gt),
            _ => None,
        }
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Eq => ordering == Ordering::Equal,
            Self::Ge => ordering != Ordering::Less,
            Self::Gt => ordering == Ordering::Greater,
        }
    }
}

/// One parenthesised test.
///
/// A condition with no comparison, like `(@flag)`, holds when the value is
/// the keyword `true`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub lhs: Entity,
    pub comparison: Option<(Comparison, Entity)>,
    pub negate: bool,
}

impl Condition {
    pub fn eval(&self, ctx: &mut EvalContext<'_>) -> Result<bool> {
        let lhs = self.lhs.eval(ctx)?;
        let holds = match &self.comparison {
            None => matches!(&lhs, Entity::Keyword(k) if k == "true"),
            Some((op, rhs)) => {
                let rhs = rhs.eval(ctx)?;
                compare(&lhs, &rhs).is_some_and(|ordering| op.accepts(ordering))
            }
        };
        Ok(holds != self.negate)
    }
}

/// Numbers compare by value; anything else is only ever equal or unordered.
fn compare(lhs: &Entity, rhs: &Entity) -> Option<Ordering> {
    match (lhs, rhs) {
        (Entity::Dimension(a), Entity::Dimension(b)) => a.value.partial_cmp(&b.value),
        _ if text(lhs) == text(rhs) => Some(Ordering::Equal),
        _ => None,
    }
}

fn text(entity: &Entity) -> String {
    match entity {
        Entity::Quoted(q) => q.content.clone(),
        other => other.to_css(false),
    }
}

/// Comma-separated alternatives, each a conjunction of conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct Guard {
    pub alternatives: Vec<Vec<Condition>>,
}

impl Guard {
    pub fn new(alternatives: Vec<Vec<Condition>>) -> Self {
        Self { alternatives }
    }

    pub fn eval(&self, ctx: &mut EvalContext<'_>) -> Result<bool> {
        'alternatives: for conditions in &self.alternatives {
            for condition in conditions {
                if !condition.eval(ctx)? {
                    continue 'alternatives;
                }
            }
            return Ok(true);
        }
        Ok(false)
    }
}
