//! Value-level nodes.

use std::sync::LazyLock;

use regex::Regex;

use super::call::Call;
use super::color::Color;
use super::dimension::Dimension;
use super::operation::Operation;
use crate::error::{Error, Result};
use crate::eval::EvalContext;

/// Anything that can appear on the right-hand side of a declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    /// Comma-separated list of expressions.
    Value(Vec<Entity>),
    /// Space-separated list of entities.
    Expression(Vec<Entity>),
    Operation(Box<Operation>),
    /// A parenthesised sub-expression.
    Paren(Box<Entity>),
    /// `-@x` or `-(expr)`.
    Negative(Box<Entity>),
    Dimension(Dimension),
    Color(Color),
    Variable(Variable),
    Call(Call),
    Keyword(String),
    Quoted(Quoted),
    Url(Box<Entity>),
    /// Text passed through verbatim.
    Anonymous(String),
    /// The IE `alpha(opacity=N)` filter.
    Alpha(Box<Entity>),
}

impl Entity {
    /// Evaluate to a value with no variables, calls or pending arithmetic.
    ///
    /// A list with a single element evaluates to that element, unwrapped.
    pub fn eval(&self, ctx: &mut EvalContext<'_>) -> Result<Entity> {
        match self {
            Self::Value(list) => match list.as_slice() {
                [single] => single.eval(ctx),
                _ => Ok(Self::Value(eval_all(list, ctx)?)),
            },
            Self::Expression(list) => match list.as_slice() {
                [single] => single.eval(ctx),
                _ => Ok(Self::Expression(eval_all(list, ctx)?)),
            },
            Self::Operation(op) => op.eval(ctx),
            Self::Paren(inner) => {
                let mut scope = ctx.parens();
                inner.eval(&mut scope)
            }
            Self::Negative(inner) => negate(inner.eval(ctx)?),
            Self::Variable(variable) => ctx.variable(&variable.name, variable.index),
            Self::Call(call) => call.eval(ctx),
            Self::Quoted(quoted) => quoted.eval(ctx).map(Self::Quoted),
            Self::Url(inner) => Ok(Self::Url(Box::new(inner.eval(ctx)?))),
            Self::Alpha(inner) => Ok(Self::Alpha(Box::new(inner.eval(ctx)?))),
            Self::Dimension(_) | Self::Color(_) | Self::Keyword(_) | Self::Anonymous(_) => {
                Ok(self.clone())
            }
        }
    }

    pub fn to_css(&self, compress: bool) -> String {
        match self {
            Self::Value(list) => join(list, if compress { "," } else { ", " }, compress),
            Self::Expression(list) => join(list, " ", compress),
            Self::Operation(op) => op.to_css(compress),
            Self::Paren(inner) => format!("({})", inner.to_css(compress)),
            Self::Negative(inner) => format!("-{}", inner.to_css(compress)),
            Self::Dimension(d) => d.to_css(),
            Self::Color(c) => c.to_css(compress),
            Self::Variable(v) => v.name.clone(),
            Self::Call(call) => call.to_css(compress),
            Self::Keyword(text) | Self::Anonymous(text) => text.clone(),
            Self::Quoted(quoted) => quoted.to_css(),
            Self::Url(inner) => format!("url({})", inner.to_css(compress)),
            Self::Alpha(inner) => format!("alpha(opacity={})", inner.to_css(compress)),
        }
    }

    pub fn as_dimension(&self) -> Option<&Dimension> {
        match self {
            Self::Dimension(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<&Color> {
        match self {
            Self::Color(c) => Some(c),
            _ => None,
        }
    }
}

fn eval_all(list: &[Entity], ctx: &mut EvalContext<'_>) -> Result<Vec<Entity>> {
    list.iter().map(|e| e.eval(ctx)).collect()
}

fn join(list: &[Entity], separator: &str, compress: bool) -> String {
    list.iter()
        .map(|e| e.to_css(compress))
        .collect::<Vec<_>>()
        .join(separator)
}

fn negate(value: Entity) -> Result<Entity> {
    match value {
        Entity::Dimension(mut d) => {
            d.value = -d.value;
            Ok(Entity::Dimension(d))
        }
        other => Err(Error::operation(format!(
            "cannot negate `{}`",
            other.to_css(false)
        ))),
    }
}

/// A reference to a variable, e.g. `@width`.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub index: usize,
}

impl Variable {
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }
}

static INTERPOLATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\{([\w-]+)\}").expect("valid interpolation pattern"));

/// A string literal.
///
/// `quote` is `None` for escaped strings (`~"..."`), which render without
/// quotes.
#[derive(Debug, Clone, PartialEq)]
pub struct Quoted {
    pub quote: Option<char>,
    pub content: String,
    pub index: usize,
}

impl Quoted {
    pub fn new(quote: Option<char>, content: impl Into<String>, index: usize) -> Self {
        Self {
            quote,
            content: content.into(),
            index,
        }
    }

    /// Replace `@{name}` with the value of `@name`.
    pub fn eval(&self, ctx: &mut EvalContext<'_>) -> Result<Quoted> {
        if !self.content.contains("@{") {
            return Ok(self.clone());
        }

        let mut content = String::with_capacity(self.content.len());
        let mut last = 0;
        for caps in INTERPOLATION.captures_iter(&self.content) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            content.push_str(&self.content[last..whole.start()]);
            let value = ctx.variable(&format!("@{}", name.as_str()), self.index)?;
            match value {
                Entity::Quoted(q) => content.push_str(&q.content),
                other => content.push_str(&other.to_css(false)),
            }
            last = whole.end();
        }
        content.push_str(&self.content[last..]);

        Ok(Quoted {
            content,
            ..self.clone()
        })
    }

    pub fn to_css(&self) -> String {
        match self.quote {
            Some(q) => format!("{q}{}{q}", self.content),
            None => self.content.clone(),
        }
    }
}
