//! Value-level productions: literals, variables, calls and arithmetic.

use std::sync::LazyLock;

use regex::Regex;

use super::grammar::Grammar;
use crate::error::{Error, Result};
use crate::options::Dialect;
use crate::tree::{Call, Color, Dimension, Entity, Operation, Operator, Quoted, Variable};

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($re).expect(concat!("valid pattern ", stringify!($name))));
    };
}

pattern!(QUOTED, r#"^(?:"((?:[^"\\\r\n]|\\.)*)"|'((?:[^'\\\r\n]|\\.)*)')"#);
pattern!(ESCAPED, r#"^~(?:"((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)')"#);
pattern!(KEYWORD, r"^[_a-zA-Z-][\w-]*");
pattern!(CALL, r"^([a-zA-Z0-9_%-]+)\(");
pattern!(URL_START, r"^url\(");
pattern!(URL_TEXT, r"^[-a-zA-Z0-9_%@$/.&=:;#+?~]+");
pattern!(VARIABLE, r"^@[a-zA-Z0-9_-]+");
pattern!(COLOR, r"^#([a-fA-F0-9]{6}|[a-fA-F0-9]{3})([\w-]*)");
pattern!(DIMENSION, r"^(-?\d*\.?\d+)(%|[a-zA-Z]+)?");
pattern!(OPACITY, r"^(?i)opacity=");
pattern!(DIGITS, r"^\d+");
pattern!(FIELD, r"^\[[\w-]+\]");
pattern!(ADD_SPACED, r"^([-+])\s+");
pattern!(ADD_TIGHT, r"^[-+]");
pattern!(MULTIPLY, r"^[/*]");
pattern!(SIGN, r"^-\S");
pattern!(IMPORTANT, r"^!\s*important");

impl<'s> Grammar<'s, '_> {
    /// `"..."` or `'...'`.
    pub(super) fn quoted(&mut self) -> Option<Entity> {
        let index = self.index();
        if !matches!(self.input.current(), Some('"' | '\'')) {
            return None;
        }
        let caps = self.input.re(&QUOTED)?;
        let (quote, content) = match (caps.get(1), caps.get(2)) {
            (Some(content), _) => ('"', content.as_str()),
            (None, Some(content)) => ('\'', content.as_str()),
            (None, None) => return None,
        };
        Some(Entity::Quoted(Quoted::new(Some(quote), content, index)))
    }

    /// `~"..."`, emitted without quotes.
    fn escaped(&mut self) -> Option<Entity> {
        let index = self.index();
        let caps = self.input.re(&ESCAPED)?;
        let content = caps.get(1).or_else(|| caps.get(2))?.as_str();
        Some(Entity::Quoted(Quoted::new(None, content, index)))
    }

    pub(super) fn keyword(&mut self) -> Option<Entity> {
        self.input
            .re_str(&KEYWORD)
            .map(|k| Entity::Keyword(k.to_owned()))
    }

    /// `name(args)`, or the IE `alpha(opacity=N)` filter.
    fn call(&mut self) -> Result<Option<Entity>> {
        let index = self.index();
        let checkpoint = self.input.save();
        let Some(caps) = self.input.re(&CALL) else {
            return Ok(None);
        };
        let name = caps.get(1).map_or("", |m| m.as_str());
        if name.eq_ignore_ascii_case("url") {
            self.input.restore(checkpoint);
            return Ok(None);
        }

        if name.eq_ignore_ascii_case("alpha") {
            let after_name = self.input.save();
            if let Some(alpha) = self.alpha()? {
                return Ok(Some(alpha));
            }
            self.input.restore(after_name);
        }

        let args = self.arguments()?;
        if !self.input.char(')') {
            self.input.restore(checkpoint);
            return Ok(None);
        }
        Ok(Some(Entity::Call(Call::new(name, args, index))))
    }

    /// Comma-separated expressions, as in call and mixin arguments.
    pub(super) fn arguments(&mut self) -> Result<Vec<Entity>> {
        let mut args = Vec::new();
        while let Some(arg) = self.expression()? {
            args.push(arg);
            if !self.input.char(',') {
                break;
            }
        }
        Ok(args)
    }

    fn alpha(&mut self) -> Result<Option<Entity>> {
        if self.input.re(&OPACITY).is_none() {
            return Ok(None);
        }
        let value = match self.input.re_str(&DIGITS) {
            Some(digits) => Some(Entity::Keyword(digits.to_owned())),
            None => self.variable(),
        };
        let Some(value) = value else {
            return Ok(None);
        };
        if !self.input.char(')') {
            return Err(Error::syntax("missing closing ) for alpha()", self.index()));
        }
        Ok(Some(Entity::Alpha(Box::new(value))))
    }

    fn url(&mut self) -> Result<Option<Entity>> {
        if !self.input.peek_char('u') || self.input.re(&URL_START).is_none() {
            return Ok(None);
        }
        let value = match self.quoted() {
            Some(quoted) => quoted,
            None => Entity::Anonymous(self.input.re_str(&URL_TEXT).unwrap_or("").to_owned()),
        };
        if !self.input.char(')') {
            return Err(Error::syntax("missing closing ) for url()", self.index()));
        }
        Ok(Some(Entity::Url(Box::new(value))))
    }

    pub(super) fn variable(&mut self) -> Option<Entity> {
        let index = self.index();
        if !self.input.peek_char('@') {
            return None;
        }
        let name = self.input.re_str(&VARIABLE)?;
        Some(Entity::Variable(Variable::new(name, index)))
    }

    fn color(&mut self) -> Option<Entity> {
        if !self.input.peek_char('#') {
            return None;
        }
        let caps = self.input.peek_re(&COLOR)?;
        if caps.get(2).is_some_and(|rest| !rest.as_str().is_empty()) {
            return None;
        }
        let hex = caps.get(1)?.as_str();
        let color = Color::from_hex(hex)?;
        self.input.re(&COLOR);
        Some(Entity::Color(color))
    }

    fn dimension(&mut self) -> Option<Entity> {
        match self.input.current() {
            Some(c) if c.is_ascii_digit() || c == '.' || c == '-' => {}
            _ => return None,
        }
        let caps = self.input.peek_re(&DIMENSION)?;
        let value: f64 = caps.get(1)?.as_str().parse().ok()?;
        let unit = caps.get(2).map(|m| m.as_str().to_owned());
        self.input.re(&DIMENSION);
        Some(Entity::Dimension(Dimension::new(value, unit.as_deref())))
    }

    fn literal(&mut self) -> Option<Entity> {
        self.dimension()
            .or_else(|| self.color())
            .or_else(|| self.quoted())
    }

    /// A single value token.
    pub(super) fn entity(&mut self) -> Result<Option<Entity>> {
        if let Some(e) = self.literal().or_else(|| self.variable()) {
            return Ok(Some(e));
        }
        if let Some(e) = self.url()? {
            return Ok(Some(e));
        }
        if let Some(e) = self.call()? {
            return Ok(Some(e));
        }
        if let Some(e) = self.escaped() {
            return Ok(Some(e));
        }
        if self.options.dialect == Dialect::Map {
            if let Some(field) = self.input.re_str(&FIELD) {
                return Ok(Some(Entity::Keyword(field.to_owned())));
            }
        }
        Ok(self.keyword())
    }

    /// `( expression )`.
    fn sub(&mut self) -> Result<Option<Entity>> {
        let checkpoint = self.input.save();
        if !self.input.char('(') {
            return Ok(None);
        }
        match self.expression()? {
            Some(e) if self.input.char(')') => Ok(Some(Entity::Paren(Box::new(e)))),
            _ => {
                self.input.restore(checkpoint);
                Ok(None)
            }
        }
    }

    fn operand(&mut self) -> Result<Option<Entity>> {
        if let Some(sub) = self.sub()? {
            return Ok(Some(sub));
        }
        if let Some(e) = self
            .dimension()
            .or_else(|| self.color())
            .or_else(|| self.variable())
        {
            return Ok(Some(e));
        }
        if let Some(call) = self.call()? {
            return Ok(Some(call));
        }

        // A detached `-` is a keyword, not a sign.
        let checkpoint = self.input.save();
        if self.input.peek_re(&SIGN).is_some() && self.input.char('-') {
            if let Some(operand) = self.operand()? {
                return Ok(Some(Entity::Negative(Box::new(operand))));
            }
            self.input.restore(checkpoint);
        }
        Ok(None)
    }

    fn multiplication(&mut self) -> Result<Option<Entity>> {
        let Some(mut left) = self.operand()? else {
            return Ok(None);
        };
        loop {
            let checkpoint = self.input.save();
            let Some(op) = self
                .input
                .re_str(&MULTIPLY)
                .and_then(|op| op.chars().next())
                .and_then(Operator::from_char)
            else {
                break;
            };
            let Some(right) = self.operand()? else {
                self.input.restore(checkpoint);
                break;
            };
            left = Entity::Operation(Box::new(Operation::new(op, left, right)));
        }
        Ok(Some(left))
    }

    /// Binary `+`/`-`. The operator must be followed by whitespace, or
    /// written tight against the left operand: `1px -2px` is a list of two
    /// values, while `1px - 2px` and `1px-2px` subtract.
    fn addition(&mut self) -> Result<Option<Entity>> {
        let Some(mut left) = self.multiplication()? else {
            return Ok(None);
        };
        loop {
            let checkpoint = self.input.save();
            let tight = !matches!(self.input.previous(), Some(' ' | '\t' | '\n'));
            let op = match self.input.re(&ADD_SPACED) {
                Some(caps) => caps.get(1).map(|m| m.as_str()),
                None if tight => self.input.re_str(&ADD_TIGHT),
                None => None,
            };
            let Some(op) = op.and_then(|op| op.chars().next()).and_then(Operator::from_char) else {
                self.input.restore(checkpoint);
                break;
            };
            let Some(right) = self.multiplication()? else {
                self.input.restore(checkpoint);
                break;
            };
            left = Entity::Operation(Box::new(Operation::new(op, left, right)));
        }
        Ok(Some(left))
    }

    /// Space-separated entities and operations.
    pub(super) fn expression(&mut self) -> Result<Option<Entity>> {
        let mut entities = Vec::new();
        loop {
            if let Some(e) = self.addition()? {
                entities.push(e);
            } else if let Some(e) = self.entity()? {
                entities.push(e);
            } else {
                break;
            }
        }
        Ok((!entities.is_empty()).then_some(Entity::Expression(entities)))
    }

    /// Comma-separated expressions: the right-hand side of a declaration.
    pub(super) fn value(&mut self) -> Result<Option<Entity>> {
        let mut expressions = Vec::new();
        while let Some(e) = self.expression()? {
            expressions.push(e);
            if !self.input.char(',') {
                break;
            }
        }
        Ok((!expressions.is_empty()).then_some(Entity::Value(expressions)))
    }

    pub(super) fn important(&mut self) -> bool {
        self.input.re(&IMPORTANT).is_some()
    }
}

#[cfg(test)]
mod tests {
    use crate::options::ParseOptions;
    use crate::parser::grammar::Grammar;
    use crate::parser::input::ParserInput;
    use crate::tree::{Entity, Operator};

    fn parse_value(text: &str) -> Entity {
        let options = ParseOptions::default();
        let mut grammar = Grammar::new(ParserInput::new(text, vec![]), 0, &options);
        grammar.value().unwrap().unwrap()
    }

    fn single(entity: Entity) -> Entity {
        match entity {
            Entity::Value(mut list) if list.len() == 1 => match list.remove(0) {
                Entity::Expression(mut items) if items.len() == 1 => items.remove(0),
                other => other,
            },
            other => other,
        }
    }

    #[test]
    fn test_sign_versus_operator() {
        let Entity::Value(list) = parse_value("1px -2px") else {
            panic!("expected a value");
        };
        let Entity::Expression(items) = &list[0] else {
            panic!("expected an expression");
        };
        assert_eq!(items.len(), 2);

        for text in ["1px - 2px", "1px-2px"] {
            match single(parse_value(text)) {
                Entity::Operation(op) => assert_eq!(op.op, Operator::Subtract, "{text}"),
                other => panic!("{text}: expected an operation, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_detached_minus_after_keyword_is_kept() {
        let Entity::Value(list) = parse_value("a - 5px") else {
            panic!("expected a value");
        };
        let Entity::Expression(items) = &list[0] else {
            panic!("expected an expression");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(items[1], Entity::Keyword("-".into()));
        assert!(matches!(items[2], Entity::Dimension(_)));
    }

    #[test]
    fn test_operators_associate_left() {
        let Entity::Operation(op) = single(parse_value("10 - 2 - 3")) else {
            panic!("expected an operation");
        };
        assert_eq!(op.op, Operator::Subtract);
        assert!(matches!(op.left, Entity::Operation(_)));
        assert!(matches!(op.right, Entity::Dimension(_)));
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        let Entity::Operation(op) = single(parse_value("1 + 2 * 3")) else {
            panic!("expected an operation");
        };
        assert_eq!(op.op, Operator::Add);
        assert!(matches!(op.right, Entity::Operation(_)));
    }

    #[test]
    fn test_literals() {
        assert!(matches!(single(parse_value("#fff")), Entity::Color(_)));
        assert!(matches!(single(parse_value("'a'")), Entity::Quoted(q) if q.quote == Some('\'')));
        assert!(matches!(single(parse_value("~\"raw\"")), Entity::Quoted(q) if q.quote.is_none()));
        assert!(matches!(single(parse_value("url(a/b.png)")), Entity::Url(_)));
        assert!(matches!(single(parse_value("alpha(opacity=50)")), Entity::Alpha(_)));
        assert!(matches!(single(parse_value("rgb(1, 2, 3)")), Entity::Call(c) if c.args.len() == 3));
        assert!(matches!(single(parse_value("-@x")), Entity::Negative(_)));
    }

    #[test]
    fn test_unclosed_url_is_a_hard_error() {
        let options = ParseOptions::default();
        let mut grammar = Grammar::new(ParserInput::new("url(a b)", vec![]), 0, &options);
        let err = grammar.value().unwrap_err();
        assert_eq!(err.to_string(), "missing closing ) for url()");
    }
}
