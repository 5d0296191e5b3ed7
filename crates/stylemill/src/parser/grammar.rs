//! Statement-level productions.
//!
//! Every production either returns a node, or returns `None` with the
//! cursor where it started so the caller can try the next alternative.
//! Productions that have committed past any viable alternative raise a
//! syntax error instead.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::input::ParserInput;
use crate::error::{Error, Result};
use crate::map::{Filter, FilterOp, FilterValue};
use crate::options::{Dialect, ParseOptions};
use crate::tree::{
    Combinator, Comment, Comparison, Condition, Declaration, Directive, Element, Entity, Guard,
    Import, MixinCall, MixinDefinition, Node, Param, Ruleset, Selector,
};

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($re).expect(concat!("valid pattern ", stringify!($name))));
    };
}

pattern!(BLOCK_COMMENT, r"^/\*(?:[^*]|\*+[^/*])*\*+/");
pattern!(LINE_COMMENT, r"^//[^\n]*");
pattern!(VARIABLE_DECL, r"^(@[a-zA-Z0-9_-]+)\s*:");
pattern!(PROPERTY, r"^(\*?-?[_a-zA-Z][\w-]*)\s*:");
pattern!(LITERAL_VALUE, r#"^([^@+/*(;{}!"'~\[\]-]*);"#);
pattern!(ELEMENT, r"^(?:[.#:]?[\w-]+%?|\*)");
pattern!(MAP_ELEMENT, r"^(?:[.#]?[\w-]+|\*)");
pattern!(ATTRIBUTE, r"^\[[^\]]*\]");
pattern!(PAREN_ARG, r"^\([^)@]+\)");
pattern!(COMBINATOR, r"^(?:[+>~]|&|::)");
pattern!(ATTACHMENT, r"^::([\w-]+)");
pattern!(FILTER_KEY, r"^[a-zA-Z0-9_-]+");
pattern!(FILTER_OP, r"^(?:=~|!=|<=|>=|=|<|>)");
pattern!(FILTER_VALUE, r"^[\w.-]+");
pattern!(MIXIN_ELEMENT, r"^[#.][\w-]+");
pattern!(MIXIN_CALL_AHEAD, r"^[^{]*[;}]");
pattern!(MIXIN_NAME, r"^([#.][\w-]+)\s*\(");
pattern!(PARAM_NAME, r"^@[\w-]+");
pattern!(WHEN, r"^when\b");
pattern!(AND, r"^and\b");
pattern!(NOT, r"^not\b");
pattern!(GUARD_OP, r"^(?:>=|=<|<=|=|<|>)");
pattern!(DIRECTIVE_NAME, r"^@[\w-]+");
pattern!(PRELUDE, r"^[^{;]+");
pattern!(MEDIA_LIST, r"^[^;{}]+");

/// The grammar over one source file.
pub(crate) struct Grammar<'s, 'o> {
    pub(super) input: ParserInput<'s>,
    pub(super) options: &'o ParseOptions,
    base: usize,
    imports: Vec<Import>,
}

impl<'s, 'o> Grammar<'s, 'o> {
    /// `base` is the global offset of the file's first byte.
    pub fn new(input: ParserInput<'s>, base: usize, options: &'o ParseOptions) -> Self {
        Self {
            input,
            options,
            base,
            imports: Vec::new(),
        }
    }

    /// Global offset of the cursor.
    pub(super) fn index(&self) -> usize {
        self.base + self.input.pos()
    }

    /// Imports met so far that need fetching.
    pub fn take_imports(&mut self) -> Vec<Import> {
        std::mem::take(&mut self.imports)
    }

    pub fn is_eof(&self) -> bool {
        self.input.is_eof()
    }

    /// Global offset of the furthest point any production reached.
    pub fn furthest(&self) -> usize {
        self.base + self.input.furthest()
    }

    pub fn chunk_count(&self) -> usize {
        self.input.chunk_count()
    }

    fn map_dialect(&self) -> bool {
        self.options.dialect == Dialect::Map
    }

    /// Rules until nothing else matches.
    ///
    /// Alternatives are tried in a fixed order: mixin definition, rule,
    /// ruleset, mixin call, comment, directive.
    pub fn primary(&mut self) -> Result<Vec<Node>> {
        let mut rules = Vec::new();
        loop {
            if self.input.is_eof() || self.input.peek_char('}') {
                break;
            }
            if self.input.char(';') {
                continue;
            }
            if let Some(node) = self.mixin_definition()? {
                rules.push(node);
            } else if let Some(node) = self.rule()? {
                rules.push(node);
            } else if let Some(node) = self.ruleset()? {
                rules.push(node);
            } else if let Some(node) = self.mixin_call()? {
                rules.push(node);
            } else if let Some(node) = self.comment() {
                rules.push(node);
            } else if let Some(node) = self.directive()? {
                rules.push(node);
            } else {
                break;
            }
        }
        Ok(rules)
    }

    fn comment(&mut self) -> Option<Node> {
        if !self.input.peek_char('/') {
            return None;
        }
        if let Some(text) = self.input.re_str(&BLOCK_COMMENT) {
            return Some(Node::Comment(Comment {
                text: text.to_owned(),
                silent: false,
            }));
        }
        self.input.re_str(&LINE_COMMENT).map(|text| {
            Node::Comment(Comment {
                text: text.to_owned(),
                silent: true,
            })
        })
    }

    /// `{ primary }`.
    fn block(&mut self) -> Result<Option<Vec<Node>>> {
        if !self.input.char('{') {
            return Ok(None);
        }
        let rules = self.primary()?;
        Ok(self.input.char('}').then_some(rules))
    }

    /// `name: value;` or `@name: value;`.
    fn rule(&mut self) -> Result<Option<Node>> {
        if matches!(self.input.current(), Some('.' | '#' | '&')) {
            return Ok(None);
        }
        let index = self.index();
        let checkpoint = self.input.save();

        let name = match self.input.re(&VARIABLE_DECL) {
            Some(caps) => caps.get(1).map(|m| m.as_str()),
            None => self
                .input
                .re(&PROPERTY)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str()),
        };
        let Some(name) = name else {
            return Ok(None);
        };

        if self.options.literal_values() && !name.starts_with('@') {
            if let Some(caps) = self.input.peek_re(&LITERAL_VALUE) {
                let text = caps.get(1).map_or("", |m| m.as_str()).trim();
                if !text.is_empty() {
                    self.input.re(&LITERAL_VALUE);
                    let value = Entity::Anonymous(text.to_owned());
                    return Ok(Some(Node::Declaration(Declaration::new(name, value, false, index))));
                }
            }
        }

        let value = self.value()?;
        let important = self.important();
        match value {
            Some(value) if self.end() => Ok(Some(Node::Declaration(Declaration::new(
                name, value, important, index,
            )))),
            _ => {
                self.input.restore(checkpoint);
                Ok(None)
            }
        }
    }

    /// A rule terminator: `;`, or a `}` left for the enclosing block.
    fn end(&mut self) -> bool {
        self.input.char(';') || self.input.peek_char('}') || self.input.is_eof()
    }

    /// `selector, selector { ... }`.
    fn ruleset(&mut self) -> Result<Option<Node>> {
        let checkpoint = self.input.save();
        let mut selectors = Vec::new();
        while let Some(selector) = self.selector()? {
            selectors.push(selector);
            if !self.input.char(',') {
                break;
            }
        }

        if !selectors.is_empty() {
            if let Some(rules) = self.block()? {
                return Ok(Some(Node::Ruleset(Arc::new(Ruleset::new(selectors, rules)))));
            }
        }
        self.input.restore(checkpoint);
        Ok(None)
    }

    fn selector(&mut self) -> Result<Option<Selector>> {
        if self.map_dialect() {
            return self.map_selector();
        }
        let index = self.index();
        let mut elements = Vec::new();
        while let Some(element) = self.element() {
            elements.push(element);
        }
        Ok((!elements.is_empty()).then(|| Selector::new(elements, index)))
    }

    fn combinator(&mut self) -> Combinator {
        let spaced = matches!(self.input.previous(), Some(' ' | '\t' | '\n'));
        match self.input.re_str(&COMBINATOR) {
            Some(">") => Combinator::Child,
            Some("+") => Combinator::AdjacentSibling,
            Some("~") => Combinator::GeneralSibling,
            Some("&") => Combinator::Parent,
            Some("::") => Combinator::PseudoElement,
            _ if spaced => Combinator::Descendant,
            _ => Combinator::None,
        }
    }

    fn element(&mut self) -> Option<Element> {
        let checkpoint = self.input.save();
        let combinator = self.combinator();
        let value = self
            .input
            .re_str(&ELEMENT)
            .or_else(|| self.input.re_str(&ATTRIBUTE))
            .or_else(|| self.input.re_str(&PAREN_ARG));
        match value {
            Some(value) => Some(Element::new(combinator, value)),
            None if combinator == Combinator::Parent => Some(Element::new(combinator, "")),
            None => {
                self.input.restore(checkpoint);
                None
            }
        }
    }

    /// Elements, `[key op value]` filters and at most one `::attachment`.
    fn map_selector(&mut self) -> Result<Option<Selector>> {
        let index = self.index();
        let mut elements = Vec::new();
        let mut filters = Vec::new();
        let mut attachment = None;

        loop {
            let spaced = matches!(self.input.previous(), Some(' ' | '\t' | '\n'));
            if let Some(value) = self.input.re_str(&MAP_ELEMENT) {
                let combinator = if spaced { Combinator::Descendant } else { Combinator::None };
                elements.push(Element::new(combinator, value));
            } else if let Some(filter) = self.filter() {
                filters.push(filter);
            } else if let Some(caps) = self.input.re(&ATTACHMENT) {
                if attachment.is_some() {
                    return Err(Error::syntax("Encountered second attachment name", self.index()));
                }
                attachment = caps.get(1).map(|m| m.as_str().to_owned());
            } else {
                break;
            }
            if matches!(self.input.current(), Some('{' | '}' | ';' | ',')) {
                break;
            }
        }

        if elements.is_empty() && filters.is_empty() && attachment.is_none() {
            return Ok(None);
        }
        Ok(Some(
            Selector::new(elements, index)
                .with_filters(filters)
                .with_attachment(attachment),
        ))
    }

    fn filter(&mut self) -> Option<Filter> {
        let index = self.index();
        let checkpoint = self.input.save();
        if !self.input.char('[') {
            return None;
        }

        let parsed = (|| {
            let key = match self.input.re_str(&FILTER_KEY) {
                Some(key) => key.to_owned(),
                None => match self.quoted()? {
                    Entity::Quoted(q) => q.content,
                    _ => return None,
                },
            };
            let op = FilterOp::parse(self.input.re_str(&FILTER_OP)?)?;
            let value = match self.quoted() {
                Some(Entity::Quoted(q)) => FilterValue::parse(&q.content),
                _ => FilterValue::parse(self.input.re_str(&FILTER_VALUE)?),
            };
            self.input
                .char(']')
                .then(|| Filter::new(key, op, value, index))
        })();

        if parsed.is_none() {
            self.input.restore(checkpoint);
        }
        parsed
    }

    /// `.m;`, `.m(1px, red);`, `#ns > .m();`, `.m() !important;`.
    fn mixin_call(&mut self) -> Result<Option<Node>> {
        if self.map_dialect() || !matches!(self.input.current(), Some('.' | '#')) {
            return Ok(None);
        }
        let index = self.index();
        let checkpoint = self.input.save();

        let mut elements = Vec::new();
        let mut combinator = Combinator::None;
        while let Some(value) = self.input.re_str(&MIXIN_ELEMENT) {
            elements.push(Element::new(combinator, value));
            combinator = if self.input.char('>') {
                Combinator::Child
            } else {
                Combinator::None
            };
        }

        let mut args = Vec::new();
        if self.input.char('(') {
            args = self.arguments()?;
            if !self.input.char(')') {
                self.input.restore(checkpoint);
                return Ok(None);
            }
        }
        let important = self.important();

        if !elements.is_empty() && self.end() {
            let selector = Selector::new(elements, index);
            return Ok(Some(Node::MixinCall(MixinCall::new(selector, args, important, index))));
        }
        self.input.restore(checkpoint);
        Ok(None)
    }

    /// `.m(@a, @b: 2px, dark) when (@a > 0) { ... }`.
    fn mixin_definition(&mut self) -> Result<Option<Node>> {
        if self.map_dialect()
            || !matches!(self.input.current(), Some('.' | '#'))
            || self.input.peek_re(&MIXIN_CALL_AHEAD).is_some()
        {
            return Ok(None);
        }
        let index = self.index();
        let checkpoint = self.input.save();
        let Some(caps) = self.input.re(&MIXIN_NAME) else {
            return Ok(None);
        };
        let name = caps.get(1).map_or("", |m| m.as_str());

        let mut params = Vec::new();
        loop {
            if let Some(param) = self.input.re_str(&PARAM_NAME) {
                if self.input.char(':') {
                    match self.expression()? {
                        Some(default) => params.push(Param::named(param, Some(default))),
                        None => return Err(Error::syntax("Expected value", self.index())),
                    }
                } else {
                    params.push(Param::named(param, None));
                }
            } else if let Some(pattern) = self.pattern()? {
                params.push(Param::pattern(pattern));
            } else {
                break;
            }
            if !self.input.char(',') {
                break;
            }
        }
        if !self.input.char(')') {
            return Err(Error::syntax("Expected )", self.index()));
        }

        let condition = self.guard()?;
        match self.block()? {
            Some(rules) => Ok(Some(Node::MixinDefinition(Arc::new(MixinDefinition::new(
                name, params, rules, condition, index,
            ))))),
            None => {
                self.input.restore(checkpoint);
                Ok(None)
            }
        }
    }

    /// A literal parameter the argument in its position must equal.
    fn pattern(&mut self) -> Result<Option<Entity>> {
        if self.input.peek_char('@') {
            return Ok(None);
        }
        self.entity()
    }

    /// `when (cond) and (cond), not (cond)`.
    fn guard(&mut self) -> Result<Option<Guard>> {
        if self.input.re(&WHEN).is_none() {
            return Ok(None);
        }
        let mut alternatives = Vec::new();
        loop {
            let mut conditions = vec![self.condition()?];
            while self.input.re(&AND).is_some() {
                conditions.push(self.condition()?);
            }
            alternatives.push(conditions);
            if !self.input.char(',') {
                break;
            }
        }
        Ok(Some(Guard::new(alternatives)))
    }

    fn condition(&mut self) -> Result<Condition> {
        let negate = self.input.re(&NOT).is_some();
        if !self.input.char('(') {
            return Err(Error::syntax("expected a guard condition", self.index()));
        }
        let Some(lhs) = self.guard_operand()? else {
            return Err(Error::syntax("expected a guard condition", self.index()));
        };
        let comparison = match self.input.re_str(&GUARD_OP).and_then(Comparison::parse) {
            Some(op) => match self.guard_operand()? {
                Some(rhs) => Some((op, rhs)),
                None => return Err(Error::syntax("expected a value to compare", self.index())),
            },
            None => None,
        };
        if !self.input.char(')') {
            return Err(Error::syntax("Expected )", self.index()));
        }
        Ok(Condition {
            lhs,
            comparison,
            negate,
        })
    }

    fn guard_operand(&mut self) -> Result<Option<Entity>> {
        let mut entities = Vec::new();
        while let Some(e) = self.entity()? {
            entities.push(e);
        }
        Ok(match entities.len() {
            0 => None,
            1 => entities.pop(),
            _ => Some(Entity::Expression(entities)),
        })
    }

    /// `@import`, block at-rules like `@media` and `@font-face`, and
    /// one-line statements like `@charset "utf-8";`.
    fn directive(&mut self) -> Result<Option<Node>> {
        if !self.input.peek_char('@') {
            return Ok(None);
        }
        let index = self.index();
        let checkpoint = self.input.save();
        let Some(name) = self.input.re_str(&DIRECTIVE_NAME) else {
            return Ok(None);
        };

        if name == "@import" {
            if let Some(import) = self.import(index)? {
                return Ok(Some(import));
            }
            self.input.restore(checkpoint);
            return Ok(None);
        }

        let block_ahead = self
            .input
            .peek_re(&PRELUDE)
            .and_then(|caps| caps.get(0))
            .map_or(self.input.peek_char('{'), |m| {
                self.input.peek_str(&format!("{}{{", m.as_str()))
            });
        if block_ahead {
            let prelude = self
                .input
                .re_str(&PRELUDE)
                .map(|p| p.trim().to_owned())
                .filter(|p| !p.is_empty());
            if let Some(rules) = self.block()? {
                let body = Ruleset::new(Vec::new(), rules);
                return Ok(Some(Node::Directive(Directive::block(name, prelude, body, index))));
            }
        } else if let Some(value) = self.value()? {
            if self.input.char(';') {
                return Ok(Some(Node::Directive(Directive::statement(name, value, index))));
            }
        }
        self.input.restore(checkpoint);
        Ok(None)
    }

    /// `@import "file";`, `@import url(file) screen;`.
    fn import(&mut self, index: usize) -> Result<Option<Node>> {
        let source = match self.quoted() {
            Some(quoted) => quoted,
            None => match self.url_entity()? {
                Some(url) => url,
                None => return Ok(None),
            },
        };
        let path = match &source {
            Entity::Quoted(q) => q.content.clone(),
            Entity::Url(inner) => match inner.as_ref() {
                Entity::Quoted(q) => q.content.clone(),
                other => other.to_css(false),
            },
            other => other.to_css(false),
        };
        let media = self
            .input
            .re_str(&MEDIA_LIST)
            .map(|m| m.trim().to_owned())
            .filter(|m| !m.is_empty());
        if !self.input.char(';') {
            return Ok(None);
        }

        let import = Import::new(path, source, media, index);
        if !import.css {
            self.imports.push(import.clone());
        }
        Ok(Some(Node::Import(import)))
    }

    fn url_entity(&mut self) -> Result<Option<Entity>> {
        match self.entity()? {
            Some(url @ Entity::Url(_)) => Ok(Some(url)),
            _ => Ok(None),
        }
    }
}
