//! Selectors as written in the source.

use std::fmt;

use crate::map::Filter;

/// How an element relates to the element before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Combinator {
    /// Joined directly, e.g. the `:hover` in `a:hover`.
    #[default]
    None,
    /// Descendant (`a b`).
    Descendant,
    /// Child (`a > b`).
    Child,
    /// Adjacent sibling (`a + b`).
    AdjacentSibling,
    /// General sibling (`a ~ b`).
    GeneralSibling,
    /// Parent reference (`&`), joined directly onto the enclosing selector.
    Parent,
    /// Pseudo-element separator (`::`).
    PseudoElement,
}

impl Combinator {
    pub fn to_css(self, compress: bool) -> &'static str {
        match (self, compress) {
            (Self::None | Self::Parent, _) => "",
            (Self::Descendant, _) => " ",
            (Self::Child, false) => " > ",
            (Self::Child, true) => ">",
            (Self::AdjacentSibling, false) => " + ",
            (Self::AdjacentSibling, true) => "+",
            (Self::GeneralSibling, false) => " ~ ",
            (Self::GeneralSibling, true) => "~",
            (Self::PseudoElement, _) => "::",
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_css(false))
    }
}

/// One simple selector with the combinator leading into it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Element {
    pub combinator: Combinator,
    /// Tag, class, id, `*`, attribute or pseudo text.
    pub value: String,
}

impl Element {
    pub fn new(combinator: Combinator, value: impl Into<String>) -> Self {
        Self {
            combinator,
            value: value.into(),
        }
    }

    pub fn to_css(&self, compress: bool) -> String {
        format!("{}{}", self.combinator.to_css(compress), self.value)
    }

    /// Whether this element targets a layer with the given id and classes.
    pub fn applies_to(&self, id: &str, classes: &[&str]) -> bool {
        match self.value.as_bytes().first() {
            Some(b'*') => true,
            Some(b'#') => self.value[1..] == *id,
            Some(b'.') => classes.contains(&&self.value[1..]),
            _ => false,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.combinator, self.value)
    }
}

/// A selector: elements, plus filters and an attachment in the map dialect.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    pub elements: Vec<Element>,
    pub filters: Vec<Filter>,
    pub attachment: Option<String>,
    pub index: usize,
}

impl Selector {
    /// Create a selector. A leading element without a combinator is treated
    /// as a descendant of whatever encloses it.
    pub fn new(mut elements: Vec<Element>, index: usize) -> Self {
        if let Some(first) = elements.first_mut() {
            if first.combinator == Combinator::None {
                first.combinator = Combinator::Descendant;
            }
        }
        Self {
            elements,
            filters: Vec::new(),
            attachment: None,
            index,
        }
    }

    pub fn with_filters(mut self, filters: Vec<Filter>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_attachment(mut self, attachment: Option<String>) -> Self {
        self.attachment = attachment;
        self
    }

    /// Positional prefix match used to resolve mixin calls: the first
    /// `min(len)` element values of both selectors must be equal.
    pub fn matches(&self, other: &Selector) -> bool {
        let len = self.elements.len().min(other.elements.len());
        len > 0
            && self.elements[..len]
                .iter()
                .zip(&other.elements[..len])
                .all(|(a, b)| a.value == b.value)
    }

    /// The selector without its first `n` elements.
    pub fn tail(&self, n: usize) -> Selector {
        let mut elements = self.elements[n.min(self.elements.len())..].to_vec();
        if let Some(first) = elements.first_mut() {
            first.combinator = Combinator::None;
        }
        Selector::new(elements, self.index)
    }

    pub fn to_css(&self, compress: bool) -> String {
        let mut css: String = self.elements.iter().map(|e| e.to_css(compress)).collect();
        for filter in &self.filters {
            css.push_str(&filter.to_css());
        }
        if let Some(attachment) = &self.attachment {
            css.push_str("::");
            css.push_str(attachment);
        }
        css
    }

    /// Whether every element targets a layer with the given id and classes.
    pub fn applies_to(&self, id: &str, classes: &[&str]) -> bool {
        self.elements.iter().all(|e| e.applies_to(id, classes))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_css(false).trim())
    }
}
