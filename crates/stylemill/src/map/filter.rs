//! Single attribute filters: `[key op value]`.

use std::cmp::Ordering;
use std::fmt;

use crate::tree::format_number;

/// Comparison operator of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOp {
    Eq,
    Ne,
    /// Regular-expression match (`=~`).
    Match,
    Gt,
    Ge,
    Lt,
    Le,
}

impl FilterOp {
    pub fn parse(op: &str) -> Option<Self> {
        match op {
            "=" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            "=~" => Some(Self::Match),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Match => "=~",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The right-hand side of a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Number(f64),
    Text(String),
}

impl FilterValue {
    /// Numbers are recognized even when written as strings, so `"11"`
    /// and `11` describe the same constraint.
    pub fn parse(text: &str) -> Self {
        match text.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Self::Number(n),
            _ => Self::Text(text.to_owned()),
        }
    }

    /// Numbers order numerically and text lexically; mixed values do not
    /// order at all.
    pub fn compare(&self, other: &FilterValue) -> Option<Ordering> {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.partial_cmp(b),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One attribute test attached to a map selector.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub key: String,
    pub op: FilterOp,
    pub value: FilterValue,
    pub index: usize,
}

impl Filter {
    pub fn new(key: impl Into<String>, op: FilterOp, value: FilterValue, index: usize) -> Self {
        Self {
            key: key.into(),
            op,
            value,
            index,
        }
    }

    /// Canonical identity, e.g. `TOTAL>11`.
    pub fn id(&self) -> String {
        format!("{}{}{}", self.key, self.op, self.value)
    }

    /// Zoom filters select scale ranges instead of features.
    pub fn is_zoom(&self) -> bool {
        self.key == "zoom"
    }

    pub fn to_css(&self) -> String {
        match &self.value {
            FilterValue::Text(text) => format!("[{}{}'{}']", self.key, self.op, text),
            value => format!("[{}{}{}]", self.key, self.op, value),
        }
    }

    /// The filter as a map renderer expression, XML-escaped.
    pub fn to_xml(&self) -> String {
        let value = match &self.value {
            FilterValue::Number(_) => self.value.to_string(),
            FilterValue::Text(text) => format!("'{}'", text.replace('\'', "\\'")),
        };
        let expr = match self.op {
            FilterOp::Match => format!("[{}].match({})", self.key, value),
            op => format!("[{}] {} {}", self.key, op, value),
        };
        escape_xml(&expr)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

pub(crate) fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_strings_are_numbers() {
        assert_eq!(FilterValue::parse("11"), FilterValue::Number(11.0));
        assert_eq!(FilterValue::parse("motorway"), FilterValue::Text("motorway".into()));
        assert_eq!(
            FilterValue::parse("9").compare(&FilterValue::Number(11.0)),
            Some(Ordering::Less)
        );
        assert_eq!(FilterValue::Text("a".into()).compare(&FilterValue::Number(1.0)), None);
    }

    #[test]
    fn test_ids_and_xml() {
        let total = Filter::new("TOTAL", FilterOp::Gt, FilterValue::Number(11.0), 0);
        assert_eq!(total.id(), "TOTAL>11");
        assert_eq!(total.to_xml(), "[TOTAL] &gt; 11");
        assert_eq!(total.to_css(), "[TOTAL>11]");

        let name = Filter::new("name", FilterOp::Eq, FilterValue::Text("O'Hare".into()), 0);
        assert_eq!(name.to_xml(), "[name] = 'O\\'Hare'");

        let re = Filter::new("type", FilterOp::Match, FilterValue::Text("^a".into()), 0);
        assert_eq!(re.to_xml(), "[type].match('^a')");
        assert!(!re.is_zoom());
    }
}
