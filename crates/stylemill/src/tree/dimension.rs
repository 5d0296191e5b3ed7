//! Numbers with an optional unit.

use std::fmt;

use super::color::Color;
use super::operation::Operator;
use crate::error::{Error, Result};

/// A number with an optional unit, e.g. `12px`, `50%` or `1.5`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub value: f64,
    pub unit: Option<String>,
}

impl Dimension {
    pub fn new(value: f64, unit: Option<&str>) -> Self {
        Self {
            value,
            unit: unit.filter(|u| !u.is_empty()).map(str::to_owned),
        }
    }

    /// A unitless number.
    pub fn number(value: f64) -> Self {
        Self { value, unit: None }
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Apply an arithmetic operator.
    ///
    /// The result takes the unit of the left operand, or of the right operand
    /// when the left one is unitless. Units are never converted.
    pub fn operate(&self, op: Operator, other: &Dimension) -> Result<Dimension> {
        if op == Operator::Divide && other.value == 0.0 {
            return Err(Error::operation(format!(
                "division by zero in `{} / {}`",
                self, other
            )));
        }
        Ok(Dimension {
            value: op.apply(self.value, other.value),
            unit: self.unit.clone().or_else(|| other.unit.clone()),
        })
    }

    /// A grey with every channel set to this value.
    pub fn to_color(&self) -> Color {
        Color::new([self.value; 3], 1.0)
    }

    pub fn to_css(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_number(self.value))?;
        if let Some(unit) = &self.unit {
            f.write_str(unit)?;
        }
        Ok(())
    }
}

/// Render a number the way it appears in CSS: at most eight decimal places,
/// no trailing zeros, and never `-0`.
pub fn format_number(value: f64) -> String {
    let rounded = (value * 1e8).round() / 1e8;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        rounded.to_string()
    }
}
