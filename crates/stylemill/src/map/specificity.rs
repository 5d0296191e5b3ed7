//! Specificity of map selectors.

use std::fmt;

use crate::tree::Element;

use super::Filterset;

/// How strongly a map selector binds: layer ids, then classes, then
/// filters (zoom filters count as filters).
///
/// The derived ordering compares the counts field by field, so one more
/// layer id outweighs any number of classes or filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Specificity(pub u32, pub u32, pub u32);

impl Specificity {
    pub const ZERO: Self = Self(0, 0, 0);

    pub fn of(elements: &[Element], filters: &Filterset) -> Self {
        let mut ids = 0;
        let mut classes = 0;
        for element in elements {
            match element.value.as_bytes().first() {
                Some(b'#') => ids += 1,
                Some(b'.') => classes += 1,
                _ => {}
            }
        }
        Self(ids, classes, filters.len() as u32)
    }

    pub fn ids(&self) -> u32 {
        self.0
    }

    pub fn classes(&self) -> u32 {
        self.1
    }

    pub fn filters(&self) -> u32 {
        self.2
    }

    /// Pair with the selector's source offset so equal weights still sort.
    pub fn with_order(self, order: u32) -> SpecificityWithOrder {
        SpecificityWithOrder {
            specificity: self,
            order,
        }
    }
}

impl fmt::Display for Specificity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.0, self.1, self.2)
    }
}

/// A specificity plus the source offset that settles equal weights; the
/// later selector sorts higher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SpecificityWithOrder {
    pub specificity: Specificity,
    pub order: u32,
}
