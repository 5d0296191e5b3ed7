//! Flattened map style definitions.

use std::collections::HashSet;

use crate::tree::{Declaration, Element};

use super::{Filterset, Specificity, SpecificityWithOrder};

/// One flattened selector with the declarations that apply under it.
///
/// Each definition has:
/// - The layer elements it targets
/// - A canonical filter set
/// - An optional attachment naming a separate symbolizer layer
/// - Declarations, at most one per property
/// - Pre-computed specificity and source order for sorting
#[derive(Debug, Clone)]
pub struct Definition {
    pub elements: Vec<Element>,
    pub filters: Filterset,
    pub attachment: Option<String>,
    pub rules: Vec<Declaration>,
    pub specificity: Specificity,
    pub order: u32,
    rule_ids: HashSet<String>,
}

impl Definition {
    /// Create a definition. Later declarations of a property already set
    /// are dropped, as are variable bindings.
    pub fn new(
        elements: Vec<Element>,
        filters: Filterset,
        attachment: Option<String>,
        rules: Vec<Declaration>,
        order: u32,
    ) -> Self {
        let specificity = Specificity::of(&elements, &filters);
        let mut definition = Self {
            elements,
            filters,
            attachment,
            rules: Vec::new(),
            specificity,
            order,
            rule_ids: HashSet::new(),
        };
        definition.add_rules(&rules);
        definition
    }

    pub fn specificity_with_order(&self) -> SpecificityWithOrder {
        self.specificity.with_order(self.order)
    }

    /// Whether the definition targets a layer with the given id and classes.
    pub fn applies_to(&self, id: &str, classes: &[&str]) -> bool {
        self.elements.iter().all(|e| e.applies_to(id, classes))
    }

    /// Add declarations for properties not yet set, returning how many
    /// were added.
    pub fn add_rules(&mut self, rules: &[Declaration]) -> usize {
        let mut added = 0;
        for rule in rules.iter().filter(|r| !r.is_variable()) {
            if self.rule_ids.insert(rule.name.clone()) {
                self.rules.push(rule.clone());
                added += 1;
            }
        }
        added
    }

    /// A copy of this definition restricted to `filters`.
    pub fn clone_with_filters(&self, filters: Filterset) -> Self {
        Self {
            filters,
            ..self.clone()
        }
    }

    /// Offset of the earliest declaration, used to keep styles in
    /// document order.
    pub fn first_index(&self) -> Option<usize> {
        self.rules.iter().map(|r| r.index).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Combinator, Dimension, Entity};

    fn decl(name: &str, value: f64, index: usize) -> Declaration {
        Declaration::new(name, Entity::Dimension(Dimension::number(value)), false, index)
    }

    fn definition(rules: Vec<Declaration>) -> Definition {
        Definition::new(
            vec![Element::new(Combinator::Descendant, "#roads")],
            Filterset::new(),
            None,
            rules,
            0,
        )
    }

    #[test]
    fn test_first_declaration_of_a_property_wins() {
        let def = definition(vec![decl("line-width", 1.0, 4), decl("line-width", 2.0, 9)]);
        assert_eq!(def.rules.len(), 1);
        assert_eq!(def.rules[0].index, 4);
        assert_eq!(def.first_index(), Some(4));
    }

    #[test]
    fn test_add_rules_counts_new_properties() {
        let mut def = definition(vec![decl("line-width", 1.0, 0)]);
        let added = def.add_rules(&[
            decl("line-width", 3.0, 1),
            decl("line-opacity", 0.5, 2),
            Declaration::new("@w", Entity::Keyword("x".into()), false, 3),
        ]);
        assert_eq!(added, 1);
        assert_eq!(def.rules.len(), 2);
    }

    #[test]
    fn test_applies_to_layer() {
        let def = definition(Vec::new());
        assert!(def.applies_to("roads", &[]));
        assert!(!def.applies_to("water", &[]));
        assert_eq!(def.specificity, Specificity(1, 0, 0));
    }
}
