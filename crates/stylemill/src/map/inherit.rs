//! Rule inheritance between overlapping definitions.
//!
//! Definitions arrive sorted from most to least specific. Each definition
//! inherits the properties of every less specific definition with the same
//! attachment whose filters are compatible with its own; where the filters
//! only partially overlap, a narrower copy is split off so that the
//! renderer's first-match semantics pick the right combination.

use std::collections::HashMap;

use tracing::trace;

use super::{Definition, Merge};
use crate::logging::targets;

/// Definitions of one attachment, in rendering order.
#[derive(Debug, Clone)]
pub struct AttachmentGroup {
    pub attachment: Option<String>,
    pub definitions: Vec<Definition>,
}

type FilterKey = (Option<String>, String);

struct Inheritance {
    arena: Vec<Definition>,
    by_filter: HashMap<FilterKey, usize>,
}

impl Inheritance {
    fn push(&mut self, definition: Definition) -> usize {
        self.arena.push(definition);
        self.arena.len() - 1
    }

    /// Fold the rules of a less specific definition into `current`.
    fn add_rules(&mut self, current: &mut Vec<usize>, definition: &Definition) {
        let mut k = 0;
        while k < current.len() {
            let id = current[k];
            match self.arena[id].filters.clone_with(&definition.filters) {
                Merge::Merged(filters) => {
                    let key = (definition.attachment.clone(), filters.to_string());
                    if let Some(&previous) = self.by_filter.get(&key) {
                        self.arena[previous].add_rules(&definition.rules);
                    } else {
                        let mut clone = self.arena[id].clone_with_filters(filters);
                        if clone.add_rules(&definition.rules) > 0 {
                            trace!(target: targets::MAP, filters = %key.1, "split definition");
                            let clone = self.push(clone);
                            self.by_filter.insert(key, clone);
                            current.insert(k, clone);
                            k += 1;
                        }
                    }
                }
                Merge::Unchanged => {
                    self.arena[id].add_rules(&definition.rules);
                }
                Merge::Contradiction => {}
            }
            k += 1;
        }
    }
}

/// Resolve inheritance for definitions sorted by descending specificity.
///
/// Groups appear in the order their attachment first occurs.
pub fn inherit_definitions(definitions: &[Definition]) -> Vec<AttachmentGroup> {
    let mut state = Inheritance {
        arena: Vec::with_capacity(definitions.len()),
        by_filter: HashMap::new(),
    };
    let mut groups: Vec<(Option<String>, Vec<usize>)> = Vec::new();

    for (i, definition) in definitions.iter().enumerate() {
        let attachment = definition.attachment.clone();
        let first = state.push(definition.clone());
        let mut current = vec![first];

        for later in &definitions[i + 1..] {
            if later.attachment == attachment {
                state.add_rules(&mut current, later);
            }
        }

        let slot = match groups.iter().position(|(a, _)| *a == attachment) {
            Some(slot) => slot,
            None => {
                groups.push((attachment.clone(), Vec::new()));
                groups.len() - 1
            }
        };
        for &id in &current {
            let key = (attachment.clone(), state.arena[id].filters.to_string());
            state.by_filter.insert(key, id);
            groups[slot].1.push(id);
        }
    }

    let arena = state.arena;
    groups
        .into_iter()
        .map(|(attachment, ids)| AttachmentGroup {
            attachment,
            definitions: ids.into_iter().map(|id| arena[id].clone()).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{Filter, FilterOp, FilterValue, Filterset};
    use crate::tree::{Combinator, Declaration, Dimension, Element, Entity};

    fn decl(name: &str, value: f64) -> Declaration {
        Declaration::new(name, Entity::Dimension(Dimension::number(value)), false, 0)
    }

    fn def(filters: &[(&str, f64)], rules: Vec<Declaration>, order: u32) -> Definition {
        let filters: Vec<Filter> = filters
            .iter()
            .map(|(op, v)| {
                Filter::new("zoom", FilterOp::parse(op).unwrap(), FilterValue::Number(*v), 0)
            })
            .collect();
        Definition::new(
            vec![Element::new(Combinator::Descendant, "#roads")],
            Filterset::from_filters(&filters).unwrap(),
            None,
            rules,
            order,
        )
    }

    fn names(def: &Definition) -> Vec<&str> {
        def.rules.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_specific_definition_inherits_general_rules() {
        let defs = vec![
            def(&[(">", 10.0)], vec![decl("line-width", 4.0)], 2),
            def(&[], vec![decl("line-width", 1.0), decl("line-color", 0.0)], 1),
        ];
        let groups = inherit_definitions(&defs);
        assert_eq!(groups.len(), 1);

        let resolved = &groups[0].definitions;
        assert_eq!(resolved.len(), 2);
        assert_eq!(names(&resolved[0]), ["line-width", "line-color"]);
        assert_eq!(resolved[0].rules[0].value.to_css(false), "4");
        assert_eq!(names(&resolved[1]), ["line-width", "line-color"]);
    }

    #[test]
    fn test_partial_overlap_splits_definition() {
        let defs = vec![
            def(&[(">", 10.0)], vec![decl("line-width", 4.0)], 2),
            def(&[("<", 15.0)], vec![decl("line-color", 0.0)], 1),
        ];
        let groups = inherit_definitions(&defs);
        let resolved = &groups[0].definitions;

        let signatures: Vec<String> = resolved.iter().map(|d| d.filters.to_string()).collect();
        assert_eq!(signatures, ["zoom<15\tzoom>10", "zoom>10", "zoom<15"]);
        assert_eq!(names(&resolved[0]), ["line-width", "line-color"]);
        assert_eq!(names(&resolved[1]), ["line-width"]);
    }

    #[test]
    fn test_contradictory_definitions_do_not_mix() {
        let defs = vec![
            def(&[(">", 10.0)], vec![decl("line-width", 4.0)], 2),
            def(&[("<", 5.0)], vec![decl("line-color", 0.0)], 1),
        ];
        let groups = inherit_definitions(&defs);
        assert_eq!(names(&groups[0].definitions[0]), ["line-width"]);
    }

    #[test]
    fn test_attachments_group_separately() {
        let mut casing = def(&[], vec![decl("line-width", 6.0)], 1);
        casing.attachment = Some("casing".into());
        let defs = vec![def(&[], vec![decl("line-width", 2.0)], 2), casing];

        let groups = inherit_definitions(&defs);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].attachment, None);
        assert_eq!(groups[1].attachment.as_deref(), Some("casing"));
        assert_eq!(groups[0].definitions[0].rules[0].value.to_css(false), "2");
    }
}
