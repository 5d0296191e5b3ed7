//! The map-styling dialect.
//!
//! Map stylesheets are evaluated like any other, then flattened into
//! [`Definition`]s: one per selector path, carrying its canonical
//! [`Filterset`]. Definitions are sorted by [`Specificity`], resolved by
//! [`inherit_definitions`] and rendered as XML styles.

mod definition;
mod filter;
mod filterset;
mod inherit;
mod specificity;
mod xml;

pub use definition::Definition;
pub use filter::{Filter, FilterOp, FilterValue};
pub use filterset::{Addable, Filterset, MAX_ZOOM, Merge};
pub use inherit::{AttachmentGroup, inherit_definitions};
pub use specificity::{Specificity, SpecificityWithOrder};
pub use xml::styles_to_xml;

use tracing::{debug, warn};

use crate::logging::targets;
use crate::tree::{Declaration, Node, Ruleset, Selector};

/// Flatten an evaluated tree into definitions, most specific first.
///
/// Nested selectors are combined with every enclosing selector: elements
/// and filters accumulate, and an attachment set on an outer selector
/// carries into nested ones that do not name their own.
pub fn flatten(root: &Ruleset) -> Vec<Definition> {
    let mut definitions = Vec::new();
    flatten_into(root.rules(), &[], &mut definitions);
    definitions.sort_by(|a, b| b.specificity_with_order().cmp(&a.specificity_with_order()));
    debug!(target: targets::MAP, count = definitions.len(), "flattened definitions");
    definitions
}

fn flatten_into(rules: &[Node], parents: &[Selector], out: &mut Vec<Definition>) {
    for node in rules {
        let Node::Ruleset(ruleset) = node else {
            continue;
        };
        let paths = join_paths(parents, ruleset.selectors());
        let declarations: Vec<Declaration> = ruleset
            .rules()
            .iter()
            .filter_map(|rule| match rule {
                Node::Declaration(decl) if !decl.is_variable() => Some(decl.clone()),
                _ => None,
            })
            .collect();

        if !declarations.is_empty() {
            for path in &paths {
                let Some(filters) = Filterset::from_filters(&path.filters) else {
                    warn!(target: targets::MAP, selector = %path, "filters contradict each other; selector dropped");
                    continue;
                };
                out.push(Definition::new(
                    path.elements.clone(),
                    filters,
                    path.attachment.clone(),
                    declarations.clone(),
                    u32::try_from(path.index).unwrap_or(u32::MAX),
                ));
            }
        }

        flatten_into(ruleset.rules(), &paths, out);
    }
}

fn join_paths(parents: &[Selector], selectors: &[Selector]) -> Vec<Selector> {
    if parents.is_empty() {
        return selectors.to_vec();
    }
    let mut paths = Vec::with_capacity(parents.len() * selectors.len());
    for parent in parents {
        for child in selectors {
            let mut elements = parent.elements.clone();
            elements.extend(child.elements.iter().cloned());
            let mut filters = parent.filters.clone();
            filters.extend(child.filters.iter().cloned());
            paths.push(Selector {
                elements,
                filters,
                attachment: child.attachment.clone().or_else(|| parent.attachment.clone()),
                index: child.index,
            });
        }
    }
    paths
}
