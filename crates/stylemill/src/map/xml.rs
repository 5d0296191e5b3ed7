//! XML style output for resolved definitions.

use std::collections::HashSet;
use std::fmt::Write as _;

use tracing::{debug, warn};

use super::filter::escape_xml;
use super::filterset::MAX_ZOOM;
use super::{AttachmentGroup, Definition};
use crate::logging::targets;
use crate::tree::{Declaration, Entity};

/// Scale denominators at the top of each zoom level, indexed by zoom.
const SCALES: [u64; 24] = [
    1_000_000_000,
    500_000_000,
    200_000_000,
    100_000_000,
    50_000_000,
    25_000_000,
    12_500_000,
    6_500_000,
    3_000_000,
    1_500_000,
    750_000,
    400_000,
    200_000,
    100_000,
    50_000,
    25_000,
    12_500,
    5_000,
    2_500,
    1_500,
    750,
    500,
    250,
    100,
];

/// Property prefixes that span two dash-separated words.
const COMPOUND_PREFIXES: [(&str, &str); 2] = [
    ("line-pattern-", "LinePattern"),
    ("polygon-pattern-", "PolygonPattern"),
];

/// Render one `<Style>` per attachment group, in document order.
///
/// Styles are named `name` for the default attachment and
/// `name-attachment` otherwise. Groups that produce no rules are omitted.
pub fn styles_to_xml(name: &str, groups: &[AttachmentGroup]) -> String {
    let mut ordered: Vec<&AttachmentGroup> = groups.iter().collect();
    ordered.sort_by_key(|group| {
        group
            .definitions
            .iter()
            .filter_map(Definition::first_index)
            .min()
            .unwrap_or(usize::MAX)
    });

    let styles: Vec<String> = ordered
        .into_iter()
        .filter_map(|group| style_xml(name, group))
        .collect();
    debug!(target: targets::MAP, style = name, count = styles.len(), "rendered styles");
    styles.join("\n")
}

fn style_xml(name: &str, group: &AttachmentGroup) -> Option<String> {
    let mut seen = HashSet::new();
    let rules: Vec<String> = group
        .definitions
        .iter()
        .filter(|def| seen.insert(def.filters.to_string()))
        .filter_map(rule_xml)
        .collect();
    if rules.is_empty() {
        return None;
    }

    let style_name = match &group.attachment {
        Some(attachment) => format!("{name}-{attachment}"),
        None => name.to_owned(),
    };
    let mut xml = format!(
        "<Style name=\"{}\" filter-mode=\"first\">\n",
        escape_xml(&style_name)
    );
    for rule in rules {
        xml.push_str(&rule);
    }
    xml.push_str("</Style>\n");
    Some(xml)
}

fn rule_xml(def: &Definition) -> Option<String> {
    let Some(zoom) = def.filters.zoom_range() else {
        warn!(target: targets::MAP, filters = %def.filters, "zoom filters never match; rule dropped");
        return None;
    };
    let symbolizers = symbolizers(&def.rules);
    if symbolizers.is_empty() {
        return None;
    }

    let mut xml = String::from("  <Rule>\n");
    let (start, end) = (*zoom.start(), *zoom.end());
    if start > 0 {
        let _ = writeln!(
            xml,
            "    <MaxScaleDenominator>{}</MaxScaleDenominator>",
            SCALES[usize::from(start)]
        );
    }
    if end < MAX_ZOOM {
        let _ = writeln!(
            xml,
            "    <MinScaleDenominator>{}</MinScaleDenominator>",
            SCALES[usize::from(end) + 1]
        );
    }
    xml.push_str(&def.filters.to_xml());
    for (symbolizer, attributes) in symbolizers {
        let _ = write!(xml, "    <{symbolizer}Symbolizer");
        for (attribute, value) in attributes {
            let _ = write!(xml, " {attribute}=\"{}\"", escape_xml(&value));
        }
        xml.push_str(" />\n");
    }
    xml.push_str("  </Rule>\n");
    Some(xml)
}

/// Group declarations by symbolizer, keeping first-appearance order.
fn symbolizers(rules: &[Declaration]) -> Vec<(String, Vec<(String, String)>)> {
    let mut grouped: Vec<(String, Vec<(String, String)>)> = Vec::new();
    for rule in rules {
        let Some((symbolizer, attribute)) = split_property(&rule.name) else {
            warn!(target: targets::MAP, property = %rule.name, "property names no symbolizer; skipped");
            continue;
        };
        let value = attribute_value(&rule.value);
        match grouped.iter_mut().find(|(name, _)| *name == symbolizer) {
            Some((_, attributes)) => attributes.push((attribute.to_owned(), value)),
            None => grouped.push((symbolizer, vec![(attribute.to_owned(), value)])),
        }
    }
    grouped
}

fn split_property(property: &str) -> Option<(String, &str)> {
    for (prefix, symbolizer) in COMPOUND_PREFIXES {
        if let Some(attribute) = property.strip_prefix(prefix) {
            return Some((symbolizer.to_owned(), attribute));
        }
    }
    let (prefix, attribute) = property.split_once('-')?;
    if prefix.is_empty() || attribute.is_empty() {
        return None;
    }
    let mut chars = prefix.chars();
    let symbolizer = chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())?;
    Some((symbolizer, attribute))
}

fn attribute_value(value: &Entity) -> String {
    match value {
        Entity::Quoted(quoted) => quoted.content.clone(),
        other => other.to_css(false),
    }
}
