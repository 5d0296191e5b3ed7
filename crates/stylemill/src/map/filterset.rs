//! Canonical sets of filters.
//!
//! A [`Filterset`] never holds two filters on the same key that are
//! redundant or contradictory. Adding a filter is a two-step protocol:
//! [`Filterset::addable`] decides whether the filter contradicts the set,
//! is already implied by it, or narrows it, and [`Filterset::add`] folds a
//! narrowing filter in, evicting the filters it supersedes.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

use super::filter::{Filter, FilterOp, FilterValue};

/// Highest zoom level a style can address.
pub const MAX_ZOOM: u8 = 22;

/// What adding a filter to a set would do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addable {
    /// The filter narrows the set.
    New,
    /// The set already implies the filter.
    Implied,
    /// The filter can never hold together with the set.
    Contradicts,
}

/// Result of merging another set into a copy of this one.
#[derive(Debug, Clone, PartialEq)]
pub enum Merge {
    /// Some filter contradicts this set; the combination never matches.
    Contradiction,
    /// Every filter is already implied; nothing changes.
    Unchanged,
    /// A narrower set with the new filters folded in.
    Merged(Filterset),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filterset {
    filters: BTreeMap<String, Filter>,
}

fn storage_key(key: &str, op: FilterOp, value: &FilterValue) -> String {
    match op {
        FilterOp::Ne | FilterOp::Match => format!("{key}{op}{value}"),
        _ => format!("{key}{op}"),
    }
}

fn is(a: &FilterValue, b: &FilterValue, test: fn(Ordering) -> bool) -> bool {
    a.compare(b).is_some_and(test)
}

fn gt(a: &FilterValue, b: &FilterValue) -> bool {
    is(a, b, Ordering::is_gt)
}

fn ge(a: &FilterValue, b: &FilterValue) -> bool {
    is(a, b, Ordering::is_ge)
}

fn lt(a: &FilterValue, b: &FilterValue) -> bool {
    is(a, b, Ordering::is_lt)
}

fn le(a: &FilterValue, b: &FilterValue) -> bool {
    is(a, b, Ordering::is_le)
}

fn same(a: &FilterValue, b: &FilterValue) -> bool {
    a.to_string() == b.to_string()
}

impl Filterset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set by adding filters in order.
    ///
    /// Returns `None` when the filters contradict each other, i.e. the
    /// selector they came from can never match.
    pub fn from_filters<'f>(filters: impl IntoIterator<Item = &'f Filter>) -> Option<Self> {
        let mut set = Self::new();
        for filter in filters {
            match set.addable(filter) {
                Addable::New => set.add(filter.clone()),
                Addable::Implied => {}
                Addable::Contradicts => return None,
            }
        }
        Some(set)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn filters(&self) -> impl Iterator<Item = &Filter> {
        self.filters.values()
    }

    fn stored(&self, key: &str, op: FilterOp) -> Option<&FilterValue> {
        self.filters.get(&format!("{key}{op}")).map(|f| &f.value)
    }

    fn has_ne(&self, key: &str, value: &FilterValue) -> bool {
        self.filters.contains_key(&storage_key(key, FilterOp::Ne, value))
    }

    /// Decide how `filter` relates to the constraints already in the set.
    pub fn addable(&self, filter: &Filter) -> Addable {
        use Addable::{Contradicts, Implied, New};

        let key = filter.key.as_str();
        let value = &filter.value;
        let bound = |op| self.stored(key, op);
        let when = |op, test: fn(&FilterValue, &FilterValue) -> bool| {
            bound(op).is_some_and(|stored| test(stored, value))
        };

        match filter.op {
            FilterOp::Eq => {
                if let Some(stored) = bound(FilterOp::Eq) {
                    return if same(stored, value) { Implied } else { Contradicts };
                }
                if self.has_ne(key, value)
                    || when(FilterOp::Gt, ge)
                    || when(FilterOp::Lt, le)
                    || when(FilterOp::Ge, gt)
                    || when(FilterOp::Le, lt)
                {
                    return Contradicts;
                }
                let ranges = [FilterOp::Gt, FilterOp::Ge, FilterOp::Lt, FilterOp::Le];
                if ranges.iter().any(|&op| bound(op).is_some()) {
                    // Every stored bound on the key admits the value.
                    return Implied;
                }
                New
            }
            FilterOp::Match => New,
            FilterOp::Ne => {
                if let Some(stored) = bound(FilterOp::Eq) {
                    return if same(stored, value) { Contradicts } else { Implied };
                }
                if self.has_ne(key, value)
                    || when(FilterOp::Gt, ge)
                    || when(FilterOp::Lt, le)
                    || when(FilterOp::Ge, gt)
                    || when(FilterOp::Le, lt)
                {
                    return Implied;
                }
                New
            }
            FilterOp::Gt => {
                if let Some(stored) = bound(FilterOp::Eq) {
                    return if le(stored, value) { Contradicts } else { Implied };
                }
                if when(FilterOp::Lt, le) || when(FilterOp::Le, le) {
                    return Contradicts;
                }
                if when(FilterOp::Gt, ge) || when(FilterOp::Ge, gt) {
                    return Implied;
                }
                New
            }
            FilterOp::Ge => {
                if let Some(stored) = bound(FilterOp::Eq) {
                    return if lt(stored, value) { Contradicts } else { Implied };
                }
                if when(FilterOp::Lt, le) || when(FilterOp::Le, lt) {
                    return Contradicts;
                }
                if when(FilterOp::Gt, ge) || when(FilterOp::Ge, ge) {
                    return Implied;
                }
                New
            }
            FilterOp::Lt => {
                if let Some(stored) = bound(FilterOp::Eq) {
                    return if ge(stored, value) { Contradicts } else { Implied };
                }
                if when(FilterOp::Gt, ge) || when(FilterOp::Ge, ge) {
                    return Contradicts;
                }
                if when(FilterOp::Lt, le) || when(FilterOp::Le, lt) {
                    return Implied;
                }
                New
            }
            FilterOp::Le => {
                if let Some(stored) = bound(FilterOp::Eq) {
                    return if gt(stored, value) { Contradicts } else { Implied };
                }
                if when(FilterOp::Gt, ge) || when(FilterOp::Ge, gt) {
                    return Contradicts;
                }
                if when(FilterOp::Lt, le) || when(FilterOp::Le, le) {
                    return Implied;
                }
                New
            }
        }
    }

    /// Add a filter that [`addable`](Self::addable) reported as new.
    pub fn add(&mut self, mut filter: Filter) {
        let key = filter.key.clone();
        let value = filter.value.clone();
        let evict = |set: &mut Self, test: &dyn Fn(&FilterValue) -> bool| {
            set.filters.retain(|_, f| !(f.key == key && test(&f.value)));
        };

        match filter.op {
            FilterOp::Eq => evict(self, &|_| true),
            FilterOp::Ne | FilterOp::Match => {}
            FilterOp::Gt => evict(self, &|v| le(v, &value)),
            FilterOp::Ge => {
                evict(self, &|v| lt(v, &value));
                let ne = storage_key(&filter.key, FilterOp::Ne, &value);
                if self.filters.remove(&ne).is_some() {
                    filter.op = FilterOp::Gt;
                }
            }
            FilterOp::Lt => evict(self, &|v| ge(v, &value)),
            FilterOp::Le => {
                evict(self, &|v| gt(v, &value));
                let ne = storage_key(&filter.key, FilterOp::Ne, &value);
                if self.filters.remove(&ne).is_some() {
                    filter.op = FilterOp::Lt;
                }
            }
        }

        self.filters
            .insert(storage_key(&filter.key, filter.op, &filter.value), filter);
    }

    /// Merge `other` into a copy of this set.
    pub fn clone_with(&self, other: &Filterset) -> Merge {
        let mut additions = Vec::new();
        for filter in other.filters() {
            match self.addable(filter) {
                Addable::Contradicts => return Merge::Contradiction,
                Addable::New => additions.push(filter.clone()),
                Addable::Implied => {}
            }
        }
        if additions.is_empty() {
            return Merge::Unchanged;
        }

        let mut merged = self.clone();
        for filter in additions {
            merged.add(filter);
        }
        Merge::Merged(merged)
    }

    /// Zoom levels the set admits, or `None` when it admits none.
    pub fn zoom_range(&self) -> Option<RangeInclusive<u8>> {
        let mut start = 0f64;
        let mut end = f64::from(MAX_ZOOM);
        for filter in self.filters().filter(|f| f.is_zoom()) {
            let Some(z) = filter.value.as_number() else {
                continue;
            };
            match filter.op {
                FilterOp::Eq => {
                    start = start.max(z);
                    end = end.min(z);
                }
                FilterOp::Gt => start = start.max(z.floor() + 1.0),
                FilterOp::Ge => start = start.max(z.ceil()),
                FilterOp::Lt => end = end.min(z.ceil() - 1.0),
                FilterOp::Le => end = end.min(z.floor()),
                FilterOp::Ne | FilterOp::Match => {}
            }
        }
        if start > end || end < 0.0 || start > f64::from(MAX_ZOOM) {
            return None;
        }
        Some(start as u8..=end as u8)
    }

    /// `<Filter>` element for the non-zoom filters, or an empty string.
    pub fn to_xml(&self) -> String {
        let exprs: Vec<String> = self
            .filters()
            .filter(|f| !f.is_zoom())
            .map(|f| format!("({})", f.to_xml().trim()))
            .collect();
        if exprs.is_empty() {
            String::new()
        } else {
            format!("    <Filter>{}</Filter>\n", exprs.join(" and "))
        }
    }
}

/// Canonical signature: sorted filter ids joined by tabs.
impl fmt::Display for Filterset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<String> = self.filters().map(Filter::id).collect();
        ids.sort();
        f.write_str(&ids.join("\t"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(op: &str, value: f64) -> Filter {
        Filter::new(
            "TOTAL",
            FilterOp::parse(op).unwrap(),
            FilterValue::Number(value),
            0,
        )
    }

    fn with(op: &str, value: f64) -> Filterset {
        let mut set = Filterset::new();
        set.add(filter(op, value));
        set
    }

    #[test]
    fn test_empty_set_accepts_anything() {
        let set = Filterset::new();
        for op in ["=", "!=", ">", ">=", "<", "<="] {
            assert_eq!(set.addable(&filter(op, 11.0)), Addable::New, "{op}");
        }
        assert_eq!(set.to_xml(), "");
    }

    #[test]
    fn test_greater_than_rejects_and_implies() {
        let set = with(">", 11.0);
        assert_eq!(set.addable(&filter("=", 9.0)), Addable::Contradicts);
        assert_eq!(set.addable(&filter("=", 90.0)), Addable::Implied);
        assert_eq!(set.addable(&filter("=", 11.0)), Addable::Contradicts);
        assert_eq!(set.addable(&filter("!=", 9.0)), Addable::Implied);
        assert_eq!(set.addable(&filter(">", 9.0)), Addable::Implied);
        assert_eq!(set.addable(&filter(">", 90.0)), Addable::New);
        assert_eq!(set.addable(&filter("<", 11.0)), Addable::Contradicts);
        assert_eq!(set.addable(&filter("<=", 90.0)), Addable::New);
    }

    #[test]
    fn test_equality_table() {
        let set = with("=", 11.0);
        assert_eq!(set.addable(&filter("=", 11.0)), Addable::Implied);
        assert_eq!(set.addable(&filter("=", 90.0)), Addable::Contradicts);
        assert_eq!(set.addable(&filter("!=", 11.0)), Addable::Contradicts);
        assert_eq!(set.addable(&filter("!=", 90.0)), Addable::Implied);
        assert_eq!(set.addable(&filter(">", 9.0)), Addable::Implied);
        assert_eq!(set.addable(&filter(">=", 90.0)), Addable::Contradicts);
        assert_eq!(set.addable(&filter("<=", 9.0)), Addable::Contradicts);
    }

    #[test]
    fn test_not_equal_table() {
        let set = with("!=", 11.0);
        assert_eq!(set.addable(&filter("=", 11.0)), Addable::Contradicts);
        assert_eq!(set.addable(&filter("!=", 11.0)), Addable::Implied);
        assert_eq!(set.addable(&filter("!=", 9.0)), Addable::New);
        assert_eq!(set.addable(&filter(">", 9.0)), Addable::New);
    }

    #[test]
    fn test_narrower_bounds_evict_wider_ones() {
        let mut set = with(">", 5.0);
        assert_eq!(set.addable(&filter(">", 10.0)), Addable::New);
        set.add(filter(">", 10.0));
        assert_eq!(set.len(), 1);
        assert_eq!(set.to_string(), "TOTAL>10");
    }

    #[test]
    fn test_inclusive_bound_absorbs_matching_exclusion() {
        let mut set = with("!=", 11.0);
        set.add(filter(">=", 11.0));
        assert_eq!(set.to_string(), "TOTAL>11");

        let mut set = with("!=", 3.0);
        set.add(filter("<=", 3.0));
        assert_eq!(set.to_string(), "TOTAL<3");
    }

    #[test]
    fn test_clone_with_outcomes() {
        let base = with(">", 11.0);
        assert_eq!(base.clone_with(&with("<", 5.0)), Merge::Contradiction);
        assert_eq!(base.clone_with(&with(">", 2.0)), Merge::Unchanged);

        let Merge::Merged(merged) = base.clone_with(&with("<", 50.0)) else {
            panic!("expected a merged set");
        };
        assert_eq!(merged.to_string(), "TOTAL<50\tTOTAL>11");
        assert_eq!(base.len(), 1);
    }

    #[test]
    fn test_contradictory_filters_build_nothing() {
        assert!(Filterset::from_filters(&[filter(">", 10.0), filter("<", 3.0)]).is_none());
        let set = Filterset::from_filters(&[filter(">", 1.0), filter(">", 3.0)]).unwrap();
        assert_eq!(set.to_string(), "TOTAL>3");
    }

    #[test]
    fn test_zoom_ranges_and_xml() {
        let zoom = |op: &str, z: f64| {
            Filter::new("zoom", FilterOp::parse(op).unwrap(), FilterValue::Number(z), 0)
        };
        let set = Filterset::from_filters(&[zoom(">=", 10.0), zoom("<", 14.0), filter(">", 1.0)]).unwrap();
        assert_eq!(set.zoom_range(), Some(10..=13));
        assert_eq!(set.to_xml(), "    <Filter>([TOTAL] &gt; 1)</Filter>\n");

        let never = Filterset::from_filters(&[zoom(">", 22.0)]).unwrap();
        assert_eq!(never.zoom_range(), None);
    }
}
