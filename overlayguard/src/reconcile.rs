//! Set reconciliation between the extracted, documented, and build-listed
//! views of the overlay catalog.
//!
//! Everything is built on one primitive: a linear merge `diff` over two
//! pre-sorted sequences. Exclusion filtering is `diff` against the waiver
//! set, applied strictly after the raw comparison. Wildcard-shaped
//! documentation parameters are compiled to anchored regexes and absorb
//! matching source-side names before anything is reported.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use regex::Regex;
use serde::Serialize;

use crate::exclusions::Exclusions;

/// Parameter sets keyed by overlay name. Values are sorted with
/// [`param_cmp`]; producers go through [`sort_params`].
pub type Catalog = BTreeMap<String, Vec<String>>;

/// The ordering used for every comparison: ASCII-case-insensitive with a
/// byte-order tiebreak, so mixed-case names still sort deterministically.
pub fn param_cmp(a: &str, b: &str) -> Ordering {
    fn fold(s: &str) -> impl Iterator<Item = u8> + '_ {
        s.bytes().map(|b| b.to_ascii_lowercase())
    }
    match fold(a).cmp(fold(b)) {
        Ordering::Equal => a.cmp(b),
        other => other,
    }
}

/// Sort a freshly collected name list into diff order, dropping duplicates.
pub fn sort_params(mut names: Vec<String>) -> Vec<String> {
    names.sort_by(|a, b| param_cmp(a, b));
    names.dedup();
    names
}

/// Result of comparing two sorted sequences: a partition into the names
/// unique to each side and the names common to both, in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    pub left_only: Vec<String>,
    pub both: Vec<String>,
    pub right_only: Vec<String>,
}

/// Linear merge comparison. Both inputs must already be sorted with
/// [`param_cmp`]; unsorted input is a precondition violation and produces
/// meaningless partitions.
pub fn diff(left: &[String], right: &[String]) -> Diff {
    let mut out = Diff::default();
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        match param_cmp(&left[i], &right[j]) {
            Ordering::Less => {
                out.left_only.push(left[i].clone());
                i += 1;
            }
            Ordering::Greater => {
                out.right_only.push(right[j].clone());
                j += 1;
            }
            Ordering::Equal => {
                out.both.push(left[i].clone());
                i += 1;
                j += 1;
            }
        }
    }
    out.left_only.extend(left[i..].iter().cloned());
    out.right_only.extend(right[j..].iter().cloned());
    out
}

/// Remove waived names from a diff partition: `diff(items, waived).left_only`.
pub fn apply_exclusions(items: &[String], waived: &[String]) -> Vec<String> {
    if waived.is_empty() {
        return items.to_vec();
    }
    diff(items, waived).left_only
}

/// Compile a documented parameter name into a matcher if it is
/// wildcard-shaped, or `None` for a concrete name.
///
/// Placeholders are `<c>` with `c` a single lowercase letter: `i`..`n`
/// stands for one-or-more hex digits, any other letter for a single
/// lowercase letter. The match is anchored over the whole name.
pub fn wildcard_matcher(doc_param: &str) -> Option<Regex> {
    if !doc_param.contains('<') {
        return None;
    }
    let mut pattern = String::from("^");
    let mut chars = doc_param.chars();
    while let Some(c) = chars.next() {
        if c == '<' {
            let class = chars.next()?;
            if !class.is_ascii_lowercase() || chars.next() != Some('>') {
                return None;
            }
            if ('i'..='n').contains(&class) {
                pattern.push_str("[0-9a-f]+");
            } else {
                pattern.push_str("[a-z]");
            }
        } else {
            pattern.push_str(&regex::escape(&c.to_string()));
        }
    }
    pattern.push('$');
    Regex::new(&pattern).ok()
}

/// Let wildcard-shaped documentation entries absorb the source-side names
/// they cover.
///
/// Patterns are tried in document order; a name absorbed by one pattern is
/// gone before later patterns run. A wildcard that absorbs at least one
/// name is dropped from the vestigial list; one that matches nothing stays
/// reported. Concrete names are left untouched on both sides.
pub fn absorb_wildcards(undocumented: &mut Vec<String>, vestigial: &mut Vec<String>) {
    let mut kept = Vec::with_capacity(vestigial.len());
    for doc_param in vestigial.drain(..) {
        match wildcard_matcher(&doc_param) {
            Some(matcher) => {
                let before = undocumented.len();
                undocumented.retain(|name| !matcher.is_match(name));
                if undocumented.len() == before {
                    tracing::debug!("wildcard '{}' matched no source parameter", doc_param);
                    kept.push(doc_param);
                }
            }
            None => kept.push(doc_param),
        }
    }
    *vestigial = kept;
}

/// Parameter-level findings for one overlay present in both source and docs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParamFindings {
    pub overlay: String,
    pub undocumented: Vec<String>,
    pub vestigial: Vec<String>,
}

/// The complete outcome of the three top-level comparison passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub undocumented_overlays: Vec<String>,
    pub vestigial_docs: Vec<String>,
    pub params: Vec<ParamFindings>,
    pub missing_from_makefile: Vec<String>,
    pub vestigial_makefile: Vec<String>,
}

impl Reconciliation {
    pub fn is_clean(&self) -> bool {
        self.undocumented_overlays.is_empty()
            && self.vestigial_docs.is_empty()
            && self.params.is_empty()
            && self.missing_from_makefile.is_empty()
            && self.vestigial_makefile.is_empty()
    }

    pub fn finding_count(&self) -> usize {
        self.undocumented_overlays.len()
            + self.vestigial_docs.len()
            + self
                .params
                .iter()
                .map(|p| p.undocumented.len() + p.vestigial.len())
                .sum::<usize>()
            + self.missing_from_makefile.len()
            + self.vestigial_makefile.len()
    }
}

fn sorted_names(catalog: &Catalog) -> Vec<String> {
    sort_params(catalog.keys().cloned().collect())
}

/// Run the three comparison passes: overlay names source vs. docs,
/// per-overlay parameters, and overlay names source vs. build list.
///
/// Never aborts early; every independent problem surfaces in one run. The
/// build-list pass has no waiver mechanism, matching its role as a pure
/// completeness check.
pub fn reconcile(
    source: &Catalog,
    docs: &Catalog,
    makefile: Option<&[String]>,
    exclusions: &Exclusions,
) -> Reconciliation {
    let mut out = Reconciliation::default();

    let src_names = sorted_names(source);
    let doc_names = sorted_names(docs);
    let names = diff(&src_names, &doc_names);

    let missing_waived = sort_params(
        names
            .left_only
            .iter()
            .filter(|n| exclusions.waives_missing_overlay(n))
            .cloned()
            .collect(),
    );
    let vestigial_waived = sort_params(
        names
            .right_only
            .iter()
            .filter(|n| exclusions.waives_vestigial_overlay(n))
            .cloned()
            .collect(),
    );
    out.undocumented_overlays = apply_exclusions(&names.left_only, &missing_waived);
    out.vestigial_docs = apply_exclusions(&names.right_only, &vestigial_waived);

    for name in &names.both {
        let d = diff(&source[name], &docs[name]);
        let mut undocumented = d.left_only;
        let mut vestigial = d.right_only;
        absorb_wildcards(&mut undocumented, &mut vestigial);
        undocumented = apply_exclusions(&undocumented, &exclusions.missing_waivers(name));
        vestigial = apply_exclusions(&vestigial, &exclusions.vestigial_waivers(name));
        if exclusions.waives_missing_overlay(name) {
            undocumented.clear();
        }
        if exclusions.waives_vestigial_overlay(name) {
            vestigial.clear();
        }
        if !undocumented.is_empty() || !vestigial.is_empty() {
            out.params.push(ParamFindings {
                overlay: name.clone(),
                undocumented,
                vestigial,
            });
        }
    }

    if let Some(makefile) = makefile {
        let mut listed = makefile.to_vec();
        listed.sort_by(|a, b| param_cmp(a, b));
        let build = diff(&src_names, &listed);
        out.missing_from_makefile = build.left_only;
        out.vestigial_makefile = build.right_only;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_diff_partitions_inputs() {
        let left = v(&["a", "b", "d"]);
        let right = v(&["b", "c", "d", "e"]);
        let d = diff(&left, &right);
        assert_eq!(d.left_only, v(&["a"]));
        assert_eq!(d.both, v(&["b", "d"]));
        assert_eq!(d.right_only, v(&["c", "e"]));

        // left_only + both reconstructs left, right_only + both the right
        let mut rebuilt = d.left_only.clone();
        rebuilt.extend(d.both.clone());
        assert_eq!(sort_params(rebuilt), left);
        let mut rebuilt = d.right_only.clone();
        rebuilt.extend(d.both.clone());
        assert_eq!(sort_params(rebuilt), right);
    }

    #[test]
    fn test_diff_identical_inputs() {
        let x = v(&["alpha", "beta", "gamma"]);
        let d = diff(&x, &x);
        assert!(d.left_only.is_empty());
        assert!(d.right_only.is_empty());
        assert_eq!(d.both, x);
    }

    #[test]
    fn test_diff_empty_sides() {
        let x = v(&["a", "b"]);
        let d = diff(&x, &[]);
        assert_eq!(d.left_only, x);
        assert!(d.both.is_empty());
        assert!(d.right_only.is_empty());

        let d = diff(&[], &x);
        assert_eq!(d.right_only, x);
        assert!(d.both.is_empty());
    }

    #[test]
    fn test_diff_outputs_disjoint() {
        let left = v(&["a", "c", "e", "g"]);
        let right = v(&["b", "c", "f", "g"]);
        let d = diff(&left, &right);
        for name in &d.left_only {
            assert!(!d.both.contains(name));
            assert!(!d.right_only.contains(name));
        }
        for name in &d.right_only {
            assert!(!d.both.contains(name));
        }
    }

    #[test]
    fn test_param_cmp_case_insensitive_with_tiebreak() {
        assert_eq!(param_cmp("Foo", "foo"), Ordering::Less);
        assert_eq!(param_cmp("bar", "Foo"), Ordering::Less);
        assert_eq!(param_cmp("a", "a"), Ordering::Equal);
    }

    #[test]
    fn test_apply_exclusions_removes_waived_only() {
        let items = v(&["bar", "baz", "foo"]);
        let waived = v(&["baz"]);
        assert_eq!(apply_exclusions(&items, &waived), v(&["bar", "foo"]));
        // waiver for an absent name has no effect
        let waived = v(&["quux"]);
        assert_eq!(apply_exclusions(&items, &waived), items);
    }

    #[test]
    fn test_wildcard_matcher_digit_family() {
        let m = wildcard_matcher("addr<i>").expect("pattern");
        assert!(m.is_match("addr0"));
        assert!(m.is_match("addr1f"));
        assert!(!m.is_match("addrg"));
        assert!(!m.is_match("addr"));
    }

    #[test]
    fn test_wildcard_matcher_letter_family() {
        let m = wildcard_matcher("uart<a>").expect("pattern");
        assert!(m.is_match("uartb"));
        assert!(!m.is_match("uart0"));
        assert!(!m.is_match("uartbb"));
    }

    #[test]
    fn test_wildcard_matcher_range_pair() {
        let m = wildcard_matcher("chan<i>-<j>").expect("pattern");
        assert!(m.is_match("chan0-7"));
        assert!(m.is_match("chan1f-2e"));
        assert!(!m.is_match("chan0"));
    }

    #[test]
    fn test_wildcard_matcher_concrete_name() {
        assert!(wildcard_matcher("lm75addr").is_none());
    }

    #[test]
    fn test_wildcard_matcher_rejects_malformed_placeholder() {
        assert!(wildcard_matcher("addr<ii>").is_none());
        assert!(wildcard_matcher("addr<I>").is_none());
        assert!(wildcard_matcher("addr<").is_none());
    }

    #[test]
    fn test_absorb_wildcards_hex_family() {
        // addr<i> against addr0/addr1/addrg: the hex pair is absorbed,
        // addrg stays undocumented, and the wildcard drops from vestigial.
        let mut undocumented = v(&["addr0", "addr1", "addrg"]);
        let mut vestigial = v(&["addr<i>"]);
        absorb_wildcards(&mut undocumented, &mut vestigial);
        assert_eq!(undocumented, v(&["addrg"]));
        assert!(vestigial.is_empty());
    }

    #[test]
    fn test_absorb_wildcards_no_match_stays_vestigial() {
        let mut undocumented = v(&["gain"]);
        let mut vestigial = v(&["addr<i>"]);
        absorb_wildcards(&mut undocumented, &mut vestigial);
        assert_eq!(undocumented, v(&["gain"]));
        assert_eq!(vestigial, v(&["addr<i>"]));
    }

    #[test]
    fn test_absorb_wildcards_first_pattern_wins() {
        // Both patterns match addr0; the first absorbs it, so the second
        // sees nothing and stays vestigial.
        let mut undocumented = v(&["addr0"]);
        let mut vestigial = v(&["addr<i>", "addr<j>"]);
        absorb_wildcards(&mut undocumented, &mut vestigial);
        assert!(undocumented.is_empty());
        assert_eq!(vestigial, v(&["addr<j>"]));
    }

    #[test]
    fn test_absorb_wildcards_concrete_names_untouched() {
        let mut undocumented = v(&["addr0"]);
        let mut vestigial = v(&["addr0extra"]);
        absorb_wildcards(&mut undocumented, &mut vestigial);
        assert_eq!(undocumented, v(&["addr0"]));
        assert_eq!(vestigial, v(&["addr0extra"]));
    }

    fn catalog(entries: &[(&str, &[&str])]) -> Catalog {
        entries
            .iter()
            .map(|(name, params)| (name.to_string(), sort_params(v(params))))
            .collect()
    }

    #[test]
    fn test_reconcile_overlay_names() {
        // Source has foo and bar; docs describe foo and baz.
        let source = catalog(&[("foo", &[]), ("bar", &[])]);
        let docs = catalog(&[("foo", &[]), ("baz", &[])]);
        let r = reconcile(&source, &docs, None, &Exclusions::default());
        assert_eq!(r.undocumented_overlays, v(&["bar"]));
        assert_eq!(r.vestigial_docs, v(&["baz"]));
        assert!(!r.is_clean());
    }

    #[test]
    fn test_reconcile_param_level() {
        // foo declares x and y; only x is documented.
        let source = catalog(&[("foo", &["x", "y"])]);
        let docs = catalog(&[("foo", &["x"])]);
        let r = reconcile(&source, &docs, None, &Exclusions::default());
        assert_eq!(r.params.len(), 1);
        assert_eq!(r.params[0].overlay, "foo");
        assert_eq!(r.params[0].undocumented, v(&["y"]));
        assert!(r.params[0].vestigial.is_empty());
    }

    #[test]
    fn test_reconcile_makefile_pass() {
        // bar exists in source but not in the build list.
        let source = catalog(&[("bar", &[]), ("foo", &[])]);
        let docs = catalog(&[("bar", &[]), ("foo", &[])]);
        let listed = v(&["foo"]);
        let r = reconcile(&source, &docs, Some(&listed), &Exclusions::default());
        assert_eq!(r.missing_from_makefile, v(&["bar"]));
        assert!(r.vestigial_makefile.is_empty());
    }

    #[test]
    fn test_reconcile_deprecated_waives_vestigial_doc() {
        // A docs-only overlay waived via the whole-overlay marker.
        let source = Catalog::new();
        let docs = catalog(&[("olddev", &[])]);
        let mut exclusions = Exclusions::default();
        exclusions.waive_overlay("olddev");
        let r = reconcile(&source, &docs, None, &exclusions);
        assert!(r.vestigial_docs.is_empty());
        assert!(r.is_clean());
    }

    #[test]
    fn test_reconcile_param_waiver_does_not_hide_overlay() {
        // A parameter-level waiver must not suppress a whole-overlay finding.
        let source = catalog(&[("foo", &[])]);
        let docs = Catalog::new();
        let mut exclusions = Exclusions::default();
        exclusions.waive_param_missing("foo", "x");
        let r = reconcile(&source, &docs, None, &exclusions);
        assert_eq!(r.undocumented_overlays, v(&["foo"]));
    }

    #[test]
    fn test_reconcile_exclusions_applied_after_diff() {
        let source = catalog(&[("foo", &["x", "y"])]);
        let docs = catalog(&[("foo", &["x"])]);
        let mut exclusions = Exclusions::default();
        exclusions.waive_param_missing("foo", "y");
        let r = reconcile(&source, &docs, None, &exclusions);
        assert!(r.params.is_empty());
        assert!(r.is_clean());
    }

    #[test]
    fn test_reconcile_wildcard_then_exclusion() {
        let source = catalog(&[("sensor", &["addr0", "addr1", "addrg", "gain"])]);
        let docs = catalog(&[("sensor", &["addr<i>"])]);
        let mut exclusions = Exclusions::default();
        exclusions.waive_param_missing("sensor", "gain");
        let r = reconcile(&source, &docs, None, &exclusions);
        assert_eq!(r.params.len(), 1);
        assert_eq!(r.params[0].undocumented, v(&["addrg"]));
        assert!(r.params[0].vestigial.is_empty());
    }

    #[test]
    fn test_reconcile_duplicate_makefile_entry_surfaces() {
        let source = catalog(&[("foo", &[])]);
        let docs = catalog(&[("foo", &[])]);
        let listed = v(&["foo", "foo"]);
        let r = reconcile(&source, &docs, Some(&listed), &Exclusions::default());
        assert_eq!(r.vestigial_makefile, v(&["foo"]));
    }
}
