//! Permanent waiver tables for known, accepted catalog divergence.
//!
//! The exclusion file is line-oriented: `=name` opens an overlay section,
//! `-param` waives a missing-documentation finding, `+param` waives a
//! vestigial-documentation finding. The pseudo-parameter `*` waives the
//! whole overlay in that table; `Load: <Deprecated>` entries in the
//! documentation are recorded the same way. Tables are loaded once and are
//! read-only afterward; filtering happens after diffing, never by removing
//! entries from the primary data first.

use std::collections::{BTreeMap, BTreeSet};

use crate::parser::{is_overlay_name, is_param_name};
use crate::report::Violation;

/// Waives every parameter of an overlay, and the overlay itself at the
/// whole-overlay comparison level.
pub const WAIVE_ALL: &str = "*";

/// The two waiver tables: parameters allowed to be missing from the
/// documentation, and documented parameters allowed to be gone from source.
#[derive(Debug, Clone, Default)]
pub struct Exclusions {
    missing: BTreeMap<String, BTreeSet<String>>,
    vestigial: BTreeMap<String, BTreeSet<String>>,
}

impl Exclusions {
    /// Parse the exclusion file. Malformed records are reported and
    /// skipped; the tables keep everything that did parse.
    pub fn parse(text: &str) -> (Self, Vec<Violation>) {
        let mut tables = Exclusions::default();
        let mut violations = Vec::new();
        let mut current: Option<String> = None;

        for (idx, raw) in text.lines().enumerate() {
            let lineno = idx + 1;
            let line = raw.trim_end();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(name) = line.strip_prefix('=') {
                if !is_overlay_name(name) {
                    violations.push(Violation::at(
                        lineno,
                        format!("invalid overlay name '{}'", name),
                    ));
                }
                current = Some(name.to_string());
                continue;
            }
            let (table, param) = match (line.strip_prefix('-'), line.strip_prefix('+')) {
                (Some(param), _) => (&mut tables.missing, param),
                (_, Some(param)) => (&mut tables.vestigial, param),
                _ => {
                    violations.push(Violation::at(
                        lineno,
                        format!("unrecognized record '{}'", line),
                    ));
                    continue;
                }
            };
            let Some(overlay) = &current else {
                violations.push(Violation::at(
                    lineno,
                    format!("waiver '{}' before any '=name' section", line),
                ));
                continue;
            };
            if param != WAIVE_ALL && !is_param_name(param) {
                violations.push(Violation::at(
                    lineno,
                    format!("invalid parameter name '{}'", param),
                ));
                continue;
            }
            table
                .entry(overlay.clone())
                .or_default()
                .insert(param.to_string());
        }

        (tables, violations)
    }

    /// Waive the overlay entirely in both tables (the `<Deprecated>` case).
    pub fn waive_overlay(&mut self, overlay: &str) {
        self.missing
            .entry(overlay.to_string())
            .or_default()
            .insert(WAIVE_ALL.to_string());
        self.vestigial
            .entry(overlay.to_string())
            .or_default()
            .insert(WAIVE_ALL.to_string());
    }

    pub fn waive_param_missing(&mut self, overlay: &str, param: &str) {
        self.missing
            .entry(overlay.to_string())
            .or_default()
            .insert(param.to_string());
    }

    pub fn waive_param_vestigial(&mut self, overlay: &str, param: &str) {
        self.vestigial
            .entry(overlay.to_string())
            .or_default()
            .insert(param.to_string());
    }

    /// Sorted missing-waivers for one overlay, ready for `apply_exclusions`.
    pub fn missing_waivers(&self, overlay: &str) -> Vec<String> {
        waivers_of(&self.missing, overlay)
    }

    /// Sorted vestigial-waivers for one overlay.
    pub fn vestigial_waivers(&self, overlay: &str) -> Vec<String> {
        waivers_of(&self.vestigial, overlay)
    }

    pub fn waives_missing_overlay(&self, overlay: &str) -> bool {
        waives_whole(&self.missing, overlay)
    }

    pub fn waives_vestigial_overlay(&self, overlay: &str) -> bool {
        waives_whole(&self.vestigial, overlay)
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.vestigial.is_empty()
    }
}

fn waivers_of(table: &BTreeMap<String, BTreeSet<String>>, overlay: &str) -> Vec<String> {
    table
        .get(overlay)
        .map(|set| crate::reconcile::sort_params(set.iter().cloned().collect()))
        .unwrap_or_default()
}

fn waives_whole(table: &BTreeMap<String, BTreeSet<String>>, overlay: &str) -> bool {
    table
        .get(overlay)
        .is_some_and(|set| set.contains(WAIVE_ALL))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sections_and_waivers() {
        let text = "# waivers\n=i2c-sensor\n-jc42\n+sht3x\n=uart2\n-*\n";
        let (tables, violations) = Exclusions::parse(text);
        assert!(violations.is_empty());
        assert_eq!(tables.missing_waivers("i2c-sensor"), vec!["jc42"]);
        assert_eq!(tables.vestigial_waivers("i2c-sensor"), vec!["sht3x"]);
        assert!(tables.waives_missing_overlay("uart2"));
        assert!(!tables.waives_vestigial_overlay("uart2"));
    }

    #[test]
    fn test_parse_orphan_waiver_is_violation() {
        let (tables, violations) = Exclusions::parse("-stray\n");
        assert!(tables.is_empty());
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("before any"));
        assert_eq!(violations[0].line, Some(1));
    }

    #[test]
    fn test_parse_unrecognized_record() {
        let (_, violations) = Exclusions::parse("=foo\nwat\n");
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("unrecognized"));
    }

    #[test]
    fn test_parse_bad_names_reported() {
        let (_, violations) = Exclusions::parse("=-bad\n-ok_param\n-bad param\n");
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn test_waive_overlay_hits_both_tables() {
        let mut tables = Exclusions::default();
        tables.waive_overlay("olddev");
        assert!(tables.waives_missing_overlay("olddev"));
        assert!(tables.waives_vestigial_overlay("olddev"));
    }
}
