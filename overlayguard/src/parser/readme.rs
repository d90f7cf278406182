//! Documentation catalog parser.
//!
//! The README is a rigid layout: entries of `Name:`/`Info:`/`Load:`/
//! `Params:` lines separated by two blank lines, names in strictly
//! ascending order, labels at column 0, parameters at column 8 with
//! descriptions aligned to a per-entry column. The parser is a line-by-line
//! state machine (idle / inside an entry) that records every layout
//! violation and keeps going, so one run reports every problem in the file.

use std::cmp::Ordering;

use crate::core::BASE_DTB;
use crate::parser::{is_doc_param, is_overlay_name};
use crate::reconcile::{param_cmp, sort_params, Catalog};
use crate::report::Violation;

const PARAM_COLUMN: usize = 8;
const MAX_COLUMNS: usize = 80;
const LABELS: [&str; 4] = ["Name", "Info", "Load", "Params"];

/// Parsed documentation: overlay name to sorted parameter set, plus the
/// overlays waived via `Load: <Deprecated>` and the layout violations.
#[derive(Debug, Clone, Default)]
pub struct ReadmeCatalog {
    pub catalog: Catalog,
    pub deprecated: Vec<String>,
    pub violations: Vec<Violation>,
}

/// Parse the overlay README. Best-effort: the catalog holds everything
/// that parsed, and `violations` holds everything that did not.
pub fn parse_readme(text: &str) -> ReadmeCatalog {
    let mut parser = ReadmeParser::default();
    for (idx, line) in text.lines().enumerate() {
        parser.feed(idx + 1, line);
    }
    parser.finish()
}

/// One entry being collected between its `Name:` line and the two-blank
/// separator that commits it.
#[derive(Debug)]
struct Entry {
    name: String,
    name_line: usize,
    params: Vec<String>,
    params_seen: bool,
    params_expected: bool,
    collecting: bool,
    desc_column: Option<usize>,
    deprecated: bool,
}

impl Entry {
    fn new(name: String, name_line: usize) -> Self {
        Self {
            name,
            name_line,
            params: Vec::new(),
            params_seen: false,
            params_expected: false,
            collecting: false,
            desc_column: None,
            deprecated: false,
        }
    }
}

#[derive(Debug, Default)]
struct ReadmeParser {
    catalog: Catalog,
    deprecated: Vec<String>,
    violations: Vec<Violation>,
    entry: Option<Entry>,
    last_name: Option<String>,
    blank_run: usize,
}

impl ReadmeParser {
    fn error(&mut self, lineno: usize, message: impl Into<String>) {
        self.violations.push(Violation::at(lineno, message));
    }

    fn feed(&mut self, lineno: usize, raw: &str) {
        if raw.trim_end() != raw {
            self.error(lineno, "trailing whitespace");
        }
        let line = raw.trim_end();

        if line.is_empty() {
            self.blank_run += 1;
            if self.blank_run == 2 && self.entry.is_some() {
                tracing::debug!("entry closed by blank separator at line {}", lineno);
                self.commit_entry();
            }
            return;
        }
        self.blank_run = 0;

        if line.contains('\t') {
            self.error(lineno, "tab character");
        }
        let width = line.chars().count();
        if width > MAX_COLUMNS && !is_long_token_continuation(line) {
            self.error(lineno, format!("line exceeds {} columns", MAX_COLUMNS));
        }

        if let Some(first) = line.chars().next() {
            if first != ' ' {
                self.feed_label_line(lineno, line);
                return;
            }
        }
        self.feed_indented_line(lineno, line);
    }

    fn feed_label_line(&mut self, lineno: usize, line: &str) {
        let Some((label, rest)) = line.split_once(':') else {
            if self.entry.is_some() {
                self.error(lineno, "unexpected text inside an entry");
            }
            return;
        };
        if !label.chars().all(|c| c.is_ascii_alphanumeric()) || label.is_empty() {
            if self.entry.is_some() {
                self.error(lineno, "unexpected text inside an entry");
            }
            return;
        }
        if !LABELS.contains(&label) {
            self.error(lineno, format!("bad label '{}:'", label));
            return;
        }
        match label {
            "Name" => self.on_name(lineno, rest),
            "Info" => self.on_info(lineno),
            "Load" => self.on_load(lineno, rest),
            "Params" => self.on_params(lineno, line, rest),
            _ => unreachable!(),
        }
    }

    fn on_name(&mut self, lineno: usize, rest: &str) {
        if let Some(entry) = &self.entry {
            let message = format!(
                "entry '{}' not closed by a double blank line before the next entry",
                entry.name
            );
            self.error(lineno, message);
            self.commit_entry();
        }

        let name = match rest.strip_prefix("   ") {
            Some(name) if !name.starts_with(' ') && !name.is_empty() => name.to_string(),
            _ => {
                self.error(lineno, "expected exactly three spaces after 'Name:'");
                rest.trim_start().to_string()
            }
        };
        if name.is_empty() {
            self.error(lineno, "missing overlay name");
            return;
        }
        if name != BASE_DTB && !is_overlay_name(&name) {
            self.error(lineno, format!("invalid overlay name '{}'", name));
        }
        let order_message = match &self.last_name {
            Some(prev) if !entry_name_lt(prev, &name) => Some(format!(
                "overlay '{}' is out of order after '{}'",
                name, prev
            )),
            _ => None,
        };
        if let Some(message) = order_message {
            self.error(lineno, message);
        }
        self.last_name = Some(name.clone());
        self.entry = Some(Entry::new(name, lineno));
    }

    fn on_info(&mut self, lineno: usize) {
        if self.entry.is_none() {
            self.error(lineno, "'Info:' outside an entry");
        }
    }

    fn on_load(&mut self, lineno: usize, rest: &str) {
        let Some(entry) = &mut self.entry else {
            self.error(lineno, "'Load:' outside an entry");
            return;
        };
        let value = rest.trim_start();
        if value == "<Deprecated>" {
            entry.deprecated = true;
            self.deprecated.push(entry.name.clone());
            self.commit_entry();
            return;
        }
        if entry.name == BASE_DTB && value == "<loaded automatically>" {
            return;
        }
        match parse_load_example(value) {
            Some((name, has_param)) => {
                if has_param {
                    entry.params_expected = true;
                }
                if name != entry.name {
                    let message =
                        format!("Load example names '{}', expected '{}'", name, entry.name);
                    self.error(lineno, message);
                }
            }
            None => self.error(lineno, format!("malformed Load example '{}'", value)),
        }
    }

    fn on_params(&mut self, lineno: usize, line: &str, rest: &str) {
        let Some(entry) = &mut self.entry else {
            self.error(lineno, "'Params:' outside an entry");
            return;
        };
        if entry.params_seen {
            self.error(lineno, "duplicate 'Params:' label");
            return;
        }
        entry.params_seen = true;
        entry.collecting = true;

        if rest.is_empty() {
            return;
        }
        let value = rest.trim_start();
        if value == "<None>" {
            let expected = entry.params_expected;
            entry.collecting = false;
            if expected {
                self.error(
                    lineno,
                    "Load example shows a parameter but Params is '<None>'",
                );
            }
            return;
        }
        // First parameter sits on the label line; its description position
        // establishes the column for the whole entry.
        let token_start = line.len() - value.len();
        self.take_param(lineno, line, token_start);
    }

    fn feed_indented_line(&mut self, lineno: usize, line: &str) {
        let indent = line.len() - line.trim_start().len();
        let Some(entry) = &mut self.entry else {
            // Prose outside any entry only gets the whitespace checks.
            return;
        };
        if !entry.collecting {
            return;
        }

        if indent == PARAM_COLUMN {
            let body = &line[PARAM_COLUMN..];
            let token_end = body.find(' ').unwrap_or(body.len());
            let token = &body[..token_end];
            let after = &body[token_end..];
            let gap = after.len() - after.trim_start().len();
            let has_desc = !after.trim_start().is_empty();

            // A token ending in a colon, or prose separated by a single
            // space that does not land on the description column, is a
            // trailing note: parameter collection ends without error.
            let aligned = entry.desc_column == Some(PARAM_COLUMN + token_end + gap);
            if token.ends_with(':') || (has_desc && gap == 1 && !aligned) {
                tracing::debug!("parameter list for '{}' ends at line {}", entry.name, lineno);
                entry.collecting = false;
                return;
            }
            self.take_param(lineno, line, PARAM_COLUMN);
            return;
        }

        if indent < PARAM_COLUMN {
            self.error(
                lineno,
                format!("indented less than the parameter column ({})", PARAM_COLUMN),
            );
            return;
        }
        match entry.desc_column {
            Some(column) if indent >= column => {} // description wrap
            Some(column) => self.error(
                lineno,
                format!(
                    "indentation {} falls between the parameter column and the description column {}",
                    indent, column
                ),
            ),
            None => self.error(lineno, format!("unexpected indentation {}", indent)),
        }
    }

    /// Validate and record the parameter token starting at `token_start`,
    /// and check or establish the description column.
    fn take_param(&mut self, lineno: usize, line: &str, token_start: usize) {
        let body = &line[token_start..];
        let token_end = body.find(' ').unwrap_or(body.len());
        let token = &body[..token_end];
        let after = &body[token_end..];
        let gap = after.len() - after.trim_start().len();
        let has_desc = !after.trim_start().is_empty();

        if !is_doc_param(token) {
            self.error(lineno, format!("invalid parameter name '{}'", token));
            return;
        }
        let entry = self.entry.as_mut().expect("take_param requires an entry");
        entry.params.push(token.to_string());

        if has_desc {
            let column = token_start + token_end + gap;
            match entry.desc_column {
                None => entry.desc_column = Some(column),
                Some(expected) if expected != column => {
                    self.error(
                        lineno,
                        format!(
                            "description starts at column {}, expected {}",
                            column, expected
                        ),
                    );
                }
                _ => {}
            }
        }
    }

    fn commit_entry(&mut self) {
        let Some(entry) = self.entry.take() else {
            return;
        };
        if !entry.params_seen && !entry.deprecated {
            self.violations.push(Violation::at(
                entry.name_line,
                format!("entry '{}' has no Params section", entry.name),
            ));
        }
        self.catalog.insert(entry.name, sort_params(entry.params));
    }

    fn finish(mut self) -> ReadmeCatalog {
        self.commit_entry();
        ReadmeCatalog {
            catalog: self.catalog,
            deprecated: self.deprecated,
            violations: self.violations,
        }
    }
}

/// Entry ordering: the base DTB sentinel sorts before every real overlay,
/// everything else is the shared comparator.
fn entry_name_lt(a: &str, b: &str) -> bool {
    match (a == BASE_DTB, b == BASE_DTB) {
        (true, true) => false,
        (true, false) => true,
        (false, true) => false,
        (false, false) => param_cmp(a, b) == Ordering::Less,
    }
}

/// The canonical load invocation: `dtoverlay=<name>`, optionally followed
/// by `,<param>`, `,<param>=<val>`, or `,<param>[=<val>]`. Returns the
/// named overlay and whether a parameter placeholder is present.
fn parse_load_example(value: &str) -> Option<(&str, bool)> {
    let rest = value.strip_prefix("dtoverlay=")?;
    let (name, tail) = match rest.split_once(',') {
        Some((name, tail)) => (name, Some(tail)),
        None => (rest, None),
    };
    if !is_overlay_name(name) {
        return None;
    }
    match tail {
        None => Some((name, false)),
        Some("<param>") | Some("<param>=<val>") | Some("<param>[=<val>]") => Some((name, true)),
        Some(_) => None,
    }
}

/// Lines over the column limit are tolerated when they are one indented
/// unbreakable token.
fn is_long_token_continuation(line: &str) -> bool {
    line.starts_with(' ') && !line.trim_start().contains(' ')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(catalog: &ReadmeCatalog, name: &str) -> Vec<String> {
        catalog.catalog.get(name).cloned().unwrap_or_default()
    }

    const CLEAN: &str = "\
Name:   <The base DTB>
Info:   The always-loaded base hardware description
Load:   <loaded automatically>
Params: audio                   Enable the onboard audio interface
        spi                     Enable the primary SPI bus


Name:   disable-bt
Info:   Disable onboard Bluetooth
Load:   dtoverlay=disable-bt
Params: <None>


Name:   i2c-sensor
Info:   Adds support for a range of I2C sensors
Load:   dtoverlay=i2c-sensor,<param>=<val>
Params: addr<i>                 Hex address of an attached sensor
        bmp280                  Select the BMP280 pressure sensor
";

    #[test]
    fn test_parse_clean_catalog() {
        let result = parse_readme(CLEAN);
        assert!(result.violations.is_empty(), "{:?}", result.violations);
        assert_eq!(result.catalog.len(), 3);
        assert_eq!(params(&result, BASE_DTB), vec!["audio", "spi"]);
        assert!(params(&result, "disable-bt").is_empty());
        assert_eq!(params(&result, "i2c-sensor"), vec!["addr<i>", "bmp280"]);
        assert!(result.deprecated.is_empty());
    }

    #[test]
    fn test_two_blank_lines_close_exactly_one_entry() {
        let text = "\
Name:   alpha
Load:   dtoverlay=alpha
Params: <None>


Name:   beta
Load:   dtoverlay=beta
Params: <None>
";
        let result = parse_readme(text);
        assert!(result.violations.is_empty(), "{:?}", result.violations);
        assert_eq!(result.catalog.len(), 2);
    }

    #[test]
    fn test_single_blank_line_is_insignificant() {
        let text = "\
Name:   alpha
Load:   dtoverlay=alpha,<param>=<val>

Params: gain                    Input gain in dB
";
        let result = parse_readme(text);
        assert!(result.violations.is_empty(), "{:?}", result.violations);
        assert_eq!(params(&result, "alpha"), vec!["gain"]);
    }

    #[test]
    fn test_entry_without_params_is_an_error() {
        let text = "Name:   alpha\nInfo:   No params label here\n";
        let result = parse_readme(text);
        assert_eq!(result.violations.len(), 1);
        assert!(result.violations[0].message.contains("no Params section"));
        // The entry still lands in the catalog with an empty set.
        assert!(result.catalog.contains_key("alpha"));
    }

    #[test]
    fn test_name_padding_must_be_three_spaces() {
        let result = parse_readme("Name:  short\nParams: <None>\n");
        assert!(result
            .violations
            .iter()
            .any(|v| v.message.contains("three spaces")));
        assert!(result.catalog.contains_key("short"));

        let result = parse_readme("Name:    wide\nParams: <None>\n");
        assert!(result
            .violations
            .iter()
            .any(|v| v.message.contains("three spaces")));
    }

    #[test]
    fn test_names_must_ascend() {
        let text = "\
Name:   beta
Params: <None>


Name:   alpha
Params: <None>
";
        let result = parse_readme(text);
        assert!(result
            .violations
            .iter()
            .any(|v| v.message.contains("out of order")));
    }

    #[test]
    fn test_base_dtb_sorts_first() {
        let text = "\
Name:   <The base DTB>
Load:   <loaded automatically>
Params: <None>


Name:   alpha
Params: <None>
";
        let result = parse_readme(text);
        assert!(result.violations.is_empty(), "{:?}", result.violations);
    }

    #[test]
    fn test_base_dtb_after_real_overlay_is_out_of_order() {
        let text = "\
Name:   alpha
Params: <None>


Name:   <The base DTB>
Load:   <loaded automatically>
Params: <None>
";
        let result = parse_readme(text);
        assert!(result
            .violations
            .iter()
            .any(|v| v.message.contains("out of order")));
    }

    #[test]
    fn test_bad_label_reported() {
        let result = parse_readme("Name:   alpha\nNote:   hm\nParams: <None>\n");
        assert!(result
            .violations
            .iter()
            .any(|v| v.message.contains("bad label 'Note:'")));
    }

    #[test]
    fn test_deprecated_closes_entry_and_waives() {
        let text = "\
Name:   olddev
Info:   Superseded by newdev
Load:   <Deprecated>


Name:   other
Params: <None>
";
        let result = parse_readme(text);
        assert!(result.violations.is_empty(), "{:?}", result.violations);
        assert_eq!(result.deprecated, vec!["olddev"]);
        assert!(result.catalog.contains_key("olddev"));
    }

    #[test]
    fn test_load_name_must_match_entry() {
        let result = parse_readme("Name:   alpha\nLoad:   dtoverlay=beta\nParams: <None>\n");
        assert!(result
            .violations
            .iter()
            .any(|v| v.message.contains("names 'beta'")));
    }

    #[test]
    fn test_malformed_load_example() {
        let result = parse_readme("Name:   alpha\nLoad:   modprobe alpha\nParams: <None>\n");
        assert!(result
            .violations
            .iter()
            .any(|v| v.message.contains("malformed Load example")));
    }

    #[test]
    fn test_none_with_expected_params_is_mismatch() {
        let text = "Name:   alpha\nLoad:   dtoverlay=alpha,<param>=<val>\nParams: <None>\n";
        let result = parse_readme(text);
        assert!(result
            .violations
            .iter()
            .any(|v| v.message.contains("'<None>'")));
    }

    #[test]
    fn test_trailing_whitespace_and_tabs() {
        let result = parse_readme("Name:   alpha \nInfo:\tbad\nParams: <None>\n");
        assert!(result
            .violations
            .iter()
            .any(|v| v.message.contains("trailing whitespace")));
        assert!(result
            .violations
            .iter()
            .any(|v| v.message.contains("tab character")));
    }

    #[test]
    fn test_line_length_limit() {
        let long = format!("Name:   alpha\nInfo:   {}\nParams: <None>\n", "x ".repeat(60));
        let result = parse_readme(&long);
        assert!(result
            .violations
            .iter()
            .any(|v| v.message.contains("exceeds 80 columns")));

        // A single indented unbreakable token is exempt.
        let token = format!(
            "Name:   alpha\nParams: gain                    See notes\n        {}\n",
            "a".repeat(90)
        );
        let result = parse_readme(&token);
        assert!(!result
            .violations
            .iter()
            .any(|v| v.message.contains("exceeds 80 columns")));
    }

    #[test]
    fn test_description_column_mismatch() {
        let text = "\
Name:   alpha
Load:   dtoverlay=alpha,<param>=<val>
Params: first                   First parameter
        second                      Misaligned description
";
        let result = parse_readme(text);
        assert!(result
            .violations
            .iter()
            .any(|v| v.message.contains("expected 32")));
    }

    #[test]
    fn test_trailing_note_ends_collection_silently() {
        let text = "\
Name:   alpha
Load:   dtoverlay=alpha,<param>=<val>
Params: first                   First parameter
        Note: the parameters above are mutually exclusive
";
        let result = parse_readme(text);
        assert!(result.violations.is_empty(), "{:?}", result.violations);
        assert_eq!(params(&result, "alpha"), vec!["first"]);
    }

    #[test]
    fn test_single_space_prose_ends_collection() {
        let text = "\
Name:   alpha
Load:   dtoverlay=alpha,<param>=<val>
Params: first                   First parameter
        and some freeform prose follows here
";
        let result = parse_readme(text);
        assert!(result.violations.is_empty(), "{:?}", result.violations);
        assert_eq!(params(&result, "alpha"), vec!["first"]);
    }

    #[test]
    fn test_indent_between_columns_is_error() {
        let text = "\
Name:   alpha
Load:   dtoverlay=alpha,<param>=<val>
Params: first                   First parameter
            stray
";
        let result = parse_readme(text);
        assert!(result
            .violations
            .iter()
            .any(|v| v.message.contains("falls between")));
    }

    #[test]
    fn test_description_wrap_is_fine() {
        let text = "\
Name:   alpha
Load:   dtoverlay=alpha,<param>=<val>
Params: first                   A long description that wraps onto the
                                next line at the description column
";
        let result = parse_readme(text);
        assert!(result.violations.is_empty(), "{:?}", result.violations);
        assert_eq!(params(&result, "alpha"), vec!["first"]);
    }

    #[test]
    fn test_entry_not_closed_before_next_name() {
        let text = "\
Name:   alpha
Params: <None>

Name:   beta
Params: <None>
";
        let result = parse_readme(text);
        assert!(result
            .violations
            .iter()
            .any(|v| v.message.contains("not closed")));
        assert_eq!(result.catalog.len(), 2);
    }

    #[test]
    fn test_params_sorted_case_insensitively() {
        let text = "\
Name:   alpha
Load:   dtoverlay=alpha,<param>=<val>
Params: Zeta                    Uppercase sorts with its letter
        beta                    Lowercase
";
        let result = parse_readme(text);
        assert_eq!(params(&result, "alpha"), vec!["beta", "Zeta"]);
    }

    #[test]
    fn test_preamble_prose_is_ignored() {
        let text = "\
This file documents the overlay catalog for the platform


Name:   alpha
Params: <None>
";
        let result = parse_readme(text);
        assert!(result.violations.is_empty(), "{:?}", result.violations);
        assert_eq!(result.catalog.len(), 1);
    }
}
