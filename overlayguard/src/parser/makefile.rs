//! Overlay build-list parser.
//!
//! The Makefile names every overlay either on its own line
//! (`dtbo-y += name.dtbo`) or inside a backslash-continued block
//! (`dtbo-all += \` followed by tab-indented `name.dtbo \` lines). Names
//! must be strictly ascending; trailing whitespace is an error anywhere.

use std::cmp::Ordering;

use crate::core::BASE_DTB;
use crate::parser::is_overlay_name;
use crate::reconcile::param_cmp;
use crate::report::Violation;

const SINGLE_MARKER: &str = "dtbo-y += ";
const BLOCK_MARKER: &str = "dtbo-all += \\";
const DTBO_EXT: &str = ".dtbo";

/// The ordered build list. The base DTB sentinel is always the implicit
/// first entry; it has no Makefile line of its own.
#[derive(Debug, Clone, Default)]
pub struct MakefileList {
    pub names: Vec<String>,
    pub violations: Vec<Violation>,
}

/// Parse the overlay Makefile. Unrecognized lines (comments, other
/// assignments) are ignored; recognized entries are checked and collected
/// in file order. No deduplication happens here; repeats surface as
/// conflicting comparison results downstream.
pub fn parse_makefile(text: &str) -> MakefileList {
    let mut names = vec![BASE_DTB.to_string()];
    let mut violations = Vec::new();
    let mut last: Option<String> = None;
    let mut in_block = false;

    for (idx, raw) in text.lines().enumerate() {
        let lineno = idx + 1;
        if raw.trim_end() != raw {
            violations.push(Violation::at(lineno, "trailing whitespace"));
        }
        let line = raw.trim_end();

        if in_block {
            if let Some(body) = line.strip_prefix('\t') {
                let (stem, continued) = match body.strip_suffix(" \\") {
                    Some(stem) => (stem, true),
                    None => (body, false),
                };
                in_block = continued;
                take_name(stem, lineno, &mut names, &mut last, &mut violations);
                continue;
            }
            violations.push(Violation::at(
                lineno,
                "expected a tab-indented continuation line",
            ));
            in_block = false;
            // fall through; the line may still be a recognized form
        }

        if line == BLOCK_MARKER {
            in_block = true;
        } else if let Some(stem) = line.strip_prefix(SINGLE_MARKER) {
            take_name(stem, lineno, &mut names, &mut last, &mut violations);
        }
    }

    if in_block {
        violations.push(Violation::general(
            "build list ends inside a continuation block",
        ));
    }

    MakefileList { names, violations }
}

fn take_name(
    stem: &str,
    lineno: usize,
    names: &mut Vec<String>,
    last: &mut Option<String>,
    violations: &mut Vec<Violation>,
) {
    let Some(name) = stem.strip_suffix(DTBO_EXT) else {
        violations.push(Violation::at(
            lineno,
            format!("expected '{}' suffix on '{}'", DTBO_EXT, stem),
        ));
        return;
    };
    if !is_overlay_name(name) {
        violations.push(Violation::at(lineno, format!("invalid overlay name '{}'", name)));
        return;
    }
    if let Some(prev) = last {
        if param_cmp(prev, name) != Ordering::Less {
            violations.push(Violation::at(
                lineno,
                format!("overlay '{}' is out of order after '{}'", name, prev),
            ));
        }
    }
    *last = Some(name.to_string());
    names.push(name.to_string());
}
