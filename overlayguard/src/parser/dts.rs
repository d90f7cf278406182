//! Parameter extraction from compiled device tree dumps.
//!
//! The input is the textual form of an already-compiled tree: nested named
//! blocks with `key = value;` / `key;` property lines. Parameters live in
//! the `__overrides__` node; compiler bookkeeping (`__symbols__`,
//! `__fixups__`, `__local_fixups__`) trails the real content and ends the
//! scan. Overlay dumps additionally carry a root `compatible` property
//! naming the hardware family they support.

use crate::parser::is_param_name;
use crate::reconcile::sort_params;
use crate::report::Violation;

const OVERRIDES_NODE: &str = "__overrides__ {";
const FOOTER_NODES: [&str; 3] = ["__symbols__", "__fixups__", "__local_fixups__"];

/// Hardware family strings an overlay may declare.
const ACCEPTED_FAMILIES: [&str; 3] = ["brcm,bcm2835", "brcm,bcm2711", "brcm,bcm2712"];
/// The newest family; overlays compatible only with it are flagged.
const RESTRICTED_FAMILY: &str = "brcm,bcm2712";

/// Whether the dump is the base description or an overlay. Only overlays
/// carry the family check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtsKind {
    Base,
    Overlay,
}

/// What one compiled dump contributes to the source catalog.
#[derive(Debug, Clone, Default)]
pub struct DtsInfo {
    /// Declared override parameters, sorted.
    pub params: Vec<String>,
    /// True when the overlay is compatible only with the newest family.
    pub restricted: bool,
    pub violations: Vec<Violation>,
}

/// Scan one compiled dump for its override parameters and family flag.
pub fn parse_dts(text: &str, kind: DtsKind) -> DtsInfo {
    let mut params = Vec::new();
    let mut restricted = false;
    let mut violations = Vec::new();
    let mut in_overrides = false;
    let mut depth: usize = 0;

    for (idx, raw) in text.lines().enumerate() {
        let lineno = idx + 1;
        let line = raw.trim();

        if FOOTER_NODES.iter().any(|node| line.starts_with(node)) {
            tracing::debug!("stopping at compiler footer on line {}", lineno);
            break;
        }

        if in_overrides {
            match override_decl(line) {
                Some(name) => {
                    if is_param_name(name) {
                        params.push(name.to_string());
                    } else {
                        violations.push(Violation::at(
                            lineno,
                            format!("invalid parameter name '{}'", name),
                        ));
                    }
                    continue;
                }
                None => in_overrides = false,
            }
        }

        if line == OVERRIDES_NODE {
            in_overrides = true;
            depth += 1;
            continue;
        }

        if kind == DtsKind::Overlay && depth == 1 {
            if let Some(value) = line.strip_prefix("compatible = ") {
                check_compatible(value, lineno, &mut restricted, &mut violations);
            }
        }

        depth += line.matches('{').count();
        depth = depth.saturating_sub(line.matches('}').count());
    }

    DtsInfo {
        params: sort_params(params),
        restricted,
        violations,
    }
}

/// A parameter declaration inside the overrides node: `name = ...;` or
/// `name;`. Anything else ends the block.
fn override_decl(line: &str) -> Option<&str> {
    let body = line.strip_suffix(';')?;
    let name = match body.split_once(" = ") {
        Some((name, _)) => name,
        None => body,
    };
    if name.is_empty() || name.contains([' ', '{', '}', '"']) {
        return None;
    }
    Some(name)
}

fn check_compatible(
    value: &str,
    lineno: usize,
    restricted: &mut bool,
    violations: &mut Vec<Violation>,
) {
    let Some(value) = value.strip_suffix(';') else {
        violations.push(Violation::at(lineno, "malformed compatible property"));
        return;
    };
    for item in value.split(", ") {
        let family = item.trim_matches('"');
        if !ACCEPTED_FAMILIES.contains(&family) {
            violations.push(Violation::at(
                lineno,
                format!("unknown hardware family '{}'", family),
            ));
        } else if family == RESTRICTED_FAMILY {
            *restricted = true;
        }
    }
}
