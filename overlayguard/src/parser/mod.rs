//! Parsers for the three catalog inputs: the documentation README, the
//! overlay Makefile, and compiled device tree dumps.

pub mod dts;
pub mod makefile;
pub mod readme;

// Re-export for convenience
pub use dts::{parse_dts, DtsInfo, DtsKind};
pub use makefile::{parse_makefile, MakefileList};
pub use readme::{parse_readme, ReadmeCatalog};

/// Overlay identifier grammar: alphanumerics, hyphen, underscore, starting
/// with an alphanumeric.
pub fn is_overlay_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Plain parameter grammar, as declared in source overrides and the
/// Makefile.
pub fn is_param_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Documentation parameter grammar: the plain grammar extended with `<c>`
/// wildcard placeholders (single lowercase letter), which also covers
/// `<x>-<y>` range pairs.
pub fn is_doc_param(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let mut chars = name.chars();
    let mut first = true;
    while let Some(c) = chars.next() {
        if c == '<' {
            let Some(class) = chars.next() else {
                return false;
            };
            if !class.is_ascii_lowercase() || chars.next() != Some('>') {
                return false;
            }
        } else {
            let ok = if first {
                c.is_ascii_alphanumeric() || c == '_'
            } else {
                c.is_ascii_alphanumeric() || c == '-' || c == '_'
            };
            if !ok {
                return false;
            }
        }
        first = false;
    }
    true
}
