//! OverlayGuard - device tree overlay catalog consistency checker
//!
//! This library cross-checks three independently maintained views of an
//! overlay catalog: the parameters extracted from compiled overlays, the
//! hand-written README documenting each overlay, and the Makefile listing
//! every overlay that gets built. It reports overlays with no
//! documentation, documented overlays that no longer exist, undocumented
//! and vestigial parameters, and build-list gaps.
//!
//! # Quick Start
//!
//! ```no_run
//! use overlayguard::{OverlayGuardCore, CheckPaths, CheckOptions};
//! use std::path::PathBuf;
//!
//! let paths = CheckPaths {
//!     readme: PathBuf::from("overlays/README"),
//!     makefile: Some(PathBuf::from("overlays/Makefile")),
//!     dts_dir: Some(PathBuf::from("build/overlays")),
//!     ..Default::default()
//! };
//! let result = OverlayGuardCore::check_paths(&paths, &CheckOptions::default()).unwrap();
//!
//! print!("{}", overlayguard::report::render_to_string(&result.report));
//! ```
//!
//! # Features
//!
//! - **Documentation checking**: strict README layout and naming rules
//! - **Set reconciliation**: wildcard-aware diffs between source, docs,
//!   and build list
//! - **Permanent waivers**: exclusion tables for accepted divergence
//! - **External verification seam**: plug in a structural checker binary

pub mod checker;
pub mod core;
pub mod exclusions;
pub mod parser;
pub mod reconcile;
pub mod report;

// Re-export main types
pub use crate::core::{
    discover_dts_files, CatalogInputs, CheckOptions, CheckPaths, CheckResult, OverlayGuardCore,
    OverlayGuardError, BASE_DTB,
};
pub use checker::{CheckOutcome, OverrideChecker};
pub use exclusions::Exclusions;
pub use parser::dts::{parse_dts, DtsInfo, DtsKind};
pub use parser::makefile::{parse_makefile, MakefileList};
pub use parser::readme::{parse_readme, ReadmeCatalog};
pub use reconcile::{diff, reconcile, Catalog, Diff, Reconciliation};
pub use report::{render, render_to_string, CheckReport, Violation};

/// Parse a README file (convenience wrapper).
pub fn parse_readme_file(path: &std::path::Path) -> Result<ReadmeCatalog, OverlayGuardError> {
    Ok(parse_readme(&std::fs::read_to_string(path)?))
}

/// Parse a compiled dump file (convenience wrapper).
pub fn parse_dts_file(
    path: &std::path::Path,
    kind: DtsKind,
) -> Result<DtsInfo, OverlayGuardError> {
    Ok(parse_dts(&std::fs::read_to_string(path)?, kind))
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        CheckOptions, CheckPaths, CheckReport, CheckResult, OverlayGuardCore, OverlayGuardError,
        BASE_DTB,
    };
}
