//! Core check logic shared by the CLI and library consumers.
//! Runs the parsers, merges their diagnostics, and reconciles the three
//! views of the overlay catalog.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::exclusions::Exclusions;
use crate::parser::dts::{parse_dts, DtsKind};
use crate::parser::makefile::parse_makefile;
use crate::parser::readme::parse_readme;
use crate::reconcile::{reconcile, sort_params, Catalog};
use crate::report::CheckReport;

/// The non-optional base hardware description. Not a real overlay, but it
/// participates in every comparison as if it were one.
pub const BASE_DTB: &str = "<The base DTB>";

#[derive(Debug, thiserror::Error)]
pub enum OverlayGuardError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

/// Options for check runs (CLI or library).
#[derive(Clone, Debug)]
pub struct CheckOptions {
    /// Apply the permanent waiver tables. Off reports waived findings too.
    pub apply_exclusions: bool,
    /// Run the build-list completeness pass when a Makefile is supplied.
    pub check_makefile: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            apply_exclusions: true,
            check_makefile: true,
        }
    }
}

/// Raw input texts for one check run. The glue that compiles sources and
/// reads files hands everything over in this form.
#[derive(Debug, Clone, Default)]
pub struct CatalogInputs {
    pub readme: String,
    pub makefile: Option<String>,
    pub exclusions: Option<String>,
    /// Compiled dumps of the base description; unioned under [`BASE_DTB`].
    pub base_dts: Vec<String>,
    /// Compiled overlay dumps, keyed by overlay name.
    pub overlay_dts: Vec<(String, String)>,
}

/// Everything a check run produces: the report, plus the extracted source
/// view for later glue passes (external override verification).
#[derive(Debug, Clone, Default)]
pub struct CheckResult {
    pub report: CheckReport,
    /// Extractor output: overlay name to sorted parameter set.
    pub source: Catalog,
    /// Overlays compatible only with the newest hardware family.
    pub restricted: BTreeSet<String>,
}

/// Input file locations for [`OverlayGuardCore::check_paths`].
#[derive(Debug, Clone, Default)]
pub struct CheckPaths {
    pub readme: PathBuf,
    pub makefile: Option<PathBuf>,
    pub exclusions: Option<PathBuf>,
    /// Directory of compiled overlay dumps (`<name>.dts`).
    pub dts_dir: Option<PathBuf>,
    /// Compiled base description dumps.
    pub base_dts: Vec<PathBuf>,
}

/// Core check API used by both the CLI and library consumers.
pub struct OverlayGuardCore;

impl OverlayGuardCore {
    /// Run the whole pipeline over in-memory inputs. Pure; all I/O happens
    /// in [`Self::check_paths`].
    pub fn check(inputs: &CatalogInputs, options: &CheckOptions) -> CheckResult {
        let mut report = CheckReport::default();

        let readme = parse_readme(&inputs.readme);
        report.add_violations("README", readme.violations);

        let makefile = inputs.makefile.as_deref().map(parse_makefile);
        if let Some(list) = &makefile {
            report.add_violations("Makefile", list.violations.clone());
        }

        let mut exclusions = match &inputs.exclusions {
            Some(text) => {
                let (tables, violations) = Exclusions::parse(text);
                report.add_violations("exclusion list", violations);
                tables
            }
            None => Exclusions::default(),
        };
        for overlay in &readme.deprecated {
            exclusions.waive_overlay(overlay);
        }
        if !options.apply_exclusions {
            exclusions = Exclusions::default();
        }

        let mut source = Catalog::new();
        let mut restricted = BTreeSet::new();
        if !inputs.base_dts.is_empty() {
            let mut params = Vec::new();
            let mut violations = Vec::new();
            for text in &inputs.base_dts {
                let info = parse_dts(text, DtsKind::Base);
                params.extend(info.params);
                violations.extend(info.violations);
            }
            report.add_violations(BASE_DTB, violations);
            source.insert(BASE_DTB.to_string(), sort_params(params));
        }
        for (name, text) in &inputs.overlay_dts {
            let info = parse_dts(text, DtsKind::Overlay);
            if info.restricted {
                restricted.insert(name.clone());
            }
            report.add_violations(format!("{}.dts", name), info.violations);
            source.insert(name.clone(), info.params);
        }

        let listed = makefile.filter(|_| options.check_makefile);
        report.reconciliation = reconcile(
            &source,
            &readme.catalog,
            listed.as_ref().map(|l| l.names.as_slice()),
            &exclusions,
        );

        CheckResult {
            report,
            source,
            restricted,
        }
    }

    /// Load every input from disk and run the check. A missing optional
    /// input is treated as absent; an unreadable required one is an error.
    pub fn check_paths(
        paths: &CheckPaths,
        options: &CheckOptions,
    ) -> Result<CheckResult, OverlayGuardError> {
        let mut inputs = CatalogInputs {
            readme: std::fs::read_to_string(&paths.readme)?,
            ..Default::default()
        };
        if let Some(path) = &paths.makefile {
            inputs.makefile = Some(std::fs::read_to_string(path)?);
        }
        if let Some(path) = &paths.exclusions {
            inputs.exclusions = Some(std::fs::read_to_string(path)?);
        }
        for path in &paths.base_dts {
            inputs.base_dts.push(std::fs::read_to_string(path)?);
        }
        if let Some(dir) = &paths.dts_dir {
            for path in discover_dts_files(dir)? {
                if paths.base_dts.contains(&path) {
                    continue;
                }
                let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let name = name.to_string();
                inputs
                    .overlay_dts
                    .push((name, std::fs::read_to_string(&path)?));
            }
        }
        Ok(Self::check(&inputs, options))
    }
}

/// Recursively discover compiled dumps (`*.dts`) in a directory, sorted so
/// runs are deterministic.
pub fn discover_dts_files(dir: &Path) -> Result<Vec<PathBuf>, OverlayGuardError> {
    let mut files = Vec::new();
    walk_dir(dir, &mut files, 0)?;
    files.sort();
    Ok(files)
}

fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>, depth: usize) -> Result<(), OverlayGuardError> {
    if depth > 20 {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.starts_with('.') || name == "target" || name == "build" {
                continue;
            }
            walk_dir(&path, files, depth + 1)?;
        } else if path.is_file() {
            if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
                if ext == "dts" {
                    files.push(path);
                }
            }
        }
    }
    Ok(())
}
