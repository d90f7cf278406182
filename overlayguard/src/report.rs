//! Turning check results into the diagnostic listing and pass/fail signal.

use std::fmt;
use std::io::{self, Write};

use serde::Serialize;

use crate::reconcile::Reconciliation;

/// A structural problem found while parsing one of the inputs. Parsers
/// collect these and keep going, so one run surfaces every problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// 1-based line number, where one applies.
    pub line: Option<usize>,
    pub message: String,
}

impl Violation {
    pub fn at(line: usize, message: impl Into<String>) -> Self {
        Self {
            line: Some(line),
            message: message.into(),
        }
    }

    pub fn general(message: impl Into<String>) -> Self {
        Self {
            line: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Violations grouped by the input they came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceViolations {
    pub source: String,
    pub items: Vec<Violation>,
}

/// The merged outcome of one check run: structural violations per input
/// plus the reconciliation findings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub violations: Vec<SourceViolations>,
    pub reconciliation: Reconciliation,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.violations.iter().all(|s| s.items.is_empty()) && self.reconciliation.is_clean()
    }

    pub fn total_findings(&self) -> usize {
        self.violations.iter().map(|s| s.items.len()).sum::<usize>()
            + self.reconciliation.finding_count()
    }

    /// Record a non-empty violation group for one input.
    pub fn add_violations(&mut self, source: impl Into<String>, items: Vec<Violation>) {
        if !items.is_empty() {
            self.violations.push(SourceViolations {
                source: source.into(),
                items,
            });
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

fn section(out: &mut impl Write, label: &str, items: &[String]) -> io::Result<()> {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(out, "{}:", label)?;
    for item in items {
        writeln!(out, "  {}", item)?;
    }
    Ok(())
}

/// Write the full human-readable report: one header-plus-items block per
/// non-empty category, then the final `OK` / `Failed` line.
pub fn render(report: &CheckReport, out: &mut impl Write) -> io::Result<()> {
    for group in &report.violations {
        writeln!(out, "{} formatting errors:", group.source)?;
        for violation in &group.items {
            writeln!(out, "  {}", violation)?;
        }
    }

    let r = &report.reconciliation;
    section(out, "Overlays without documentation", &r.undocumented_overlays)?;
    section(out, "Vestigial overlay documentation", &r.vestigial_docs)?;
    for findings in &r.params {
        section(
            out,
            &format!("{} undocumented parameters", findings.overlay),
            &findings.undocumented,
        )?;
        section(
            out,
            &format!("{} vestigial parameters", findings.overlay),
            &findings.vestigial,
        )?;
    }
    section(out, "Overlays missing from the Makefile", &r.missing_from_makefile)?;
    section(out, "Vestigial Makefile entries", &r.vestigial_makefile)?;

    writeln!(out, "{}", if report.passed() { "OK" } else { "Failed" })
}

/// Render to an in-memory string; the CLI and tests both want this.
pub fn render_to_string(report: &CheckReport) -> String {
    let mut buf = Vec::new();
    render(report, &mut buf).expect("writing to a Vec cannot fail");
    String::from_utf8(buf).expect("report output is UTF-8")
}
