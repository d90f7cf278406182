//! External override-checker seam.
//!
//! Structural verification of a compiled artifact is done by an external
//! tool; the library only defines the boundary. Implementations live with
//! the glue that knows how to invoke the tool (the CLI ships a
//! process-spawning one).

use crate::reconcile::Catalog;
use crate::report::Violation;

/// Outcome of asking the external tool about one override.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub passed: bool,
    pub diagnostic: String,
}

impl CheckOutcome {
    pub fn pass() -> Self {
        Self {
            passed: true,
            diagnostic: String::new(),
        }
    }

    pub fn fail(diagnostic: impl Into<String>) -> Self {
        Self {
            passed: false,
            diagnostic: diagnostic.into(),
        }
    }
}

/// Common interface for external override checkers.
pub trait OverrideChecker {
    /// Get the checker name, for diagnostics.
    fn name(&self) -> &str;

    /// Verify one override of one overlay against its compiled artifact.
    fn check_override(&self, overlay: &str, param: &str) -> CheckOutcome;
}

/// Run the checker over every extracted override. Overlays in
/// `skip` (for example, ones restricted to a hardware family the host
/// cannot load) are passed over. Failures come back as ordinary
/// violations; nothing aborts.
pub fn verify_catalog(
    checker: &dyn OverrideChecker,
    source: &Catalog,
    skip: &[String],
) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (overlay, params) in source {
        if skip.iter().any(|s| s == overlay) {
            tracing::debug!("skipping override verification for '{}'", overlay);
            continue;
        }
        for param in params {
            let outcome = checker.check_override(overlay, param);
            if !outcome.passed {
                violations.push(Violation::general(format!(
                    "{}: override '{}' of '{}' failed verification: {}",
                    checker.name(),
                    param,
                    overlay,
                    outcome.diagnostic
                )));
            }
        }
    }
    violations
}
