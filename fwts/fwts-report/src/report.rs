use crate::{Severity, ValidationOutcome};
use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;

/// Insertion-ordered outcomes of one check invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    outcomes: Vec<ValidationOutcome>,
}

/// Outcome counts of a [`ValidationReport`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
    pub infos: usize,
    /// Failures per severity, indexed by [`Severity::index`].
    pub by_severity: [usize; 4],
}

impl Summary {
    /// Number of failures graded `min` or worse.
    #[must_use]
    pub fn failed_at_least(&self, min: Severity) -> usize {
        self.by_severity[min.index()..].iter().sum()
    }

    /// Add the counts of another summary.
    pub fn merge(&mut self, other: &Self) {
        self.passed += other.passed;
        self.failed += other.failed;
        self.warnings += other.warnings;
        self.infos += other.infos;
        for (mine, theirs) in self.by_severity.iter_mut().zip(other.by_severity) {
            *mine += theirs;
        }
    }
}

impl ValidationReport {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            outcomes: Vec::new(),
        }
    }

    /// Append an outcome, whatever it is.
    pub fn record(&mut self, outcome: ValidationOutcome) {
        self.outcomes.push(outcome);
    }

    /// Record the outcome unless it passed; returns whether it passed.
    ///
    /// Field checks go through here so that a clean table does not produce
    /// one `Passed` entry per field.
    pub fn check(&mut self, outcome: ValidationOutcome) -> bool {
        if outcome.is_passed() {
            return true;
        }
        self.record(outcome);
        false
    }

    pub fn passed(&mut self) {
        self.record(ValidationOutcome::Passed);
    }

    pub fn failed(
        &mut self,
        severity: Severity,
        code: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
    ) {
        self.record(ValidationOutcome::Failed {
            severity,
            code: code.into(),
            message: message.into(),
        });
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.record(ValidationOutcome::warning(message));
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.record(ValidationOutcome::info(message));
    }

    /// `true` iff no `Failed` outcome has been recorded.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        !self.outcomes.iter().any(ValidationOutcome::is_failed)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, ValidationOutcome> {
        self.outcomes.iter()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ValidationOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    /// Whether a failure with the given label has been recorded.
    #[must_use]
    pub fn has_failure(&self, code: &str) -> bool {
        self.failures().any(|o| o.code() == Some(code))
    }

    #[must_use]
    pub fn worst_severity(&self) -> Option<Severity> {
        self.outcomes.iter().filter_map(ValidationOutcome::severity).max()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    #[must_use]
    pub fn summary(&self) -> Summary {
        let mut s = Summary::default();
        for outcome in &self.outcomes {
            match outcome {
                ValidationOutcome::Passed => s.passed += 1,
                ValidationOutcome::Failed { severity, .. } => {
                    s.failed += 1;
                    s.by_severity[severity.index()] += 1;
                }
                ValidationOutcome::Warning { .. } => s.warnings += 1,
                ValidationOutcome::Info { .. } => s.infos += 1,
            }
        }
        s
    }
}

impl<'a> IntoIterator for &'a ValidationReport {
    type Item = &'a ValidationOutcome;
    type IntoIter = core::slice::Iter<'a, ValidationOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Extend<ValidationOutcome> for ValidationReport {
    fn extend<T: IntoIterator<Item = ValidationOutcome>>(&mut self, iter: T) {
        self.outcomes.extend(iter);
    }
}
