use std::fmt;
use std::panic;

/// Collects failures from many independent test cases and reports them all at once.
///
/// Each case is run by [`MultiFailure::case()`] under a label. A case that panics is
/// recorded by its label instead of ending the test, and when the [`MultiFailure`] is
/// dropped, it panics with the list of failed labels if there were any. This is useful
/// for grids of initial conditions, where knowing every failing case says more than
/// knowing the first one.
#[derive(Default)]
pub struct MultiFailure {
    cases: usize,
    failed: Vec<String>,
}

impl MultiFailure {
    /// Constructs a [`MultiFailure`] with no cases.
    #[inline]
    #[must_use = "this is useless if never invoked to collect failures"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` as the case named by `label`. Returns its output, or [`None`] if it
    /// panicked, in which case the failure is deferred until this is dropped.
    #[inline]
    pub fn case<O, F>(&mut self, label: impl fmt::Display, f: F) -> Option<O>
    where
        F: FnOnce() -> O + panic::UnwindSafe,
    {
        self.cases += 1;
        // The panic hook has already printed the message by the time this returns.
        panic::catch_unwind(f)
            .inspect_err(|_| self.failed.push(label.to_string()))
            .ok()
    }

    /// Returns the number of cases run so far.
    #[inline]
    pub fn cases(&self) -> usize {
        self.cases
    }

    /// Returns the labels of the cases that failed so far.
    #[inline]
    pub fn failed(&self) -> &[String] {
        &self.failed
    }
}

impl fmt::Debug for MultiFailure {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiFailure")
            .field("cases", &self.cases)
            .field("failed", &self.failed)
            .finish()
    }
}

impl Drop for MultiFailure {
    #[inline]
    fn drop(&mut self) {
        if self.failed.is_empty() || std::thread::panicking() {
            return;
        }
        let message = format!(
            "{failed} of {cases} cases failed: {labels}",
            failed = self.failed.len(),
            cases = self.cases,
            labels = self.failed.join("; "),
        );
        eprintln!("\n{message}");
        // resume_unwind skips the panic hook, which already reported each case.
        panic::resume_unwind(Box::new(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_cases_pass() {
        let mut f = MultiFailure::new();
        assert_eq!(f.case("a", || 1), Some(1));
        assert_eq!(f.case("b", || 2), Some(2));
        assert_eq!(f.cases(), 2);
        assert!(f.failed().is_empty());
    }

    #[test]
    #[should_panic = "2 of 3 cases failed: y=1; y=3"]
    fn failures_are_listed() {
        let mut f = MultiFailure::new();
        for y in 1..=3 {
            f.case(format_args!("y={y}"), || {
                assert!(y == 2, "case {y}");
            });
        }
    }
}
