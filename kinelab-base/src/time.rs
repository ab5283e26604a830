//! Wall-clock limits on computation.

#[doc(no_inline)]
pub use core::time::Duration;
#[doc(no_inline)]
pub use web_time::Instant;

/// A request regarding how much real time a numerical search may spend.
///
/// Searches which have no natural bound on their running time accept a [`Deadline`]
/// in addition to their iteration limits, and check it after each iteration.
#[derive(Debug, Clone, Copy, Default, Eq, Ord, PartialEq, PartialOrd)]
#[non_exhaustive]
pub enum Deadline {
    /// Stop after the first iteration.
    Asap,
    /// Stop at the first check after the given time.
    At(Instant),
    /// Don't stop until the search finishes or runs out of iterations.
    ///
    /// This is the default, so that results are deterministic unless a time limit is
    /// explicitly requested.
    #[default]
    Whenever,
}

impl Deadline {
    /// Constructs a deadline which is `duration` from now.
    #[inline]
    pub fn after(duration: Duration) -> Self {
        Deadline::At(Instant::now() + duration)
    }

    /// Returns whether the deadline has passed, consulting the clock only if the deadline
    /// is a specific time.
    #[inline]
    pub fn has_passed(&self) -> bool {
        match self {
            Deadline::Asap => true,
            Deadline::At(deadline) => *deadline <= Instant::now(),
            Deadline::Whenever => false,
        }
    }
}
