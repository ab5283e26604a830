//! Data types for simulated and real time.

use core::num::NonZeroU16;

#[doc(inline)]
pub use kinelab_base::time::*;

// -------------------------------------------------------------------------------------------------

/// Numeric type for the phase of a [`Clock`].
pub type Phase = u64;

/// Specifies an amount of simulated time passing in one step of a simulation.
///
/// [`Tick`] values are passed along through the `step()` operations that advance time.
/// They are produced by a [`Clock`] which has a [`TickSchedule`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Tick {
    delta_t: Duration,

    /// Whether simulated time is paused, and `delta_t` should not be considered
    /// as an amount of time passing. See [`Self::paused()`] for details.
    paused: bool,
}

impl Tick {
    /// Construct a non-paused [`Tick`] from a duration expressed in fractional seconds.
    ///
    /// The duration is rounded to whole nanoseconds, so [`Tick::delta_t_f64()`] may differ
    /// slightly from `dt` (1/30 s becomes 0.033333333 s). Negative or non-finite durations
    /// produce a zero-length tick.
    pub fn from_seconds(dt: f64) -> Self {
        Self {
            delta_t: Duration::try_from_secs_f64(dt).unwrap_or(Duration::ZERO),
            paused: false,
        }
    }

    /// Returns the amount of time passed, as a [`Duration`].
    pub fn delta_t_duration(self) -> Duration {
        self.delta_t
    }

    /// Returns the amount of time passed, as a floating-point number of seconds.
    pub fn delta_t_f64(self) -> f64 {
        self.delta_t.as_secs_f64()
    }

    /// Set the paused flag. See [`Tick::paused`] for more information.
    #[must_use]
    pub fn pause(self) -> Self {
        Self {
            paused: true,
            ..self
        }
    }

    /// Returns the "paused" state of this Tick. If true, then step operations should
    /// not perform any changes that reflect simulated time passing.
    pub fn paused(&self) -> bool {
        self.paused
    }
}

// -------------------------------------------------------------------------------------------------

/// Defines how simulated time passes.
///
/// It defines a base duration (for example, it could be 1 second), and a divisor with which
/// to subdivide this duration into individual [`Tick`]s. A schedule of 30 ticks per second
/// corresponds to a 30 frames-per-second animation in which each frame advances the
/// simulation by 1/30 s.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct TickSchedule {
    base_duration: Duration,
    divisor: NonZeroU16,
}

impl TickSchedule {
    /// Construct a [`TickSchedule`] which specifies `divisor` ticks per second.
    pub const fn per_second(divisor: u16) -> Self {
        Self {
            base_duration: Duration::from_secs(1),
            divisor: match NonZeroU16::new(divisor) {
                Some(x) => x,
                None => panic!("divisor must be nonzero"),
            },
        }
    }

    /// Construct a [`TickSchedule`] in which every tick has length `period`.
    pub const fn with_period(period: Duration) -> Self {
        Self {
            base_duration: period,
            divisor: NonZeroU16::MIN,
        }
    }

    /// Returns the length of a [`Tick`] in this schedule.
    pub fn delta_t(&self) -> Duration {
        self.base_duration / u32::from(self.divisor.get())
    }
}

// -------------------------------------------------------------------------------------------------

/// Produces [`Tick`]s according to a [`TickSchedule`], and can be paused.
///
/// While paused, the clock still produces ticks (so that callers can keep redrawing), but
/// they are [paused](Tick::paused) and the phase does not advance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Clock {
    schedule: TickSchedule,
    phase: Phase,
    paused: bool,
}

impl Clock {
    /// Constructs a running clock at phase 0.
    pub fn new(schedule: TickSchedule) -> Self {
        Self {
            schedule,
            phase: 0,
            paused: false,
        }
    }

    /// Returns the schedule this clock was constructed with.
    pub fn schedule(&self) -> TickSchedule {
        self.schedule
    }

    /// Returns the number of non-paused ticks produced so far.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the simulated time elapsed over all non-paused ticks.
    pub fn elapsed(&self) -> Duration {
        // Multiplying per tick avoids accumulating rounding error.
        let delta_t = self.schedule.delta_t();
        delta_t.saturating_mul(u32::try_from(self.phase).unwrap_or(u32::MAX))
    }

    /// Produces the next tick, advancing the phase unless paused.
    pub fn tick(&mut self) -> Tick {
        let tick = Tick {
            delta_t: self.schedule.delta_t(),
            paused: false,
        };
        if self.paused {
            tick.pause()
        } else {
            self.phase += 1;
            tick
        }
    }

    /// Stops simulated time from advancing.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Lets simulated time advance again after [`Clock::pause()`].
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Returns whether [`Clock::pause()`] is in effect.
    pub fn is_paused(&self) -> bool {
        self.paused
    }
}
