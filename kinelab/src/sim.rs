//! Simulations and the context that drives them.
//!
//! Each simulation implements [`Simulation`] and owns all of its own state. Everything that
//! a step needs from outside (how much time passes, which frame this is) is passed to
//! [`Simulation::step()`] as a [`StepContext`]. A [`SimContext`] produces those contexts
//! from a [`Clock`].

use crate::time::{Clock, Tick, TickSchedule};

mod ball;
pub use ball::*;
mod chain;
pub use chain::*;
mod disks;
pub use disks::*;
mod projectile;
pub use projectile::*;

/// Frame counter type.
pub type Frame = u64;

/// Information passed to [`Simulation::step()`].
#[expect(clippy::exhaustive_structs)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepContext {
    /// How much simulated time passes in this step.
    pub tick: Tick,
    /// Number of steps that have been taken before this one.
    pub frame: Frame,
}

impl StepContext {
    /// Constructs a context for stepping by `dt` seconds as frame 0, for use outside of
    /// a [`SimContext`].
    pub fn from_seconds(dt: f64) -> Self {
        Self {
            tick: Tick::from_seconds(dt),
            frame: 0,
        }
    }
}

/// A system that evolves over simulated time.
pub trait Simulation {
    /// What [`Simulation::step()`] reports about the step it took.
    type Info;

    /// Advances the simulation by `ctx.tick`.
    ///
    /// If the tick is [paused](Tick::paused), nothing should change.
    fn step(&mut self, ctx: &StepContext) -> Self::Info;

    /// Returns the simulated time the simulation has reached.
    fn time(&self) -> f64;
}

/// Owns the [`Clock`] and frame counter that drive a [`Simulation`].
#[derive(Clone, Debug)]
pub struct SimContext {
    clock: Clock,
    frame: Frame,
}

impl SimContext {
    /// Constructs a context at frame 0 whose clock follows `schedule`.
    pub fn new(schedule: TickSchedule) -> Self {
        Self {
            clock: Clock::new(schedule),
            frame: 0,
        }
    }

    /// Steps `sim` once, unless the clock is paused, in which case returns [`None`] and
    /// the frame counter does not advance.
    pub fn advance<S: Simulation + ?Sized>(&mut self, sim: &mut S) -> Option<S::Info> {
        let tick = self.clock.tick();
        if tick.paused() {
            return None;
        }
        let info = self.step_with(sim, tick);
        Some(info)
    }

    /// Steps `sim` once even if the clock is paused, as for single-stepping a paused
    /// simulation.
    pub fn step_once<S: Simulation + ?Sized>(&mut self, sim: &mut S) -> S::Info {
        let tick = Tick::from_seconds(self.clock.schedule().delta_t().as_secs_f64());
        self.step_with(sim, tick)
    }

    fn step_with<S: Simulation + ?Sized>(&mut self, sim: &mut S, tick: Tick) -> S::Info {
        let ctx = StepContext {
            tick,
            frame: self.frame,
        };
        self.frame += 1;
        sim.step(&ctx)
    }

    /// Returns the number of steps taken so far.
    pub fn frame(&self) -> Frame {
        self.frame
    }

    /// Returns the clock.
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Pauses the clock; see [`SimContext::advance()`].
    pub fn pause(&mut self) {
        self.clock.pause();
    }

    /// Resumes the clock.
    pub fn resume(&mut self) {
        self.clock.resume();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Duration;
    use pretty_assertions::assert_eq;

    /// Records the contexts it was stepped with.
    #[derive(Default)]
    struct Recorder {
        time: f64,
        seen: Vec<StepContext>,
    }

    impl Simulation for Recorder {
        type Info = Frame;

        fn step(&mut self, ctx: &StepContext) -> Frame {
            if !ctx.tick.paused() {
                self.time += ctx.tick.delta_t_f64();
            }
            self.seen.push(*ctx);
            ctx.frame
        }

        fn time(&self) -> f64 {
            self.time
        }
    }

    #[test]
    fn advance_counts_frames() {
        let mut ctx = SimContext::new(TickSchedule::per_second(4));
        let mut sim = Recorder::default();
        assert_eq!(ctx.advance(&mut sim), Some(0));
        assert_eq!(ctx.advance(&mut sim), Some(1));
        assert_eq!(sim.time(), 0.5);
        assert_eq!(ctx.frame(), 2);
        assert_eq!(ctx.clock().elapsed(), Duration::from_millis(500));
    }

    #[test]
    fn paused_does_not_step() {
        let mut ctx = SimContext::new(TickSchedule::per_second(4));
        let mut sim = Recorder::default();
        ctx.pause();
        assert_eq!(ctx.advance(&mut sim), None);
        assert_eq!(sim.seen, vec![]);
        assert_eq!(ctx.frame(), 0);

        // Single-stepping while paused still moves the simulation.
        assert_eq!(ctx.step_once(&mut sim), 0);
        assert_eq!(sim.time(), 0.25);

        ctx.resume();
        assert_eq!(ctx.advance(&mut sim), Some(1));
        assert_eq!(sim.seen.len(), 2);
    }
}
