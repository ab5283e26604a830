use core::fmt;

use manyfmt::Refmt as _;

use crate::math::FreeCoordinate;
use crate::physics::ode::{DormandPrince, FreeFall, IntegrationError, Integrator};
use crate::physics::{
    DEFAULT_MAX_ITERATIONS, FLOOR, FallModel, KinematicState, RefineError, RefineParams,
    Refinement, refine_collision,
};
use crate::sim::{Simulation, StepContext};
use crate::util::ConciseDebug;

/// Parameters of a [`BouncingBall`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct BallParams {
    /// Vertical acceleration; negative is toward the floor.
    pub gravity: FreeCoordinate,
    /// How close to the floor a bounce must be located.
    pub tolerance: FreeCoordinate,
    /// Iteration limit for locating each bounce.
    pub max_iterations: u32,
    /// Trajectory used when locating each bounce.
    pub model: FallModel,
}

impl Default for BallParams {
    fn default() -> Self {
        Self {
            gravity: -9.8,
            tolerance: 1e-6,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            model: FallModel::default(),
        }
    }
}

impl BallParams {
    /// Replaces the trajectory model.
    #[must_use]
    pub fn with_model(mut self, model: FallModel) -> Self {
        self.model = model;
        self
    }

    /// Replaces the gravity.
    #[must_use]
    pub fn with_gravity(mut self, gravity: FreeCoordinate) -> Self {
        self.gravity = gravity;
        self
    }

    /// Replaces the tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: FreeCoordinate) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Whether a [`BouncingBall`] is integrating normally or locating a bounce.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum BallPhase {
    /// Ordinary integration.
    Falling,
    /// The last step ended below the floor and the bounce is being located.
    Colliding,
}

/// What happened during one [`BouncingBall`] step.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub enum BallEvent {
    /// The tick was paused or empty.
    Idle,
    /// The ball moved without reaching the floor.
    Moved,
    /// The ball reached the floor and bounced; the ball's time is now the bounce time.
    Bounced(Refinement),
    /// The ball reached the floor, but the bounce could not be located precisely;
    /// the best estimate was used.
    Fallback(Refinement),
    /// The ball was on the floor without enough speed to leave it, and is now at rest.
    Settled,
    /// The integrator failed; the ball was left at its last successfully integrated state.
    Failed(IntegrationError),
}

/// A ball falling onto the [`FLOOR`] and bouncing off it elastically.
///
/// Each step integrates the ball's motion with `I`. When a step ends below the floor,
/// [`refine_collision()`] finds when during the step the floor was reached, the ball is
/// moved to that time and state with its velocity reflected, and the integrator is
/// restarted from there. Consequently, after a bounce the ball's [time](Simulation::time)
/// is earlier than the sum of the ticks it has been given.
///
/// A step that starts on the floor and is long enough for the ball to rise and fall back
/// is split at the top of the arc, so the next bounce is located from there.
pub struct BouncingBall<I = DormandPrince<FreeFall>> {
    integrator: I,
    params: BallParams,
    state: KinematicState,
    time: FreeCoordinate,
    phase: BallPhase,
    bounces: u32,
    fallbacks: u32,
}

impl BouncingBall {
    /// Constructs a ball at `initial` at time 0, integrated with [`DormandPrince`].
    pub fn new(initial: KinematicState, params: BallParams) -> Self {
        let integrator = DormandPrince::new(
            FreeFall {
                gravity: params.gravity,
            },
            2,
        )
        .with_tolerances(1e-10, 1e-12);
        Self::with_integrator(integrator, initial, params)
    }
}

impl<I: Integrator> BouncingBall<I> {
    /// Constructs a ball at `initial` at time 0, integrated with `integrator`, which must
    /// integrate the same system as [`FreeFall`] with `params.gravity`.
    pub fn with_integrator(mut integrator: I, initial: KinematicState, params: BallParams) -> Self {
        integrator.set_initial_value(&initial.to_array(), 0.0);
        Self {
            integrator,
            params,
            state: initial,
            time: 0.0,
            phase: BallPhase::Falling,
            bounces: 0,
            fallbacks: 0,
        }
    }

    /// Returns the current position and velocity.
    pub fn state(&self) -> KinematicState {
        self.state
    }

    /// Returns the current phase.
    pub fn phase(&self) -> BallPhase {
        self.phase
    }

    /// Returns the parameters.
    pub fn params(&self) -> &BallParams {
        &self.params
    }

    /// Returns how many times the ball has bounced, including those counted by
    /// [`BouncingBall::fallbacks()`].
    pub fn bounces(&self) -> u32 {
        self.bounces
    }

    /// Returns how many bounces could not be located within tolerance.
    pub fn fallbacks(&self) -> u32 {
        self.fallbacks
    }

    fn reseed(&mut self) {
        self.integrator
            .set_initial_value(&self.state.to_array(), self.time);
    }

    fn integrate_to(&mut self, t: FreeCoordinate) -> Result<KinematicState, IntegrationError> {
        let state = self.integrator.integrate(t)?;
        KinematicState::from_slice(state).ok_or(IntegrationError::DimensionMismatch {
            expected: 2,
            actual: state.len(),
        })
    }

    /// Returns the time after leaving the floor with `velocity` at which the ball is highest,
    /// or [`None`] if gravity never brings it back down.
    fn apex_offset(&self, velocity: FreeCoordinate) -> Option<FreeCoordinate> {
        let gravity = self.params.gravity;
        (gravity < 0.0).then(|| velocity.max(0.0) / -gravity)
    }

    fn locate_bounce(
        &mut self,
        before: KinematicState,
        after: KinematicState,
        t_prev: FreeCoordinate,
        dt: FreeCoordinate,
    ) -> BallEvent {
        self.phase = BallPhase::Colliding;
        let params = RefineParams::new(dt, self.params.gravity, self.params.tolerance)
            .with_max_iterations(self.params.max_iterations)
            .with_model(self.params.model);

        let (refinement, precise) = match refine_collision(before, after, t_prev, &params) {
            Ok(refinement) if refinement.iterations == 0 && refinement.time == t_prev => {
                // Started within tolerance of the floor; nothing to locate.
                self.state = KinematicState::RESTING;
                self.time = t_prev + dt;
                self.reseed();
                self.phase = BallPhase::Falling;
                return BallEvent::Settled;
            }
            Ok(refinement) => (refinement, true),
            Err(error @ RefineError::ConvergenceFailure { last, .. }) => {
                log::warn!("{error}; continuing from {:?}", last.state.refmt(&ConciseDebug));
                (last, false)
            }
            Err(error) => {
                log::warn!("{error}; clamping to the floor");
                let last = Refinement {
                    state: KinematicState::new(FLOOR, -after.velocity),
                    time: t_prev + dt,
                    iterations: 0,
                };
                (last, false)
            }
        };

        self.state = refinement.state;
        self.time = refinement.time;
        self.bounces += 1;
        let event = if precise {
            log::debug!(
                "bounce at t={:.6} after {} iterations: {:?}",
                refinement.time,
                refinement.iterations,
                refinement.state.refmt(&ConciseDebug)
            );
            BallEvent::Bounced(refinement)
        } else {
            self.fallbacks += 1;
            BallEvent::Fallback(refinement)
        };
        self.reseed();
        self.phase = BallPhase::Falling;
        event
    }

    fn fail(&mut self, error: IntegrationError) -> BallEvent {
        log::error!("ball integration failed: {error}");
        self.reseed();
        BallEvent::Failed(error)
    }
}

impl<I: Integrator> Simulation for BouncingBall<I> {
    type Info = BallEvent;

    fn step(&mut self, ctx: &StepContext) -> BallEvent {
        let dt = ctx.tick.delta_t_f64();
        if ctx.tick.paused() || dt == 0.0 {
            return BallEvent::Idle;
        }
        let t_end = self.time + dt;

        if self.state.position.abs() <= self.params.tolerance {
            if self.state.velocity < 0.0 {
                // On the floor and still heading into it; this happens when a bounce was
                // located exactly and the next step starts from it.
                self.state.velocity = -self.state.velocity;
                self.reseed();
            }
            if let Some(apex) = self.apex_offset(self.state.velocity) {
                let apex_height = 0.5 * self.state.velocity * apex;
                if apex_height <= self.params.tolerance {
                    self.state = KinematicState::RESTING;
                    self.time = t_end;
                    self.reseed();
                    return BallEvent::Settled;
                }
                if apex < dt {
                    // The ball would leave the floor and come back down within this step,
                    // so stop at the top first, leaving a fall to be located from there.
                    let t_apex = self.time + apex;
                    match self.integrate_to(t_apex) {
                        Ok(state) => {
                            self.state = state;
                            self.time = t_apex;
                        }
                        Err(error) => return self.fail(error),
                    }
                }
            }
        }

        let before = self.state;
        let t_prev = self.time;
        let after = match self.integrate_to(t_end) {
            Ok(after) => after,
            Err(error) => return self.fail(error),
        };

        if after.is_penetrating() {
            self.locate_bounce(before, after, t_prev, t_end - t_prev)
        } else {
            self.state = after;
            self.time = t_end;
            BallEvent::Moved
        }
    }

    fn time(&self) -> f64 {
        self.time
    }
}

impl<I> fmt::Debug for BouncingBall<I> {
    #[mutants::skip]
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("BouncingBall")
            .field("state", &self.state)
            .field("time", &self.time)
            .field("phase", &self.phase)
            .field("bounces", &self.bounces)
            .field("fallbacks", &self.fallbacks)
            .finish_non_exhaustive()
    }
}
