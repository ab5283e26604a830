//! Locating the moment within a step at which a falling body reached the floor.

use core::fmt;

use manyfmt::Refmt as _;

use crate::math::FreeCoordinate;
use crate::physics::KinematicState;
use crate::time::Deadline;
use crate::util::ConciseDebug;

/// Number of bisection iterations [`refine_collision()`] performs before giving up,
/// unless [`RefineParams::with_max_iterations()`] says otherwise.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// Closed-form trajectory used to evaluate a body's state partway through a step.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum FallModel {
    /// `v(Δt) = v₀ + gΔt` and `y(Δt) = y₀ + v(Δt)Δt`.
    ///
    /// This multiplies the offset by the velocity at the *end* of the offset rather than
    /// the average velocity over it, so it overestimates the distance fallen. It is the
    /// behavior bouncing-ball simulations have historically been tuned against, so it is
    /// the default. With large steps the bisection may then fail to converge.
    #[default]
    UpdatedVelocity,

    /// `v(Δt) = v₀ + gΔt` and `y(Δt) = y₀ + v₀Δt + ½gΔt²`: exact constant-acceleration
    /// kinematics.
    ConstantAcceleration,
}

impl FallModel {
    /// Returns the state reached from `start` after `offset` seconds under `gravity`.
    #[inline]
    pub fn evaluate(
        self,
        start: KinematicState,
        gravity: FreeCoordinate,
        offset: FreeCoordinate,
    ) -> KinematicState {
        let velocity = start.velocity + gravity * offset;
        let position = match self {
            FallModel::UpdatedVelocity => start.position + velocity * offset,
            FallModel::ConstantAcceleration => {
                start.position + start.velocity * offset + 0.5 * gravity * offset * offset
            }
        };
        KinematicState { position, velocity }
    }
}

/// Parameters of [`refine_collision()`] that stay fixed over a simulation run.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct RefineParams {
    /// Length of the integration step in which the floor was crossed.
    pub dt: FreeCoordinate,
    /// Constant vertical acceleration; negative pulls toward the floor.
    pub gravity: FreeCoordinate,
    /// How close to the floor the refined position must be.
    pub tolerance: FreeCoordinate,
    /// Bisection iterations allowed before reporting [`RefineError::ConvergenceFailure`].
    pub max_iterations: u32,
    /// Real time allowed before reporting [`RefineError::ConvergenceFailure`].
    /// Checked after each iteration, so at least one iteration always runs.
    pub deadline: Deadline,
    /// Trajectory evaluated at each midpoint.
    pub model: FallModel,
}

impl RefineParams {
    /// Constructs parameters with the default iteration limit, no deadline, and the
    /// default [`FallModel`].
    pub fn new(dt: FreeCoordinate, gravity: FreeCoordinate, tolerance: FreeCoordinate) -> Self {
        Self {
            dt,
            gravity,
            tolerance,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            deadline: Deadline::Whenever,
            model: FallModel::default(),
        }
    }

    /// Replaces the iteration limit.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Replaces the deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    /// Replaces the trajectory model.
    #[must_use]
    pub fn with_model(mut self, model: FallModel) -> Self {
        self.model = model;
        self
    }

    fn is_finite(&self) -> bool {
        self.dt.is_finite() && self.gravity.is_finite() && self.tolerance.is_finite()
    }
}

/// Result of [`refine_collision()`]: the state just after bouncing, and when it happened.
#[expect(clippy::exhaustive_structs)]
#[derive(Clone, Copy, PartialEq)]
pub struct Refinement {
    /// Position at the collision time and the reflected velocity.
    pub state: KinematicState,
    /// Absolute simulation time of the collision.
    pub time: FreeCoordinate,
    /// Number of bisection iterations performed.
    pub iterations: u32,
}

impl fmt::Debug for Refinement {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Refinement")
            .field("state", &self.state.refmt(&ConciseDebug))
            .field("time", &self.time)
            .field("iterations", &self.iterations)
            .finish()
    }
}

/// One bisection iteration, as reported to the observer of [`refine_collision_traced()`].
///
/// Offsets are measured forward from the start of the step.
#[expect(clippy::exhaustive_structs)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RefineStep {
    /// 1-based iteration number.
    pub iteration: u32,
    /// Lower bracket offset before this iteration moved an endpoint.
    pub lo: FreeCoordinate,
    /// Upper bracket offset before this iteration moved an endpoint.
    pub hi: FreeCoordinate,
    /// Height at `lo`.
    pub lo_height: FreeCoordinate,
    /// Height at `hi`.
    pub hi_height: FreeCoordinate,
    /// Midpoint offset evaluated in this iteration.
    pub mid: FreeCoordinate,
    /// Height at `mid`.
    pub mid_height: FreeCoordinate,
}

impl RefineStep {
    /// Width of the bracket this iteration started with.
    #[inline]
    pub fn width(&self) -> FreeCoordinate {
        (self.hi - self.lo).abs()
    }

    /// The larger of the two endpoint heights' magnitudes.
    #[inline]
    pub fn max_endpoint_height(&self) -> FreeCoordinate {
        self.lo_height.abs().max(self.hi_height.abs())
    }
}

/// Failure of [`refine_collision()`].
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum RefineError {
    /// The iteration limit or deadline was reached before the height came within tolerance.
    #[error(
        "collision time did not converge after {iterations} iterations \
        (last height {})",
        .last.state.position
    )]
    ConvergenceFailure {
        /// Iterations performed.
        iterations: u32,
        /// The state at the last midpoint evaluated, reflected as if it had converged.
        last: Refinement,
    },

    /// An input state or parameter was infinite or NaN.
    #[error("collision refinement input was not finite")]
    NonFinite,
}

impl RefineError {
    /// Returns the best available estimate of the collision, if any.
    ///
    /// Callers which prefer to keep simulating over stopping should use this.
    pub fn fallback(&self) -> Option<Refinement> {
        match *self {
            RefineError::ConvergenceFailure { last, .. } => Some(last),
            RefineError::NonFinite => None,
        }
    }
}

/// Given a body that was at `before` at time `t_prev` and, after a step of `params.dt`,
/// ended up at `after` below the floor, finds when during the step it reached the floor and
/// returns its state at that time with the velocity reflected.
///
/// Special cases:
///
/// * If `params.dt` is zero or `before` is already within tolerance of the floor, returns
///   `before` unchanged at time `t_prev` with zero iterations.
/// * If `after` is not below the floor, returns `after` unchanged at `t_prev + dt` with
///   zero iterations.
///
/// The bracket is shrunk by moving whichever endpoint has the greater height magnitude to
/// the midpoint. For a trajectory that crosses the floor once and does not overshoot far,
/// this approaches the crossing.
pub fn refine_collision(
    before: KinematicState,
    after: KinematicState,
    t_prev: FreeCoordinate,
    params: &RefineParams,
) -> Result<Refinement, RefineError> {
    refine_collision_traced(before, after, t_prev, params, |_| {})
}

/// As [`refine_collision()`], but reports each bisection iteration to `observer`.
pub fn refine_collision_traced(
    before: KinematicState,
    after: KinematicState,
    t_prev: FreeCoordinate,
    params: &RefineParams,
    mut observer: impl FnMut(RefineStep),
) -> Result<Refinement, RefineError> {
    if !(before.is_finite() && after.is_finite() && t_prev.is_finite() && params.is_finite()) {
        return Err(RefineError::NonFinite);
    }

    let &RefineParams {
        dt,
        gravity,
        tolerance,
        max_iterations,
        deadline,
        model,
    } = params;

    if dt == 0.0 || before.position.abs() <= tolerance {
        return Ok(Refinement {
            state: before,
            time: t_prev,
            iterations: 0,
        });
    }
    if !after.is_penetrating() {
        return Ok(Refinement {
            state: after,
            time: t_prev + dt,
            iterations: 0,
        });
    }

    let height_at = |offset: FreeCoordinate| model.evaluate(before, gravity, offset).position;

    let mut lo: FreeCoordinate = 0.0;
    let mut hi: FreeCoordinate = dt;
    let mut last = None;
    for iteration in 1..=max_iterations {
        let mid = (lo + hi) / 2.0;
        let at_mid = model.evaluate(before, gravity, mid);
        let lo_height = height_at(lo);
        let hi_height = height_at(hi);
        observer(RefineStep {
            iteration,
            lo,
            hi,
            lo_height,
            hi_height,
            mid,
            mid_height: at_mid.position,
        });
        log::trace!(
            "refine #{iteration}: [{lo}, {hi}] mid {mid} height {}",
            at_mid.position
        );

        let refinement = Refinement {
            state: KinematicState::new(at_mid.position, -at_mid.velocity),
            time: t_prev + mid,
            iterations: iteration,
        };
        if at_mid.position.abs() <= tolerance {
            return Ok(refinement);
        }
        last = Some(refinement);

        if hi_height.abs() > lo_height.abs() {
            hi = mid;
        } else {
            lo = mid;
        }

        if deadline.has_passed() {
            break;
        }
    }

    match last {
        Some(last) => Err(RefineError::ConvergenceFailure {
            iterations: last.iterations,
            last,
        }),
        // Zero iterations allowed; the best estimate is the start of the step.
        None => Err(RefineError::ConvergenceFailure {
            iterations: 0,
            last: Refinement {
                state: KinematicState::new(before.position, -before.velocity),
                time: t_prev,
                iterations: 0,
            },
        }),
    }
}
