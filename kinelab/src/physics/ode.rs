//! Numerical integration of ordinary differential equations.
//!
//! Simulations own an [`Integrator`] and only talk to it through
//! [`Integrator::set_initial_value()`] and [`Integrator::integrate()`], so the method used can
//! be chosen independently of the simulation.

use alloc::vec;
use alloc::vec::Vec;

use crate::math::FreeCoordinate;

/// A first-order system of ordinary differential equations `y' = f(t, y)`.
pub trait OdeSystem {
    /// Writes `f(t, y)` into `dy`, which has the same length as `y`.
    fn derivative(&self, t: f64, y: &[f64], dy: &mut [f64]);
}

impl<F> OdeSystem for F
where
    F: Fn(f64, &[f64], &mut [f64]),
{
    #[inline]
    fn derivative(&self, t: f64, y: &[f64], dy: &mut [f64]) {
        self(t, y, dy)
    }
}

/// Vertical motion under constant acceleration, with state `[position, velocity]`.
#[expect(clippy::exhaustive_structs)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FreeFall {
    /// Acceleration; negative is downward.
    pub gravity: FreeCoordinate,
}

impl OdeSystem for FreeFall {
    fn derivative(&self, _t: f64, y: &[f64], dy: &mut [f64]) {
        dy[0] = y[1];
        dy[1] = self.gravity;
    }
}

/// Error from [`Integrator::integrate()`].
#[derive(Clone, Copy, Debug, PartialEq, displaydoc::Display)]
#[non_exhaustive]
pub enum IntegrationError {
    /// step size became too small at t = {t}
    StepSizeUnderflow {
        /// Time reached before failing.
        t: f64,
    },
    /// gave up after {steps} steps at t = {t}
    TooManySteps {
        /// Number of steps attempted.
        steps: usize,
        /// Time reached before failing.
        t: f64,
    },
    /// state became non-finite at t = {t}
    NonFinite {
        /// Time reached before failing.
        t: f64,
    },
    /// state has {actual} components but the integrator was set up for {expected}
    DimensionMismatch {
        /// Dimension given when the integrator was constructed.
        expected: usize,
        /// Length of the state passed to [`Integrator::set_initial_value()`].
        actual: usize,
    },
    /// cannot integrate backwards from t = {from} to t = {to}
    Backwards {
        /// Current time of the integrator.
        from: f64,
        /// Requested time.
        to: f64,
    },
}

impl core::error::Error for IntegrationError {}

/// Advances the state of an [`OdeSystem`] through time.
pub trait Integrator {
    /// Replaces the current state and time.
    ///
    /// A state of the wrong length is accepted here and reported by the next
    /// [`Integrator::integrate()`].
    fn set_initial_value(&mut self, state: &[f64], t: f64);

    /// Advances the state from [`Integrator::t()`] to `t` and returns the new state.
    ///
    /// On error, the state and time are those reached before the failure.
    fn integrate(&mut self, t: f64) -> Result<&[f64], IntegrationError>;

    /// Returns the time of the current state.
    fn t(&self) -> f64;

    /// Returns the current state.
    fn state(&self) -> &[f64];
}

/// Validation shared by the integrators before stepping toward `target`.
fn check_request(
    dimension: usize,
    state: &[f64],
    t: f64,
    target: f64,
) -> Result<(), IntegrationError> {
    if state.len() != dimension {
        return Err(IntegrationError::DimensionMismatch {
            expected: dimension,
            actual: state.len(),
        });
    }
    if !target.is_finite() || !state.iter().all(|c| c.is_finite()) {
        return Err(IntegrationError::NonFinite { t });
    }
    if target < t {
        return Err(IntegrationError::Backwards { from: t, to: target });
    }
    Ok(())
}

// -------------------------------------------------------------------------------------------------

/// Classic fourth-order Runge-Kutta with a fixed maximum substep.
///
/// Each call to [`Integrator::integrate()`] divides the requested interval into equal
/// substeps no longer than `max_step`.
#[derive(Clone, Debug)]
pub struct Rk4<S> {
    system: S,
    dimension: usize,
    max_step: f64,
    t: f64,
    state: Vec<f64>,
    k: [Vec<f64>; 4],
    scratch: Vec<f64>,
}

impl<S: OdeSystem> Rk4<S> {
    /// Constructs an integrator for `system` with state vectors of length `dimension`,
    /// starting at the zero state at time 0.
    ///
    /// Panics if `max_step` is not positive.
    pub fn new(system: S, dimension: usize, max_step: f64) -> Self {
        assert!(max_step > 0.0, "max_step must be positive");
        Self {
            system,
            dimension,
            max_step,
            t: 0.0,
            state: vec![0.0; dimension],
            k: core::array::from_fn(|_| vec![0.0; dimension]),
            scratch: vec![0.0; dimension],
        }
    }

    /// Returns the system being integrated.
    pub fn system(&self) -> &S {
        &self.system
    }

    fn step(&mut self, h: f64) {
        let Self {
            system,
            t,
            state,
            k,
            scratch,
            ..
        } = self;
        let t = *t;

        system.derivative(t, state, &mut k[0]);
        for i in 0..state.len() {
            scratch[i] = state[i] + 0.5 * h * k[0][i];
        }
        system.derivative(t + 0.5 * h, scratch, &mut k[1]);
        for i in 0..state.len() {
            scratch[i] = state[i] + 0.5 * h * k[1][i];
        }
        system.derivative(t + 0.5 * h, scratch, &mut k[2]);
        for i in 0..state.len() {
            scratch[i] = state[i] + h * k[2][i];
        }
        system.derivative(t + h, scratch, &mut k[3]);
        for i in 0..state.len() {
            state[i] += h / 6.0 * (k[0][i] + 2.0 * k[1][i] + 2.0 * k[2][i] + k[3][i]);
        }
    }
}

impl<S: OdeSystem> Integrator for Rk4<S> {
    fn set_initial_value(&mut self, state: &[f64], t: f64) {
        self.state.clear();
        self.state.extend_from_slice(state);
        self.t = t;
    }

    fn integrate(&mut self, t: f64) -> Result<&[f64], IntegrationError> {
        check_request(self.dimension, &self.state, self.t, t)?;
        let span = t - self.t;
        if span > 0.0 {
            let substeps = (span / self.max_step).ceil().max(1.0);
            let h = span / substeps;
            for _ in 0..(substeps as u64) {
                self.step(h);
                self.t += h;
                if !self.state.iter().all(|c| c.is_finite()) {
                    return Err(IntegrationError::NonFinite { t: self.t });
                }
            }
            self.t = t;
        }
        Ok(&self.state)
    }

    fn t(&self) -> f64 {
        self.t
    }

    fn state(&self) -> &[f64] {
        &self.state
    }
}

// -------------------------------------------------------------------------------------------------

// Dormand-Prince 5(4) coefficients.
const C: [f64; 7] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];
const A: [[f64; 6]; 7] = [
    [0.0; 6],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
        0.0,
    ],
    [
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
];
/// Fifth-order solution weights (same as the last row of `A`).
const B: [f64; 7] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
    0.0,
];
/// Difference between the fifth- and fourth-order weights.
const E: [f64; 7] = [
    71.0 / 57600.0,
    0.0,
    -71.0 / 16695.0,
    71.0 / 1920.0,
    -17253.0 / 339200.0,
    22.0 / 525.0,
    -1.0 / 40.0,
];

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

/// Adaptive Runge-Kutta integrator using the Dormand-Prince 5(4) embedded pair.
///
/// The step size is chosen so that the estimated local error of each component stays
/// below `atol + rtol * |y|`.
#[derive(Clone, Debug)]
pub struct DormandPrince<S> {
    system: S,
    dimension: usize,
    rtol: f64,
    atol: f64,
    max_steps: usize,
    /// Step size to try next; zero when not yet known.
    h: f64,
    t: f64,
    state: Vec<f64>,
    k: [Vec<f64>; 7],
    scratch: Vec<f64>,
    candidate: Vec<f64>,
}

impl<S: OdeSystem> DormandPrince<S> {
    /// Constructs an integrator for `system` with state vectors of length `dimension`,
    /// starting at the zero state at time 0, with tolerances `rtol = 1e-6`, `atol = 1e-9`.
    pub fn new(system: S, dimension: usize) -> Self {
        Self {
            system,
            dimension,
            rtol: 1e-6,
            atol: 1e-9,
            max_steps: 100_000,
            h: 0.0,
            t: 0.0,
            state: vec![0.0; dimension],
            k: core::array::from_fn(|_| vec![0.0; dimension]),
            scratch: vec![0.0; dimension],
            candidate: vec![0.0; dimension],
        }
    }

    /// Replaces the relative and absolute error tolerances.
    #[must_use]
    pub fn with_tolerances(mut self, rtol: f64, atol: f64) -> Self {
        self.rtol = rtol;
        self.atol = atol;
        self
    }

    /// Replaces the limit on steps (accepted or rejected) per [`Integrator::integrate()`] call.
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Returns the system being integrated.
    pub fn system(&self) -> &S {
        &self.system
    }

    /// Returns the system being integrated, for changing its parameters between calls.
    pub fn system_mut(&mut self) -> &mut S {
        &mut self.system
    }

    /// Computes a candidate step of size `h` into `self.candidate` and returns the
    /// normalized RMS error estimate.
    fn attempt(&mut self, h: f64) -> f64 {
        let Self {
            system,
            rtol,
            atol,
            t,
            state,
            k,
            scratch,
            candidate,
            ..
        } = self;
        let n = state.len();

        system.derivative(*t, state, &mut k[0]);
        for stage in 1..7 {
            for i in 0..n {
                let mut sum = 0.0;
                for (j, kj) in k.iter().enumerate().take(stage) {
                    sum += A[stage][j] * kj[i];
                }
                scratch[i] = state[i] + h * sum;
            }
            system.derivative(*t + C[stage] * h, scratch, &mut k[stage]);
        }

        let mut sum_sq = 0.0;
        for i in 0..n {
            let mut increment = 0.0;
            let mut error = 0.0;
            for (j, kj) in k.iter().enumerate() {
                increment += B[j] * kj[i];
                error += E[j] * kj[i];
            }
            candidate[i] = state[i] + h * increment;
            let scale = *atol + *rtol * state[i].abs().max(candidate[i].abs());
            let ratio = h * error / scale;
            sum_sq += ratio * ratio;
        }
        if n == 0 {
            0.0
        } else {
            (sum_sq / n as f64).sqrt()
        }
    }
}

impl<S: OdeSystem> Integrator for DormandPrince<S> {
    fn set_initial_value(&mut self, state: &[f64], t: f64) {
        self.state.clear();
        self.state.extend_from_slice(state);
        self.t = t;
        // The previous step size may be far too large for the new state.
        self.h = 0.0;
    }

    fn integrate(&mut self, target: f64) -> Result<&[f64], IntegrationError> {
        check_request(self.dimension, &self.state, self.t, target)?;

        let mut steps = 0;
        while self.t < target {
            if steps >= self.max_steps {
                return Err(IntegrationError::TooManySteps { steps, t: self.t });
            }
            steps += 1;

            let remaining = target - self.t;
            if remaining <= 4.0 * f64::EPSILON * target.abs().max(1.0) {
                // Rounding left a sliver that no step can resolve.
                self.t = target;
                break;
            }
            if self.h <= 0.0 {
                self.h = remaining / 100.0;
            }
            let last = self.h >= remaining;
            let h = if last { remaining } else { self.h };
            if h <= f64::EPSILON * self.t.abs().max(1.0) {
                return Err(IntegrationError::StepSizeUnderflow { t: self.t });
            }

            let error = self.attempt(h);
            if !error.is_finite() {
                return Err(IntegrationError::NonFinite { t: self.t });
            }

            let factor = if error == 0.0 {
                MAX_FACTOR
            } else {
                (SAFETY * error.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
            };
            if error <= 1.0 {
                core::mem::swap(&mut self.state, &mut self.candidate);
                self.t = if last { target } else { self.t + h };
                self.h = h * factor;
            } else {
                log::trace!("rejected step h={h} at t={} error={error}", self.t);
                self.h = h * factor.min(1.0);
            }
        }
        Ok(&self.state)
    }

    fn t(&self) -> f64 {
        self.t
    }

    fn state(&self) -> &[f64] {
        &self.state
    }
}
