//! One-dimensional ballistic state, collision-time refinement, and numerical integration.

use core::fmt;

use manyfmt::{Fmt, Refmt as _};

use crate::math::FreeCoordinate;
use crate::util::ConciseDebug;

mod refine;
pub use refine::*;
pub mod ode;

#[cfg(test)]
mod tests;

/// Height of the floor that falling bodies bounce off.
pub const FLOOR: FreeCoordinate = 0.0;

/// Position and velocity of a body moving along one vertical axis.
///
/// Positive positions are above the [`FLOOR`]; positive velocities point up.
#[expect(clippy::exhaustive_structs)]
#[derive(Clone, Copy, PartialEq)]
pub struct KinematicState {
    /// Height above the floor.
    pub position: FreeCoordinate,
    /// Velocity, in position units per second.
    pub velocity: FreeCoordinate,
}

impl KinematicState {
    /// A body at rest on the floor.
    pub const RESTING: Self = Self::new(FLOOR, 0.0);

    /// Constructs a [`KinematicState`] from its components.
    #[inline]
    pub const fn new(position: FreeCoordinate, velocity: FreeCoordinate) -> Self {
        Self { position, velocity }
    }

    /// Constructs a [`KinematicState`] from an integrator state vector `[position, velocity]`.
    ///
    /// Returns [`None`] if the slice is shorter than two elements.
    #[inline]
    pub fn from_slice(state: &[f64]) -> Option<Self> {
        match *state {
            [position, velocity, ..] => Some(Self { position, velocity }),
            _ => None,
        }
    }

    /// Returns the state as an integrator state vector.
    #[inline]
    pub const fn to_array(self) -> [f64; 2] {
        [self.position, self.velocity]
    }

    /// Returns whether both components are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }

    /// Returns whether the body is strictly below the floor.
    #[inline]
    pub fn is_penetrating(&self) -> bool {
        self.position < FLOOR
    }
}

impl fmt::Debug for KinematicState {
    #[mutants::skip]
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("KinematicState")
            .field("position", &self.position.refmt(&ConciseDebug))
            .field("velocity", &self.velocity.refmt(&ConciseDebug))
            .finish()
    }
}

impl Fmt<ConciseDebug> for KinematicState {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>, fopt: &ConciseDebug) -> fmt::Result {
        write!(
            fmt,
            "y={} v={}",
            self.position.refmt(fopt),
            self.velocity.refmt(fopt)
        )
    }
}

impl From<[f64; 2]> for KinematicState {
    #[inline]
    fn from([position, velocity]: [f64; 2]) -> Self {
        Self { position, velocity }
    }
}
