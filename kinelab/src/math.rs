//! Mathematical utilities and decisions.

/// Coordinates and scalar physical quantities, in simulation units (meters, seconds).
pub type FreeCoordinate = f64;

/// Unit-of-measure type for euclid vectors and points in the simulated plane.
#[expect(clippy::exhaustive_enums)]
#[derive(Debug, Eq, PartialEq)]
pub enum Sim {}

/// A position in the simulated plane. The Y axis points up.
pub type FreePoint = euclid::Point2D<FreeCoordinate, Sim>;
/// A displacement, velocity, or acceleration in the simulated plane.
pub type FreeVector = euclid::Vector2D<FreeCoordinate, Sim>;

/// Returns `-1`, `0`, or `1` according to the sign of `value`.
///
/// Unlike [`f64::signum()`], zero maps to zero, which is what a spring force direction
/// between two coincident points should be.
#[inline]
pub fn sign_or_zero(value: FreeCoordinate) -> FreeCoordinate {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}
