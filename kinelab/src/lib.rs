//! kinelab is a set of small mechanical simulations of the kind used to teach
//! numerical physics: a ball bouncing on a floor, a projectile with drag, disks colliding
//! in a box, a chain of masses on springs, and a Monte Carlo estimate of π.
//!
//! This crate defines the simulation state, the numerical methods, and simulated time.
//! Presentation (plotting, windows, input) is left to other crates; the `kinelab-desktop`
//! package provides a headless command-line runner which prints text traces.
//!
//! ## Concepts
//!
//! * [`physics::KinematicState`] is the one-dimensional (position, velocity) pair of a
//!   falling body, and [`physics::FLOOR`] is the boundary it collides with.
//! * [`physics::refine_collision()`] locates the moment within an integration step at which
//!   a body reached the floor, and produces the reflected state at that moment, so that
//!   integration can resume from a physically reasonable state rather than from one that
//!   has already penetrated the floor.
//! * [`physics::ode::Integrator`] is the interface to a numerical ODE solver.
//!   [`physics::ode::DormandPrince`] and [`physics::ode::Rk4`] are provided.
//! * [`sim::Simulation`] is implemented by each simulation, and is advanced by a
//!   [`sim::SimContext`] which owns the [`time::Clock`]. There is no global state; everything
//!   a step needs is passed in its [`sim::StepContext`].
//!
//! ## Crate features
//!
//! This crate has no optional features.

extern crate alloc;

pub mod math;
pub mod montecarlo;
pub mod physics;
pub mod sim;
pub mod time;

/// Utilities that are not specific to simulation.
pub mod util {
    #[doc(inline)]
    pub use kinelab_base::util::*;
}
