use alloc::vec::Vec;

use euclid::{point2, vec2};

use crate::math::{FreeCoordinate, FreePoint, FreeVector};
use crate::physics::ode::{DormandPrince, IntegrationError, Integrator, OdeSystem};
use crate::sim::{Simulation, StepContext};

/// Height below which a [`Projectile`] is considered to have landed.
pub const LANDING_HEIGHT: FreeCoordinate = -1.0;

/// Launch and environment parameters of a [`Projectile`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct ProjectileParams {
    /// Vertical acceleration.
    pub gravity: FreeCoordinate,
    /// Horizontal drag coefficient, per second.
    pub friction: FreeCoordinate,
    /// Launch speed.
    pub speed: FreeCoordinate,
    /// Launch angle above the horizontal.
    pub angle_degrees: FreeCoordinate,
}

impl Default for ProjectileParams {
    fn default() -> Self {
        Self {
            gravity: -9.81,
            friction: 0.05,
            speed: 50.0,
            angle_degrees: 45.0,
        }
    }
}

impl ProjectileParams {
    /// Replaces the launch speed and angle.
    #[must_use]
    pub fn with_launch(mut self, speed: FreeCoordinate, angle_degrees: FreeCoordinate) -> Self {
        self.speed = speed;
        self.angle_degrees = angle_degrees;
        self
    }

    /// Replaces the horizontal drag coefficient.
    #[must_use]
    pub fn with_friction(mut self, friction: FreeCoordinate) -> Self {
        self.friction = friction;
        self
    }

    /// Returns the launch velocity.
    pub fn launch_velocity(&self) -> FreeVector {
        let angle = self.angle_degrees.to_radians();
        vec2(angle.cos(), angle.sin()) * self.speed
    }
}

/// Equations of motion with state `[x, y, vx, vy]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ballistics {
    gravity: FreeCoordinate,
    friction: FreeCoordinate,
}

impl OdeSystem for Ballistics {
    fn derivative(&self, _t: f64, y: &[f64], dy: &mut [f64]) {
        dy[0] = y[2];
        dy[1] = y[3];
        dy[2] = -y[2] * self.friction;
        dy[3] = self.gravity;
    }
}

/// What happened during one [`Projectile`] step.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub enum ProjectileEvent {
    /// The tick was paused, or the projectile had already landed.
    Idle,
    /// The projectile moved to this position.
    Flying(FreePoint),
    /// The projectile moved to this position, which is at or below [`LANDING_HEIGHT`].
    Landed(FreePoint),
    /// The integrator failed; the projectile did not move.
    Failed(IntegrationError),
}

/// A point launched from the origin, subject to gravity and horizontal drag.
#[derive(Clone, Debug)]
pub struct Projectile {
    integrator: DormandPrince<Ballistics>,
    position: FreePoint,
    velocity: FreeVector,
    trace: Vec<FreePoint>,
}

impl Projectile {
    /// Launches a projectile from the origin at time 0.
    pub fn launch(params: ProjectileParams) -> Self {
        let position = FreePoint::origin();
        let velocity = params.launch_velocity();
        let mut integrator = DormandPrince::new(
            Ballistics {
                gravity: params.gravity,
                friction: params.friction,
            },
            4,
        )
        .with_tolerances(1e-9, 1e-12);
        integrator.set_initial_value(&[position.x, position.y, velocity.x, velocity.y], 0.0);
        Self {
            integrator,
            position,
            velocity,
            trace: vec![position],
        }
    }

    /// Returns the current position.
    pub fn position(&self) -> FreePoint {
        self.position
    }

    /// Returns the current velocity.
    pub fn velocity(&self) -> FreeVector {
        self.velocity
    }

    /// Returns every position the projectile has had, starting with the launch point.
    pub fn trace(&self) -> &[FreePoint] {
        &self.trace
    }

    /// Returns whether the projectile has reached [`LANDING_HEIGHT`].
    pub fn landed(&self) -> bool {
        self.position.y <= LANDING_HEIGHT
    }
}

impl Simulation for Projectile {
    type Info = ProjectileEvent;

    fn step(&mut self, ctx: &StepContext) -> ProjectileEvent {
        if ctx.tick.paused() || self.landed() {
            return ProjectileEvent::Idle;
        }
        let target = self.integrator.t() + ctx.tick.delta_t_f64();
        match self.integrator.integrate(target) {
            Ok(&[x, y, vx, vy]) => {
                self.position = point2(x, y);
                self.velocity = vec2(vx, vy);
            }
            Ok(state) => {
                // Cannot happen; the integrator was constructed with dimension 4.
                return ProjectileEvent::Failed(IntegrationError::DimensionMismatch {
                    expected: 4,
                    actual: state.len(),
                });
            }
            Err(error) => {
                log::error!("projectile integration failed: {error}");
                return ProjectileEvent::Failed(error);
            }
        }
        self.trace.push(self.position);

        if self.landed() {
            log::debug!(
                "landed at x={:.3} after {:.2} s",
                self.position.x,
                self.integrator.t()
            );
            ProjectileEvent::Landed(self.position)
        } else {
            ProjectileEvent::Flying(self.position)
        }
    }

    fn time(&self) -> f64 {
        self.integrator.t()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn launch_velocity() {
        let v = ProjectileParams::default().launch_velocity();
        let component = 50.0 * core::f64::consts::FRAC_1_SQRT_2;
        assert!((v.x - component).abs() < 1e-12, "{v:?}");
        assert!((v.y - component).abs() < 1e-12, "{v:?}");
    }

    #[test]
    fn without_drag_matches_parabola() {
        let mut projectile = Projectile::launch(ProjectileParams::default().with_friction(0.0));
        let ctx = StepContext::from_seconds(0.1);
        for _ in 0..10 {
            projectile.step(&ctx);
        }
        let v0 = ProjectileParams::default().launch_velocity();
        let t = projectile.time();
        assert!((t - 1.0).abs() < 1e-12);
        let p = projectile.position();
        assert!((p.x - v0.x * t).abs() < 1e-9, "{p:?}");
        assert!((p.y - (v0.y * t - 0.5 * 9.81 * t * t)).abs() < 1e-9, "{p:?}");
        assert_eq!(projectile.trace().len(), 11);
    }

    #[test]
    fn drag_decays_horizontal_velocity() {
        let params = ProjectileParams::default();
        let mut projectile = Projectile::launch(params);
        let ctx = StepContext::from_seconds(0.1);
        for _ in 0..20 {
            projectile.step(&ctx);
        }
        let t = projectile.time();
        let vx0 = params.launch_velocity().x;
        let expected_vx = vx0 * (-params.friction * t).exp();
        let expected_x = vx0 / params.friction * (1.0 - (-params.friction * t).exp());
        assert!((projectile.velocity().x - expected_vx).abs() < 1e-6);
        assert!((projectile.position().x - expected_x).abs() < 1e-6);
    }

    #[test]
    fn lands_short_of_drag_free_range() {
        let mut projectile = Projectile::launch(ProjectileParams::default());
        let ctx = StepContext::from_seconds(0.1);
        let mut landing = None;
        for _ in 0..200 {
            if let ProjectileEvent::Landed(p) = projectile.step(&ctx) {
                landing = Some(p);
                break;
            }
        }
        let landing = landing.expect("should land within 20 s");
        // Range without drag is v²/g.
        let drag_free_range = 50.0 * 50.0 / 9.81;
        assert!(landing.x > 200.0 && landing.x < drag_free_range, "{landing:?}");
        assert!(projectile.landed());
        assert_eq!(projectile.step(&ctx), ProjectileEvent::Idle);
        assert_eq!(projectile.trace().last(), Some(&landing));
    }
}
