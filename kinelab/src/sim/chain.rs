use alloc::vec::Vec;

use crate::math::{FreeCoordinate, sign_or_zero};
use crate::physics::ode::{DormandPrince, Integrator, OdeSystem};
use crate::sim::{Simulation, StepContext};

/// Speed below which the bottom of a held [`SpringChain`] is considered to have settled.
pub const SETTLED_SPEED: FreeCoordinate = 0.001;

/// Physical parameters of a [`SpringChain`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct ChainParams {
    /// Number of masses; at least 2.
    pub masses: usize,
    /// Unstretched length of the whole chain.
    pub length: FreeCoordinate,
    /// Sum of all the masses.
    pub total_mass: FreeCoordinate,
    /// Height of the bottom mass at the start.
    pub start_height: FreeCoordinate,
    /// Spring constant of each link.
    pub stiffness: FreeCoordinate,
    /// Viscous damping coefficient of each mass.
    pub damping: FreeCoordinate,
    /// Vertical acceleration.
    pub gravity: FreeCoordinate,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            masses: 10,
            length: 0.7,
            total_mass: 0.2,
            start_height: 5.0,
            stiffness: 2.3,
            damping: 0.1,
            gravity: -9.8,
        }
    }
}

impl ChainParams {
    /// Replaces the damping coefficient.
    #[must_use]
    pub fn with_damping(mut self, damping: FreeCoordinate) -> Self {
        self.damping = damping;
        self
    }

    /// Replaces the spring constant.
    #[must_use]
    pub fn with_stiffness(mut self, stiffness: FreeCoordinate) -> Self {
        self.stiffness = stiffness;
        self
    }

    /// Replaces the gravity.
    #[must_use]
    pub fn with_gravity(mut self, gravity: FreeCoordinate) -> Self {
        self.gravity = gravity;
        self
    }

    /// Unstretched length of one link.
    pub fn rest_length(&self) -> FreeCoordinate {
        self.length / self.masses as FreeCoordinate
    }
}

/// Equations of motion of the whole chain, with state `[y₀ … yₙ₋₁, v₀ … vₙ₋₁]` where index 0
/// is the bottom.
#[derive(Clone, Debug)]
pub struct ChainSystem {
    params: ChainParams,
    mass: FreeCoordinate,
    rest_length: FreeCoordinate,
    /// Whether the top mass is fixed in place.
    held: bool,
}

impl OdeSystem for ChainSystem {
    fn derivative(&self, _t: f64, y: &[f64], dy: &mut [f64]) {
        let n = self.params.masses;
        let (heights, velocities) = y.split_at(n);
        let (dheights, dvelocities) = dy.split_at_mut(n);
        for i in 0..n {
            if self.held && i == n - 1 {
                dheights[i] = 0.0;
                dvelocities[i] = 0.0;
                continue;
            }
            let mut acceleration = self.params.gravity;
            let neighbors = [i.checked_sub(1), Some(i + 1).filter(|&j| j < n)];
            for j in neighbors.into_iter().flatten() {
                let distance = heights[j] - heights[i];
                let compression = (self.rest_length - distance.abs()) * sign_or_zero(distance);
                acceleration -= self.params.stiffness * compression / self.mass;
            }
            acceleration -= self.params.damping * velocities[i] / self.mass;
            dheights[i] = velocities[i];
            dvelocities[i] = acceleration;
        }
    }
}

/// What happened during one [`SpringChain`] step.
#[expect(clippy::exhaustive_structs)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChainStepInfo {
    /// If the top was released in this step, the height of the bottom at that moment.
    pub released: Option<FreeCoordinate>,
    /// If the top first fell below the bottom in this step, the height of the bottom.
    pub top_passed_bottom: Option<FreeCoordinate>,
}

/// A vertical chain of point masses joined by springs, hanging from its top mass.
///
/// The top mass is held fixed until the bottom mass has settled (its speed is below
/// [`SETTLED_SPEED`]), then released, and the chain falls.
#[derive(Clone, Debug)]
pub struct SpringChain {
    integrator: DormandPrince<ChainSystem>,
    top_above: bool,
}

impl SpringChain {
    /// Constructs a chain at rest with every link at its rest length, the top held.
    ///
    /// Returns [`None`] if `params.masses` is less than 2.
    pub fn new(params: ChainParams) -> Option<Self> {
        let rest_length = params.rest_length();
        let heights: Vec<f64> = (0..params.masses)
            .map(|i| params.start_height + i as FreeCoordinate * rest_length)
            .collect();
        let velocities = vec![0.0; params.masses];
        Self::from_state(params, &heights, &velocities)
    }

    /// Constructs a chain with the given heights and velocities, bottom first, the top
    /// held.
    ///
    /// Returns [`None`] if there are fewer than 2 masses or the lengths differ from
    /// `params.masses`.
    pub fn from_state(
        params: ChainParams,
        heights: &[FreeCoordinate],
        velocities: &[FreeCoordinate],
    ) -> Option<Self> {
        let n = params.masses;
        if n < 2 || heights.len() != n || velocities.len() != n {
            return None;
        }
        let system = ChainSystem {
            params,
            mass: params.total_mass / n as FreeCoordinate,
            rest_length: params.rest_length(),
            held: true,
        };
        let mut integrator = DormandPrince::new(system, 2 * n).with_tolerances(1e-8, 1e-10);
        let state: Vec<f64> = heights.iter().chain(velocities).copied().collect();
        integrator.set_initial_value(&state, 0.0);
        Some(Self {
            integrator,
            top_above: heights[n - 1] >= heights[0],
        })
    }

    fn masses(&self) -> usize {
        self.integrator.system().params.masses
    }

    /// Returns the heights of the masses, bottom first.
    pub fn heights(&self) -> &[FreeCoordinate] {
        &self.integrator.state()[..self.masses()]
    }

    /// Returns the velocities of the masses, bottom first.
    pub fn velocities(&self) -> &[FreeCoordinate] {
        &self.integrator.state()[self.masses()..]
    }

    /// Returns whether the top mass is still held.
    pub fn is_held(&self) -> bool {
        self.integrator.system().held
    }

    /// Lets go of the top mass, if it was held.
    pub fn release(&mut self) {
        self.integrator.system_mut().held = false;
    }

    fn bottom_and_top(&self) -> (FreeCoordinate, FreeCoordinate) {
        let heights = self.heights();
        (heights[0], heights[heights.len() - 1])
    }
}

impl Simulation for SpringChain {
    type Info = ChainStepInfo;

    fn step(&mut self, ctx: &StepContext) -> ChainStepInfo {
        let mut info = ChainStepInfo::default();
        if ctx.tick.paused() {
            return info;
        }
        let target = self.integrator.t() + ctx.tick.delta_t_f64();
        if let Err(error) = self.integrator.integrate(target) {
            log::error!("chain integration failed: {error}");
            return info;
        }

        let (bottom, top) = self.bottom_and_top();
        if self.is_held() && self.velocities()[0].abs() < SETTLED_SPEED {
            self.release();
            log::info!("top released with bottom at {bottom:.4}");
            info.released = Some(bottom);
        }
        if !self.is_held() && self.top_above && top < bottom {
            self.top_above = false;
            log::info!("top passed bottom at {bottom:.4}");
            info.top_passed_bottom = Some(bottom);
        }
        info
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
    fn starts_at_rest_length() {
        let chain = SpringChain::new(ChainParams::default()).unwrap();
        let heights = chain.heights();
        assert_eq!(heights.len(), 10);
        assert_eq!(heights[0], 5.0);
        assert!((heights[9] - 5.63).abs() < 1e-12);
        assert!(chain.is_held());
    }

    #[test]
    fn rejects_bad_shapes() {
        let params = ChainParams {
            masses: 1,
            ..ChainParams::default()
        };
        assert!(SpringChain::new(params).is_none());
        let params = ChainParams {
            masses: 2,
            ..ChainParams::default()
        };
        assert!(SpringChain::from_state(params, &[0.0, 1.0], &[0.0]).is_none());
    }

    #[test]
    fn held_top_does_not_move() {
        let mut chain = SpringChain::new(ChainParams::default()).unwrap();
        let ctx = StepContext::from_seconds(0.01);
        for _ in 0..50 {
            chain.step(&ctx);
        }
        let top = *chain.heights().last().unwrap();
        assert_eq!(top, 5.0 + 9.0 * ChainParams::default().rest_length());
        assert!(chain.heights()[0] < 5.0);
    }

    #[test]
    fn released_after_bottom_settles() {
        let mut chain = SpringChain::new(ChainParams::default()).unwrap();
        let ctx = StepContext::from_seconds(0.01);
        let mut release = None;
        for step in 1..=2000 {
            if let Some(bottom) = chain.step(&ctx).released {
                release = Some((step, bottom));
                break;
            }
        }
        let (step, bottom) = release.expect("should be released within 20 s");
        assert!((1000..=1250).contains(&step), "released at step {step}");
        assert!((bottom - 1.1666).abs() < 0.01, "bottom at {bottom}");
        assert!(!chain.is_held());

        let top_before = *chain.heights().last().unwrap();
        for _ in 0..10 {
            chain.step(&ctx);
        }
        assert!(*chain.heights().last().unwrap() < top_before);
    }

    #[test]
    fn reports_top_passing_bottom() {
        // Two free masses with no forces; the bottom one moves up past the top one.
        let params = ChainParams {
            masses: 2,
            ..ChainParams::default()
        }
        .with_stiffness(0.0)
        .with_damping(0.0)
        .with_gravity(0.0);
        let mut chain = SpringChain::from_state(params, &[0.0, 0.07], &[2.0, 0.0]).unwrap();
        chain.release();
        let ctx = StepContext::from_seconds(0.01);
        let infos: Vec<ChainStepInfo> = (0..6).map(|_| chain.step(&ctx)).collect();
        let passed: Vec<Option<FreeCoordinate>> =
            infos.iter().map(|info| info.top_passed_bottom).collect();
        assert_eq!(&passed[..3], &[None, None, None]);
        assert!((passed[3].unwrap() - 0.08).abs() < 1e-9, "{passed:?}");
        assert_eq!(&passed[4..], &[None, None]);
        assert!(infos.iter().all(|info| info.released.is_none()));
    }
}
