use alloc::vec::Vec;

use euclid::{point2, vec2};
use rand::{Rng as _, SeedableRng as _};

use crate::math::{FreeCoordinate, FreePoint, FreeVector};
use crate::sim::{Simulation, StepContext};

/// Distances shorter than this are treated as this long when computing a collision normal.
const MIN_SEPARATION: FreeCoordinate = 0.001;

/// A rigid disk moving in the plane.
#[expect(clippy::exhaustive_structs)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Disk {
    /// Center.
    pub position: FreePoint,
    /// Velocity of the center.
    pub velocity: FreeVector,
    /// Mass; must be positive.
    pub mass: FreeCoordinate,
    /// Radius; must be positive.
    pub radius: FreeCoordinate,
}

impl Disk {
    /// Returns the momentum.
    pub fn momentum(&self) -> FreeVector {
        self.velocity * self.mass
    }

    /// Returns the kinetic energy.
    pub fn kinetic_energy(&self) -> FreeCoordinate {
        0.5 * self.mass * self.velocity.square_length()
    }
}

/// Ranges that [`DiskWorld::random()`] draws disk properties from.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct DiskDistribution {
    /// Each velocity component is uniform in `-max_speed..max_speed`.
    pub max_speed: FreeCoordinate,
    /// Mass is uniform in this range.
    pub mass: (FreeCoordinate, FreeCoordinate),
    /// Radius is uniform in this range.
    pub radius: (FreeCoordinate, FreeCoordinate),
}

impl Default for DiskDistribution {
    fn default() -> Self {
        Self {
            max_speed: 10.0,
            mass: (1.0, 5.0),
            radius: (0.1, 0.2),
        }
    }
}

/// Counts of what happened during one [`DiskWorld`] step.
#[expect(clippy::exhaustive_structs)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DiskStepInfo {
    /// Number of disk pairs that exchanged an impulse.
    pub collisions: usize,
    /// Number of wall reflections.
    pub wall_bounces: usize,
}

/// Disks moving inside the square box `[0, size] × [0, size]`, bouncing off its walls and
/// off each other.
///
/// Collisions between disks exchange an impulse along the line between their centers,
/// scaled by the coefficient of restitution. Disks that overlap but are already separating
/// are left alone.
#[derive(Clone, Debug)]
pub struct DiskWorld {
    disks: Vec<Disk>,
    size: FreeCoordinate,
    restitution: FreeCoordinate,
    time: FreeCoordinate,
}

impl DiskWorld {
    /// Constructs a world containing `disks` in a box of side `size`.
    ///
    /// `restitution` is 1 for perfectly elastic collisions and 0 for perfectly inelastic
    /// ones.
    pub fn new(disks: Vec<Disk>, size: FreeCoordinate, restitution: FreeCoordinate) -> Self {
        Self {
            disks,
            size,
            restitution,
            time: 0.0,
        }
    }

    /// Constructs a world of `count` disks with positions uniformly distributed in the box,
    /// other properties drawn from `distribution`, and perfectly elastic collisions.
    ///
    /// The same `seed` always produces the same world.
    pub fn random(
        count: usize,
        size: FreeCoordinate,
        distribution: &DiskDistribution,
        seed: u64,
    ) -> Self {
        let mut rng = rand_xoshiro::Xoshiro256PlusPlus::seed_from_u64(seed);
        let mut uniform = |(low, high): (FreeCoordinate, FreeCoordinate)| {
            low + rng.random::<FreeCoordinate>() * (high - low)
        };
        let disks = (0..count)
            .map(|_| {
                let position = point2(uniform((0.0, size)), uniform((0.0, size)));
                let speed = (-distribution.max_speed, distribution.max_speed);
                let velocity = vec2(uniform(speed), uniform(speed));
                Disk {
                    position,
                    velocity,
                    mass: uniform(distribution.mass),
                    radius: uniform(distribution.radius),
                }
            })
            .collect();
        Self::new(disks, size, 1.0)
    }

    /// Returns the disks.
    pub fn disks(&self) -> &[Disk] {
        &self.disks
    }

    /// Returns the side length of the box.
    pub fn size(&self) -> FreeCoordinate {
        self.size
    }

    /// Returns the total momentum of all disks.
    pub fn momentum(&self) -> FreeVector {
        self.disks.iter().map(Disk::momentum).sum()
    }

    /// Returns the total kinetic energy of all disks.
    pub fn kinetic_energy(&self) -> FreeCoordinate {
        self.disks.iter().map(Disk::kinetic_energy).sum()
    }

    fn collide_pairs(&mut self) -> usize {
        let mut collisions = 0;
        for i in 0..self.disks.len() {
            let (head, tail) = self.disks.split_at_mut(i + 1);
            let a = &mut head[i];
            for b in tail {
                let offset = a.position - b.position;
                let distance = offset.length();
                if distance > a.radius + b.radius {
                    continue;
                }
                let normal = offset / distance.max(MIN_SEPARATION);
                let approach = (a.velocity - b.velocity).dot(normal);
                if approach >= 0.0 {
                    // Already separating.
                    continue;
                }
                let impulse =
                    (1.0 + self.restitution) * approach / (1.0 / a.mass + 1.0 / b.mass);
                a.velocity -= normal * (impulse / a.mass);
                b.velocity += normal * (impulse / b.mass);
                collisions += 1;
            }
        }
        collisions
    }

    fn reflect_off_walls(disk: &mut Disk, size: FreeCoordinate) -> usize {
        let mut bounces = 0;
        let Disk {
            position,
            velocity,
            radius,
            ..
        } = disk;
        for (p, v) in [(position.x, &mut velocity.x), (position.y, &mut velocity.y)] {
            if (p - *radius < 0.0 && *v < 0.0) || (p + *radius > size && *v > 0.0) {
                *v = -*v;
                bounces += 1;
            }
        }
        bounces
    }
}

impl Simulation for DiskWorld {
    type Info = DiskStepInfo;

    fn step(&mut self, ctx: &StepContext) -> DiskStepInfo {
        if ctx.tick.paused() {
            return DiskStepInfo::default();
        }
        let dt = ctx.tick.delta_t_f64();

        let collisions = self.collide_pairs();
        let mut wall_bounces = 0;
        for disk in &mut self.disks {
            disk.position += disk.velocity * dt;
            wall_bounces += Self::reflect_off_walls(disk, self.size);
        }
        self.time += dt;

        DiskStepInfo {
            collisions,
            wall_bounces,
        }
    }

    fn time(&self) -> f64 {
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn disk(position: [f64; 2], velocity: [f64; 2], mass: f64) -> Disk {
        Disk {
            position: position.into(),
            velocity: velocity.into(),
            mass,
            radius: 0.2,
        }
    }

    #[test]
    fn head_on_equal_masses_exchange_velocities() {
        let mut world = DiskWorld::new(
            vec![
                disk([2.0, 2.5], [1.0, 0.0], 1.0),
                disk([2.3, 2.5], [-1.0, 0.0], 1.0),
            ],
            5.0,
            1.0,
        );
        let info = world.step(&StepContext::from_seconds(0.01));
        assert_eq!(
            info,
            DiskStepInfo {
                collisions: 1,
                wall_bounces: 0
            }
        );
        assert_eq!(world.disks()[0].velocity, vec2(-1.0, 0.0));
        assert_eq!(world.disks()[1].velocity, vec2(1.0, 0.0));
    }

    #[test]
    fn separating_overlap_is_ignored() {
        let mut world = DiskWorld::new(
            vec![
                disk([2.0, 2.5], [-1.0, 0.0], 1.0),
                disk([2.3, 2.5], [1.0, 0.0], 1.0),
                // This pair still collides even though the pair above was skipped.
                disk([4.0, 1.0], [0.0, 1.0], 2.0),
                disk([4.0, 1.3], [0.0, -1.0], 2.0),
            ],
            5.0,
            1.0,
        );
        let info = world.step(&StepContext::from_seconds(0.01));
        assert_eq!(info.collisions, 1);
        assert_eq!(world.disks()[0].velocity, vec2(-1.0, 0.0));
        assert_eq!(world.disks()[2].velocity, vec2(0.0, -1.0));
    }

    #[test]
    fn inelastic_collision_conserves_momentum_only() {
        let mut world = DiskWorld::new(
            vec![
                disk([2.0, 2.0], [3.0, 1.0], 1.0),
                disk([2.25, 2.1], [-1.0, 0.5], 4.0),
            ],
            5.0,
            0.5,
        );
        let momentum = world.momentum();
        let energy = world.kinetic_energy();
        let info = world.step(&StepContext::from_seconds(0.001));
        assert_eq!(info.collisions, 1);
        assert!((world.momentum() - momentum).length() < 1e-12);
        assert!(world.kinetic_energy() < energy);
    }

    #[test]
    fn wall_reflection() {
        let mut world = DiskWorld::new(
            vec![disk([0.1, 4.9], [-2.0, 3.0], 1.0)],
            5.0,
            1.0,
        );
        let info = world.step(&StepContext::from_seconds(0.01));
        assert_eq!(info.wall_bounces, 2);
        assert_eq!(world.disks()[0].velocity, vec2(2.0, -3.0));
    }

    #[test]
    fn random_world_is_reproducible_and_in_range() {
        let distribution = DiskDistribution::default();
        let a = DiskWorld::random(10, 5.0, &distribution, 7);
        let b = DiskWorld::random(10, 5.0, &distribution, 7);
        assert_eq!(a.disks(), b.disks());
        assert_ne!(a.disks(), DiskWorld::random(10, 5.0, &distribution, 8).disks());
        for d in a.disks() {
            assert!((0.0..=5.0).contains(&d.position.x), "{d:?}");
            assert!((0.0..=5.0).contains(&d.position.y), "{d:?}");
            assert!(d.velocity.x.abs() <= 10.0 && d.velocity.y.abs() <= 10.0, "{d:?}");
            assert!((1.0..=5.0).contains(&d.mass), "{d:?}");
            assert!((0.1..=0.2).contains(&d.radius), "{d:?}");
        }
    }

    #[test]
    fn elastic_world_conserves_energy() {
        let mut world = DiskWorld::random(10, 5.0, &DiskDistribution::default(), 0);
        let energy = world.kinetic_energy();
        let ctx = StepContext::from_seconds(0.01);
        for _ in 0..500 {
            world.step(&ctx);
        }
        assert!(
            (world.kinetic_energy() - energy).abs() < 1e-9 * energy,
            "{} vs {energy}",
            world.kinetic_energy()
        );
        assert!((world.time() - 5.0).abs() < 1e-9);
    }
}
