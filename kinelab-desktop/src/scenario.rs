//! Running a scenario and writing its trace as text.

use std::io;

use anyhow::Context as _;

use kinelab::physics::KinematicState;
use kinelab::sim::{
    BallEvent, BallParams, BouncingBall, ChainParams, DiskDistribution, DiskWorld, Frame,
    Projectile, ProjectileEvent, ProjectileParams, SimContext, Simulation, SpringChain,
};
use kinelab::time::{Duration, TickSchedule};

use crate::config_files::{
    BounceConfig, ChainConfig, DisksConfig, LabConfig, PiConfig, ProjectileConfig,
};

/// Which simulation to run.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum, strum::IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
#[non_exhaustive]
pub enum Scenario {
    /// A ball dropped onto the floor, bouncing.
    Bounce,
    /// A projectile launched with horizontal drag, until it lands.
    Projectile,
    /// Disks colliding in a box.
    Disks,
    /// A chain of masses on springs, held at the top and then dropped.
    Chain,
    /// Monte Carlo estimation of π.
    Pi,
}

/// How long to run and how much of the trace to print.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct RunOptions {
    /// Number of steps to take.
    pub frames: Frame,
    /// Print every this many frames; frames with notable events are always printed.
    pub every: Frame,
}

impl RunOptions {
    /// Constructs options for `frames` steps printing every `every`th frame.
    pub fn new(frames: Frame, every: Frame) -> Self {
        Self {
            frames,
            every: every.max(1),
        }
    }

    fn wants(&self, frame: Frame) -> bool {
        frame % self.every == 0
    }
}

/// Runs `scenario` with parameters from `config`, writing a header, trace rows, and a
/// summary line to `out`.
pub fn run_scenario(
    scenario: Scenario,
    config: &LabConfig,
    options: &RunOptions,
    out: &mut dyn io::Write,
) -> Result<(), anyhow::Error> {
    log::info!(
        "running {} for {} frames",
        <&str>::from(scenario),
        options.frames
    );
    match scenario {
        Scenario::Bounce => run_bounce(&config.bounce, options, out),
        Scenario::Projectile => run_projectile(&config.projectile, options, out),
        Scenario::Disks => run_disks(&config.disks, options, out),
        Scenario::Chain => run_chain(&config.chain, options, out),
        Scenario::Pi => run_pi(&config.pi, out),
    }
}

fn schedule(dt: f64) -> Result<TickSchedule, anyhow::Error> {
    let period = Duration::try_from_secs_f64(dt)
        .ok()
        .filter(|d| !d.is_zero())
        .with_context(|| format!("step length must be a positive number of seconds, not {dt}"))?;
    Ok(TickSchedule::with_period(period))
}

fn run_bounce(
    config: &BounceConfig,
    options: &RunOptions,
    out: &mut dyn io::Write,
) -> Result<(), anyhow::Error> {
    let mut params = BallParams::default()
        .with_gravity(config.gravity)
        .with_tolerance(config.tolerance)
        .with_model(config.model.into());
    params.max_iterations = config.max_iterations;
    let mut ball = BouncingBall::new(KinematicState::new(config.height, config.velocity), params);
    let mut ctx = SimContext::new(schedule(config.dt)?);

    writeln!(out, "frame\ttime\tposition\tvelocity\tevent")?;
    while ctx.frame() < options.frames {
        let frame = ctx.frame();
        let Some(event) = ctx.advance(&mut ball) else {
            continue;
        };
        let label = match event {
            BallEvent::Idle | BallEvent::Moved => "",
            BallEvent::Bounced(_) => "bounce",
            BallEvent::Fallback(_) => "fallback",
            BallEvent::Settled => "settled",
            BallEvent::Failed(error) => {
                return Err(error).context("ball integration failed");
            }
            _ => "other",
        };
        if options.wants(frame) || !label.is_empty() {
            let state = ball.state();
            writeln!(
                out,
                "{frame}\t{:.6}\t{:.6}\t{:.6}\t{label}",
                ball.time(),
                state.position,
                state.velocity
            )?;
        }
    }
    writeln!(
        out,
        "bounces: {}, imprecise: {}, time: {:.6}",
        ball.bounces(),
        ball.fallbacks(),
        ball.time()
    )?;
    Ok(())
}

fn run_projectile(
    config: &ProjectileConfig,
    options: &RunOptions,
    out: &mut dyn io::Write,
) -> Result<(), anyhow::Error> {
    let mut params = ProjectileParams::default()
        .with_friction(config.friction)
        .with_launch(config.speed, config.angle);
    params.gravity = config.gravity;
    let mut projectile = Projectile::launch(params);
    let mut ctx = SimContext::new(schedule(config.dt)?);

    writeln!(out, "frame\ttime\tx\ty")?;
    while ctx.frame() < options.frames && !projectile.landed() {
        let frame = ctx.frame();
        let Some(event) = ctx.advance(&mut projectile) else {
            continue;
        };
        let position = match event {
            ProjectileEvent::Flying(p) if options.wants(frame) => p,
            ProjectileEvent::Landed(p) => p,
            ProjectileEvent::Failed(error) => {
                return Err(error).context("projectile integration failed");
            }
            _ => continue,
        };
        writeln!(
            out,
            "{frame}\t{:.3}\t{:.3}\t{:.3}",
            projectile.time(),
            position.x,
            position.y
        )?;
    }
    let end = projectile.position();
    if projectile.landed() {
        writeln!(
            out,
            "landed at x={:.3} after {:.3} s",
            end.x,
            projectile.time()
        )?;
    } else {
        writeln!(out, "still flying at ({:.3}, {:.3})", end.x, end.y)?;
    }
    Ok(())
}

fn run_disks(
    config: &DisksConfig,
    options: &RunOptions,
    out: &mut dyn io::Write,
) -> Result<(), anyhow::Error> {
    let random = DiskWorld::random(
        config.count,
        config.size,
        &DiskDistribution::default(),
        config.seed,
    );
    let mut world = DiskWorld::new(random.disks().to_vec(), config.size, config.restitution);
    let mut ctx = SimContext::new(schedule(config.dt)?);

    writeln!(out, "frame\ttime\tcollisions\twall_bounces\tenergy")?;
    let mut total_collisions = 0;
    let mut total_wall_bounces = 0;
    while ctx.frame() < options.frames {
        let frame = ctx.frame();
        let Some(info) = ctx.advance(&mut world) else {
            continue;
        };
        total_collisions += info.collisions;
        total_wall_bounces += info.wall_bounces;
        if options.wants(frame) {
            writeln!(
                out,
                "{frame}\t{:.3}\t{}\t{}\t{:.6}",
                world.time(),
                info.collisions,
                info.wall_bounces,
                world.kinetic_energy()
            )?;
        }
    }
    writeln!(
        out,
        "collisions: {total_collisions}, wall bounces: {total_wall_bounces}, energy: {:.6}",
        world.kinetic_energy()
    )?;
    Ok(())
}

fn run_chain(
    config: &ChainConfig,
    options: &RunOptions,
    out: &mut dyn io::Write,
) -> Result<(), anyhow::Error> {
    let mut params = ChainParams::default()
        .with_stiffness(config.stiffness)
        .with_damping(config.damping)
        .with_gravity(config.gravity);
    params.masses = config.masses;
    params.length = config.length;
    params.total_mass = config.total_mass;
    params.start_height = config.start_height;
    let mut chain = SpringChain::new(params).context("a chain needs at least 2 masses")?;
    let mut ctx = SimContext::new(schedule(config.dt)?);

    writeln!(out, "frame\ttime\tbottom\ttop\tevent")?;
    let mut released_at = None;
    let mut passed_at = None;
    while ctx.frame() < options.frames {
        let frame = ctx.frame();
        let Some(info) = ctx.advance(&mut chain) else {
            continue;
        };
        let mut label = String::new();
        if let Some(bottom) = info.released {
            released_at = Some((chain.time(), bottom));
            label.push_str("released");
        }
        if let Some(bottom) = info.top_passed_bottom {
            passed_at = Some((chain.time(), bottom));
            if !label.is_empty() {
                label.push(',');
            }
            label.push_str("top-passed-bottom");
        }
        if options.wants(frame) || !label.is_empty() {
            let heights = chain.heights();
            writeln!(
                out,
                "{frame}\t{:.3}\t{:.6}\t{:.6}\t{label}",
                chain.time(),
                heights[0],
                heights[heights.len() - 1]
            )?;
        }
    }
    match released_at {
        Some((t, bottom)) => writeln!(out, "released at t={t:.3} with bottom at {bottom:.6}")?,
        None => writeln!(out, "not released")?,
    }
    if let Some((t, bottom)) = passed_at {
        writeln!(out, "top passed bottom at t={t:.3} with bottom at {bottom:.6}")?;
    }
    Ok(())
}

fn run_pi(config: &PiConfig, out: &mut dyn io::Write) -> Result<(), anyhow::Error> {
    for &exponent in &config.exponents {
        10u64.checked_pow(exponent).with_context(|| {
            format!("10^{exponent} samples is too many; exponents must be at most 19")
        })?;
    }
    writeln!(out, "samples\tmean\terror")?;
    let table = kinelab::montecarlo::pi_table(config.exponents.iter().copied(), config.runs);
    for row in &table {
        writeln!(out, "{}\t{:.6}\t{:.6}", row.samples, row.mean(), row.error())?;
    }
    if let Some(best) = table.last() {
        writeln!(out, "best estimate: {:.6}", best.mean())?;
    }
    Ok(())
}
