use alloc::vec::Vec;

use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::physics::{
    FLOOR, FallModel, KinematicState, RefineError, RefineParams, RefineStep, Refinement,
    refine_collision, refine_collision_traced,
};
use crate::time::Deadline;
use crate::util::MultiFailure;

const G: f64 = -9.8;
const EPSILON: f64 = 1e-6;

/// A ball dropped from rest at height 10, one second into its fall and one second later.
fn dropped_from_ten() -> (KinematicState, KinematicState) {
    (KinematicState::new(5.1, -9.8), KinematicState::new(-9.6, -19.6))
}

/// Exact constant-acceleration state after falling for `dt`.
fn advance(start: KinematicState, dt: f64) -> KinematicState {
    KinematicState::new(
        start.position + start.velocity * dt + 0.5 * G * dt * dt,
        start.velocity + G * dt,
    )
}

fn assert_reflected(start: KinematicState, t_prev: f64, refinement: &Refinement) {
    let pre_collision_velocity = start.velocity + G * (refinement.time - t_prev);
    assert!(
        (refinement.state.velocity + pre_collision_velocity).abs() < 1e-9,
        "velocity not reflected: {refinement:?}, v(t_c) = {pre_collision_velocity}"
    );
}

#[test]
fn dropped_ball_constant_acceleration() {
    let (before, after) = dropped_from_ten();
    let params = RefineParams::new(1.0, G, EPSILON).with_model(FallModel::ConstantAcceleration);

    let refinement = refine_collision(before, after, 1.0, &params).unwrap();

    assert!(refinement.state.position.abs() <= EPSILON, "{refinement:?}");
    assert!(
        (refinement.time - (20.0f64 / 9.8).sqrt()).abs() < 1e-6,
        "{refinement:?}"
    );
    assert!((refinement.state.velocity - 14.0).abs() < 1e-6, "{refinement:?}");
    assert_reflected(before, 1.0, &refinement);
    assert_eq!(refinement.iterations, 22);
}

/// The default model overestimates the distance fallen at each midpoint, and with a step
/// this large the bracket collapses onto a point above the floor.
#[test]
fn dropped_ball_updated_velocity_does_not_converge() {
    let (before, after) = dropped_from_ten();
    let params = RefineParams::new(1.0, G, EPSILON);
    assert_eq!(params.model, FallModel::UpdatedVelocity);

    let error = refine_collision(before, after, 1.0, &params).unwrap_err();

    let RefineError::ConvergenceFailure { iterations, last } = error else {
        panic!("unexpected error {error:?}");
    };
    assert_eq!(iterations, 100);
    assert_eq!(last.iterations, 100);
    assert_eq!(last.time, 1.375);
    assert!((last.state.position - 0.046875).abs() < 1e-12, "{last:?}");
    assert!((last.state.velocity - 13.475).abs() < 1e-12, "{last:?}");
    assert_eq!(error.fallback(), Some(last));
}

#[test]
fn updated_velocity_small_step() {
    // One 0.05 s step from 0.01 above the floor, falling at 3 m/s.
    let before = KinematicState::new(0.01, -3.0);
    let after = advance(before, 0.05);
    let params = RefineParams::new(0.05, G, EPSILON);

    let refinement = refine_collision(before, after, 2.0, &params).unwrap();

    assert!(refinement.state.position.abs() <= EPSILON, "{refinement:?}");
    assert!(refinement.time > 2.0 && refinement.time < 2.05, "{refinement:?}");
    assert!(refinement.state.velocity > 0.0);
    assert_reflected(before, 2.0, &refinement);
}

/// Grid of falling states, each stepped far enough to end below the floor.
fn grid_cases(dt: f64) -> Vec<(KinematicState, KinematicState)> {
    let mut cases = Vec::new();
    for y0 in [0.05, 0.3, 1.0, 2.5, 7.0] {
        for v0 in [0.0, -0.5, -3.0, -12.0, -40.0] {
            let before = KinematicState::new(y0, v0);
            let after = advance(before, dt);
            if after.position < FLOOR {
                cases.push((before, after));
            }
        }
    }
    cases
}

fn check_grid(model: FallModel, dt: f64, expected_cases: usize) {
    let cases = grid_cases(dt);
    assert_eq!(cases.len(), expected_cases);
    let params = RefineParams::new(dt, G, EPSILON).with_model(model);

    let mut failures = MultiFailure::new();
    for (before, after) in cases {
        failures.case(format_args!("{before:?}"), move || {
            let refinement = match refine_collision(before, after, 0.0, &params) {
                Ok(r) => r,
                Err(e) => panic!("{before:?} -> {after:?}: {e}"),
            };
            assert!(
                refinement.state.position.abs() <= EPSILON,
                "{before:?}: {refinement:?}"
            );
            assert!(
                refinement.time >= 0.0 && refinement.time <= dt,
                "{before:?}: {refinement:?}"
            );
            assert_reflected(before, 0.0, &refinement);
        });
    }
    assert_eq!(failures.cases(), expected_cases);
}

#[test]
fn grid_converges_constant_acceleration() {
    check_grid(FallModel::ConstantAcceleration, 0.5, 20);
}

#[test]
fn grid_converges_updated_velocity_small_step() {
    check_grid(FallModel::UpdatedVelocity, 0.05, 6);
}

#[rstest]
fn corrected_state_is_returned_unchanged(
    #[values(FallModel::UpdatedVelocity, FallModel::ConstantAcceleration)] model: FallModel,
) {
    let (before, after) = dropped_from_ten();
    let params = RefineParams::new(1.0, G, EPSILON).with_model(FallModel::ConstantAcceleration);
    let first = refine_collision(before, after, 1.0, &params).unwrap();

    let params = params.with_model(model);
    let again = refine_collision(first.state, advance(first.state, 1.0), first.time, &params)
        .unwrap();

    assert_eq!(
        again,
        Refinement {
            state: first.state,
            time: first.time,
            iterations: 0,
        }
    );
}

#[test]
fn zero_dt_is_degenerate() {
    let (before, after) = dropped_from_ten();
    let params = RefineParams::new(0.0, G, EPSILON);
    assert_eq!(
        refine_collision(before, after, 3.0, &params),
        Ok(Refinement {
            state: before,
            time: 3.0,
            iterations: 0,
        })
    );
}

#[test]
fn landing_exactly_on_floor_is_not_refined() {
    let before = KinematicState::new(4.9, 0.0);
    let after = KinematicState::new(0.0, -9.8);
    let params = RefineParams::new(1.0, G, EPSILON);
    let mut steps = 0;
    let result = refine_collision_traced(before, after, 0.0, &params, |_| steps += 1);
    assert_eq!(
        result,
        Ok(Refinement {
            state: after,
            time: 1.0,
            iterations: 0,
        })
    );
    assert_eq!(steps, 0);
}

#[rstest]
fn bracket_halves_and_endpoint_height_does_not_grow(
    #[values(FallModel::UpdatedVelocity, FallModel::ConstantAcceleration)] model: FallModel,
) {
    let (before, after) = dropped_from_ten();
    let params = RefineParams::new(1.0, G, EPSILON).with_model(model);
    let mut steps: Vec<RefineStep> = Vec::new();
    let result = refine_collision_traced(before, after, 1.0, &params, |step| steps.push(step));

    let iterations = match result {
        Ok(r) => r.iterations,
        Err(e) => e.fallback().unwrap().iterations,
    };
    assert_eq!(steps.len(), iterations as usize);
    assert_eq!(steps[0].width(), 1.0);
    for (i, pair) in steps.windows(2).enumerate() {
        let [previous, next] = pair else {
            unreachable!()
        };
        assert_eq!(next.iteration, previous.iteration + 1);
        assert!(
            (next.width() - previous.width() / 2.0).abs() <= 1e-15,
            "step {i}: {previous:?} -> {next:?}"
        );
        assert!(
            next.max_endpoint_height() <= previous.max_endpoint_height() + 1e-12,
            "step {i}: {previous:?} -> {next:?}"
        );
    }
}

#[test]
fn observer_sees_midpoint_heights() {
    let (before, after) = dropped_from_ten();
    let params = RefineParams::new(1.0, G, EPSILON).with_model(FallModel::ConstantAcceleration);
    let mut first = None;
    let result = refine_collision_traced(before, after, 1.0, &params, |step| {
        first.get_or_insert(step);
    });
    assert!(result.is_ok());
    let first = first.unwrap();
    assert_eq!((first.lo, first.hi, first.mid), (0.0, 1.0, 0.5));
    assert_eq!(first.lo_height, 5.1);
    assert!((first.hi_height - -9.6).abs() < 1e-12, "{first:?}");
    assert!((first.mid_height - -1.025).abs() < 1e-12, "{first:?}");
}

#[test]
fn iteration_limit() {
    let (before, after) = dropped_from_ten();
    let params = RefineParams::new(1.0, G, EPSILON)
        .with_model(FallModel::ConstantAcceleration)
        .with_max_iterations(5);
    let error = refine_collision(before, after, 1.0, &params).unwrap_err();
    assert!(
        matches!(error, RefineError::ConvergenceFailure { iterations: 5, .. }),
        "{error:?}"
    );
    assert_eq!(error.fallback().unwrap().iterations, 5);
}

#[test]
fn zero_iterations_falls_back_to_start_of_step() {
    let (before, after) = dropped_from_ten();
    let params = RefineParams::new(1.0, G, EPSILON).with_max_iterations(0);
    assert_eq!(
        refine_collision(before, after, 1.0, &params),
        Err(RefineError::ConvergenceFailure {
            iterations: 0,
            last: Refinement {
                state: KinematicState::new(5.1, 9.8),
                time: 1.0,
                iterations: 0,
            },
        })
    );
}

#[test]
fn deadline_asap_stops_after_one_iteration() {
    let (before, after) = dropped_from_ten();
    let params = RefineParams::new(1.0, G, EPSILON)
        .with_model(FallModel::ConstantAcceleration)
        .with_deadline(Deadline::Asap);
    let error = refine_collision(before, after, 1.0, &params).unwrap_err();
    let last = error.fallback().unwrap();
    assert_eq!(last.iterations, 1);
    assert_eq!(last.time, 1.5);
}

#[rstest]
#[case::position(KinematicState::new(f64::NAN, -1.0), KinematicState::new(-1.0, -2.0), 1.0)]
#[case::velocity(KinematicState::new(1.0, f64::INFINITY), KinematicState::new(-1.0, -2.0), 1.0)]
#[case::after(KinematicState::new(1.0, -1.0), KinematicState::new(f64::NEG_INFINITY, -2.0), 1.0)]
#[case::dt(KinematicState::new(1.0, -1.0), KinematicState::new(-1.0, -2.0), f64::NAN)]
fn non_finite_input(
    #[case] before: KinematicState,
    #[case] after: KinematicState,
    #[case] dt: f64,
) {
    let params = RefineParams::new(dt, G, EPSILON);
    let error = refine_collision(before, after, 0.0, &params).unwrap_err();
    assert_eq!(error, RefineError::NonFinite);
    assert_eq!(error.fallback(), None);
}

#[test]
fn error_display() {
    let error = RefineError::ConvergenceFailure {
        iterations: 100,
        last: Refinement {
            state: KinematicState::new(0.5, 1.0),
            time: 1.0,
            iterations: 100,
        },
    };
    assert_eq!(
        error.to_string(),
        "collision time did not converge after 100 iterations (last height 0.5)"
    );
}

#[test]
fn kinematic_state_debug() {
    assert_eq!(
        format!("{:?}", KinematicState::new(1.5, -0.25)),
        "KinematicState { position: +1.500, velocity: -0.250 }"
    );
}
