//! End-to-end scenarios over the public simulation API: the field is built
//! from a scene-style configuration and stepped like the frame loop would,
//! without any GPU involvement.

use nebula_sim::field::ParticleField;
use nebula_sim::forces::{FrameInput, TIME_STEP};
use nebula_sim::interaction::{InteractionState, Phase};
use nebula_sim::{ParticleParams, Spawn};
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn quiet_params() -> ParticleParams {
  ParticleParams {
    count: 100,
    radius: 10.0,
    spring_normal: 0.02,
    damping_normal: 0.95,
    mouse_normal: 0.0,
    mouse_hover: 0.0,
    motion_scale: 0.0,
    ..ParticleParams::default()
  }
}

#[test]
fn settles_onto_rest_shape_within_five_hundred_ticks() {
  let params = quiet_params();
  let mut field = ParticleField::new(&params).unwrap();
  let mut rng = SmallRng::seed_from_u64(1);

  for tick in 0..500 {
    let input = FrameInput::calm(tick as f32 * TIME_STEP);
    field.step(&params, &input, &mut rng);
  }

  let positions = field.positions();
  let rest = field.rest_positions();
  for i in 0..positions.len() {
    assert!(
      (positions[i] - rest[i]).abs() < 1e-3,
      "slot {i}: {} vs rest {}",
      positions[i],
      rest[i]
    );
  }
}

#[test]
fn scattered_spawn_converges_into_the_sphere() {
  // Portfolio-style entrance: wide flat scatter pulled into a sphere by
  // the same spring that animates the settled state.
  let params = ParticleParams {
    spawn: Spawn::Scatter { spread: 24.0 },
    ..quiet_params()
  };
  let mut field = ParticleField::new(&params).unwrap();
  let mut rng = SmallRng::seed_from_u64(1);

  let offset = |field: &ParticleField| {
    let positions = field.positions();
    let rest = field.rest_positions();
    positions
      .iter()
      .zip(rest)
      .map(|(p, r)| (p - r).abs())
      .fold(0.0f32, f32::max)
  };

  let before = offset(&field);
  assert!(before > 1.0, "scatter should start off the sphere");

  for tick in 0..600 {
    field.step(&params, &FrameInput::calm(tick as f32 * TIME_STEP), &mut rng);
  }
  assert!(offset(&field) < 1e-2);
}

#[test]
fn dispersal_blasts_the_field_apart_and_stays_one_shot() {
  let params = ParticleParams {
    count: 200,
    radius: 10.0,
    disperse_distance: 200.0,
    ..ParticleParams::default()
  };
  let mut field = ParticleField::new(&params).unwrap();
  let mut interaction = InteractionState::new();
  let mut rng = SmallRng::seed_from_u64(1);
  let mut clock = 0.0f32;

  // Settle briefly in the normal regime.
  for _ in 0..100 {
    clock += TIME_STEP;
    field.step(&params, &interaction.frame_input(clock), &mut rng);
    interaction.end_frame();
  }

  assert!(interaction.trigger_disperse());
  assert!(!interaction.trigger_disperse(), "re-trigger must be ignored");
  assert_eq!(interaction.phase(), Phase::Dispersing);

  let mut shutdown_signals = 0;
  for _ in 0..120 {
    clock += TIME_STEP;
    field.step(&params, &interaction.frame_input(clock), &mut rng);
    if interaction.end_frame() {
      shutdown_signals += 1;
    }
  }
  assert_eq!(shutdown_signals, 1, "shutdown must fire exactly once");

  // The ensemble should have blown well past the rest sphere by now.
  let max_offset = field
    .positions()
    .iter()
    .zip(field.rest_positions())
    .map(|(p, r)| (p - r).abs())
    .fold(0.0f32, f32::max);
  assert!(max_offset > params.radius, "dispersal too tame: {max_offset}");

  // Everything stays finite even under the violent regime.
  assert!(field.positions().iter().all(|p| p.is_finite()));
}

#[test]
fn long_run_with_pointer_activity_stays_bounded() {
  let params = ParticleParams {
    count: 300,
    ..ParticleParams::default()
  };
  let mut field = ParticleField::new(&params).unwrap();
  let mut interaction = InteractionState::new();
  let mut rng = SmallRng::seed_from_u64(1);
  let mut clock = 0.0f32;

  for tick in 0..3_000u32 {
    // Sweep the pointer around the scene, crossing the hover zone.
    let angle = tick as f32 * 0.01;
    let ndc = [angle.cos() * 0.7, angle.sin() * 0.7];
    let focus = [ndc[0] * params.radius, ndc[1] * params.radius, 0.0];
    interaction.pointer_moved(ndc, focus);

    clock += TIME_STEP;
    field.step(&params, &interaction.frame_input(clock), &mut rng);
    interaction.end_frame();
  }

  let bound = params.radius * 6.0;
  for p in field.positions() {
    assert!(p.is_finite() && p.abs() < bound, "position {p} escaped");
  }
}
