use crate::field::ParticleField;
use crate::ParticleParams;
use rand::{rngs::SmallRng, Rng};

/// Nominal clock advance per animation tick. The clock is not wall-time
/// accurate on purpose: every amplitude below was tuned against this fixed
/// increment, so playback tracks display refresh rather than real seconds.
pub const TIME_STEP: f32 = 0.016;

const BREATHING_AMPLITUDE: f32 = 1.5;
const BREATHING_SPEED: f32 = 1.2;
const BREATHING_SCALE: f32 = 0.02;
const SPIRAL_WAVE_SPEED: f32 = 0.8;
const SPIRAL_WAVE_FREQUENCY: f32 = 3.0;
const SPIRAL_WAVE_AMPLITUDE: f32 = 0.8;
const VERTICAL_WAVE_SPEED: f32 = 1.5;
const VERTICAL_WAVE_FREQUENCY: f32 = 0.05;
const VERTICAL_WAVE_AMPLITUDE: f32 = 0.6;
/// Cursor influence reaches this many radii, widened by pointer speed.
const MOUSE_RADIUS_FACTOR: f32 = 1.5;
const MOUSE_FORCE_SCALE: f32 = 1.5;
const TIME_WAVE_AMPLITUDE: f32 = 0.2;
const HOVER_SPIRAL_STRENGTH: f32 = 15.0;
const HOVER_PUSH_STRENGTH: f32 = 10.0;

/// Interaction snapshot the integrator reads once per frame. Pointer events
/// only ever write the fields this is built from, so the frame tick always
/// sees a consistent view without locking.
#[derive(Clone, Copy, Debug)]
pub struct FrameInput {
  pub time: f32,
  /// World point under the cursor on the z = 0 plane.
  pub focus: [f32; 3],
  pub pointer_speed: f32,
  pub hovering: bool,
  pub dispersing: bool,
}

impl FrameInput {
  /// A frame with no pointer anywhere near the field.
  #[must_use]
  pub fn calm(time: f32) -> Self {
    Self {
      time,
      focus: [f32::MAX, f32::MAX, 0.0],
      pointer_speed: 0.0,
      hovering: false,
      dispersing: false,
    }
  }
}

/// Organic displacement of the rest position: breathing, a rotating spiral
/// ripple and a traveling vertical wave, all scaled by normalized distance
/// from center so the core barely moves while the shell sways.
#[must_use]
pub fn organic_target(rest: [f32; 3], time: f32, radius: f32, motion_scale: f32) -> [f32; 3] {
  let breathing = (time * BREATHING_SPEED).sin() * BREATHING_AMPLITUDE;
  let angle = rest[0].atan2(rest[1]);
  let spiral =
    (angle * SPIRAL_WAVE_FREQUENCY + time * SPIRAL_WAVE_SPEED).sin() * SPIRAL_WAVE_AMPLITUDE;
  let vertical = (rest[1] * VERTICAL_WAVE_FREQUENCY + time * VERTICAL_WAVE_SPEED).sin()
    * VERTICAL_WAVE_AMPLITUDE;

  let norm = (rest[0] * rest[0] + rest[1] * rest[1] + rest[2] * rest[2]).sqrt() / radius;
  let scale = 1.0 + breathing * norm * BREATHING_SCALE * motion_scale;
  let wave = (spiral + vertical) * norm * motion_scale;
  [
    rest[0] * scale + wave,
    rest[1] * scale + wave,
    rest[2] * scale + wave,
  ]
}

/// Blast-apart target used during the one-shot dispersal: the organic terms
/// are dropped entirely in favor of a large uniform jitter around rest.
#[must_use]
pub fn disperse_target(rest: [f32; 3], disperse_distance: f32, rng: &mut SmallRng) -> [f32; 3] {
  [
    rest[0] + (rng.gen::<f32>() - 0.5) * disperse_distance,
    rest[1] + (rng.gen::<f32>() - 0.5) * disperse_distance,
    rest[2] + (rng.gen::<f32>() - 0.5) * disperse_distance,
  ]
}

/// High-frequency per-particle noise folded straight into velocity. Phase
/// comes from the particle index so neighbors stay decorrelated.
#[must_use]
pub fn turbulence(index: usize, time: f32, hovering: bool) -> f32 {
  let i = index as f32;
  if hovering {
    (time * 3.0 + i * 0.1).sin() * 0.025 + (time * 2.0 + i * 0.05).cos() * 0.025
  } else {
    (time + i * 0.05).sin() * 0.005
  }
}

impl ParticleField {
  /// Advance every particle one tick: recompute the target from the rest
  /// shape plus all active effects, then forward-Euler a damped spring
  /// toward it. Stable for damping < 1 and spring strength well under 1.
  pub fn step(&mut self, params: &ParticleParams, input: &FrameInput, rng: &mut SmallRng) {
    let spring = if input.dispersing {
      params.spring_dispersing
    } else {
      params.spring_normal
    };
    let damping = if input.dispersing {
      params.damping_dispersing
    } else {
      params.damping_normal
    };
    let influence_strength = if input.hovering {
      params.mouse_hover
    } else {
      params.mouse_normal
    };
    let mouse_radius = params.radius * MOUSE_RADIUS_FACTOR + input.pointer_speed * 2.0;

    for i in 0..self.count() {
      let idx = i * 3;
      let pos = [
        self.positions[idx],
        self.positions[idx + 1],
        self.positions[idx + 2],
      ];
      let rest = [self.rest[idx], self.rest[idx + 1], self.rest[idx + 2]];

      let mut target = if input.dispersing {
        disperse_target(rest, params.disperse_distance, rng)
      } else {
        organic_target(rest, input.time, params.radius, params.motion_scale)
      };

      let dx = pos[0] - input.focus[0];
      let dy = pos[1] - input.focus[1];
      let dz = pos[2] - input.focus[2];
      let distance = (dx * dx + dy * dy + dz * dz).sqrt();
      // Zero distance means no usable direction; skip the push rather than
      // letting a division send NaN through the buffers.
      let dir = if distance > f32::EPSILON {
        [dx / distance, dy / distance, dz / distance]
      } else {
        [0.0; 3]
      };

      let influence = (1.0 - distance / mouse_radius).max(0.0).powi(2);
      let force =
        influence * influence_strength * (1.0 + input.pointer_speed * 0.5) * MOUSE_FORCE_SCALE;
      let time_wave =
        (input.time * 2.0 + i as f32 * 1e-4).sin() * TIME_WAVE_AMPLITUDE * params.motion_scale;
      for axis in 0..3 {
        target[axis] += dir[axis] * (force + time_wave);
      }

      if input.hovering && !input.dispersing {
        let spiral_angle = input.time * 2.0 + dy.atan2(dx);
        target[0] += spiral_angle.cos() * HOVER_SPIRAL_STRENGTH * influence;
        target[1] += spiral_angle.sin() * HOVER_SPIRAL_STRENGTH * influence;
        for axis in 0..3 {
          target[axis] += dir[axis] * HOVER_PUSH_STRENGTH * influence;
        }
      }

      let turb = turbulence(i, input.time, input.hovering) * params.motion_scale;
      for axis in 0..3 {
        self.targets[idx + axis] = target[axis];
        let spring_force = (target[axis] - pos[axis]) * spring;
        self.velocities[idx + axis] = (self.velocities[idx + axis] + spring_force + turb) * damping;
        self.positions[idx + axis] += self.velocities[idx + axis];
      }
    }
  }
}

/// Eased rotation of the whole field toward an angle set by the pointer.
/// Exponential smoothing, not a spring: a fixed fraction of the remaining
/// error closes every frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct Rotation {
  pub x: f32,
  pub y: f32,
}

impl Rotation {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  pub fn ease_toward(&mut self, pointer_ndc: [f32; 2], smoothing: f32) {
    let target_y = pointer_ndc[0] * 0.3;
    let target_x = -pointer_ndc[1] * 0.3;
    self.y += (target_y - self.y) * smoothing;
    self.x += (target_x - self.x) * smoothing;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{ParticleParams, Spawn};
  use rand::SeedableRng;

  fn still_params(count: u32, radius: f32) -> ParticleParams {
    ParticleParams {
      count,
      radius,
      mouse_normal: 0.0,
      mouse_hover: 0.0,
      motion_scale: 0.0,
      ..ParticleParams::default()
    }
  }

  #[test]
  fn target_equals_rest_when_everything_is_off() {
    let params = still_params(64, 30.0);
    let mut field = ParticleField::new(&params).unwrap();
    let mut rng = SmallRng::seed_from_u64(7);
    field.step(&params, &FrameInput::calm(3.2), &mut rng);
    for i in 0..field.count() * 3 {
      assert!(
        (field.targets[i] - field.rest[i]).abs() < 1e-6,
        "target drifted from rest at slot {i}"
      );
    }
  }

  #[test]
  fn positions_converge_to_rest_without_forces() {
    let params = still_params(64, 30.0);
    let mut field = ParticleField::new(&params).unwrap();
    let mut rng = SmallRng::seed_from_u64(7);
    for tick in 0..500 {
      field.step(&params, &FrameInput::calm(tick as f32 * TIME_STEP), &mut rng);
    }
    for i in 0..field.count() * 3 {
      assert!(
        (field.positions[i] - field.rest[i]).abs() < 1e-3,
        "slot {i} did not settle"
      );
    }
  }

  #[test]
  fn positions_stay_bounded_under_sustained_normal_regime() {
    let params = ParticleParams {
      count: 200,
      ..ParticleParams::default()
    };
    let mut field = ParticleField::new(&params).unwrap();
    let mut rng = SmallRng::seed_from_u64(7);
    let bound = params.radius * 6.0;
    for tick in 0..2_000 {
      let input = FrameInput {
        time: tick as f32 * TIME_STEP,
        focus: [10.0, -5.0, 0.0],
        pointer_speed: 0.4,
        hovering: tick % 300 < 150,
        dispersing: false,
      };
      field.step(&params, &input, &mut rng);
    }
    for (slot, p) in field.positions.iter().enumerate() {
      assert!(p.is_finite(), "non-finite position at slot {slot}");
      assert!(p.abs() < bound, "runaway position {p} at slot {slot}");
    }
  }

  #[test]
  fn zero_distance_to_focus_is_guarded() {
    let params = ParticleParams {
      count: 4,
      ..ParticleParams::default()
    };
    let mut field = ParticleField::new(&params).unwrap();
    let focus = [
      field.positions[0],
      field.positions[1],
      field.positions[2],
    ];
    let input = FrameInput {
      time: 0.5,
      focus,
      pointer_speed: 2.0,
      hovering: true,
      dispersing: false,
    };
    let mut rng = SmallRng::seed_from_u64(7);
    field.step(&params, &input, &mut rng);
    assert!(field.positions.iter().all(|p| p.is_finite()));
    assert!(field.velocities.iter().all(|v| v.is_finite()));
  }

  #[test]
  fn disperse_target_jitters_around_rest() {
    let mut rng = SmallRng::seed_from_u64(7);
    let rest = [3.0, -4.0, 5.0];
    let mut saw_difference = false;
    for _ in 0..32 {
      let t = disperse_target(rest, 200.0, &mut rng);
      for axis in 0..3 {
        assert!((t[axis] - rest[axis]).abs() <= 100.0);
        if (t[axis] - rest[axis]).abs() > 1.0 {
          saw_difference = true;
        }
      }
    }
    assert!(saw_difference);
  }

  #[test]
  fn buffers_keep_length_across_frames() {
    let params = ParticleParams {
      count: 128,
      spawn: Spawn::Scatter { spread: 80.0 },
      ..ParticleParams::default()
    };
    let mut field = ParticleField::new(&params).unwrap();
    let mut rng = SmallRng::seed_from_u64(7);
    for tick in 0..50 {
      field.step(&params, &FrameInput::calm(tick as f32 * TIME_STEP), &mut rng);
      assert_eq!(field.positions.len(), 128 * 3);
      assert_eq!(field.velocities.len(), 128 * 3);
      assert_eq!(field.colors().len(), 128 * 3);
    }
  }

  #[test]
  fn organic_motion_scales_with_distance_from_center() {
    let time = 1.7;
    let near = organic_target([0.5, 0.5, 0.0], time, 30.0, 1.0);
    let far = organic_target([20.0, 20.0, 0.0], time, 30.0, 1.0);
    let near_shift = (near[2] - 0.0).abs();
    let far_shift = (far[2] - 0.0).abs();
    // The z component only moves through the wave terms, which grow with
    // normalized distance.
    assert!(far_shift > near_shift);
  }

  #[test]
  fn rotation_eases_toward_pointer_angle() {
    let mut rot = Rotation::new();
    for _ in 0..600 {
      rot.ease_toward([1.0, -0.5], 0.02);
    }
    assert!((rot.y - 0.3).abs() < 1e-3);
    assert!((rot.x - 0.15).abs() < 1e-3);
  }

  #[test]
  fn hover_turbulence_is_stronger() {
    let mut calm_max = 0.0f32;
    let mut hover_max = 0.0f32;
    for i in 0..200 {
      calm_max = calm_max.max(turbulence(i, i as f32 * 0.1, false).abs());
      hover_max = hover_max.max(turbulence(i, i as f32 * 0.1, true).abs());
    }
    assert!(hover_max > calm_max);
  }
}
