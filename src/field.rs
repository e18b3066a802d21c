use crate::{ParticleParams, Spawn};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::f32::consts::PI;
use std::fmt;

/// Fraction of particles placed in the outer shell near the configured
/// radius; the rest fill the interior.
pub const SHELL_RATIO: f32 = 0.8;
/// Radial jitter applied to shell particles, as a fraction of the radius.
const SHELL_JITTER: f32 = 0.1;
/// Interior particles land between these fractions of the radius.
const CORE_MIN: f32 = 0.45;
const CORE_SPAN: f32 = 0.4;

#[derive(Debug, PartialEq)]
pub enum ConfigError {
  ZeroCount,
  NonPositiveRadius(f32),
  InvalidSpread(f32),
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::ZeroCount => write!(f, "particle count must be greater than zero"),
      ConfigError::NonPositiveRadius(r) => {
        write!(f, "sphere radius must be positive, got {r}")
      }
      ConfigError::InvalidSpread(s) => {
        write!(f, "scatter spread must be a non-negative number, got {s}")
      }
    }
  }
}

impl std::error::Error for ConfigError {}

/// The particle ensemble as parallel flat buffers, `3 * count` floats each,
/// particle `i` occupying slots `[3i, 3i + 3)` in every buffer. The layout
/// is what the GPU wants for bulk upload, so it never changes shape after
/// construction.
pub struct ParticleField {
  count: usize,
  pub(crate) positions: Vec<f32>,
  pub(crate) rest: Vec<f32>,
  pub(crate) targets: Vec<f32>,
  pub(crate) velocities: Vec<f32>,
  colors: Vec<f32>,
}

impl ParticleField {
  pub fn new(params: &ParticleParams) -> Result<Self, ConfigError> {
    Self::with_rng(params, &mut SmallRng::seed_from_u64(42))
  }

  pub fn with_rng(params: &ParticleParams, rng: &mut SmallRng) -> Result<Self, ConfigError> {
    if params.count == 0 {
      return Err(ConfigError::ZeroCount);
    }
    if params.radius <= 0.0 {
      return Err(ConfigError::NonPositiveRadius(params.radius));
    }

    let count = params.count as usize;
    let mut positions = vec![0.0f32; count * 3];
    let mut rest = vec![0.0f32; count * 3];
    let mut velocities = vec![0.0f32; count * 3];
    let mut colors = vec![0.0f32; count * 3];

    let depth = match params.spawn {
      Spawn::Scatter { spread } => {
        // Normal accepts a negative std_dev (samples are reflected), so a
        // bad spread has to be caught here, not by the constructor. The
        // negated comparison also rejects NaN.
        if !(spread >= 0.0) {
          return Err(ConfigError::InvalidSpread(spread));
        }
        Some(Normal::new(0.0f32, spread * 0.25).map_err(|_| ConfigError::InvalidSpread(spread))?)
      }
      Spawn::Shell => None,
    };

    for i in 0..count {
      let idx = i * 3;
      let [x, y, z] = sample_rest_position(rng, params.radius);
      rest[idx] = x;
      rest[idx + 1] = y;
      rest[idx + 2] = z;

      match params.spawn {
        Spawn::Shell => {
          positions[idx] = x;
          positions[idx + 1] = y;
          positions[idx + 2] = z;
          for axis in 0..3 {
            velocities[idx + axis] = (rng.gen::<f32>() - 0.5) * 0.05;
          }
        }
        Spawn::Scatter { spread } => {
          // Flat ring scatter with a soft depth spread; velocity starts at
          // rest so the convergence reads as a single sweep inward.
          let angle = rng.gen::<f32>() * 2.0 * PI;
          let reach = spread * (0.5 + rng.gen::<f32>() * 0.5);
          positions[idx] = angle.cos() * reach;
          positions[idx + 1] = angle.sin() * reach;
          positions[idx + 2] = depth.as_ref().map_or(0.0, |d| d.sample(rng));
        }
      }

      let distance = (x * x + y * y + z * z).sqrt() / params.radius;
      let hue = params.base_hue + distance * params.hue_range;
      let saturation = (params.base_saturation - distance * 0.3).max(0.0);
      let lightness = (params.base_lightness + distance * 0.2).min(1.0);
      let [r, g, b] = hsl_to_rgb(hue, saturation, lightness);
      colors[idx] = r;
      colors[idx + 1] = g;
      colors[idx + 2] = b;
    }

    let targets = rest.clone();
    Ok(Self {
      count,
      positions,
      rest,
      targets,
      velocities,
      colors,
    })
  }

  #[must_use]
  pub fn count(&self) -> usize {
    self.count
  }

  #[must_use]
  pub fn positions(&self) -> &[f32] {
    &self.positions
  }

  #[must_use]
  pub fn rest_positions(&self) -> &[f32] {
    &self.rest
  }

  #[must_use]
  pub fn velocities(&self) -> &[f32] {
    &self.velocities
  }

  #[must_use]
  pub fn colors(&self) -> &[f32] {
    &self.colors
  }
}

/// Uniform-on-sphere direction with a shell-biased radius: `SHELL_RATIO` of
/// the particles sit in a thin jittered shell at the full radius, the rest
/// fill the interior between `CORE_MIN` and `CORE_MIN + CORE_SPAN`.
fn sample_rest_position(rng: &mut SmallRng, radius: f32) -> [f32; 3] {
  let theta = rng.gen::<f32>() * 2.0 * PI;
  let phi = (2.0 * rng.gen::<f32>() - 1.0).acos();

  let jittered = radius * (1.0 + (rng.gen::<f32>() - 0.5) * SHELL_JITTER);
  let r = if rng.gen::<f32>() < SHELL_RATIO {
    jittered
  } else {
    jittered * (CORE_MIN + rng.gen::<f32>() * CORE_SPAN)
  };

  [
    r * phi.sin() * theta.cos(),
    r * phi.sin() * theta.sin(),
    r * phi.cos(),
  ]
}

/// HSL to RGB, hue wrapping like the usual CSS/three.js conversion.
#[must_use]
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [f32; 3] {
  fn hue_channel(p: f32, q: f32, mut t: f32) -> f32 {
    t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
      p + (q - p) * 6.0 * t
    } else if t < 0.5 {
      q
    } else if t < 2.0 / 3.0 {
      p + (q - p) * 6.0 * (2.0 / 3.0 - t)
    } else {
      p
    }
  }

  if s <= 0.0 {
    return [l, l, l];
  }
  let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
  let p = 2.0 * l - q;
  [
    hue_channel(p, q, h + 1.0 / 3.0),
    hue_channel(p, q, h),
    hue_channel(p, q, h - 1.0 / 3.0),
  ]
}
