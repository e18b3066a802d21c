pub mod camera;
pub mod field;
pub mod forces;
pub mod interaction;
pub mod render;
pub mod state;

/// How the particles enter the scene before settling on the rest sphere.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Spawn {
  /// Start directly on the rest shape with a small velocity jitter.
  Shell,
  /// Start in a wide flat scatter; the spring pulls everything into the
  /// sphere over the first couple of seconds.
  Scatter { spread: f32 },
}

#[derive(Clone, Debug)]
pub struct ParticleParams {
  pub count: u32,
  pub radius: f32,
  pub base_size: f32,
  /// Clear color, sRGB components in 0..1.
  pub background: [f64; 3],
  pub base_hue: f32,
  pub hue_range: f32,
  pub base_saturation: f32,
  pub base_lightness: f32,
  pub spring_normal: f32,
  pub spring_dispersing: f32,
  pub damping_normal: f32,
  pub damping_dispersing: f32,
  pub mouse_normal: f32,
  pub mouse_hover: f32,
  pub rotation_smoothing: f32,
  pub disperse_distance: f32,
  /// Scales breathing, waves and turbulence together. 1.0 is the tuned
  /// look; 0.0 freezes all organic motion and leaves a pure damped spring.
  pub motion_scale: f32,
  pub spawn: Spawn,
}

impl Default for ParticleParams {
  fn default() -> Self {
    Self {
      count: 15_000,
      radius: 30.0,
      base_size: 4.33,
      background: [0x0a as f64 / 255.0, 0x19 as f64 / 255.0, 0x2f as f64 / 255.0],
      base_hue: 0.35,
      hue_range: 0.1,
      base_saturation: 0.8,
      base_lightness: 0.6,
      spring_normal: 0.02,
      spring_dispersing: 0.01,
      damping_normal: 0.95,
      damping_dispersing: 0.98,
      mouse_normal: 25.0,
      mouse_hover: 35.0,
      rotation_smoothing: 0.02,
      disperse_distance: 200.0,
      motion_scale: 1.0,
      spawn: Spawn::Shell,
    }
  }
}

#[derive(Clone, Copy, Debug)]
pub struct CameraParams {
  pub fov: f32,
  pub near: f32,
  pub far: f32,
  pub z: f32,
}

impl Default for CameraParams {
  fn default() -> Self {
    Self {
      fov: 60.0,
      near: 0.1,
      far: 2000.0,
      z: 120.0,
    }
  }
}

impl CameraParams {
  /// Radius of a sphere that fills the viewport when centered at the origin.
  #[must_use]
  pub fn fill_radius(&self, aspect: f32) -> f32 {
    let half_height = self.z * (self.fov.to_radians() / 2.0).tan();
    half_height * aspect.max(1.0)
  }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScenePreset {
  Welcome,
  Portfolio,
  Contact,
}

impl ScenePreset {
  #[must_use]
  pub fn name(self) -> &'static str {
    match self {
      ScenePreset::Welcome => "welcome",
      ScenePreset::Portfolio => "portfolio",
      ScenePreset::Contact => "contact",
    }
  }

  /// Build the full scene configuration. `aspect` only matters for the
  /// viewport-filling presets.
  #[must_use]
  pub fn config(self, aspect: f32) -> SceneConfig {
    let camera = CameraParams::default();
    let particles = match self {
      // Landing screen: green nebula palette, compact radius.
      ScenePreset::Welcome => ParticleParams::default(),
      // Portfolio and contact share the same dynamics with a neutral icy
      // palette, a screen-filling sphere and triple point size; particles
      // converge from a wide scatter instead of starting in place.
      ScenePreset::Portfolio | ScenePreset::Contact => {
        let radius = camera.fill_radius(aspect);
        ParticleParams {
          radius,
          base_size: 4.33 * 3.0,
          base_hue: 0.55,
          hue_range: 0.02,
          base_saturation: 0.3,
          base_lightness: 0.8,
          spawn: Spawn::Scatter {
            spread: radius * 1.2,
          },
          ..ParticleParams::default()
        }
      }
    };
    SceneConfig {
      name: self.name(),
      particles,
      camera,
    }
  }
}

#[derive(Clone, Debug)]
pub struct SceneConfig {
  pub name: &'static str,
  pub particles: ParticleParams,
  pub camera: CameraParams,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fill_radius_covers_half_height() {
    let camera = CameraParams::default();
    let half_height = camera.z * (camera.fov.to_radians() / 2.0).tan();
    assert!((camera.fill_radius(1.0) - half_height).abs() < 1e-4);
    // Wide viewports scale the radius by aspect, narrow ones do not shrink it.
    assert!(camera.fill_radius(1.8) > camera.fill_radius(1.0));
    assert!((camera.fill_radius(0.5) - half_height).abs() < 1e-4);
  }

  #[test]
  fn presets_differ_where_expected() {
    let welcome = ScenePreset::Welcome.config(1.5);
    let portfolio = ScenePreset::Portfolio.config(1.5);
    assert_eq!(welcome.particles.spawn, Spawn::Shell);
    assert!(matches!(portfolio.particles.spawn, Spawn::Scatter { .. }));
    assert!(portfolio.particles.radius > welcome.particles.radius);
    assert!(portfolio.particles.base_size > welcome.particles.base_size);
    assert_eq!(
      welcome.particles.spring_normal,
      portfolio.particles.spring_normal
    );
  }
}
