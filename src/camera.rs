use crate::CameraParams;
use cgmath::{InnerSpace, Matrix4, Point3, SquareMatrix, Vector3, Vector4};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

pub struct Camera {
  pub eye: Point3<f32>,
  pub target: Point3<f32>,
  pub up: Vector3<f32>,
  pub aspect: f32,
  pub fovy: f32,
  pub znear: f32,
  pub zfar: f32,
}

impl Camera {
  /// Camera on the +z axis looking at the origin, the fixed setup every
  /// scene uses.
  #[must_use]
  pub fn from_params(params: &CameraParams, aspect: f32) -> Self {
    Self {
      eye: (0.0, 0.0, params.z).into(),
      target: (0.0, 0.0, 0.0).into(),
      up: Vector3::unit_y(),
      aspect,
      fovy: params.fov,
      znear: params.near,
      zfar: params.far,
    }
  }

  #[must_use]
  pub fn view_matrix(&self) -> Matrix4<f32> {
    Matrix4::look_at_rh(self.eye, self.target, self.up)
  }

  #[must_use]
  pub fn projection_matrix(&self) -> Matrix4<f32> {
    OPENGL_TO_WGPU_MATRIX
      * cgmath::perspective(cgmath::Deg(self.fovy), self.aspect, self.znear, self.zfar)
  }

  /// Recompute aspect for a resized surface, ignoring degenerate sizes a
  /// minimized window reports.
  pub fn set_viewport(&mut self, width: u32, height: u32) {
    if width > 0 && height > 0 {
      self.aspect = width as f32 / height as f32;
    }
  }

  /// Cast a ray from the eye through a point in normalized device
  /// coordinates and intersect it with the z = 0 scene plane. Returns
  /// `None` when the inverse projection degenerates or the ray runs
  /// parallel to the plane.
  #[must_use]
  pub fn unproject_to_plane(&self, ndc: [f32; 2]) -> Option<[f32; 3]> {
    let inverse = (self.projection_matrix() * self.view_matrix()).invert()?;
    let clip = Vector4::new(ndc[0], ndc[1], 0.5, 1.0);
    let world = inverse * clip;
    if world.w.abs() <= f32::EPSILON {
      return None;
    }
    let point = Vector3::new(world.x / world.w, world.y / world.w, world.z / world.w);
    let origin = Vector3::new(self.eye.x, self.eye.y, self.eye.z);
    let dir = (point - origin).normalize();
    if dir.z.abs() <= f32::EPSILON {
      return None;
    }
    let t = -origin.z / dir.z;
    let hit = origin + dir * t;
    Some([hit.x, hit.y, hit.z])
  }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
  proj: [[f32; 4]; 4],
  view: [[f32; 4]; 4],
}

impl CameraUniform {
  #[must_use]
  pub fn new() -> Self {
    Self {
      proj: Matrix4::identity().into(),
      view: Matrix4::identity().into(),
    }
  }

  pub fn update(&mut self, camera: &Camera) {
    self.proj = camera.projection_matrix().into();
    self.view = camera.view_matrix().into();
  }
}

impl Default for CameraUniform {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::CameraParams;

  #[test]
  fn center_ray_hits_the_origin() {
    let camera = Camera::from_params(&CameraParams::default(), 16.0 / 9.0);
    let hit = camera.unproject_to_plane([0.0, 0.0]).unwrap();
    assert!(hit[0].abs() < 1e-3);
    assert!(hit[1].abs() < 1e-3);
    assert!(hit[2].abs() < 1e-3);
  }

  #[test]
  fn off_center_rays_land_off_center() {
    let camera = Camera::from_params(&CameraParams::default(), 1.0);
    let right = camera.unproject_to_plane([0.5, 0.0]).unwrap();
    let left = camera.unproject_to_plane([-0.5, 0.0]).unwrap();
    assert!(right[0] > 1.0);
    assert!((right[0] + left[0]).abs() < 1e-3, "expected symmetry");
    assert!(right[2].abs() < 1e-3, "hit must lie on the z = 0 plane");
    let up = camera.unproject_to_plane([0.0, 0.8]).unwrap();
    assert!(up[1] > 1.0);
  }

  #[test]
  fn degenerate_viewport_keeps_previous_aspect() {
    let mut camera = Camera::from_params(&CameraParams::default(), 2.0);
    camera.set_viewport(0, 1080);
    assert_eq!(camera.aspect, 2.0);
    camera.set_viewport(1920, 1080);
    assert!((camera.aspect - 1920.0 / 1080.0).abs() < 1e-6);
  }
}
