use crate::camera::{Camera, CameraUniform};
use crate::field::{ConfigError, ParticleField};
use crate::forces::{Rotation, TIME_STEP};
use crate::interaction::InteractionState;
use crate::render::Render;
use crate::{SceneConfig, ScenePreset};
use cgmath::{Matrix4, Rad};
use rand::{rngs::SmallRng, SeedableRng};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::{
  dpi::{PhysicalPosition, PhysicalSize},
  event::{ElementState, Event, KeyEvent, MouseButton, StartCause, WindowEvent},
  event_loop::EventLoop,
  keyboard::{KeyCode, PhysicalKey},
  window::Window,
};

/// The cursor's plane point is clamped to this many radii from center so a
/// ray grazing the horizon cannot fling the influence point to infinity.
const FOCUS_CLAMP_FACTOR: f32 = 1.6;

#[derive(Debug)]
pub enum InitError {
  Config(ConfigError),
  EventLoop(winit::error::EventLoopError),
  Window(winit::error::OsError),
  NoAdapter,
  Device(wgpu::RequestDeviceError),
  Surface(wgpu::CreateSurfaceError),
}

impl fmt::Display for InitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      InitError::Config(e) => write!(f, "invalid scene configuration: {e}"),
      InitError::EventLoop(e) => write!(f, "failed to create event loop: {e}"),
      InitError::Window(e) => write!(f, "failed to create window: {e}"),
      InitError::NoAdapter => write!(f, "no compatible GPU adapter found"),
      InitError::Device(e) => write!(f, "failed to create GPU device: {e}"),
      InitError::Surface(e) => write!(f, "failed to create surface: {e}"),
    }
  }
}

impl std::error::Error for InitError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      InitError::Config(e) => Some(e),
      InitError::EventLoop(e) => Some(e),
      InitError::Window(e) => Some(e),
      InitError::Device(e) => Some(e),
      InitError::Surface(e) => Some(e),
      InitError::NoAdapter => None,
    }
  }
}

impl From<ConfigError> for InitError {
  fn from(e: ConfigError) -> Self {
    InitError::Config(e)
  }
}

impl From<winit::error::EventLoopError> for InitError {
  fn from(e: winit::error::EventLoopError) -> Self {
    InitError::EventLoop(e)
  }
}

struct EventLoopWrapper {
  event_loop: EventLoop<()>,
  window: Arc<Window>,
}

impl EventLoopWrapper {
  fn new(title: &str) -> Result<Self, InitError> {
    let event_loop = EventLoop::new()?;
    let window = Arc::new(
      winit::window::WindowBuilder::new()
        .with_title(title)
        .build(&event_loop)
        .map_err(InitError::Window)?,
    );
    Ok(Self { event_loop, window })
  }
}

struct SurfaceWrapper {
  surface: Option<wgpu::Surface<'static>>,
  config: Option<wgpu::SurfaceConfiguration>,
}

impl SurfaceWrapper {
  fn new() -> Self {
    Self {
      surface: None,
      config: None,
    }
  }

  fn resume(&mut self, context: &SimState, window: Arc<Window>) -> Result<(), InitError> {
    let window_size = window.inner_size();
    let width = window_size.width.max(1);
    let height = window_size.height.max(1);
    let surface = context
      .instance
      .create_surface(window)
      .map_err(InitError::Surface)?;
    let mut config = surface
      .get_default_config(&context.adapter, width, height)
      .ok_or(InitError::NoAdapter)?;
    let view_format = config.format.add_srgb_suffix();
    config.view_formats.push(view_format);
    surface.configure(&context.device, &config);
    self.surface = Some(surface);
    self.config = Some(config);
    Ok(())
  }

  fn resize(&mut self, context: &SimState, size: PhysicalSize<u32>) {
    let (Some(surface), Some(config)) = (self.surface.as_ref(), self.config.as_mut()) else {
      return;
    };
    config.width = size.width.max(1);
    config.height = size.height.max(1);
    surface.configure(&context.device, config);
  }

  fn acquire(&mut self, context: &SimState) -> wgpu::SurfaceTexture {
    let surface = self.surface.as_ref().unwrap();

    match surface.get_current_texture() {
      Ok(frame) => frame,
      Err(wgpu::SurfaceError::Timeout) => surface.get_current_texture().unwrap(),
      Err(
        wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost | wgpu::SurfaceError::OutOfMemory,
      ) => {
        surface.configure(&context.device, self.config());
        surface.get_current_texture().unwrap()
      }
    }
  }

  fn suspend(&mut self) {}

  fn config(&self) -> &wgpu::SurfaceConfiguration {
    self.config.as_ref().unwrap()
  }
}

/// One simulation instance: GPU handles, camera, particle buffers and
/// interaction state, created on mount and dropped together on exit. No
/// long-lived globals survive past the event loop.
struct SimState {
  instance: wgpu::Instance,
  adapter: wgpu::Adapter,
  device: wgpu::Device,
  queue: wgpu::Queue,
  camera: Camera,
  camera_uniform: CameraUniform,
  camera_buffer: wgpu::Buffer,
  camera_bind_group: wgpu::BindGroup,
  camera_bind_group_layout: wgpu::BindGroupLayout,
  scene: SceneConfig,
  field: ParticleField,
  interaction: InteractionState,
  rotation: Rotation,
  clock: f32,
  rng: SmallRng,
}

impl SimState {
  async fn init(
    surface: &SurfaceWrapper,
    size: &PhysicalSize<u32>,
    scene: SceneConfig,
  ) -> Result<Self, InitError> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
      backends: wgpu::Backends::PRIMARY,
      ..Default::default()
    });

    let adapter = instance
      .request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::default(),
        compatible_surface: surface.surface.as_ref(),
        force_fallback_adapter: false,
      })
      .await
      .ok_or(InitError::NoAdapter)?;

    let (device, queue) = adapter
      .request_device(
        &wgpu::DeviceDescriptor {
          label: None,
          required_features: wgpu::Features::empty(),
          required_limits: wgpu::Limits::default(),
          memory_hints: Default::default(),
        },
        None,
      )
      .await
      .map_err(InitError::Device)?;

    let aspect = size.width.max(1) as f32 / size.height.max(1) as f32;
    let camera = Camera::from_params(&scene.camera, aspect);
    let mut camera_uniform = CameraUniform::new();
    camera_uniform.update(&camera);

    let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Camera Buffer"),
      contents: bytemuck::cast_slice(&[camera_uniform]),
      usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let camera_bind_group_layout =
      device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
          binding: 0,
          visibility: wgpu::ShaderStages::VERTEX,
          ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
          },
          count: None,
        }],
        label: Some("camera_bind_group_layout"),
      });
    let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
      layout: &camera_bind_group_layout,
      entries: &[wgpu::BindGroupEntry {
        binding: 0,
        resource: camera_buffer.as_entire_binding(),
      }],
      label: Some("camera_bind_group"),
    });

    let field = ParticleField::new(&scene.particles)?;
    log::info!(
      "scene '{}' ready: {} particles, radius {:.1}",
      scene.name,
      field.count(),
      scene.particles.radius
    );

    Ok(Self {
      instance,
      adapter,
      device,
      queue,
      camera,
      camera_uniform,
      camera_buffer,
      camera_bind_group,
      camera_bind_group_layout,
      scene,
      field,
      interaction: InteractionState::new(),
      rotation: Rotation::new(),
      clock: 0.0,
      rng: SmallRng::seed_from_u64(97),
    })
  }

  fn pointer_moved(&mut self, position: PhysicalPosition<f64>, size: PhysicalSize<u32>) {
    if size.width == 0 || size.height == 0 {
      return;
    }
    let ndc = [
      (position.x / f64::from(size.width) * 2.0 - 1.0) as f32,
      -(position.y / f64::from(size.height) * 2.0 - 1.0) as f32,
    ];
    let bound = self.scene.particles.radius * FOCUS_CLAMP_FACTOR;
    let focus = match self.camera.unproject_to_plane(ndc) {
      Some([x, y, z]) => [x.clamp(-bound, bound), y.clamp(-bound, bound), z],
      // Cursor ray missed the plane: park the influence point far away.
      None => [f32::MAX, f32::MAX, 0.0],
    };
    self.interaction.pointer_moved(ndc, focus);
  }

  fn click(&mut self) {
    if self.interaction.trigger_disperse() {
      log::info!("dispersing, shutting down shortly");
    }
  }

  fn resized(&mut self, size: PhysicalSize<u32>) {
    self.camera.set_viewport(size.width, size.height);
    log::debug!("viewport resized to {}x{}", size.width, size.height);
  }

  /// One animation tick: advance the fixed-increment clock, integrate all
  /// particles against the current interaction snapshot, ease the field
  /// rotation. Returns true when the dispersal delay has elapsed.
  fn tick(&mut self) -> bool {
    self.clock += TIME_STEP;
    let input = self.interaction.frame_input(self.clock);
    self.field.step(&self.scene.particles, &input, &mut self.rng);
    self
      .rotation
      .ease_toward(self.interaction.pointer(), self.scene.particles.rotation_smoothing);
    self.interaction.end_frame()
  }

  fn update_camera(&mut self) {
    self.camera_uniform.update(&self.camera);
    self.queue.write_buffer(
      &self.camera_buffer,
      0,
      bytemuck::cast_slice(&[self.camera_uniform]),
    );
  }

  fn model_matrix(&self) -> Matrix4<f32> {
    Matrix4::from_angle_x(Rad(self.rotation.x)) * Matrix4::from_angle_y(Rad(self.rotation.y))
  }

  /// Point size pulses gently, faster and larger while hovering.
  fn point_size(&self) -> f32 {
    let (pulse_freq, pulse_amp) = if self.interaction.hovering() {
      (2.0, 1.0)
    } else {
      (1.0, 0.3)
    };
    self.scene.particles.base_size + (self.clock * pulse_freq).sin() * pulse_amp
  }

  /// Slow continuous hue drift plus a hover-triggered oscillation. The
  /// color buffer itself is never rewritten.
  fn color_shift(&self) -> f32 {
    let base = self.clock * 0.05;
    let hover = if self.interaction.hovering() {
      (self.clock * 2.0).sin() * 0.2
    } else {
      0.0
    };
    base + hover
  }
}

async fn start(preset: ScenePreset, count_override: Option<u32>) -> Result<(), InitError> {
  let window_loop = EventLoopWrapper::new(&format!("Nebula Sim - {}", preset.name()))?;
  // The viewport-filling presets size the sphere from the real window.
  let size = window_loop.window.inner_size();
  let aspect = size.width.max(1) as f32 / size.height.max(1) as f32;
  let mut scene = preset.config(aspect);
  if let Some(count) = count_override {
    scene.particles.count = count;
  }
  let mut surface = SurfaceWrapper::new();
  let mut context = SimState::init(&surface, &size, scene).await?;
  let mut renderer: Option<Render> = None;
  let window = window_loop.window.clone();

  window_loop.event_loop.run(move |event, target| match event {
    Event::NewEvents(StartCause::Init) => {
      if let Err(e) = surface.resume(&context, window.clone()) {
        log::error!("surface initialization failed: {e}");
        target.exit();
        return;
      }
      if renderer.is_none() {
        renderer = Some(Render::init(
          surface.config(),
          &context.device,
          &context.camera_bind_group_layout,
          &context.field,
          context.scene.particles.background,
        ));
      }
    }
    Event::Suspended => {
      surface.suspend();
    }
    Event::WindowEvent { event, window_id } if window_id == window.id() => match event {
      WindowEvent::CloseRequested
      | WindowEvent::KeyboardInput {
        event:
          KeyEvent {
            state: ElementState::Pressed,
            physical_key: PhysicalKey::Code(KeyCode::Escape),
            ..
          },
        ..
      } => target.exit(),
      WindowEvent::Resized(size) => {
        surface.resize(&context, size);
        context.resized(size);
      }
      WindowEvent::CursorMoved { position, .. } => {
        context.pointer_moved(position, window.inner_size());
      }
      WindowEvent::MouseInput {
        state: ElementState::Pressed,
        button: MouseButton::Left,
        ..
      } => {
        context.click();
      }
      WindowEvent::RedrawRequested => {
        window.request_redraw();
        if renderer.is_none() {
          return;
        }
        let done = context.tick();
        context.update_camera();
        if let Some(renderer) = &mut renderer {
          let config = surface.config();
          let viewport = [config.width as f32, config.height as f32];
          renderer.upload_positions(&context.queue, context.field.positions());
          renderer.update_uniforms(
            &context.queue,
            context.model_matrix(),
            viewport,
            context.clock,
            context.point_size(),
            context.color_shift(),
          );
          let frame = surface.acquire(&context);
          let view = frame.texture.create_view(&wgpu::TextureViewDescriptor {
            format: Some(surface.config().view_formats[0]),
            ..wgpu::TextureViewDescriptor::default()
          });
          renderer.render(&view, &context.device, &context.queue, &context.camera_bind_group);
          frame.present();
        }
        if done {
          log::info!("dispersal finished");
          target.exit();
        }
      }
      _ => {}
    },
    _ => {}
  })?;
  Ok(())
}

fn run_headless(scene: SceneConfig, ticks: u64) -> Result<(), InitError> {
  log::info!(
    "headless run: scene '{}', {} particles{}",
    scene.name,
    scene.particles.count,
    if ticks == 0 {
      String::from(", until interrupted")
    } else {
      format!(", {ticks} ticks")
    }
  );

  let stop = Arc::new(AtomicBool::new(false));
  {
    let stop = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst)) {
      log::warn!("could not install interrupt handler: {e}");
    }
  }

  let mut field = ParticleField::new(&scene.particles)?;
  let interaction = InteractionState::new();
  let mut rng = SmallRng::seed_from_u64(97);
  let mut clock = 0.0f32;
  let mut tick = 0u64;

  while (ticks == 0 || tick < ticks) && !stop.load(Ordering::SeqCst) {
    clock += TIME_STEP;
    field.step(&scene.particles, &interaction.frame_input(clock), &mut rng);
    tick += 1;
    if tick % 250 == 0 {
      let max = field
        .positions()
        .iter()
        .fold(0.0f32, |m, p| m.max(p.abs()));
      log::info!("tick {tick}: max |coordinate| {max:.2}");
    }
  }
  log::info!("headless run finished after {tick} ticks");
  Ok(())
}

/// Entry point for the binary: build the scene configuration and drive
/// either the windowed event loop or a windowless simulation run.
pub fn run(
  preset: ScenePreset,
  count_override: Option<u32>,
  headless: Option<u64>,
) -> Result<(), InitError> {
  env_logger::init();

  match headless {
    Some(ticks) => {
      // No window to measure; assume a common aspect.
      let mut scene = preset.config(16.0 / 9.0);
      if let Some(count) = count_override {
        scene.particles.count = count;
      }
      run_headless(scene, ticks)
    }
    None => pollster::block_on(start(preset, count_override)),
  }
}
