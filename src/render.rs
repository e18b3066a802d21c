use crate::field::ParticleField;
use cgmath::Matrix4;
use std::borrow::Cow;
use wgpu::{util::DeviceExt, PipelineCompilationOptions};

/// Unit quad expanded into a camera-facing point sprite in the vertex
/// stage; two triangles, corners in [-1, 1].
#[rustfmt::skip]
const CORNERS: [f32; 12] = [
  -1.0, -1.0,
   1.0, -1.0,
   1.0,  1.0,
  -1.0, -1.0,
   1.0,  1.0,
  -1.0,  1.0,
];

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct DrawUniforms {
  model: [[f32; 4]; 4],
  viewport: [f32; 2],
  time: f32,
  size: f32,
  color_shift: f32,
  _pad: [f32; 3],
}

pub struct Render {
  render_pipeline: wgpu::RenderPipeline,
  position_buffer: wgpu::Buffer,
  color_buffer: wgpu::Buffer,
  corner_buffer: wgpu::Buffer,
  uniform_buffer: wgpu::Buffer,
  uniform_bind_group: wgpu::BindGroup,
  num_particles: u32,
  background: wgpu::Color,
}

impl Render {
  /// Build pipelines and upload the initial buffers. The color buffer is
  /// written once here and never again; per-frame color variation happens
  /// entirely through the hue-shift uniform in the shader.
  #[must_use]
  pub fn init(
    config: &wgpu::SurfaceConfiguration,
    device: &wgpu::Device,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    field: &ParticleField,
    background: [f64; 3],
  ) -> Self {
    let draw_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
      label: None,
      source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("shaders/draw.wgsl"))),
    });

    let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Draw Uniform Buffer"),
      contents: bytemuck::cast_slice(&[DrawUniforms {
        model: Matrix4::from_scale(1.0f32).into(),
        viewport: [config.width as f32, config.height as f32],
        time: 0.0,
        size: 1.0,
        color_shift: 0.0,
        _pad: [0.0; 3],
      }]),
      usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let uniform_bind_group_layout =
      device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
          binding: 0,
          visibility: wgpu::ShaderStages::VERTEX,
          ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniforms>() as _),
          },
          count: None,
        }],
        label: Some("draw_uniform_bind_group_layout"),
      });
    let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
      layout: &uniform_bind_group_layout,
      entries: &[wgpu::BindGroupEntry {
        binding: 0,
        resource: uniform_buffer.as_entire_binding(),
      }],
      label: Some("draw_uniform_bind_group"),
    });

    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
      label: Some("render"),
      bind_group_layouts: &[camera_bind_group_layout, &uniform_bind_group_layout],
      push_constant_ranges: &[],
    });
    let position_layout = wgpu::VertexBufferLayout {
      array_stride: 3 * 4,
      step_mode: wgpu::VertexStepMode::Instance,
      attributes: &wgpu::vertex_attr_array![0 => Float32x3],
    };
    let color_layout = wgpu::VertexBufferLayout {
      array_stride: 3 * 4,
      step_mode: wgpu::VertexStepMode::Instance,
      attributes: &wgpu::vertex_attr_array![1 => Float32x3],
    };
    let corner_layout = wgpu::VertexBufferLayout {
      array_stride: 2 * 4,
      step_mode: wgpu::VertexStepMode::Vertex,
      attributes: &wgpu::vertex_attr_array![2 => Float32x2],
    };
    let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
      label: Some("Render Pipeline"),
      layout: Some(&render_pipeline_layout),
      vertex: wgpu::VertexState {
        module: &draw_shader,
        entry_point: "main_vs",
        compilation_options: PipelineCompilationOptions::default(),
        buffers: &[position_layout, color_layout, corner_layout],
      },
      fragment: Some(wgpu::FragmentState {
        module: &draw_shader,
        entry_point: "main_fs",
        compilation_options: PipelineCompilationOptions::default(),
        targets: &[Some(wgpu::ColorTargetState {
          format: config.view_formats[0],
          blend: Some(wgpu::BlendState::ALPHA_BLENDING),
          write_mask: wgpu::ColorWrites::ALL,
        })],
      }),
      primitive: wgpu::PrimitiveState::default(),
      depth_stencil: None,
      multisample: wgpu::MultisampleState::default(),
      multiview: None,
      cache: None,
    });

    let position_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Particle Position Buffer"),
      contents: bytemuck::cast_slice(field.positions()),
      usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    });
    let color_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Particle Color Buffer"),
      contents: bytemuck::cast_slice(field.colors()),
      usage: wgpu::BufferUsages::VERTEX,
    });
    let corner_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Corner Buffer"),
      contents: bytemuck::cast_slice(&CORNERS),
      usage: wgpu::BufferUsages::VERTEX,
    });

    let [r, g, b] = background;
    Render {
      render_pipeline,
      position_buffer,
      color_buffer,
      corner_buffer,
      uniform_buffer,
      uniform_bind_group,
      num_particles: field.count() as u32,
      background: wgpu::Color {
        r: srgb_to_linear(r),
        g: srgb_to_linear(g),
        b: srgb_to_linear(b),
        a: 1.0,
      },
    }
  }

  /// Re-upload the mutated position buffer; called once per frame after
  /// the integrator runs.
  pub fn upload_positions(&self, queue: &wgpu::Queue, positions: &[f32]) {
    queue.write_buffer(&self.position_buffer, 0, bytemuck::cast_slice(positions));
  }

  /// Push the per-frame uniforms: field rotation, viewport, clock, pulsing
  /// point size and the hue-shift angle.
  pub fn update_uniforms(
    &self,
    queue: &wgpu::Queue,
    model: Matrix4<f32>,
    viewport: [f32; 2],
    time: f32,
    size: f32,
    color_shift: f32,
  ) {
    queue.write_buffer(
      &self.uniform_buffer,
      0,
      bytemuck::cast_slice(&[DrawUniforms {
        model: model.into(),
        viewport,
        time,
        size,
        color_shift,
        _pad: [0.0; 3],
      }]),
    );
  }

  pub fn render(
    &mut self,
    view: &wgpu::TextureView,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    camera_bind_group: &wgpu::BindGroup,
  ) {
    let color_attachments = [Some(wgpu::RenderPassColorAttachment {
      view,
      resolve_target: None,
      ops: wgpu::Operations {
        load: wgpu::LoadOp::Clear(self.background),
        store: wgpu::StoreOp::Store,
      },
    })];
    let render_pass_descriptor = wgpu::RenderPassDescriptor {
      label: None,
      color_attachments: &color_attachments,
      depth_stencil_attachment: None,
      timestamp_writes: None,
      occlusion_query_set: None,
    };
    let mut command_encoder =
      device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    {
      let mut rpass = command_encoder.begin_render_pass(&render_pass_descriptor);
      rpass.set_pipeline(&self.render_pipeline);
      rpass.set_bind_group(0, camera_bind_group, &[]);
      rpass.set_bind_group(1, &self.uniform_bind_group, &[]);
      rpass.set_vertex_buffer(0, self.position_buffer.slice(..));
      rpass.set_vertex_buffer(1, self.color_buffer.slice(..));
      rpass.set_vertex_buffer(2, self.corner_buffer.slice(..));
      rpass.draw(0..6, 0..self.num_particles);
    }
    queue.submit(Some(command_encoder.finish()));
  }
}

fn srgb_to_linear(c: f64) -> f64 {
  if c <= 0.04045 {
    c / 12.92
  } else {
    ((c + 0.055) / 1.055).powf(2.4)
  }
}
