//! wgpu-backed `RenderDevice` drawing into a headless target texture.
//!
//! wgpu has no triangle-fan topology and cannot rewrite a uniform between
//! draws inside one pass, so draws are staged during the frame (fan expanded
//! to a triangle list, uniform values snapshotted per draw) and submitted as
//! a single pass in `end_frame`.

use render::{
    ATTRIB_POSITION, RenderDevice, RenderError, ShaderStage, UNIFORM_FILL_COLOR,
    UNIFORM_TRANSFORM,
};

const HANDLE_TRANSFORM: u32 = 0;
const HANDLE_FILL_COLOR: u32 = 1;

/// Per-draw shader globals; layout mirrors the WGSL `Globals` struct.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Globals {
    transform: [f32; 4],
    fill_color: [f32; 4],
}

/// Map the program manager's canonical handle names onto fixed slots.
fn builtin_handle(name: &str) -> Option<u32> {
    match name {
        UNIFORM_TRANSFORM => Some(HANDLE_TRANSFORM),
        UNIFORM_FILL_COLOR => Some(HANDLE_FILL_COLOR),
        _ => None,
    }
}

/// Expand a fan v0..vn of xy pairs into a triangle list (v0, vi, vi+1).
fn fan_to_triangle_list(xy: &[f32]) -> Vec<f32> {
    let points = xy.len() / 2;
    if points < 3 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity((points - 2) * 6);
    for i in 1..points - 1 {
        out.extend_from_slice(&xy[0..2]);
        out.extend_from_slice(&xy[i * 2..i * 2 + 2]);
        out.extend_from_slice(&xy[(i + 1) * 2..(i + 1) * 2 + 2]);
    }
    out
}

/// Read-back rows must be 256-byte aligned.
fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

struct ProgramEntry {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

struct DrawCmd {
    program: u32,
    vertices: Vec<f32>,
    globals: Globals,
}

struct FrameState {
    clear_color: wgpu::Color,
    draws: Vec<DrawCmd>,
}

pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target: wgpu::Texture,
    target_view: wgpu::TextureView,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
    shaders: Vec<wgpu::ShaderModule>,
    programs: Vec<Option<ProgramEntry>>,
    // CPU staging for the engine's reusable vertex buffer; the GPU buffer
    // is (re)created at submit time, as elsewhere in this codebase.
    buffers: Vec<Option<Vec<f32>>>,
    current_transform: [f32; 4],
    current_fill: [f32; 4],
    frame: Option<FrameState>,
}

impl WgpuDevice {
    /// Acquire an adapter/device and allocate the offscreen target.
    /// Fails fast when the host has no usable graphics context.
    pub fn headless(width: u32, height: u32) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| RenderError::ContextUnavailable(format!("no adapter: {e}")))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("slippy-device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            ..Default::default()
        }))
        .map_err(|e| RenderError::ContextUnavailable(format!("no device: {e}")))?;

        let format = wgpu::TextureFormat::Rgba8Unorm;
        let (target, target_view) = Self::create_target(&device, format, width, height);

        Ok(Self {
            device,
            queue,
            target,
            target_view,
            format,
            width: width.max(1),
            height: height.max(1),
            shaders: Vec::new(),
            programs: Vec::new(),
            buffers: Vec::new(),
            current_transform: [1.0, 1.0, 0.0, 0.0],
            current_fill: [1.0, 1.0, 1.0, 1.0],
            frame: None,
        })
    }

    fn create_target(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("slippy-target"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());
        (target, view)
    }

    fn create_buffer_init(&self, label: &str, contents: &[u8], usage: wgpu::BufferUsages) -> wgpu::Buffer {
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: contents.len().max(4) as u64,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.queue.write_buffer(&buffer, 0, contents);
        buffer
    }

    /// Copy the target texture back to RAM as tightly packed RGBA rows.
    pub fn read_pixels(&self) -> Vec<u8> {
        let padded = padded_bytes_per_row(self.width);
        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("slippy-readback"),
            size: (padded * self.height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("slippy-readback-encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = readback.slice(..);
        slice.map_async(wgpu::MapMode::Read, |_| {});
        let _ = self.device.poll(wgpu::PollType::wait_indefinitely());

        let mapped = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((self.width * self.height * 4) as usize);
        for row in mapped.chunks(padded as usize) {
            pixels.extend_from_slice(&row[0..(self.width * 4) as usize]);
        }
        drop(mapped);
        readback.unmap();
        pixels
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl RenderDevice for WgpuDevice {
    type Shader = u32;
    type Program = u32;
    type Buffer = u32;
    type Attrib = u32;
    type Uniform = u32;

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<u32, RenderError> {
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("slippy-shader"),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
        if let Some(error) = pollster::block_on(scope.pop()) {
            return Err(RenderError::ShaderCompile {
                stage,
                log: error.to_string(),
            });
        }

        self.shaders.push(module);
        Ok(self.shaders.len() as u32 - 1)
    }

    fn link_program(&mut self, vertex: u32, fragment: u32) -> Result<u32, RenderError> {
        let vertex_module = &self.shaders[vertex as usize];
        let fragment_module = &self.shaders[fragment as usize];

        let bind_group_layout =
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("slippy-globals-bgl"),
                    entries: &[wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    }],
                });

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("slippy-pipeline-layout"),
                bind_group_layouts: &[&bind_group_layout],
                immediate_size: 0,
            });

        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("slippy-fill-pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: vertex_module,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: 8,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &[wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x2,
                            offset: 0,
                            shader_location: 0,
                        }],
                    }],
                },
                fragment: Some(wgpu::FragmentState {
                    module: fragment_module,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });
        if let Some(error) = pollster::block_on(scope.pop()) {
            return Err(RenderError::ProgramLink {
                log: error.to_string(),
            });
        }

        self.programs.push(Some(ProgramEntry {
            pipeline,
            bind_group_layout,
        }));
        Ok(self.programs.len() as u32 - 1)
    }

    fn attrib_location(&mut self, _program: u32, name: &str) -> Option<u32> {
        (name == ATTRIB_POSITION).then_some(0)
    }

    fn uniform_location(&mut self, _program: u32, name: &str) -> Option<u32> {
        builtin_handle(name)
    }

    fn create_vertex_buffer(&mut self) -> Result<u32, RenderError> {
        self.buffers.push(Some(Vec::new()));
        Ok(self.buffers.len() as u32 - 1)
    }

    fn resize(&mut self, width_px: u32, height_px: u32) {
        self.width = width_px.max(1);
        self.height = height_px.max(1);
        let (target, view) = Self::create_target(&self.device, self.format, self.width, self.height);
        self.target = target;
        self.target_view = view;
    }

    fn begin_frame(&mut self, clear_color: [f32; 4]) {
        self.frame = Some(FrameState {
            clear_color: wgpu::Color {
                r: clear_color[0] as f64,
                g: clear_color[1] as f64,
                b: clear_color[2] as f64,
                a: clear_color[3] as f64,
            },
            draws: Vec::new(),
        });
    }

    fn upload_vertices(&mut self, buffer: u32, xy: &[f32]) {
        if let Some(Some(staging)) = self.buffers.get_mut(buffer as usize) {
            staging.clear();
            staging.extend_from_slice(xy);
        }
    }

    fn set_uniform_vec4(&mut self, uniform: u32, value: [f32; 4]) {
        match uniform {
            HANDLE_TRANSFORM => self.current_transform = value,
            HANDLE_FILL_COLOR => self.current_fill = value,
            _ => {}
        }
    }

    fn draw_triangle_fan(&mut self, program: u32, buffer: u32, _position: u32, vertex_count: u32) {
        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        let Some(Some(staging)) = self.buffers.get(buffer as usize) else {
            return;
        };
        let take = (vertex_count as usize * 2).min(staging.len());
        let vertices = fan_to_triangle_list(&staging[0..take]);
        if vertices.is_empty() {
            return;
        }
        frame.draws.push(DrawCmd {
            program,
            vertices,
            globals: Globals {
                transform: self.current_transform,
                fill_color: self.current_fill,
            },
        });
    }

    fn end_frame(&mut self) {
        let Some(frame) = self.frame.take() else {
            return;
        };

        let mut vertex_data: Vec<f32> = Vec::new();
        let mut ranges = Vec::with_capacity(frame.draws.len());
        for draw in &frame.draws {
            let start = (vertex_data.len() / 2) as u32;
            vertex_data.extend_from_slice(&draw.vertices);
            ranges.push(start..(vertex_data.len() / 2) as u32);
        }

        let vertex_buffer = self.create_buffer_init(
            "slippy-frame-vertices",
            bytemuck::cast_slice(&vertex_data),
            wgpu::BufferUsages::VERTEX,
        );

        let mut bind_groups = Vec::with_capacity(frame.draws.len());
        for draw in &frame.draws {
            let Some(Some(entry)) = self.programs.get(draw.program as usize) else {
                bind_groups.push(None);
                continue;
            };
            let globals = self.create_buffer_init(
                "slippy-draw-globals",
                bytemuck::bytes_of(&draw.globals),
                wgpu::BufferUsages::UNIFORM,
            );
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("slippy-draw-globals-bg"),
                layout: &entry.bind_group_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals.as_entire_binding(),
                }],
            });
            bind_groups.push(Some(bind_group));
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("slippy-frame-encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("slippy-frame-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target_view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(frame.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            rpass.set_vertex_buffer(0, vertex_buffer.slice(..));
            for ((draw, range), bind_group) in
                frame.draws.iter().zip(&ranges).zip(&bind_groups)
            {
                let (Some(Some(entry)), Some(bind_group)) =
                    (self.programs.get(draw.program as usize), bind_group)
                else {
                    continue;
                };
                rpass.set_pipeline(&entry.pipeline);
                rpass.set_bind_group(0, bind_group, &[]);
                rpass.draw(range.clone(), 0..1);
            }
        }
        self.queue.submit(Some(encoder.finish()));
    }

    fn delete_buffer(&mut self, buffer: u32) {
        if let Some(slot) = self.buffers.get_mut(buffer as usize) {
            *slot = None;
        }
    }

    fn delete_program(&mut self, program: u32) {
        if let Some(slot) = self.programs.get_mut(program as usize) {
            *slot = None;
        }
    }
}

impl std::fmt::Debug for WgpuDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuDevice")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("programs", &self.programs.len())
            .finish()
    }
}
