// renderer.rs — wgpu 渲染器：网格/纹理注册表、不透明与半透明两条管线、egui 叠加层

use crate::mesh::{CpuMesh, Vertex};
use crate::scene::{BlendMode, DrawItem, MeshId, TextureId};
use crate::scheduler::{FrameTarget, FrameView};
use glam::Mat4;
use image::RgbaImage;
use std::num::NonZeroU64;
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.02,
    b: 0.02,
    a: 1.0,
};
const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];
const INITIAL_DRAW_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("failed to open GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct DrawUniform {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    color: [f32; 4],
    // x = opacity, y = lit
    params: [f32; 4],
}

impl DrawUniform {
    fn new(view_proj: Mat4, item: &DrawItem) -> Self {
        let m = &item.material;
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            model: item.world.to_cols_array_2d(),
            color: m.color,
            params: [m.opacity, if m.lit { 1.0 } else { 0.0 }, 0.0, 0.0],
        }
    }
}

const DRAW_UNIFORM_SIZE: u64 = std::mem::size_of::<DrawUniform>() as u64;

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

struct GpuTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wrap {
    // 全景图水平方向循环
    Repeat,
    Clamp,
}

/// One dynamic-offset uniform buffer shared by every draw of a frame.
struct DrawUniforms {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u64,
    capacity: usize,
}

impl DrawUniforms {
    fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        stride: u64,
        capacity: usize,
    ) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniforms"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("draw_bind_group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(DRAW_UNIFORM_SIZE),
                }),
            }],
        });
        Self {
            buffer,
            bind_group,
            stride,
            capacity,
        }
    }
}

struct PendingUi {
    primitives: Vec<egui::ClippedPrimitive>,
    textures_delta: egui::TexturesDelta,
    pixels_per_point: f32,
}

pub struct Renderer {
    surface: wgpu::Surface,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    depth_view: wgpu::TextureView,

    opaque_pipeline: wgpu::RenderPipeline,
    translucent_pipeline: wgpu::RenderPipeline,

    draw_layout: wgpu::BindGroupLayout,
    draw_uniforms: DrawUniforms,
    staging: Vec<u8>,

    texture_layout: wgpu::BindGroupLayout,
    repeat_sampler: wgpu::Sampler,
    clamp_sampler: wgpu::Sampler,
    white: GpuTexture,
    textures: Vec<Option<GpuTexture>>,
    meshes: Vec<Option<GpuMesh>>,

    // UI
    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
    pending_ui: Option<PendingUi>,
}

impl Renderer {
    pub async fn new(window: Arc<Window>) -> Result<Self, RendererError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Window 由调用方以 Arc 持有，生命周期覆盖 surface
        let surface = unsafe { instance.create_surface(window.as_ref()) }?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RendererError::NoAdapter)?;
        log::info!("GPU adapter: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    features: wgpu::Features::empty(),
                    limits: if cfg!(target_arch = "wasm32") {
                        wgpu::Limits::downlevel_webgl2_defaults()
                    } else {
                        wgpu::Limits::default().using_resolution(adapter.limits())
                    },
                    label: None,
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo, // VSync on
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, config.width, config.height);

        // --- 1. Bind group layouts ---
        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("draw_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(DRAW_UNIFORM_SIZE),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        // --- 2. Samplers + default texture ---
        let repeat_sampler = create_sampler(&device, wgpu::AddressMode::Repeat);
        let clamp_sampler = create_sampler(&device, wgpu::AddressMode::ClampToEdge);

        let white = create_gpu_texture(&device, &texture_layout, &clamp_sampler, 1, 1, "white");
        write_rgba(&queue, &white.texture, 1, 1, &[255, 255, 255, 255]);

        // --- 3. Uniform pool ---
        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let stride = DRAW_UNIFORM_SIZE.div_ceil(alignment) * alignment;
        let draw_uniforms =
            DrawUniforms::new(&device, &draw_layout, stride, INITIAL_DRAW_CAPACITY);

        // --- 4. Pipelines ---
        let shader = device.create_shader_module(wgpu::include_wgsl!("shader_scene.wgsl"));
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&draw_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        let opaque_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            config.format,
            BlendMode::Opaque,
        );
        let translucent_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            config.format,
            BlendMode::Translucent,
        );

        // --- 5. Egui ---
        let egui_ctx = egui::Context::default();
        let mut egui_state = egui_winit::State::new(window.as_ref());
        // 高 DPI 显示器
        egui_state.set_pixels_per_point(window.scale_factor() as f32);
        let egui_renderer = egui_wgpu::Renderer::new(&device, config.format, None, 1);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            depth_view,
            opaque_pipeline,
            translucent_pipeline,
            draw_layout,
            draw_uniforms,
            staging: Vec::new(),
            texture_layout,
            repeat_sampler,
            clamp_sampler,
            white,
            textures: Vec::new(),
            meshes: Vec::new(),
            egui_ctx,
            egui_state,
            egui_renderer,
            pending_ui: None,
        })
    }

    pub fn size(&self) -> winit::dpi::PhysicalSize<u32> {
        self.size
    }

    /// Largest 2D texture the device accepts; environments are fitted to it before upload.
    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, new_size.width, new_size.height);
        }
    }

    // ── 资源注册表 ───────────────────────────────────────────────────

    pub fn upload_mesh(&mut self, mesh: &CpuMesh) -> MeshId {
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Buffer"),
                contents: bytemuck::cast_slice::<Vertex, u8>(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Index Buffer"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        self.meshes.push(Some(GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }));
        MeshId(self.meshes.len() - 1)
    }

    pub fn release_mesh(&mut self, id: MeshId) {
        if let Some(mesh) = self.meshes.get_mut(id.0).and_then(Option::take) {
            mesh.vertex_buffer.destroy();
            mesh.index_buffer.destroy();
        }
    }

    /// Equirectangular environment: repeats horizontally.
    pub fn upload_environment(&mut self, img: &RgbaImage) -> TextureId {
        self.upload_image(img, Wrap::Repeat, "environment")
    }

    pub fn upload_texture(&mut self, img: &RgbaImage) -> TextureId {
        self.upload_image(img, Wrap::Clamp, "texture")
    }

    /// Texture rewritten every tick through [`FrameTarget::write_texture`].
    pub fn create_dynamic_texture(&mut self, width: u32, height: u32) -> TextureId {
        self.register_texture(width, height, Wrap::Clamp, "dynamic")
    }

    pub fn release_texture(&mut self, id: TextureId) {
        if let Some(tex) = self.textures.get_mut(id.0).and_then(Option::take) {
            tex.texture.destroy();
        }
    }

    fn upload_image(&mut self, img: &RgbaImage, wrap: Wrap, label: &str) -> TextureId {
        let (width, height) = img.dimensions();
        let id = self.register_texture(width, height, wrap, label);
        if let Some(tex) = self.textures.get(id.0).and_then(Option::as_ref) {
            write_rgba(&self.queue, &tex.texture, tex.width, tex.height, img.as_raw());
        }
        id
    }

    fn register_texture(&mut self, width: u32, height: u32, wrap: Wrap, label: &str) -> TextureId {
        let sampler = match wrap {
            Wrap::Repeat => &self.repeat_sampler,
            Wrap::Clamp => &self.clamp_sampler,
        };
        let tex = create_gpu_texture(
            &self.device,
            &self.texture_layout,
            sampler,
            width.max(1),
            height.max(1),
            label,
        );
        self.textures.push(Some(tex));
        TextureId(self.textures.len() - 1)
    }

    fn texture(&self, id: Option<TextureId>) -> &GpuTexture {
        id.and_then(|id| self.textures.get(id.0))
            .and_then(Option::as_ref)
            .unwrap_or(&self.white)
    }

    // ── UI ──────────────────────────────────────────────────────────

    /// Run the egui pass for the next frame; it is composited by the next `render`.
    pub fn prepare_ui(&mut self, window: &Window, run_ui: impl FnOnce(&egui::Context)) {
        let raw_input = self.egui_state.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, run_ui);
        self.egui_state
            .handle_platform_output(window, &self.egui_ctx, full_output.platform_output);
        let primitives = self.egui_ctx.tessellate(full_output.shapes);

        // 上一帧没画出去的纹理更新不能丢
        let mut textures_delta = self
            .pending_ui
            .take()
            .map(|p| p.textures_delta)
            .unwrap_or_default();
        textures_delta.append(full_output.textures_delta);

        self.pending_ui = Some(PendingUi {
            primitives,
            textures_delta,
            pixels_per_point: window.scale_factor() as f32,
        });
    }

    fn encode_ui(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
    ) -> Vec<wgpu::CommandBuffer> {
        let Some(ui) = self.pending_ui.take() else {
            return Vec::new();
        };
        let screen_descriptor = egui_wgpu::renderer::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: ui.pixels_per_point,
        };

        for (id, delta) in &ui.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, delta);
        }
        let extra = self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            encoder,
            &ui.primitives,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });
            self.egui_renderer
                .render(&mut render_pass, &ui.primitives, &screen_descriptor);
        }

        for id in &ui.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
        extra
    }

    // ── Scene ───────────────────────────────────────────────────────

    fn write_uniforms(&mut self, view_proj: Mat4, items: &[&DrawItem]) {
        if items.is_empty() {
            return;
        }
        if items.len() > self.draw_uniforms.capacity {
            let capacity = items.len().next_power_of_two();
            log::debug!("growing draw uniform pool to {capacity}");
            self.draw_uniforms = DrawUniforms::new(
                &self.device,
                &self.draw_layout,
                self.draw_uniforms.stride,
                capacity,
            );
        }

        let stride = self.draw_uniforms.stride as usize;
        self.staging.clear();
        self.staging.resize(stride * items.len(), 0);
        for (i, item) in items.iter().enumerate() {
            let uniform = DrawUniform::new(view_proj, item);
            let start = i * stride;
            self.staging[start..start + DRAW_UNIFORM_SIZE as usize]
                .copy_from_slice(bytemuck::bytes_of(&uniform));
        }
        self.queue
            .write_buffer(&self.draw_uniforms.buffer, 0, &self.staging);
    }
}

impl FrameTarget for Renderer {
    type Error = wgpu::SurfaceError;

    fn write_texture(&mut self, texture: TextureId, width: u32, height: u32, rgba: &[u8]) {
        let Some(tex) = self.textures.get(texture.0).and_then(Option::as_ref) else {
            return;
        };
        if (tex.width, tex.height) != (width, height) {
            log::warn!(
                "texture {:?} is {}x{}, ignoring {width}x{height} upload",
                texture,
                tex.width,
                tex.height
            );
            return;
        }
        write_rgba(&self.queue, &tex.texture, width, height, rgba);
    }

    fn render(&mut self, frame: &FrameView<'_>) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // 先不透明，后半透明（保持收集顺序）
        let all = || frame.world.iter().chain(frame.overlay.iter());
        let ordered: Vec<&DrawItem> = all()
            .filter(|i| i.material.blend == BlendMode::Opaque)
            .chain(all().filter(|i| i.material.blend == BlendMode::Translucent))
            .collect();
        self.write_uniforms(frame.camera.view_projection(), &ordered);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: true,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: true,
                    }),
                    stencil_ops: None,
                }),
            });

            for (i, item) in ordered.iter().enumerate() {
                let Some(mesh) = self.meshes.get(item.mesh.0).and_then(Option::as_ref) else {
                    continue;
                };
                let pipeline = match item.material.blend {
                    BlendMode::Opaque => &self.opaque_pipeline,
                    BlendMode::Translucent => &self.translucent_pipeline,
                };
                let offset = (i as u64 * self.draw_uniforms.stride) as u32;
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &self.draw_uniforms.bind_group, &[offset]);
                render_pass.set_bind_group(1, &self.texture(item.material.texture).bind_group, &[]);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        let ui_commands = self.encode_ui(&mut encoder, &view);
        self.queue
            .submit(ui_commands.into_iter().chain(std::iter::once(encoder.finish())));
        output.present();
        Ok(())
    }
}

fn create_sampler(device: &wgpu::Device, address_mode_u: wgpu::AddressMode) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_gpu_texture(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    width: u32,
    height: u32,
    label: &str,
) -> GpuTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        label: Some(label),
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some(label),
    });
    GpuTexture {
        texture,
        bind_group,
        width,
        height,
    }
}

fn write_rgba(queue: &wgpu::Queue, texture: &wgpu::Texture, width: u32, height: u32, rgba: &[u8]) {
    if rgba.len() < (4 * width * height) as usize {
        log::warn!("short texture upload ({} bytes for {width}x{height})", rgba.len());
        return;
    }
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    blend: BlendMode,
) -> wgpu::RenderPipeline {
    let (label, color_blend, depth_write_enabled) = match blend {
        BlendMode::Opaque => ("Opaque Pipeline", wgpu::BlendState::REPLACE, true),
        // 半透明：测试深度但不写入
        BlendMode::Translucent => (
            "Translucent Pipeline",
            wgpu::BlendState::ALPHA_BLENDING,
            false,
        ),
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: "vs_main",
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &VERTEX_ATTRIBUTES,
            }],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(color_blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // 环境球从内部看，glTF 镜片常为单面：都不剔除
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}
