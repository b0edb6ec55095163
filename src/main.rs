// Traffic simulation viewer.
// Fetch thread polls the server; this thread reconciles snapshots between
// frames, re-poses every car and draws the whole scene in one batched draw call.

mod config;
mod engine;
mod net;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context};
use clap::Parser;
use glam::{Mat4, Vec3};
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver};
use wgpu::util::DeviceExt;
use winit::{
    event::{ElementState, Event as WinitEvent, KeyEvent, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use config::Config;
use engine::camera::{CameraInput, OrbitCamera};
use engine::debug_overlay::DebugOverlay;
use engine::mesh::SceneVertex;
use engine::Scene;
use net::{FeedEvent, SimClient};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const CLEAR_COLOR: wgpu::Color = wgpu::Color { r: 0.53, g: 0.7, b: 0.85, a: 1.0 };

// ============================================================================
// UNIFORM DATA (camera + light)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    light_dir: [f32; 4],
}

impl Uniforms {
    fn new(view_proj: Mat4) -> Self {
        let light = Vec3::new(0.4, 1.0, 0.3).normalize();
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            light_dir: light.extend(0.0).to_array(),
        }
    }
}

// ============================================================================
// DYNAMIC GPU BUFFERS
// ============================================================================

/// GPU buffer rewritten every frame, reallocated when the batch outgrows it.
struct DynamicBuffer {
    label: &'static str,
    usage: wgpu::BufferUsages,
    buffer: wgpu::Buffer,
    capacity: u64,
}

impl DynamicBuffer {
    fn new(device: &wgpu::Device, label: &'static str, usage: wgpu::BufferUsages, capacity: u64) -> Self {
        let usage = usage | wgpu::BufferUsages::COPY_DST;
        let buffer = Self::allocate(device, label, usage, capacity);
        Self { label, usage, buffer, capacity }
    }

    fn allocate(device: &wgpu::Device, label: &'static str, usage: wgpu::BufferUsages, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        })
    }

    fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, bytes: &[u8]) {
        let needed = bytes.len() as u64;
        if needed > self.capacity {
            self.capacity = needed.next_power_of_two();
            self.buffer = Self::allocate(device, self.label, self.usage, self.capacity);
            log::debug!("{} grown to {} bytes", self.label, self.capacity);
        }
        if needed > 0 {
            queue.write_buffer(&self.buffer, 0, bytes);
        }
    }

    fn slice(&self, len: u64) -> wgpu::BufferSlice<'_> {
        self.buffer.slice(..len)
    }
}

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
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

// ============================================================================
// APPLICATION STATE
// ============================================================================

struct State {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    render_pipeline: wgpu::RenderPipeline,
    depth_view: wgpu::TextureView,
    vertex_buffer: DynamicBuffer,
    index_buffer: DynamicBuffer,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    overlay: DebugOverlay,

    scene: Scene,
    feed: UnboundedReceiver<FeedEvent>,
    feed_alive: bool,
    server: String,
    last_update: Instant,

    camera: OrbitCamera,
    camera_input: CameraInput,

    frame_count: u32,
    fps: u32,
    last_fps_update: Instant,
    frame_time_ms: f32,
}

impl State {
    async fn new(
        window: Arc<Window>,
        settings: &Config,
        feed: UnboundedReceiver<FeedEvent>,
    ) -> anyhow::Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow!("no GPU adapter compatible with the window surface"))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .context("failed to open the GPU device")?;

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
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let camera = OrbitCamera::framing_grid(settings.grid_width, settings.grid_height);
        let aspect = config.width as f32 / config.height as f32;
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&[Uniforms::new(camera.view_proj(aspect))]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
                label: Some("uniform_bind_group_layout"),
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("uniform_bind_group"),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                push_constant_ranges: &[],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[SceneVertex::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                // Meshes wind CCW seen from outside; the left-handed view mirrors that on screen.
                front_face: wgpu::FrontFace::Cw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        let depth_view = create_depth_view(&device, &config);

        // Room for the floor and a few dozen cars before the first reallocation.
        let vertex_buffer = DynamicBuffer::new(&device, "Scene Vertex Buffer", wgpu::BufferUsages::VERTEX, 1 << 18);
        let index_buffer = DynamicBuffer::new(&device, "Scene Index Buffer", wgpu::BufferUsages::INDEX, 1 << 17);

        let overlay = DebugOverlay::new(&window, &device, config.format, settings.show_hud);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            render_pipeline,
            depth_view,
            vertex_buffer,
            index_buffer,
            uniform_buffer,
            uniform_bind_group,
            overlay,
            scene: Scene::new(settings.scene()),
            feed,
            feed_alive: true,
            server: settings.server.clone(),
            last_update: Instant::now(),
            camera,
            camera_input: CameraInput::default(),
            frame_count: 0,
            fps: 0,
            last_fps_update: Instant::now(),
            frame_time_ms: 0.0,
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, &self.config);
        }
    }

    /// Apply everything the fetch thread delivered since the last frame.
    fn drain_feed(&mut self) {
        loop {
            match self.feed.try_recv() {
                Ok(event) => self.scene.apply(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.feed_alive {
                        log::warn!("Fetch thread exited, the scene will no longer update");
                        self.feed_alive = false;
                    }
                    break;
                }
            }
        }
    }

    fn update(&mut self) {
        let now = Instant::now();
        let dt = (now - self.last_update).as_secs_f32();
        self.last_update = now;

        self.drain_feed();
        self.scene.tick(dt);
        self.camera.update(&mut self.camera_input, dt);

        self.frame_count += 1;
        if (now - self.last_fps_update).as_secs_f32() >= 1.0 {
            self.fps = self.frame_count;
            self.frame_time_ms = 1000.0 / self.frame_count.max(1) as f32;
            log::trace!("FPS: {}", self.fps);
            self.frame_count = 0;
            self.last_fps_update = now;
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // Upload the frame's geometry BEFORE creating the render pass
        let batch = self.scene.collect();
        let vertex_len = batch.vertex_bytes().len() as u64;
        let index_len = batch.index_bytes().len() as u64;
        let index_count = batch.index_count();
        self.vertex_buffer.write(&self.device, &self.queue, batch.vertex_bytes());
        self.index_buffer.write(&self.device, &self.queue, batch.index_bytes());

        let aspect = self.config.width as f32 / self.config.height as f32;
        let uniforms = Uniforms::new(self.camera.view_proj(aspect));
        self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if index_count > 0 {
                render_pass.set_pipeline(&self.render_pipeline);
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(vertex_len));
                render_pass.set_index_buffer(self.index_buffer.slice(index_len), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..index_count, 0, 0..1);
            }
        }

        if self.overlay.visible {
            let mut stats = self.scene.hud_stats();
            stats.fps = self.fps;
            stats.frame_time_ms = self.frame_time_ms;
            stats.server = self.server.clone();
            stats.feed_alive = self.feed_alive;

            let screen_descriptor = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [self.config.width, self.config.height],
                pixels_per_point: self.window.scale_factor() as f32,
            };
            self.overlay.render(
                &self.device,
                &self.queue,
                &mut encoder,
                &self.window,
                &view,
                &screen_descriptor,
                &stats,
            );
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

// ============================================================================
// MAIN
// ============================================================================

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = Config::parse();

    log::info!(
        "Polling {} every {:.1}s for {} cars (reveal delay {:.1}s)",
        config.server,
        config.poll_interval,
        config.cars,
        config.reveal_delay()
    );

    let client = SimClient::new(config.server.clone());
    let (_poller, feed) =
        net::poller::spawn(client, config.poller()).context("failed to start the fetch thread")?;

    let event_loop = EventLoop::new()?;
    let window_attributes = Window::default_attributes()
        .with_title(format!("Traffic View ({})", config.server))
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
    let window = Arc::new(event_loop.create_window(window_attributes)?);

    let mut state = pollster::block_on(State::new(window.clone(), &config, feed))?;

    event_loop.run(move |event, control_flow| {
        match event {
            WinitEvent::WindowEvent {
                ref event,
                window_id,
            } if window_id == window.id() => {
                let response = state.overlay.handle_window_event(&window, event);
                if !response.consumed {
                    state.camera_input.process_event(event);
                }

                match event {
                    WindowEvent::CloseRequested
                    | WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(KeyCode::Escape),
                                ..
                            },
                        ..
                    } => control_flow.exit(),
                    WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(KeyCode::F3),
                                repeat: false,
                                ..
                            },
                        ..
                    } => state.overlay.toggle(),
                    WindowEvent::Resized(physical_size) => {
                        state.resize(*physical_size);
                    }
                    WindowEvent::RedrawRequested => {
                        state.update();
                        match state.render() {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                state.resize(state.size)
                            }
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                log::error!("GPU out of memory, exiting");
                                control_flow.exit()
                            }
                            Err(e) => log::warn!("Frame dropped: {:?}", e),
                        }
                    }
                    _ => {}
                }
            }
            WinitEvent::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}
