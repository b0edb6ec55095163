// egui HUD drawn over the scene: feed health, entity counts, blend progress, FPS.
// Toggled with F3.

use egui::epaint::Shadow;
use egui::{Color32, RichText};

use super::scene::FeedFailures;

const PANEL_FILL: Color32 = Color32::from_rgba_premultiplied(0, 0, 0, 170);
const WARN_COLOR: Color32 = Color32::from_rgb(255, 120, 110);

/// Numbers shown in the HUD, refreshed once per frame.
#[derive(Debug, Clone, Default)]
pub struct HudStats {
    pub fps: u32,
    pub frame_time_ms: f32,
    pub server: String,
    pub agents: usize,
    pub visible_agents: usize,
    pub signals: usize,
    pub obstacles: usize,
    /// Blend factor of the current polling interval.
    pub blend: f32,
    pub agent_snapshots: u64,
    pub signal_snapshots: u64,
    pub failures: FeedFailures,
    pub last_error: Option<String>,
    /// False once the fetch thread has exited.
    pub feed_alive: bool,
}

pub struct DebugOverlay {
    pub visible: bool,
    ctx: egui::Context,
    input: egui_winit::State,
    renderer: egui_wgpu::Renderer,
}

impl DebugOverlay {
    pub fn new(
        window: &winit::window::Window,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        visible: bool,
    ) -> Self {
        let ctx = egui::Context::default();
        apply_hud_style(&ctx);

        let input = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        // Drawn in its own pass after the scene: no depth, no MSAA, no dithering.
        let renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);

        Self { visible, ctx, input, renderer }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        log::debug!("HUD {}", if self.visible { "shown" } else { "hidden" });
    }

    pub fn handle_window_event(
        &mut self,
        window: &winit::window::Window,
        event: &winit::event::WindowEvent,
    ) -> egui_winit::EventResponse {
        self.input.on_window_event(window, event)
    }

    /// Lay out the HUD for `stats` and paint it on top of `view`.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        window: &winit::window::Window,
        view: &wgpu::TextureView,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
        stats: &HudStats,
    ) {
        let raw_input = self.input.take_egui_input(window);
        let output = self.ctx.run(raw_input, |ctx| {
            egui::Area::new(egui::Id::new("traffic_hud"))
                .fixed_pos(egui::pos2(10.0, 10.0))
                .show(ctx, |ui| {
                    egui::Frame::none()
                        .fill(PANEL_FILL)
                        .inner_margin(egui::Margin::same(8.0))
                        .rounding(4.0)
                        .show(ui, |ui| stats_panel(ui, stats));
                });
        });
        self.input.handle_platform_output(window, output.platform_output);

        let primitives = self.ctx.tessellate(output.shapes, output.pixels_per_point);
        for (id, delta) in &output.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, delta);
        }
        self.renderer
            .update_buffers(device, queue, encoder, &primitives, screen_descriptor);

        self.paint(encoder, view, &primitives, screen_descriptor);

        for id in &output.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }

    fn paint(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        primitives: &[egui::ClippedPrimitive],
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("HUD Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        self.renderer
            .render(&mut pass.forget_lifetime(), primitives, screen_descriptor);
    }
}

/// Dark translucent panel, small white monospace text.
fn apply_hud_style(ctx: &egui::Context) {
    let mut visuals = egui::Visuals::dark();
    visuals.window_fill = PANEL_FILL;
    visuals.window_stroke = egui::Stroke::NONE;
    visuals.window_shadow = Shadow::NONE;
    visuals.override_text_color = Some(Color32::WHITE);
    ctx.set_visuals(visuals);

    ctx.style_mut(|style| style.override_font_id = Some(egui::FontId::monospace(13.0)));
}

fn stats_panel(ui: &mut egui::Ui, stats: &HudStats) {
    ui.label(format!("FPS {:>4}  {:6.2} ms", stats.fps, stats.frame_time_ms));
    ui.label(format!("Server  {}", stats.server));
    ui.separator();

    ui.label(format!("Cars    {} ({} shown)", stats.agents, stats.visible_agents));
    ui.label(format!("Lights  {}", stats.signals));
    ui.label(format!("Blocks  {}", stats.obstacles));
    ui.add(egui::ProgressBar::new(stats.blend).text(format!("blend {:.2}", stats.blend)));
    ui.separator();

    ui.label(format!(
        "Snapshots  cars {}  lights {}",
        stats.agent_snapshots, stats.signal_snapshots
    ));
    let failures = stats.failures;
    if failures.total() > 0 {
        ui.label(
            RichText::new(format!(
                "Failed     cars {}  lights {}  blocks {}",
                failures.agents, failures.signals, failures.obstacles
            ))
            .color(WARN_COLOR),
        );
    }
    if let Some(error) = &stats.last_error {
        ui.label(RichText::new(format!("Last error: {error}")).color(WARN_COLOR));
    }
    if !stats.feed_alive {
        ui.label(RichText::new("Feed stopped").color(WARN_COLOR).strong());
    }
}
