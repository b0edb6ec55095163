// Orbit camera around the city grid.
//
// Render space is left-handed (+X east, +Y up, +Z north), matching the
// wire → render remap, so the camera uses the `_lh` view and projection.
// Seen from above, east is to the right of north as on a map.
//
// Camera model:
//   - A fixed target point at the centre of the grid on the ground plane
//   - Yaw orbits around the target, pitch tilts between grazing and top-down
//   - Zoom by adjusting distance along the look vector
//   - A/D or Left/Right orbit, W/S or Up/Down tilt, mouse wheel zooms

use std::collections::HashSet;

use glam::{Mat4, Vec3};
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Keys currently held and scroll accumulated since the last frame.
#[derive(Default)]
pub struct CameraInput {
    keys_held: HashSet<KeyCode>,
    scroll_delta: f32,
}

impl CameraInput {
    pub fn process_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => { self.keys_held.insert(key); }
                        ElementState::Released => { self.keys_held.remove(&key); }
                    }
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.scroll_delta += match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
            }
            _ => {}
        }
    }

    fn axis(&self, positive: [KeyCode; 2], negative: [KeyCode; 2]) -> f32 {
        let held = |keys: [KeyCode; 2]| keys.iter().any(|k| self.keys_held.contains(k));
        held(positive) as i32 as f32 - held(negative) as i32 as f32
    }

    /// Take the scroll accumulated since the previous call.
    fn take_scroll(&mut self) -> f32 {
        std::mem::take(&mut self.scroll_delta)
    }
}

pub struct OrbitCamera {
    pub target: Vec3,

    /// Distance from target along the look direction.
    /// Private: always clamped to [min_distance, max_distance]. Use distance() to read.
    distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,

    /// Horizontal rotation in radians around the target.
    pub yaw: f32,

    /// Elevation angle in radians (0 = horizontal, PI/2 = straight down).
    pitch: f32,

    pub fov: f32,
    pub near: f32,
    pub far: f32,

    /// Radians per second while an orbit key is held.
    pub orbit_speed: f32,
    /// Distance change per scroll line.
    pub zoom_speed: f32,
}

const MIN_PITCH: f32 = 0.15;
const MAX_PITCH: f32 = 1.5;

impl OrbitCamera {
    /// Frame a `width` × `height` grid from its south-west corner.
    pub fn framing_grid(width: u32, height: u32) -> Self {
        let extent = width.max(height) as f32;
        Self {
            target: Vec3::new(width as f32 * 0.5 - 0.5, 0.0, height as f32 * 0.5 - 0.5),
            distance: extent * 1.3,
            min_distance: 3.0,
            max_distance: extent * 3.0,
            yaw: -std::f32::consts::FRAC_PI_4,
            pitch: 50.0_f32.to_radians(),
            fov: 45.0_f32.to_radians(),
            near: 0.1,
            far: 500.0,
            orbit_speed: 1.2,
            zoom_speed: 1.5,
        }
    }

    #[cfg(test)]
    pub fn distance(&self) -> f32 {
        self.distance
    }

    #[cfg(test)]
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Apply held keys and scroll. Call once per frame before rendering.
    pub fn update(&mut self, input: &mut CameraInput, dt: f32) {
        let orbit = input.axis([KeyCode::KeyD, KeyCode::ArrowRight], [KeyCode::KeyA, KeyCode::ArrowLeft]);
        let tilt = input.axis([KeyCode::KeyW, KeyCode::ArrowUp], [KeyCode::KeyS, KeyCode::ArrowDown]);
        self.yaw += orbit * self.orbit_speed * dt;
        self.pitch = (self.pitch + tilt * self.orbit_speed * dt).clamp(MIN_PITCH, MAX_PITCH);
        self.distance = (self.distance - input.take_scroll() * self.zoom_speed)
            .clamp(self.min_distance, self.max_distance);
    }

    pub fn eye(&self) -> Vec3 {
        let horizontal = self.distance * self.pitch.cos();
        self.target
            + Vec3::new(
                horizontal * self.yaw.sin(),
                self.distance * self.pitch.sin(),
                horizontal * self.yaw.cos(),
            )
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        let projection = Mat4::perspective_lh(self.fov, aspect, self.near, self.far);
        let view = Mat4::look_at_lh(self.eye(), self.target, Vec3::Y);
        projection * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eye_keeps_its_distance_from_the_target() {
        let camera = OrbitCamera::framing_grid(26, 26);
        assert!((camera.eye().distance(camera.target) - camera.distance()).abs() < 1e-3);
        assert!(camera.eye().y > 0.0);
    }

    /// Screen position in NDC of a wire-space ground point.
    fn project(view_proj: Mat4, x: f32, y: f32) -> glam::Vec2 {
        let clip = view_proj * crate::engine::snapshot::wire_to_render(x, y, 0.0).extend(1.0);
        assert!(clip.w > 0.0, "point behind the camera");
        glam::Vec2::new(clip.x, clip.y) / clip.w
    }

    #[test]
    fn server_map_is_not_mirrored() {
        let mut camera = OrbitCamera::framing_grid(26, 26);
        let mut input = CameraInput::default();
        for yaw_step in 0..8 {
            camera.yaw = -std::f32::consts::FRAC_PI_4 + yaw_step as f32 * std::f32::consts::FRAC_PI_4;
            for key in [None, Some(KeyCode::KeyW), Some(KeyCode::KeyS)] {
                input.keys_held.clear();
                input.keys_held.extend(key);
                camera.update(&mut input, 2.0);

                let view_proj = camera.view_proj(16.0 / 9.0);
                let origin = project(view_proj, 13.0, 13.0);
                let east = project(view_proj, 14.0, 13.0) - origin;
                let north = project(view_proj, 13.0, 14.0) - origin;
                // North is a counter-clockwise turn from east on screen, as on a map.
                assert!(east.perp_dot(north) > 0.0, "yaw {} pitch {}: mirrored", camera.yaw, camera.pitch());
            }
        }
    }

    #[test]
    fn default_view_puts_the_grid_centre_on_screen() {
        let camera = OrbitCamera::framing_grid(26, 26);
        let centre = project(camera.view_proj(1.0), 12.5, 12.5);
        assert!(centre.abs_diff_eq(glam::Vec2::ZERO, 1e-4), "{centre:?}");
    }

    #[test]
    fn zoom_is_clamped() {
        let mut camera = OrbitCamera::framing_grid(10, 10);
        let mut input = CameraInput { scroll_delta: 1000.0, ..Default::default() };
        camera.update(&mut input, 0.016);
        assert_eq!(camera.distance(), camera.min_distance);
        assert_eq!(input.scroll_delta, 0.0);
    }

    #[test]
    fn tilt_is_clamped() {
        let mut camera = OrbitCamera::framing_grid(10, 10);
        let mut input = CameraInput::default();
        input.keys_held.insert(KeyCode::KeyW);
        camera.update(&mut input, 100.0);
        assert_eq!(camera.pitch(), MAX_PITCH);
    }
}
