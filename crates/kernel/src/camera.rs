use glam::{Mat4, Vec3};
use glade_render::RenderView;

use crate::config::CameraConfig;

/// Orbit camera that follows a target at a bounded distance.
///
/// The camera is shared with entities for the duration of a frame (they read
/// its orientation) but only the engine moves it.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl OrbitCamera {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            position: config.position,
            target: config.target,
            up: Vec3::Y,
            fov_degrees: config.fov_degrees,
            near: config.near,
            far: config.far,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
        }
    }

    /// Look direction. Falls back to -Z when the camera sits on its target.
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position)
            .try_normalize()
            .unwrap_or(Vec3::NEG_Z)
    }

    /// `up x forward`. Points to the viewer's left for a right-handed
    /// camera, which is what camera-relative movement expects.
    pub fn right(&self) -> Vec3 {
        self.up.cross(self.forward())
    }

    pub fn distance(&self) -> f32 {
        self.position.distance(self.target)
    }

    /// Re-target the camera, keeping its orbit offset with the distance
    /// clamped to `[min_distance, max_distance]`.
    pub fn follow(&mut self, target: Vec3) {
        let offset = self.position - self.target;
        let offset = if offset.length_squared() > 0.0 {
            offset.clamp_length(self.min_distance, self.max_distance)
        } else {
            Vec3::Z * self.min_distance
        };
        self.target = target;
        self.position = target + offset;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), aspect, self.near, self.far)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    pub fn render_view(&self) -> RenderView {
        RenderView {
            eye: self.position,
            target: self.target,
            fov_degrees: self.fov_degrees,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera() {
        let cam = OrbitCamera::default();
        assert!(cam.position.y > 0.0);
        let vp = cam.view_projection(16.0 / 9.0);
        assert!(!vp.col(0).x.is_nan());
    }

    #[test]
    fn right_is_up_cross_forward() {
        let cam = OrbitCamera {
            position: Vec3::new(0.0, 0.0, 10.0),
            target: Vec3::ZERO,
            ..OrbitCamera::default()
        };
        assert_eq!(cam.forward(), Vec3::NEG_Z);
        assert!((cam.right() - Vec3::NEG_X).length() < 1e-6);
    }

    #[test]
    fn follow_keeps_direction_and_clamps_distance() {
        let mut cam = OrbitCamera::default();
        let before = cam.forward();
        cam.follow(Vec3::new(5.0, 0.0, -3.0));
        assert!((cam.forward() - before).length() < 1e-5);
        assert!((cam.distance() - cam.max_distance).abs() < 1e-3);
        assert_eq!(cam.target, Vec3::new(5.0, 0.0, -3.0));
    }

    #[test]
    fn follow_from_degenerate_offset() {
        let mut cam = OrbitCamera {
            position: Vec3::ZERO,
            target: Vec3::ZERO,
            ..OrbitCamera::default()
        };
        cam.follow(Vec3::ONE);
        assert!((cam.distance() - cam.min_distance).abs() < 1e-5);
    }
}
