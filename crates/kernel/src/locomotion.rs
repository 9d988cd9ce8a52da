//! Camera-relative ground locomotion.

use glam::{Mat3, Quat, Vec3};
use glade_common::Transform;
use glade_input::{InputState, MoveKey};
use serde::{Deserialize, Serialize};

use crate::camera::OrbitCamera;

/// Movement tuning for a keyboard-driven entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Locomotion {
    /// Ground speed in world units per second.
    pub speed: f32,
    /// Heading slerp rate; each frame moves `rotation_speed * dt` of the way.
    pub rotation_speed: f32,
    /// The entity's up axis, used when building the target heading.
    pub up: Vec3,
}

impl Default for Locomotion {
    fn default() -> Self {
        Self {
            speed: 50.0,
            rotation_speed: 5.0,
            up: Vec3::Y,
        }
    }
}

/// Raw intent in camera-local axes: `z = back - forward`, `x = left - right`.
/// Not normalized; opposing keys cancel.
pub fn intent(input: &InputState) -> Vec3 {
    let axis = |pos: MoveKey, neg: MoveKey| {
        f32::from(u8::from(input.is_held(pos))) - f32::from(u8::from(input.is_held(neg)))
    };
    Vec3::new(
        axis(MoveKey::Left, MoveKey::Right),
        0.0,
        axis(MoveKey::Back, MoveKey::Forward),
    )
}

/// Rotation whose +Z axis points along `direction`, with `up` as the
/// reference up axis. `None` if the direction is zero or parallel to `up`.
pub fn look_rotation(direction: Vec3, up: Vec3) -> Option<Quat> {
    let z = direction.try_normalize()?;
    let x = up.cross(z).try_normalize()?;
    let y = z.cross(x);
    Some(Quat::from_mat3(&Mat3::from_cols(x, y, z)).normalize())
}

impl Locomotion {
    /// Compute the next transform, or `None` when nothing moves this frame
    /// (no net intent, or `dt <= 0`).
    pub fn step(
        &self,
        transform: &Transform,
        input: &InputState,
        camera: &OrbitCamera,
        dt: f32,
    ) -> Option<Transform> {
        if !(dt > 0.0) {
            return None;
        }
        let intent = intent(input).try_normalize()?;

        let forward = camera.forward();
        let right = camera.up.cross(forward);
        let mut direction = forward * -intent.z + right * intent.x;
        direction.y = 0.0;

        let position = transform.position + direction * self.speed * dt;

        let mut target = position;
        target.y = transform.position.y;
        let rotation = match look_rotation(target - transform.position, self.up) {
            Some(heading) => {
                let fraction = (self.rotation_speed * dt).clamp(0.0, 1.0);
                transform.rotation.slerp(heading, fraction)
            }
            None => transform.rotation,
        };

        Some(Transform {
            position,
            rotation,
            ..*transform
        })
    }
}
