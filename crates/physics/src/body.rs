use glam::{Quat, Vec3};
use rapier3d::prelude::RigidBodyHandle;
use serde::{Deserialize, Serialize};

/// Key of a body inside a [`crate::PhysicsWorld`].
///
/// Handles are never reused, so a handle kept after its body was removed
/// simply misses on lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u64);

/// Who owns a body's pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    /// Simulated; its pose is copied onto the entity after each step.
    #[default]
    Dynamic,
    /// Driven by the entity; its pose is pushed in before each step.
    Kinematic,
    /// Never moves and never syncs.
    Static,
}

/// Registration parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyParams {
    pub mass: f32,
    pub kind: BodyKind,
}

impl Default for BodyParams {
    fn default() -> Self {
        Self {
            mass: 1.0,
            kind: BodyKind::Dynamic,
        }
    }
}

/// Engine-side view of a box body simulated by rapier.
///
/// Refreshed after every sub-step for dynamic bodies. The orientation is the
/// owner's; colliders are axis-aligned and never rotate.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    pub kind: BodyKind,
    pub mass: f32,
    pub position: Vec3,
    pub orientation: Quat,
    pub velocity: Vec3,
    pub(crate) previous_position: Vec3,
    pub(crate) rapier: RigidBodyHandle,
    half_extents: Vec3,
}

impl RigidBody {
    pub(crate) fn new(
        params: BodyParams,
        half_extents: Vec3,
        position: Vec3,
        orientation: Quat,
        rapier: RigidBodyHandle,
    ) -> Self {
        Self {
            kind: params.kind,
            mass: params.mass,
            position,
            orientation,
            velocity: Vec3::ZERO,
            previous_position: position,
            rapier,
            half_extents,
        }
    }

    /// Collision half-extents, fixed at registration.
    pub fn half_extents(&self) -> Vec3 {
        self.half_extents
    }

    /// Position blended between the last two sub-steps by `alpha`.
    pub fn interpolated_position(&self, alpha: f32) -> Vec3 {
        self.previous_position.lerp(self.position, alpha.clamp(0.0, 1.0))
    }
}
