use std::collections::BTreeMap;

use glam::{Mat4, Quat, Vec3};
use glade_common::{Aabb, Transform};
use rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::body::{BodyHandle, BodyKind, BodyParams, RigidBody};

/// Smallest extent accepted on any axis of a collision box.
const MIN_EXTENT: f32 = 1e-6;
/// Half-size of the ground slab on the horizontal axes.
const GROUND_HALF_WIDTH: f32 = 10_000.0;
const GROUND_HALF_THICKNESS: f32 = 0.5;

#[derive(Debug, thiserror::Error)]
pub enum PhysicsError {
    #[error("degenerate collision geometry: size {size:?}")]
    InvalidGeometry { size: Vec3 },
    #[error("fixed sub-step must be positive, got {0}")]
    InvalidSubStep(f32),
}

/// Physics world configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Length of one internal integration step, in seconds.
    pub fixed_step: f32,
    /// Upper bound on sub-steps per `step` call. Surplus time is dropped.
    pub max_substeps: u32,
    pub gravity: Vec3,
    /// Height of the infinite ground plane, if any.
    pub ground_height: Option<f32>,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            fixed_step: 1.0 / 60.0,
            max_substeps: 10,
            gravity: Vec3::new(0.0, -9.82, 0.0),
            ground_height: Some(0.0),
        }
    }
}

/// Rapier state: body and collider sets plus the pipeline that steps them.
struct Simulation {
    gravity: Vec3,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    bodies: RigidBodySet,
    colliders: ColliderSet,
}

impl Simulation {
    fn new(config: &PhysicsConfig) -> Self {
        let mut colliders = ColliderSet::new();
        if let Some(ground) = config.ground_height {
            // Top face sits at `ground`.
            let slab = ColliderBuilder::cuboid(GROUND_HALF_WIDTH, GROUND_HALF_THICKNESS, GROUND_HALF_WIDTH)
                .translation([0.0, ground - GROUND_HALF_THICKNESS, 0.0].into())
                .build();
            colliders.insert(slab);
        }
        Self {
            gravity: config.gravity,
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            bodies: RigidBodySet::new(),
            colliders,
        }
    }

    fn insert_box(&mut self, kind: BodyKind, mass: f32, half_extents: Vec3, position: Vec3) -> RigidBodyHandle {
        let builder = match kind {
            BodyKind::Dynamic => RigidBodyBuilder::dynamic(),
            BodyKind::Kinematic => RigidBodyBuilder::kinematic_position_based(),
            BodyKind::Static => RigidBodyBuilder::fixed(),
        };
        let body = builder
            .translation([position.x, position.y, position.z].into())
            .lock_rotations()
            .build();
        let handle = self.bodies.insert(body);
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .mass(mass)
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    fn remove(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    fn move_kinematic(&mut self, handle: RigidBodyHandle, position: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_next_kinematic_translation([position.x, position.y, position.z].into());
        }
    }

    /// Linear state of a body as `(position, velocity)`.
    fn linear_state(&self, handle: RigidBodyHandle) -> Option<(Vec3, Vec3)> {
        let body = self.bodies.get(handle)?;
        let t = body.translation();
        let v = body.linvel();
        Some((Vec3::new(t.x, t.y, t.z), Vec3::new(v.x, v.y, v.z)))
    }

    fn step(&mut self, h: f32) {
        self.integration_parameters.dt = h;
        let gravity = rapier3d::math::Vector::new(self.gravity.x, self.gravity.y, self.gravity.z);
        self.pipeline.step(
            gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            &(),
            &(),
        );
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("gravity", &self.gravity)
            .field("bodies", &self.bodies.len())
            .field("colliders", &self.colliders.len())
            .finish_non_exhaustive()
    }
}

/// Owns every rigid body and advances them at a fixed sub-step.
///
/// Rapier does the simulation; this type keeps the handle map, the
/// sub-step accumulator and a per-body pose mirror the frame loop reads.
/// Uses BTreeMap so bodies sync in the same order on every run.
#[derive(Debug)]
pub struct PhysicsWorld {
    config: PhysicsConfig,
    bodies: BTreeMap<BodyHandle, RigidBody>,
    sim: Simulation,
    next_handle: u64,
    accumulator: f32,
    alpha: f32,
    total_substeps: u64,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

impl PhysicsWorld {
    pub fn new(config: PhysicsConfig) -> Self {
        let sim = Simulation::new(&config);
        Self {
            config,
            bodies: BTreeMap::new(),
            sim,
            next_handle: 0,
            accumulator: 0.0,
            alpha: 0.0,
            total_substeps: 0,
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Interpolation factor left over from the last `step`, in `[0, 1)`.
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Sub-steps integrated since creation.
    pub fn total_substeps(&self) -> u64 {
        self.total_substeps
    }

    /// Register an axis-aligned box body sized from a model's local bounds
    /// posed by the spawn scale and rotation.
    ///
    /// The half-extents are fixed here; later changes to the visual scale do
    /// not resize the collision box.
    pub fn register_body(
        &mut self,
        local_bounds: &Aabb,
        spawn: &Transform,
        params: BodyParams,
    ) -> Result<BodyHandle, PhysicsError> {
        let size = spawn_extent(local_bounds, spawn);
        if !size.is_finite() || size.min_element() < MIN_EXTENT {
            return Err(PhysicsError::InvalidGeometry { size });
        }

        let half_extents = size * 0.5;
        let rapier = self
            .sim
            .insert_box(params.kind, params.mass, half_extents, spawn.position);
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        let body = RigidBody::new(params, half_extents, spawn.position, spawn.rotation, rapier);
        tracing::debug!(
            handle = handle.0,
            kind = ?params.kind,
            mass = params.mass,
            half_extents = ?body.half_extents(),
            "body registered"
        );
        self.bodies.insert(handle, body);
        Ok(handle)
    }

    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<RigidBody> {
        let removed = self.bodies.remove(&handle)?;
        self.sim.remove(removed.rapier);
        tracing::debug!(handle = handle.0, "body removed");
        Some(removed)
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(&handle)
    }

    /// Move a kinematic body to the pose its owner dictates. The simulation
    /// reaches it on the next sub-step.
    pub fn set_kinematic_pose(&mut self, handle: BodyHandle, position: Vec3, orientation: Quat) -> bool {
        match self.bodies.get_mut(&handle) {
            Some(body) if body.kind == BodyKind::Kinematic => {
                body.position = position;
                body.orientation = orientation;
                self.sim.move_kinematic(body.rapier, position);
                true
            }
            _ => false,
        }
    }

    /// Advance by `elapsed` seconds using sub-steps of `fixed_sub_step`.
    ///
    /// Returns the number of sub-steps integrated. Time left over (less than
    /// one sub-step) carries into the next call; time beyond `max_substeps`
    /// is discarded.
    pub fn step(&mut self, fixed_sub_step: f32, elapsed: f32) -> Result<usize, PhysicsError> {
        if !(fixed_sub_step > 0.0) {
            return Err(PhysicsError::InvalidSubStep(fixed_sub_step));
        }
        if elapsed > 0.0 {
            self.accumulator += elapsed;
        }

        let mut substeps = 0usize;
        while self.accumulator >= fixed_sub_step && substeps < self.config.max_substeps as usize {
            self.substep(fixed_sub_step);
            self.accumulator -= fixed_sub_step;
            substeps += 1;
        }
        if self.accumulator >= fixed_sub_step {
            tracing::warn!(
                dropped = self.accumulator - self.accumulator % fixed_sub_step,
                "physics fell behind, dropping time"
            );
            self.accumulator %= fixed_sub_step;
        }

        self.alpha = self.accumulator / fixed_sub_step;
        self.total_substeps += substeps as u64;
        tracing::trace!(substeps, alpha = self.alpha, "physics step");
        Ok(substeps)
    }

    fn substep(&mut self, h: f32) {
        for body in self.bodies.values_mut() {
            body.previous_position = body.position;
        }
        self.sim.step(h);
        for body in self.bodies.values_mut() {
            if body.kind != BodyKind::Dynamic {
                continue;
            }
            if let Some((position, velocity)) = self.sim.linear_state(body.rapier) {
                body.position = position;
                body.velocity = velocity;
            }
        }
    }
}

/// Size of the world-axis box around `bounds` once scaled and rotated by
/// the spawn pose. Translation plays no part.
fn spawn_extent(bounds: &Aabb, spawn: &Transform) -> Vec3 {
    let pose = Mat4::from_scale_rotation_translation(spawn.scale.abs(), spawn.rotation, Vec3::ZERO);
    bounds.transformed(&pose).size()
}
