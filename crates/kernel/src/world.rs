use glam::Vec3;
use glade_common::EntityId;
use glade_physics::{BodyKind, PhysicsError, PhysicsWorld};
use glade_render::RenderItem;

use crate::animation::advance_animations;
use crate::entity::{Entity, FrameContext};

/// Everything that lives in the scene.
///
/// Entities keep their spawn order, which is also the update and render
/// order. The world owns the physics world so bodies and entities are
/// released together.
#[derive(Debug, Default)]
pub struct World {
    entities: Vec<Entity>,
    physics: PhysicsWorld,
    tick: u64,
}

impl World {
    pub fn new(physics: PhysicsWorld) -> Self {
        Self {
            entities: Vec::new(),
            physics,
            tick: 0,
        }
    }

    /// Frames simulated so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn advance_tick(&mut self) {
        self.tick += 1;
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    /// Add an entity. Returns its id.
    pub fn push(&mut self, entity: Entity) -> EntityId {
        let id = entity.id();
        self.entities.push(entity);
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id() == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id() == id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name() == name)
    }

    /// The keyboard-driven entity, if one was spawned.
    pub fn player(&self) -> Option<&Entity> {
        self.entities.iter().find(|e| e.is_player())
    }

    pub fn player_position(&self) -> Option<Vec3> {
        self.player().map(|e| e.transform.position)
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.physics
    }

    /// Dispose an entity and remove it in the same call. Returns whether it
    /// existed.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        let Some(index) = self.entities.iter().position(|e| e.id() == id) else {
            return false;
        };
        let entity = self.entities.remove(index);
        entity.dispose(&mut self.physics);
        true
    }

    /// Advance physics and sync poses by body kind.
    ///
    /// Kinematic bodies take the entity's pose before the step. Dynamic
    /// bodies hand their interpolated pose back to the entity after it.
    /// Static bodies are left alone.
    pub fn step_physics(&mut self, fixed_sub_step: f32, dt: f32) -> Result<usize, PhysicsError> {
        for entity in &self.entities {
            if let Some(handle) = entity.body() {
                self.physics
                    .set_kinematic_pose(handle, entity.transform.position, entity.transform.rotation);
            }
        }

        let substeps = self.physics.step(fixed_sub_step, dt)?;

        let alpha = self.physics.alpha();
        for entity in &mut self.entities {
            let Some(body) = entity.body().and_then(|h| self.physics.body(h)) else {
                continue;
            };
            if body.kind == BodyKind::Dynamic {
                entity.transform.position = body.interpolated_position(alpha);
                entity.transform.rotation = body.orientation;
            }
        }
        Ok(substeps)
    }

    /// Update every healthy entity. A failing entity is logged, marked
    /// faulted and skipped from then on; the rest of the frame continues.
    ///
    /// Returns how many entities were updated successfully.
    pub fn update_entities(&mut self, dt: f32, ctx: &FrameContext<'_>) -> usize {
        let mut updated = 0;
        for entity in self.entities.iter_mut().filter(|e| !e.is_faulted()) {
            match entity.update(dt, ctx) {
                Ok(()) => updated += 1,
                Err(err) => {
                    tracing::error!(
                        entity = %entity.name(),
                        id = %entity.id().short(),
                        error = %err,
                        "entity update failed, skipping it from now on"
                    );
                    entity.mark_faulted();
                }
            }
        }
        updated
    }

    pub fn faulted_count(&self) -> usize {
        self.entities.iter().filter(|e| e.is_faulted()).count()
    }

    pub fn advance_animations(&mut self, dt: f32) -> usize {
        advance_animations(&mut self.entities, dt)
    }

    /// Renderable entities in spawn order.
    pub fn render_items(&self) -> Vec<RenderItem> {
        self.entities.iter().filter_map(Entity::render_item).collect()
    }

    /// Dispose every entity. The world is empty afterwards.
    pub fn dispose_all(&mut self) {
        let count = self.entities.len();
        for entity in self.entities.drain(..) {
            entity.dispose(&mut self.physics);
        }
        tracing::info!(count, "world disposed");
    }
}
