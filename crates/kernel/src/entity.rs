use glam::Vec3;
use glade_assets::{AssetError, ModelLoader, SceneNode};
use glade_common::{Aabb, EntityId, Transform};
use glade_input::{InputChannel, InputSnapshot, Subscription};
use glade_physics::{BodyHandle, PhysicsWorld};
use glade_render::RenderItem;

use crate::animation::{AnimationPlayer, AnimationSpec};
use crate::camera::OrbitCamera;
use crate::error::{BehaviorError, EntityError};
use crate::locomotion::Locomotion;

/// Read-only state shared with every entity during the update pass.
/// `Sync`, so the pass may be spread across threads.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    pub input: InputSnapshot<'a>,
    pub camera: &'a OrbitCamera,
}

/// Custom per-frame logic attached to an entity.
///
/// Implementations may only touch the transform they are handed.
pub trait Behavior: Send {
    fn update(&mut self, transform: &mut Transform, dt: f32, ctx: &FrameContext<'_>) -> Result<(), BehaviorError>;
}

/// Owned renderable resource: the node subtree spawned from a model.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderHandle {
    pub model: String,
    pub node: SceneNode,
}

/// Makes an entity keyboard-driven.
#[derive(Debug)]
pub struct PlayerController {
    subscription: Subscription,
    locomotion: Locomotion,
    target_position: Vec3,
}

impl PlayerController {
    pub fn new(subscription: Subscription, locomotion: Locomotion) -> Self {
        Self {
            subscription,
            locomotion,
            target_position: Vec3::ZERO,
        }
    }

    pub fn locomotion(&self) -> &Locomotion {
        &self.locomotion
    }

    /// Position the controller last steered towards.
    pub fn target_position(&self) -> Vec3 {
        self.target_position
    }

    fn update(&mut self, transform: &mut Transform, dt: f32, ctx: &FrameContext<'_>) {
        let Some(input) = ctx.input.for_subscription(&self.subscription) else {
            return;
        };
        if let Some(next) = self.locomotion.step(transform, input, ctx.camera, dt) {
            self.target_position = next.position;
            *transform = next;
        }
    }
}

/// What to spawn and where.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnParams {
    pub name: String,
    pub model_path: String,
    pub transform: Transform,
    pub animation: Option<AnimationSpec>,
}

/// A simulated object. Behavior comes from which capabilities are present.
pub struct Entity {
    id: EntityId,
    name: String,
    pub transform: Transform,
    render: Option<RenderHandle>,
    animation: Option<AnimationPlayer>,
    body: Option<BodyHandle>,
    controller: Option<PlayerController>,
    behavior: Option<Box<dyn Behavior>>,
    local_bounds: Aabb,
    faulted: bool,
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("transform", &self.transform)
            .field("animated", &self.animation.is_some())
            .field("body", &self.body)
            .field("player", &self.controller.is_some())
            .field("faulted", &self.faulted)
            .finish()
    }
}

impl Entity {
    /// An entity with no capabilities.
    pub fn new(name: impl Into<String>, transform: Transform) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            transform,
            render: None,
            animation: None,
            body: None,
            controller: None,
            behavior: None,
            local_bounds: Aabb::EMPTY,
            faulted: false,
        }
    }

    /// Load the model and build a renderable, optionally animated entity.
    ///
    /// The first top-level node of the model becomes the entity's root; its
    /// transform is replaced by `params.transform`.
    pub async fn spawn<L: ModelLoader>(loader: &L, params: SpawnParams) -> Result<Self, AssetError> {
        let model = loader.load(&params.model_path).await?;
        let node = model
            .primary()
            .cloned()
            .ok_or_else(|| AssetError::EmptyModel(params.model_path.clone()))?;

        let mut entity = Self::new(params.name, params.transform);
        entity.local_bounds = node.local_bounds();

        if let Some(spec) = params.animation {
            match model.clips.get(spec.clip_index) {
                Some(clip) => {
                    entity.animation = Some(AnimationPlayer::new(clip.clone(), spec.duration));
                }
                None => tracing::warn!(
                    entity = %entity.name,
                    model = %params.model_path,
                    clip = spec.clip_index,
                    available = model.clips.len(),
                    "animation clip missing, spawning without animation"
                ),
            }
        }

        entity.render = Some(RenderHandle {
            model: params.model_path,
            node,
        });
        tracing::debug!(
            entity = %entity.name,
            id = %entity.id.short(),
            position = ?entity.transform.position,
            "entity spawned"
        );
        Ok(entity)
    }

    pub fn with_controller(mut self, controller: PlayerController) -> Self {
        self.controller = Some(controller);
        self
    }

    pub fn with_behavior(mut self, behavior: impl Behavior + 'static) -> Self {
        self.behavior = Some(Box::new(behavior));
        self
    }

    pub fn with_animation(mut self, player: AnimationPlayer) -> Self {
        self.animation = Some(player);
        self
    }

    pub fn with_local_bounds(mut self, bounds: Aabb) -> Self {
        self.local_bounds = bounds;
        self
    }

    /// Create a keyboard-driven controller subscribed to `input`.
    pub fn attach_player(&mut self, input: &mut InputChannel, locomotion: Locomotion) {
        self.controller = Some(PlayerController::new(input.subscribe(), locomotion));
    }

    pub fn attach_body(&mut self, handle: BodyHandle) {
        self.body = Some(handle);
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn render(&self) -> Option<&RenderHandle> {
        self.render.as_ref()
    }

    pub fn animation(&self) -> Option<&AnimationPlayer> {
        self.animation.as_ref()
    }

    pub fn animation_mut(&mut self) -> Option<&mut AnimationPlayer> {
        self.animation.as_mut()
    }

    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    pub fn controller(&self) -> Option<&PlayerController> {
        self.controller.as_ref()
    }

    pub fn is_player(&self) -> bool {
        self.controller.is_some()
    }

    /// Model bounds in the entity's own space (before its transform).
    pub fn local_bounds(&self) -> &Aabb {
        &self.local_bounds
    }

    pub fn world_bounds(&self) -> Aabb {
        self.local_bounds.transformed(&self.transform.matrix())
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    pub(crate) fn mark_faulted(&mut self) {
        self.faulted = true;
    }

    /// Run one frame of this entity's logic.
    ///
    /// Only the entity's own transform and capability state change. On
    /// error the transform is left as it was before the call.
    pub fn update(&mut self, dt: f32, ctx: &FrameContext<'_>) -> Result<(), EntityError> {
        let before = self.transform;

        if let Some(controller) = self.controller.as_mut() {
            controller.update(&mut self.transform, dt, ctx);
        }
        if let Some(behavior) = self.behavior.as_mut() {
            if let Err(source) = behavior.update(&mut self.transform, dt, ctx) {
                self.transform = before;
                return Err(EntityError::Behavior {
                    name: self.name.clone(),
                    source,
                });
            }
        }

        if !self.transform.is_finite() {
            self.transform = before;
            return Err(EntityError::NonFiniteTransform {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    pub fn render_item(&self) -> Option<RenderItem> {
        self.render.as_ref().map(|_| RenderItem {
            id: self.id,
            name: self.name.clone(),
            transform: self.transform,
            animation_time: self.animation.as_ref().map(AnimationPlayer::time),
        })
    }

    /// Release everything the entity holds: the renderable, the physics
    /// body and the input subscription.
    pub fn dispose(self, physics: &mut PhysicsWorld) {
        if let Some(handle) = self.body {
            physics.remove_body(handle);
        }
        tracing::debug!(entity = %self.name, id = %self.id.short(), "entity disposed");
        // Dropping the controller drops its subscription.
    }
}
