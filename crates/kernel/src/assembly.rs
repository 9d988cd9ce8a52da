//! Builds the initial [`World`] from configuration and a world scene.
//!
//! Marker lookup runs to completion before anything is spawned, so a bad
//! world scene never leaves a half-built world behind.

use glam::{Quat, Vec3};
use glade_assets::{Model, ModelLoader};
use glade_common::Transform;
use glade_input::InputChannel;
use glade_physics::{BodyParams, PhysicsWorld};

use crate::config::EngineConfig;
use crate::entity::{Entity, SpawnParams};
use crate::error::EngineError;
use crate::locomotion::Locomotion;
use crate::world::World;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("world scene has no marker for {name:?}")]
    MissingMarker { name: String },
    #[error("world scene has more than one marker for {name:?}")]
    DuplicateMarker { name: String },
}

/// A resolved marker: where an entity spawns, in world units.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnPoint {
    pub name: String,
    pub position: Vec3,
    pub rotation: Quat,
}

/// Resolve one marker per name, in the order given.
///
/// A marker is the top-level node named `prefix + name`. Its position is
/// multiplied by `world_scale`; its rotation is copied.
pub fn resolve_markers<S: AsRef<str>>(
    scene: &Model,
    names: &[S],
    prefix: &str,
    world_scale: f32,
) -> Result<Vec<SpawnPoint>, AssemblyError> {
    names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            let marker = format!("{prefix}{name}");
            let mut found = scene.find_children(&marker);
            let node = found.next().ok_or_else(|| AssemblyError::MissingMarker { name: name.to_owned() })?;
            if found.next().is_some() {
                return Err(AssemblyError::DuplicateMarker { name: name.to_owned() });
            }
            Ok(SpawnPoint {
                name: name.to_owned(),
                position: node.transform.position * world_scale,
                rotation: node.transform.rotation,
            })
        })
        .collect()
}

/// Every top-level node of `scene` whose name starts with `prefix`, with the
/// prefix stripped.
pub fn marker_names<'a>(scene: &'a Model, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    scene
        .nodes
        .iter()
        .filter_map(move |node| node.name.strip_prefix(prefix))
}

/// Load the world scene and spawn the player followed by every configured
/// character.
///
/// The player subscribes to `input`. Bodies are registered per the config;
/// an entity whose model has no usable volume keeps rendering without one.
pub async fn assemble<L: ModelLoader>(
    loader: &L,
    config: &EngineConfig,
    input: &mut InputChannel,
) -> Result<World, EngineError> {
    let scene = loader.load(&config.world.path).await?;
    let prefix = &config.world.marker_prefix;
    let scale = config.world.scale;

    let player_spawn = match &config.player.spawn_marker {
        Some(marker) => resolve_markers(&scene, &[marker.as_str()], prefix, scale)?.pop(),
        None => None,
    };
    let character_spawns = resolve_markers(&scene, config.characters.names.as_slice(), prefix, scale)?;
    tracing::info!(
        world = %config.world.path,
        markers = character_spawns.len(),
        "world markers resolved"
    );

    let mut world = World::new(PhysicsWorld::new(config.physics.clone()));

    let player = &config.player;
    let mut entity = Entity::spawn(
        loader,
        SpawnParams {
            name: player.name.clone(),
            model_path: player.model.clone(),
            transform: spawn_transform(player_spawn.as_ref(), player.scale),
            animation: player.animation.clone(),
        },
    )
    .await?;
    entity.attach_player(
        input,
        Locomotion {
            speed: player.speed,
            rotation_speed: player.rotation_speed,
            up: Vec3::Y,
        },
    );
    register_body(&mut world, &mut entity, player.body);
    world.push(entity);

    let characters = &config.characters;
    for spawn in &character_spawns {
        let mut entity = Entity::spawn(
            loader,
            SpawnParams {
                name: spawn.name.clone(),
                model_path: characters.model_path(&spawn.name),
                transform: spawn_transform(Some(spawn), characters.scale),
                animation: characters.animation.clone(),
            },
        )
        .await?;
        register_body(&mut world, &mut entity, characters.body);
        world.push(entity);
    }

    tracing::info!(
        entities = world.entity_count(),
        bodies = world.physics().len(),
        "world assembled"
    );
    Ok(world)
}

fn spawn_transform(spawn: Option<&SpawnPoint>, scale: f32) -> Transform {
    let (position, rotation) = spawn.map_or((Vec3::ZERO, Quat::IDENTITY), |s| (s.position, s.rotation));
    Transform {
        position,
        rotation,
        scale: Vec3::splat(scale),
    }
}

fn register_body(world: &mut World, entity: &mut Entity, params: Option<BodyParams>) {
    let Some(params) = params else {
        return;
    };
    match world
        .physics_mut()
        .register_body(entity.local_bounds(), &entity.transform, params)
    {
        Ok(handle) => entity.attach_body(handle),
        Err(err) => tracing::warn!(
            entity = %entity.name(),
            error = %err,
            "no physics body, entity stays render-only"
        ),
    }
}
