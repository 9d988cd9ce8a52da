use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use glade_assets::ModelLoader;
use glade_common::EntityId;
use glade_input::{InputChannel, InputSender};
use glade_render::{FrameView, Renderer, Surface};

use crate::assembly::assemble;
use crate::camera::OrbitCamera;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::entity::FrameContext;
use crate::error::EngineError;
use crate::world::World;

/// Lifecycle of an [`Engine`]. Moves strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initializing,
    Running,
    Disposed,
}

/// Cancellation token for the run loop. Cloneable and usable from any thread.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What happened during one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    /// Elapsed time fed to the pipeline, after clamping.
    pub dt: f32,
    pub substeps: usize,
    pub updated: usize,
    pub faulted: usize,
}

/// Drives the per-frame pipeline.
///
/// Owns the world, the input channel and the camera; the renderer and clock
/// are supplied by the host.
pub struct Engine<R: Renderer, C: Clock> {
    config: EngineConfig,
    state: EngineState,
    renderer: R,
    clock: C,
    surface: Option<Surface>,
    world: Option<World>,
    input: InputChannel,
    camera: OrbitCamera,
    stop: StopHandle,
    frame: u64,
}

impl<R: Renderer, C: Clock> Engine<R, C> {
    pub fn new(config: EngineConfig, renderer: R, clock: C) -> Self {
        let input = InputChannel::new(config.keys.clone());
        let camera = OrbitCamera::from_config(&config.camera);
        Self {
            config,
            state: EngineState::Uninitialized,
            renderer,
            clock,
            surface: None,
            world: None,
            input,
            camera,
            stop: StopHandle::default(),
            frame: 0,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Frames completed so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    pub fn input(&self) -> &InputChannel {
        &self.input
    }

    /// Producer side of the input channel, for the host's event source.
    pub fn input_sender(&self) -> InputSender {
        self.input.sender()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    fn expect_state(&self, expected: EngineState) -> Result<(), EngineError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(EngineError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }

    /// Create the surface and assemble the world. Only valid once, from
    /// `Uninitialized`. On failure the engine ends up `Disposed`.
    pub async fn initialize<L: ModelLoader>(&mut self, loader: &L) -> Result<(), EngineError> {
        self.expect_state(EngineState::Uninitialized)?;
        self.state = EngineState::Initializing;
        tracing::info!("engine initializing");

        match self.try_initialize(loader).await {
            Ok(()) => {
                self.state = EngineState::Running;
                tracing::info!(
                    entities = self.world.as_ref().map_or(0, World::entity_count),
                    "engine running"
                );
                Ok(())
            }
            Err(err) => {
                self.state = EngineState::Disposed;
                self.input.reset();
                tracing::debug!(error = %err, "engine initialization failed");
                Err(err)
            }
        }
    }

    async fn try_initialize<L: ModelLoader>(&mut self, loader: &L) -> Result<(), EngineError> {
        self.config.validate()?;
        let surface = &self.config.surface;
        self.surface = Some(self.renderer.create_surface(surface.width, surface.height)?);

        let world = assemble(loader, &self.config, &mut self.input).await?;
        if let Some(position) = world.player_position() {
            self.camera.follow(position);
        }
        self.world = Some(world);
        Ok(())
    }

    /// Run one iteration of the pipeline: clock, input, physics, entity
    /// updates, camera, animation, then the draw.
    pub fn run_frame(&mut self) -> Result<FrameStats, EngineError> {
        self.expect_state(EngineState::Running)?;
        let (Some(world), Some(surface)) = (self.world.as_mut(), self.surface.as_ref()) else {
            return Err(EngineError::InvalidState {
                expected: EngineState::Running,
                actual: self.state,
            });
        };

        let frame = self.frame + 1;
        let _span = tracing::info_span!("frame", frame).entered();

        let dt = clamp_delta(self.clock.elapsed_since_last(), self.config.max_frame_delta);
        let events = self.input.drain();

        let substeps = world.step_physics(self.config.physics.fixed_step, dt)?;

        let ctx = FrameContext {
            input: self.input.snapshot(),
            camera: &self.camera,
        };
        let updated = world.update_entities(dt, &ctx);

        if let Some(position) = world.player_position() {
            self.camera.follow(position);
        }
        world.advance_animations(dt);

        let view = FrameView {
            frame,
            view: self.camera.render_view(),
            items: world.render_items(),
        };
        self.renderer.draw_frame(surface, &view)?;

        world.advance_tick();
        self.frame = frame;
        let stats = FrameStats {
            frame,
            dt,
            substeps,
            updated,
            faulted: world.faulted_count(),
        };
        tracing::trace!(dt, events, substeps, updated, "frame done");
        Ok(stats)
    }

    /// Run frames until stopped, until `max_frames` have run, or until a
    /// frame fails. A failure stops the engine and is returned.
    ///
    /// Returns the number of frames run by this call.
    pub fn run(&mut self, max_frames: Option<u64>) -> Result<u64, EngineError> {
        self.expect_state(EngineState::Running)?;
        let budget = self
            .config
            .max_fps
            .filter(|fps| *fps > 0)
            .map(|fps| Duration::from_secs_f64(1.0 / f64::from(fps)));
        let mut ran = 0u64;

        while !self.stop.is_stopped() && max_frames.is_none_or(|max| ran < max) {
            let started = Instant::now();
            if let Err(err) = self.run_frame() {
                tracing::error!(error = %err, frame = self.frame + 1, "frame failed, stopping");
                self.stop();
                return Err(err);
            }
            ran += 1;

            if let Some(budget) = budget {
                if let Some(rest) = budget.checked_sub(started.elapsed()) {
                    std::thread::sleep(rest);
                }
            }
        }

        if self.stop.is_stopped() {
            self.stop();
        }
        Ok(ran)
    }

    /// Cancel further iterations and dispose every entity.
    pub fn stop(&mut self) {
        self.stop.stop();
        if self.state == EngineState::Disposed {
            return;
        }
        if let Some(world) = self.world.as_mut() {
            world.dispose_all();
        }
        self.input.reset();
        self.state = EngineState::Disposed;
        tracing::info!(frames = self.frame, "engine stopped");
    }

    /// Forward a host resize to the renderer.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), EngineError> {
        if let Some(surface) = self.surface.as_mut() {
            self.renderer.resize(surface, width, height)?;
            tracing::debug!(width, height, "surface resized");
        }
        Ok(())
    }

    /// Dispose and remove one entity.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        self.world.as_mut().is_some_and(|world| world.despawn(id))
    }
}

/// Frame delta in `[0, max]`. Non-finite input, or a limit that is not a
/// positive number, yields zero.
fn clamp_delta(raw: f32, max: f32) -> f32 {
    if !raw.is_finite() || !(max > 0.0) {
        return 0.0;
    }
    raw.max(0.0).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use glade_assets::{AnimationClip, MemoryLoader, Model, SceneNode};
    use glade_common::{Aabb, Transform};
    use glade_render::DebugTextRenderer;

    use crate::assembly::AssemblyError;
    use crate::clock::FixedClock;
    use crate::config::{CharacterConfig, PlayerConfig, WorldConfig};

    fn engine() -> Engine<DebugTextRenderer, FixedClock> {
        Engine::new(EngineConfig::default(), DebugTextRenderer::new(), FixedClock::new(1.0 / 60.0))
    }

    #[test]
    fn starts_uninitialized() {
        let e = engine();
        assert_eq!(e.state(), EngineState::Uninitialized);
        assert!(e.world().is_none());
    }

    #[test]
    fn run_frame_requires_running() {
        let mut e = engine();
        let err = e.run_frame().unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidState {
                expected: EngineState::Running,
                actual: EngineState::Uninitialized
            }
        ));
    }

    #[test]
    fn failed_initialize_disposes() {
        let mut e = engine();
        let err = pollster::block_on(e.initialize(&MemoryLoader::new())).unwrap_err();
        assert!(matches!(err, EngineError::Asset(_)));
        assert_eq!(e.state(), EngineState::Disposed);

        let err = pollster::block_on(e.initialize(&MemoryLoader::new())).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { .. }));
    }

    #[test]
    fn invalid_surface_is_fatal() {
        let config = EngineConfig {
            surface: crate::config::SurfaceConfig { width: 0, height: 0 },
            ..EngineConfig::default()
        };
        let mut e = Engine::new(config, DebugTextRenderer::new(), FixedClock::new(0.0));
        let err = pollster::block_on(e.initialize(&MemoryLoader::new())).unwrap_err();
        assert!(matches!(err, EngineError::Render(_)));
    }

    fn unit_model(path: &str) -> Model {
        Model::new(
            path,
            vec![SceneNode::new("Root").with_mesh_bounds(Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5)))],
            vec![
                AnimationClip {
                    name: "Idle".into(),
                    duration: 1.0,
                },
                AnimationClip {
                    name: "Walk".into(),
                    duration: 3.0,
                },
            ],
        )
    }

    fn demo_loader(markers: &[&str]) -> MemoryLoader {
        let world = Model::new(
            "world.gltf",
            markers
                .iter()
                .map(|m| SceneNode::new(*m).with_transform(Transform::from_position(Vec3::new(1.0, 0.0, 0.0))))
                .collect(),
            Vec::new(),
        );
        MemoryLoader::new()
            .with(world)
            .with(unit_model("cat.gltf"))
            .with(unit_model("ninja.gltf"))
    }

    fn demo_config() -> EngineConfig {
        EngineConfig {
            world: WorldConfig {
                path: "world.gltf".into(),
                scale: 10.0,
                marker_prefix: "placeholder-".into(),
            },
            player: PlayerConfig {
                model: "cat.gltf".into(),
                rotation_speed: 30.0,
                ..PlayerConfig::default()
            },
            characters: CharacterConfig {
                names: vec!["ninja".into()],
                model_pattern: "{name}.gltf".into(),
                ..CharacterConfig::default()
            },
            ..EngineConfig::default()
        }
    }

    fn running_engine() -> Engine<DebugTextRenderer, FixedClock> {
        let mut e = Engine::new(demo_config(), DebugTextRenderer::new(), FixedClock::new(1.0 / 60.0));
        pollster::block_on(e.initialize(&demo_loader(&["placeholder-ninja"]))).unwrap();
        e
    }

    #[test]
    fn forward_held_moves_and_turns_player() {
        let mut e = running_engine();
        assert_eq!(e.state(), EngineState::Running);
        let start = e.world().unwrap().player_position().unwrap();
        let ninja_start = e.world().unwrap().get_by_name("ninja").unwrap().transform;

        e.input_sender().key_down("KeyW");
        let mut last = 0.0;
        for _ in 0..10 {
            let stats = e.run_frame().unwrap();
            assert_eq!(stats.faulted, 0);
            let position = e.world().unwrap().player_position().unwrap();
            let travelled = start.z - position.z;
            assert!(travelled > last, "displacement must grow every frame");
            last = travelled;
        }

        let world = e.world().unwrap();
        let player = world.player().unwrap();
        let moved = player.transform.position - start;
        assert!(moved.x.abs() < 1e-4 && moved.y.abs() < 1e-4);
        let angle = player.transform.forward().angle_between(moved.normalize());
        assert!(angle < 1f32.to_radians(), "facing off by {angle} rad");

        assert_eq!(world.get_by_name("ninja").unwrap().transform, ninja_start);
        assert_eq!(e.camera().target, player.transform.position);
        assert_eq!(e.frame(), 10);
        assert_eq!(world.tick(), 10);
    }

    #[test]
    fn releasing_key_stops_player() {
        let mut e = running_engine();
        let tx = e.input_sender();
        tx.key_down("ArrowLeft");
        e.run_frame().unwrap();
        tx.key_up("ArrowLeft");
        e.run_frame().unwrap();
        let here = e.world().unwrap().player_position().unwrap();
        e.run_frame().unwrap();
        assert_eq!(e.world().unwrap().player_position().unwrap(), here);
        assert!(here.x < 0.0);
    }

    #[test]
    fn frames_are_drawn_with_animations() {
        let mut e = running_engine();
        assert_eq!(e.run(Some(3)).unwrap(), 3);
        assert_eq!(e.renderer().frames_drawn(), 3);
        let text = e.renderer().last_frame();
        assert!(text.contains("=== Frame 3 (1280x720) ==="));
        assert!(text.contains("Objects: 2"));
        assert!(text.contains("ninja"));

        let ninja = e.world().unwrap().get_by_name("ninja").unwrap();
        assert!(ninja.animation().unwrap().time() > 0.0);
    }

    #[test]
    fn stop_disposes_everything() {
        let mut e = running_engine();
        assert_eq!(e.input().listener_count(), 1);
        e.run(Some(2)).unwrap();

        e.stop();
        assert_eq!(e.state(), EngineState::Disposed);
        assert_eq!(e.world().unwrap().entity_count(), 0);
        assert!(e.world().unwrap().physics().is_empty());
        assert_eq!(e.input().listener_count(), 0);
        assert!(e.run_frame().is_err());

        let err = pollster::block_on(e.initialize(&demo_loader(&["placeholder-ninja"]))).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidState {
                expected: EngineState::Uninitialized,
                actual: EngineState::Disposed
            }
        ));
    }

    #[test]
    fn stop_handle_ends_run_loop() {
        let mut e = running_engine();
        e.stop_handle().stop();
        assert_eq!(e.run(None).unwrap(), 0);
        assert_eq!(e.state(), EngineState::Disposed);
    }

    #[test]
    fn missing_marker_aborts_startup() {
        let mut e = Engine::new(demo_config(), DebugTextRenderer::new(), FixedClock::new(1.0 / 60.0));
        let err = pollster::block_on(e.initialize(&demo_loader(&["placeholder-wizard"]))).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Assembly(AssemblyError::MissingMarker { ref name }) if name == "ninja"
        ));
        assert!(e.world().is_none());
        assert_eq!(e.input().listener_count(), 0);
    }

    #[test]
    fn oversized_delta_is_clamped() {
        let mut e = Engine::new(demo_config(), DebugTextRenderer::new(), FixedClock::new(5.0));
        pollster::block_on(e.initialize(&demo_loader(&["placeholder-ninja"]))).unwrap();
        let stats = e.run_frame().unwrap();
        assert_eq!(stats.dt, 0.25);
        assert!(stats.substeps <= 10);
    }

    #[test]
    fn despawn_removes_entity() {
        let mut e = running_engine();
        let id = e.world().unwrap().get_by_name("ninja").unwrap().id();
        assert!(e.despawn(id));
        assert!(!e.despawn(id));
        e.run_frame().unwrap();
        assert!(e.renderer().last_frame().contains("Objects: 1"));
    }

    #[test]
    fn resize_updates_surface() {
        let mut e = running_engine();
        e.resize(800, 600).unwrap();
        assert_eq!(e.surface().unwrap().width, 800);
        assert!(matches!(e.resize(0, 600), Err(EngineError::Render(_))));
    }

    #[test]
    fn run_before_initialize_keeps_engine_usable() {
        let mut e = Engine::new(demo_config(), DebugTextRenderer::new(), FixedClock::new(1.0 / 60.0));
        let err = e.run(Some(1)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidState {
                expected: EngineState::Running,
                actual: EngineState::Uninitialized
            }
        ));
        assert_eq!(e.state(), EngineState::Uninitialized);
        assert!(!e.stop_handle().is_stopped());

        pollster::block_on(e.initialize(&demo_loader(&["placeholder-ninja"]))).unwrap();
        assert_eq!(e.run(Some(2)).unwrap(), 2);
    }

    #[test]
    fn invalid_config_fails_initialize() {
        let config = EngineConfig {
            max_frame_delta: -1.0,
            ..demo_config()
        };
        let mut e = Engine::new(config, DebugTextRenderer::new(), FixedClock::new(1.0 / 60.0));
        let err = pollster::block_on(e.initialize(&demo_loader(&["placeholder-ninja"]))).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
        assert_eq!(e.state(), EngineState::Disposed);
        assert!(e.world().is_none());
    }

    #[test]
    fn delta_clamp_handles_bad_limits() {
        assert_eq!(clamp_delta(0.5, 0.25), 0.25);
        assert_eq!(clamp_delta(-1.0, 0.25), 0.0);
        assert_eq!(clamp_delta(0.1, 0.25), 0.1);
        assert_eq!(clamp_delta(f32::NAN, 0.25), 0.0);
        assert_eq!(clamp_delta(f32::INFINITY, 0.25), 0.0);
        assert_eq!(clamp_delta(0.1, -1.0), 0.0);
        assert_eq!(clamp_delta(0.1, f32::NAN), 0.0);
    }

    #[test]
    fn default_turn_rate_closes_heading_every_frame() {
        let config = EngineConfig {
            player: PlayerConfig {
                model: "cat.gltf".into(),
                ..PlayerConfig::default()
            },
            ..demo_config()
        };
        assert_eq!(config.player.rotation_speed, 5.0);
        let mut e = Engine::new(config, DebugTextRenderer::new(), FixedClock::new(1.0 / 60.0));
        pollster::block_on(e.initialize(&demo_loader(&["placeholder-ninja"]))).unwrap();

        e.input_sender().key_down("KeyW");
        let heading_error = |e: &Engine<DebugTextRenderer, FixedClock>| {
            let player = e.world().unwrap().player().unwrap();
            player.transform.forward().angle_between(Vec3::NEG_Z)
        };
        let mut last = heading_error(&e);
        for frame in 1..=10 {
            e.run_frame().unwrap();
            let now = heading_error(&e);
            assert!(now < last || now < 1e-4, "frame {frame}: heading error {now} did not shrink from {last}");
            last = now;
        }
    }

    #[test]
    fn stop_handle_is_shared() {
        let e = engine();
        let handle = e.stop_handle();
        handle.stop();
        assert!(e.stop_handle().is_stopped());
    }
}
