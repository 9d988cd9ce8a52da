use std::fmt::Write as _;

use glam::Vec3;
use glade_common::{EntityId, Transform};

/// Camera/view configuration for rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderView {
    /// Camera position in world space.
    pub eye: Vec3,
    /// Point the camera is looking at.
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
}

impl Default for RenderView {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 10.0, 250.0),
            target: Vec3::ZERO,
            fov_degrees: 30.0,
        }
    }
}

/// One drawable object in a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderItem {
    pub id: EntityId,
    pub name: String,
    pub transform: Transform,
    /// Playback position of the object's animation, if it has one.
    pub animation_time: Option<f32>,
}

/// Everything a renderer needs to draw one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameView {
    pub frame: u64,
    pub view: RenderView,
    pub items: Vec<RenderItem>,
}

/// Render target created once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
}

impl Surface {
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("invalid surface size {width}x{height}")]
    InvalidSurface { width: u32, height: u32 },
    #[error("render backend failure: {0}")]
    Backend(String),
}

/// Renderer-agnostic interface. All renderers implement this trait.
pub trait Renderer {
    /// Create the render surface. Called once during engine initialization.
    fn create_surface(&mut self, width: u32, height: u32) -> Result<Surface, RenderError>;

    /// Draw one frame.
    fn draw_frame(&mut self, surface: &Surface, frame: &FrameView) -> Result<(), RenderError>;

    /// React to a host resize.
    fn resize(&mut self, surface: &mut Surface, width: u32, height: u32) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidSurface { width, height });
        }
        surface.width = width;
        surface.height = height;
        Ok(())
    }
}

/// Debug text renderer.
///
/// Produces a human-readable description of each frame. Useful for CLI
/// output, logging, and testing the frame loop without a GPU.
#[derive(Debug, Default)]
pub struct DebugTextRenderer {
    frames_drawn: u64,
    last_frame: String,
}

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Text of the most recently drawn frame.
    pub fn last_frame(&self) -> &str {
        &self.last_frame
    }

    pub fn format(surface: &Surface, frame: &FrameView) -> String {
        let mut out = String::new();
        let view = &frame.view;
        let _ = writeln!(
            out,
            "=== Frame {} ({}x{}) ===",
            frame.frame, surface.width, surface.height
        );
        let _ = writeln!(out, "Objects: {}", frame.items.len());
        let _ = writeln!(
            out,
            "Camera: eye=({:.1}, {:.1}, {:.1}) target=({:.1}, {:.1}, {:.1}) fov={:.0}",
            view.eye.x, view.eye.y, view.eye.z, view.target.x, view.target.y, view.target.z, view.fov_degrees
        );

        for item in &frame.items {
            let p = item.transform.position;
            let f = item.transform.forward();
            let _ = write!(
                out,
                "  [{}] {:<10} pos=({:.2}, {:.2}, {:.2}) facing=({:.2}, {:.2}, {:.2})",
                item.id.short(),
                item.name,
                p.x,
                p.y,
                p.z,
                f.x,
                f.y,
                f.z
            );
            if let Some(t) = item.animation_time {
                let _ = write!(out, " anim={t:.2}s");
            }
            out.push('\n');
        }

        out
    }
}

impl Renderer for DebugTextRenderer {
    fn create_surface(&mut self, width: u32, height: u32) -> Result<Surface, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidSurface { width, height });
        }
        tracing::debug!(width, height, "debug surface created");
        Ok(Surface { width, height })
    }

    fn draw_frame(&mut self, surface: &Surface, frame: &FrameView) -> Result<(), RenderError> {
        self.last_frame = Self::format(surface, frame);
        self.frames_drawn += 1;
        Ok(())
    }
}
