//! Rendering adapter: renderer-agnostic frame submission.
//!
//! # Invariants
//! - Renderers only see a [`FrameView`]; they cannot mutate simulation state.
//! - A frame is submitted only after every update of that frame has run.
//!
//! The real GPU backend lives outside this workspace. [`DebugTextRenderer`]
//! implements the same trait and is what the CLI and the tests drive.

mod renderer;

pub use renderer::{DebugTextRenderer, FrameView, RenderError, RenderItem, RenderView, Renderer, Surface};
