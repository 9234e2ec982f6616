//! Render Pipeline - a deferred render-command pipeline
//!
//! Frame work is described as [`RenderCommand`]s that refer to GPU resources
//! through weak handles, queued in submission order and executed later
//! against a [`GraphicsBackend`].
//!
//! # Features
//! - Ordered render passes with runtime injection and removal
//! - Framebuffer and camera stacks driven by commands
//! - Named pass outputs later passes sample from
//! - Expired handles turn commands into logged no-ops
//! - A recording dummy backend for tests and headless tools

pub mod backend;
pub mod commands;
pub mod debug_lines;
pub mod jobs;
pub mod manager;
pub mod pass;
pub mod pipeline;
pub mod resources;
pub mod scene;

pub use backend::{BackendError, BackendResult, CompareFunction, DummyBackend, GraphicsBackend};
pub use commands::{CommandQueue, ExecuteContext, RenderCommand};
pub use debug_lines::DebugLines;
pub use jobs::{JobManager, MainThread};
pub use manager::{PassOutputs, RenderManager, RenderMode, RenderStats};
pub use pass::{PassContext, PassDescriptor, PassInjectionPoint, RenderPass};
pub use pipeline::{build_default_pipeline, PipelineConfig};
pub use resources::RenderAssets;
pub use scene::{Scene, SceneSource};

use glam::Vec4;

/// Configuration for the render manager
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Initial surface width
    pub width: u32,
    /// Initial surface height
    pub height: u32,
    /// Clear color of the window surface
    pub clear_color: Vec4,
    /// Depth comparison restored after every draw
    pub depth_compare: CompareFunction,
    /// Name of the pass that renders from the light. Draws inside it do not
    /// sample pass outputs.
    pub shadow_pass_name: String,
    pub render_mode: RenderMode,
    /// Alpha blending at startup
    pub blending: bool,
    /// Worker threads for the job manager
    pub worker_threads: usize,
    /// Wrap every framebuffer push in a backend debug group
    pub debug_groups: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            clear_color: Vec4::new(100.0 / 255.0, 149.0 / 255.0, 237.0 / 255.0, 1.0),
            depth_compare: CompareFunction::LessEqual,
            shadow_pass_name: "ShadowDepthPass".to_string(),
            render_mode: RenderMode::Normal,
            blending: true,
            worker_threads: 3,
            debug_groups: true,
        }
    }
}
