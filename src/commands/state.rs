//! Commands that change render state rather than draw

use std::fmt;

use super::ExecuteContext;
use crate::backend::{BlendState, GlobalUniforms, PolygonMode};
use crate::resources::{FramebufferHandle, ShaderHandle};

/// Make a framebuffer (or the window surface) the current render target.
#[derive(Debug, Clone)]
pub struct PushFramebuffer {
    /// `None` targets the window surface
    pub framebuffer: Option<FramebufferHandle>,
    /// Debug group label, normally the pass name
    pub name: String,
    pub clear: bool,
}

impl PushFramebuffer {
    pub fn new(framebuffer: FramebufferHandle, name: &str) -> Self {
        Self {
            framebuffer: Some(framebuffer),
            name: name.to_string(),
            clear: true,
        }
    }

    pub fn surface(name: &str) -> Self {
        Self {
            framebuffer: None,
            name: name.to_string(),
            clear: true,
        }
    }

    pub fn with_clear(mut self, clear: bool) -> Self {
        self.clear = clear;
        self
    }

    pub(crate) fn execute(self, ctx: &mut ExecuteContext<'_>) {
        let pushed = ctx.state.push_framebuffer(
            &mut *ctx.backend,
            ctx.assets,
            self.framebuffer,
            &self.name,
            self.clear,
        );
        if !pushed {
            ctx.report_expired("PushFramebuffer", "framebuffer");
        }
    }
}

/// Run a compute shader over a grid of work groups.
#[derive(Debug, Clone)]
pub struct ComputeDispatch {
    pub shader: ShaderHandle,
    pub groups: [u32; 3],
}

impl ComputeDispatch {
    pub fn new(shader: ShaderHandle, groups: [u32; 3]) -> Self {
        Self { shader, groups }
    }

    pub(crate) fn execute(self, ctx: &mut ExecuteContext<'_>) {
        let Some(shader) = ctx.assets.resolve(self.shader) else {
            ctx.report_expired("Dispatch", "compute shader");
            return;
        };
        if !shader.is_compute() {
            log::warn!(
                "Dispatch skipped: shader '{}' is not a compute shader",
                shader.label()
            );
            return;
        }

        let [x, y, z] = self.groups;
        ctx.backend.bind_shader(shader.id());
        ctx.backend.dispatch_compute(x, y, z);
        ctx.state.stats.dispatches += 1;
    }
}

type CustomFn = Box<dyn FnOnce(&mut ExecuteContext<'_>)>;

/// A command defined by a closure, for work the built-in variants don't cover.
pub struct CustomCommand(CustomFn);

impl CustomCommand {
    pub fn new(f: impl FnOnce(&mut ExecuteContext<'_>) + 'static) -> Self {
        Self(Box::new(f))
    }

    pub(crate) fn execute(self, ctx: &mut ExecuteContext<'_>) {
        (self.0)(ctx)
    }
}

impl fmt::Debug for CustomCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomCommand")
    }
}

/// Recompute the shared uniform block from the active camera and upload it.
pub(crate) fn update_globals(ctx: &mut ExecuteContext<'_>) {
    let mut globals = GlobalUniforms {
        time: ctx.state.elapsed,
        render_mode: ctx.state.render_mode as u32,
        ..Default::default()
    };
    if let Some(camera) = ctx.active_camera() {
        globals.projection = camera.projection_matrix();
        globals.view = camera.view_matrix();
        globals.eye_position = camera.position.extend(1.0);
        globals.eye_forward = camera.forward().extend(0.0);
    }

    let buffer = ctx.state.globals_buffer;
    ctx.backend
        .write_buffer(buffer, 0, bytemuck::bytes_of(&globals));
}

pub(crate) fn set_wireframe(ctx: &mut ExecuteContext<'_>, enabled: bool) {
    let mode = if enabled {
        PolygonMode::Line
    } else {
        PolygonMode::Fill
    };
    ctx.backend.set_polygon_mode(mode);
}

pub(crate) fn set_blending(ctx: &mut ExecuteContext<'_>, enabled: bool) {
    let blend = enabled.then(BlendState::alpha_blending);
    ctx.backend.set_blend_state(blend);
}

