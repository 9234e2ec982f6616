//! Deferred render commands
//!
//! A [`RenderCommand`] is a self-contained description of one GPU-visible
//! operation. Collaborators build commands at "describe the frame" time and
//! submit them to a [`CommandQueue`]; the queue later executes them in
//! submission order against an [`ExecuteContext`].
//!
//! Commands refer to resources through weak handles. A command resolves every
//! handle it needs before touching the backend and turns into a logged no-op
//! if any of them has expired.

mod draw;
mod queue;
mod state;

pub use draw::*;
pub use queue::*;
pub use state::*;

use crate::backend::{GraphicsBackend, Viewport};
use crate::manager::RenderState;
use crate::resources::{CameraHandle, MaterialHandle, RenderAssets};
use crate::scene::Camera;
use crate::RendererConfig;
use glam::Mat4;
use std::fmt;

/// Uniform names commands assign on the bound shader
pub mod uniform_names {
    pub const MODEL: &str = "model";
    pub const PROJECTION: &str = "projection";
    pub const VIEW: &str = "view";
    pub const LIGHT_SPACE_MATRIX: &str = "lightSpaceMatrix";
    pub const TEXTURE0: &str = "texture0";
    pub const UI_TRANSFORM: &str = "transform";
    pub const UI_TRANSLATION: &str = "translation";
    pub const LINE_COLOR: &str = "color";
}

/// A deferred unit of GPU work.
pub enum RenderCommand {
    DrawPlain(DrawPlain),
    DrawTextured(DrawTextured),
    DrawMaterial(DrawMaterial),
    DrawLines(DrawLines),
    DrawPostProcess(DrawPostProcess),
    DrawUi(DrawUi),
    PushFramebuffer(PushFramebuffer),
    PopFramebuffer,
    PushCamera(CameraHandle),
    PopCamera,
    UpdateGlobals,
    SetWireframe(bool),
    SetBlending(bool),
    Dispatch(ComputeDispatch),
    Custom(CustomCommand),
}

impl RenderCommand {
    /// Variant name, used in log messages
    pub fn name(&self) -> &'static str {
        match self {
            RenderCommand::DrawPlain(_) => "DrawPlain",
            RenderCommand::DrawTextured(_) => "DrawTextured",
            RenderCommand::DrawMaterial(_) => "DrawMaterial",
            RenderCommand::DrawLines(_) => "DrawLines",
            RenderCommand::DrawPostProcess(_) => "DrawPostProcess",
            RenderCommand::DrawUi(_) => "DrawUi",
            RenderCommand::PushFramebuffer(_) => "PushFramebuffer",
            RenderCommand::PopFramebuffer => "PopFramebuffer",
            RenderCommand::PushCamera(_) => "PushCamera",
            RenderCommand::PopCamera => "PopCamera",
            RenderCommand::UpdateGlobals => "UpdateGlobals",
            RenderCommand::SetWireframe(_) => "SetWireframe",
            RenderCommand::SetBlending(_) => "SetBlending",
            RenderCommand::Dispatch(_) => "Dispatch",
            RenderCommand::Custom(_) => "Custom",
        }
    }

    /// Run the command. Consumes it; nothing is retained afterwards.
    pub fn execute(self, ctx: &mut ExecuteContext<'_>) {
        match self {
            RenderCommand::DrawPlain(cmd) => cmd.execute(ctx),
            RenderCommand::DrawTextured(cmd) => cmd.execute(ctx),
            RenderCommand::DrawMaterial(cmd) => cmd.execute(ctx),
            RenderCommand::DrawLines(cmd) => cmd.execute(ctx),
            RenderCommand::DrawPostProcess(cmd) => cmd.execute(ctx),
            RenderCommand::DrawUi(cmd) => cmd.execute(ctx),
            RenderCommand::PushFramebuffer(cmd) => cmd.execute(ctx),
            RenderCommand::PopFramebuffer => {
                ctx.state.pop_framebuffer(&mut *ctx.backend, ctx.assets)
            }
            RenderCommand::PushCamera(camera) => {
                if !ctx.state.push_camera(ctx.assets, camera) {
                    ctx.report_expired("PushCamera", "camera");
                }
            }
            RenderCommand::PopCamera => ctx.state.pop_camera(),
            RenderCommand::UpdateGlobals => update_globals(ctx),
            RenderCommand::SetWireframe(enabled) => set_wireframe(ctx, enabled),
            RenderCommand::SetBlending(enabled) => set_blending(ctx, enabled),
            RenderCommand::Dispatch(cmd) => cmd.execute(ctx),
            RenderCommand::Custom(cmd) => cmd.execute(ctx),
        }
    }
}

impl fmt::Debug for RenderCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

macro_rules! impl_from_command {
    ($($ty:ident),* $(,)?) => {
        $(
            impl From<$ty> for RenderCommand {
                fn from(command: $ty) -> Self {
                    RenderCommand::$ty(command)
                }
            }
        )*
    };
}

impl_from_command!(
    DrawPlain,
    DrawTextured,
    DrawMaterial,
    DrawLines,
    DrawPostProcess,
    DrawUi,
    PushFramebuffer,
);

impl From<ComputeDispatch> for RenderCommand {
    fn from(command: ComputeDispatch) -> Self {
        RenderCommand::Dispatch(command)
    }
}

impl From<CustomCommand> for RenderCommand {
    fn from(command: CustomCommand) -> Self {
        RenderCommand::Custom(command)
    }
}

/// Everything a command may read or change while it executes.
pub struct ExecuteContext<'a> {
    pub(crate) backend: &'a mut dyn GraphicsBackend,
    pub(crate) assets: &'a RenderAssets,
    pub(crate) state: &'a mut RenderState,
    pub(crate) queue: &'a mut CommandQueue,
}

impl<'a> ExecuteContext<'a> {
    pub fn backend(&mut self) -> &mut dyn GraphicsBackend {
        &mut *self.backend
    }

    pub fn assets(&self) -> &'a RenderAssets {
        self.assets
    }

    pub fn config(&self) -> &RendererConfig {
        &self.state.config
    }

    /// Append a command to the tail of the queue being flushed
    pub fn submit(&mut self, command: impl Into<RenderCommand>) {
        self.queue.submit(command);
    }

    /// Top of the camera stack, else the scene camera
    pub fn active_camera(&self) -> Option<&'a Camera> {
        self.state.active_camera(self.assets)
    }

    pub fn current_pass_name(&self) -> &str {
        self.state.current_pass_name()
    }

    pub fn current_pass_override_material(&self) -> Option<MaterialHandle> {
        self.state.current_pass_override_material()
    }

    pub fn light_space_matrix(&self) -> Mat4 {
        self.state.light_space_matrix
    }

    pub fn viewport(&self) -> Viewport {
        self.state.viewport
    }

    /// Log the single warning a command emits when a handle has expired
    pub(crate) fn report_expired(&mut self, command: &str, kind: &str) {
        log::warn!(
            "{} skipped: {} expired before execution (pass '{}')",
            command,
            kind,
            self.state.current_pass_name()
        );
        self.state.stats.expired_resources += 1;
    }
}
