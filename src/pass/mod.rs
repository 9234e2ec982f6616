//! Render passes
//!
//! A pass is one ordered stage of a frame. The manager drives every pass
//! through the same three steps:
//!
//! - `begin_render` submits the framebuffer push (and the pass camera)
//! - `render` submits the pass content
//! - `end_render` pops what begin pushed, flushes the queue and publishes the
//!   pass outputs
//!
//! Passes only override `render`; the default begin and end keep framebuffer
//! and output handling uniform across passes with very different content.

use crate::backend::{CompareFunction, GraphicsBackend, TextureId};
use crate::commands::{flush_queue, CommandQueue, ComputeDispatch, PushFramebuffer, RenderCommand};
use crate::manager::{PassOutputs, RenderState};
use crate::pipeline::{UiLayer, MAIN_COLOR_PASS, UI_PASS};
use crate::resources::{CameraHandle, FramebufferHandle, MaterialHandle, RenderAssets, RenderFlags};
use crate::scene::SceneSource;
use crate::RendererConfig;

/// Where a pass renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTarget {
    /// The pass's own framebuffer
    Framebuffer(FramebufferHandle),
    /// Whatever the previous pass rendered to, the surface for the first pass.
    /// Pair with `with_clear(false)` to draw on top of it.
    Previous,
    /// The window surface
    Surface,
}

/// Which attachment of the pass framebuffer an output publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputAttachment {
    Color(usize),
    Depth,
}

/// A named texture the pass publishes after it ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOutput {
    pub name: String,
    pub attachment: OutputAttachment,
}

impl PassOutput {
    pub fn color(name: &str, index: usize) -> Self {
        Self {
            name: name.to_string(),
            attachment: OutputAttachment::Color(index),
        }
    }

    pub fn depth(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attachment: OutputAttachment::Depth,
        }
    }
}

/// Configuration shared by every pass
#[derive(Debug, Clone)]
pub struct PassDescriptor {
    pub name: String,
    pub target: PassTarget,
    /// Replaces the material of every shadow-casting draw in the pass
    pub override_material: Option<MaterialHandle>,
    pub camera: Option<CameraHandle>,
    pub outputs: Vec<PassOutput>,
    pub clear: bool,
    /// Depth comparison for material draws, the draw's own when `None`
    pub depth_compare: Option<CompareFunction>,
    /// Blend classes the scene emits in this pass
    pub flags: RenderFlags,
}

impl PassDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            target: PassTarget::Surface,
            override_material: None,
            camera: None,
            outputs: Vec::new(),
            clear: true,
            depth_compare: None,
            flags: RenderFlags::DRAW_ALL,
        }
    }

    pub fn with_framebuffer(mut self, framebuffer: FramebufferHandle) -> Self {
        self.target = PassTarget::Framebuffer(framebuffer);
        self
    }

    pub fn with_target(mut self, target: PassTarget) -> Self {
        self.target = target;
        self
    }

    pub fn with_override_material(mut self, material: MaterialHandle) -> Self {
        self.override_material = Some(material);
        self
    }

    pub fn with_camera(mut self, camera: CameraHandle) -> Self {
        self.camera = Some(camera);
        self
    }

    /// Publish color attachment `index` as `name`
    pub fn with_output(mut self, name: &str, index: usize) -> Self {
        self.outputs.push(PassOutput::color(name, index));
        self
    }

    /// Publish the depth attachment as `name`
    pub fn with_depth_output(mut self, name: &str) -> Self {
        self.outputs.push(PassOutput::depth(name));
        self
    }

    pub fn with_clear(mut self, clear: bool) -> Self {
        self.clear = clear;
        self
    }

    pub fn with_depth_compare(mut self, depth_compare: CompareFunction) -> Self {
        self.depth_compare = Some(depth_compare);
        self
    }

    pub fn with_flags(mut self, flags: RenderFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Well-known positions in the default pipeline for extra passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassInjectionPoint {
    BeforeShadowDepth = 0,
    BeforeMainColor = 1,
    BeforeUserInterface = 2,
}

impl PassInjectionPoint {
    /// Index of this point in the default pipeline
    pub fn index(self) -> usize {
        self as usize
    }

    /// Name of the pass the injected pass goes in front of
    pub fn anchor<'c>(self, config: &'c RendererConfig) -> &'c str {
        match self {
            PassInjectionPoint::BeforeShadowDepth => &config.shadow_pass_name,
            PassInjectionPoint::BeforeMainColor => MAIN_COLOR_PASS,
            PassInjectionPoint::BeforeUserInterface => UI_PASS,
        }
    }
}

/// What a pass can reach while the manager drives it.
///
/// The pass list itself is not reachable, so a pass cannot change the list
/// it is being iterated from.
pub struct PassContext<'a> {
    queue: &'a mut CommandQueue,
    state: &'a mut RenderState,
    backend: &'a mut dyn GraphicsBackend,
    assets: &'a RenderAssets,
    scene: &'a dyn SceneSource,
    ui: Option<&'a dyn UiLayer>,
    target: Option<FramebufferHandle>,
    camera_pushed: bool,
}

impl<'a> PassContext<'a> {
    pub(crate) fn new(
        queue: &'a mut CommandQueue,
        state: &'a mut RenderState,
        backend: &'a mut dyn GraphicsBackend,
        assets: &'a RenderAssets,
        scene: &'a dyn SceneSource,
        ui: Option<&'a dyn UiLayer>,
    ) -> Self {
        Self {
            queue,
            state,
            backend,
            assets,
            scene,
            ui,
            target: None,
            camera_pushed: false,
        }
    }

    pub fn submit(&mut self, command: impl Into<RenderCommand>) {
        self.queue.submit(command);
    }

    pub fn queue(&mut self) -> &mut CommandQueue {
        &mut *self.queue
    }

    pub fn assets(&self) -> &'a RenderAssets {
        self.assets
    }

    pub fn scene(&self) -> &'a dyn SceneSource {
        self.scene
    }

    pub fn ui(&self) -> Option<&'a dyn UiLayer> {
        self.ui
    }

    pub fn config(&self) -> &RendererConfig {
        &self.state.config
    }

    /// Outputs published so far; later passes see this frame's values
    pub fn outputs(&self) -> &PassOutputs {
        &self.state.outputs
    }

    pub fn current_pass_name(&self) -> &str {
        self.state.current_pass_name()
    }

    /// Framebuffer the pass renders to, `None` for the surface
    pub fn target(&self) -> Option<FramebufferHandle> {
        self.target
    }

    pub(crate) fn flush(&mut self) -> usize {
        flush_queue(&mut *self.queue, &mut *self.state, &mut *self.backend, self.assets)
    }

    pub(crate) fn take_compute_work(&mut self) -> Vec<ComputeDispatch> {
        std::mem::take(&mut self.state.compute_queue)
    }
}

/// A stage of the frame.
pub trait RenderPass {
    fn descriptor(&self) -> &PassDescriptor;

    fn descriptor_mut(&mut self) -> &mut PassDescriptor;

    fn name(&self) -> &str {
        &self.descriptor().name
    }

    fn begin_render(&mut self, ctx: &mut PassContext<'_>) {
        begin_pass(self.descriptor(), ctx);
    }

    fn render(&mut self, ctx: &mut PassContext<'_>) {
        render_scene(self.descriptor(), ctx);
    }

    fn end_render(&mut self, ctx: &mut PassContext<'_>) {
        end_pass(self.descriptor(), ctx);
    }
}

/// Submit the pass target push and, when the pass has one, its camera.
pub fn begin_pass(desc: &PassDescriptor, ctx: &mut PassContext<'_>) {
    let target = match desc.target {
        PassTarget::Framebuffer(framebuffer) => Some(framebuffer),
        PassTarget::Previous => ctx.state.last_framebuffer,
        PassTarget::Surface => None,
    };
    ctx.target = target;

    ctx.submit(PushFramebuffer {
        framebuffer: target,
        name: desc.name.clone(),
        clear: desc.clear,
    });
    if let Some(camera) = desc.camera {
        ctx.submit(RenderCommand::PushCamera(camera));
        ctx.camera_pushed = true;
    }
}

/// Let the scene submit its draws for the pass's blend classes.
pub fn render_scene(desc: &PassDescriptor, ctx: &mut PassContext<'_>) {
    ctx.scene.render_scene(desc.flags, ctx.assets, &mut *ctx.queue);
}

/// Pop what [`begin_pass`] pushed, flush, then publish the pass outputs.
pub fn end_pass(desc: &PassDescriptor, ctx: &mut PassContext<'_>) {
    if ctx.camera_pushed {
        ctx.submit(RenderCommand::PopCamera);
        ctx.camera_pushed = false;
    }
    ctx.submit(RenderCommand::PopFramebuffer);
    ctx.flush();

    publish_outputs(desc, ctx);
    ctx.state.last_framebuffer = ctx.target;
}

fn publish_outputs(desc: &PassDescriptor, ctx: &mut PassContext<'_>) {
    if desc.outputs.is_empty() {
        return;
    }
    let Some(framebuffer) = ctx.target.and_then(|handle| ctx.assets.resolve(handle)) else {
        log::warn!(
            "Pass '{}' declares outputs but has no live framebuffer to publish from",
            desc.name
        );
        return;
    };

    let frame = ctx.state.frame_index;
    for output in &desc.outputs {
        let texture: Option<TextureId> = match output.attachment {
            OutputAttachment::Color(index) => framebuffer.color_texture(index),
            OutputAttachment::Depth => framebuffer.depth_texture(),
        };
        match texture {
            Some(texture) => {
                ctx.state
                    .outputs
                    .publish(&output.name, texture, &desc.name, frame);
            }
            None => log::warn!(
                "Pass '{}' output '{}' names a missing attachment {:?}",
                desc.name,
                output.name,
                output.attachment
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_defaults() {
        let desc = PassDescriptor::new("MainColorPass");
        assert_eq!(desc.target, PassTarget::Surface);
        assert!(desc.clear);
        assert_eq!(desc.flags, RenderFlags::DRAW_ALL);
        assert!(desc.outputs.is_empty());
    }

    #[test]
    fn test_outputs_keep_attachment_index() {
        let desc = PassDescriptor::new("GBuffer")
            .with_output("Albedo", 0)
            .with_output("Normal", 1)
            .with_depth_output("Depth");
        assert_eq!(desc.outputs[1].attachment, OutputAttachment::Color(1));
        assert_eq!(desc.outputs[2], PassOutput::depth("Depth"));
    }

    #[test]
    fn test_injection_points() {
        let config = RendererConfig::default();
        assert_eq!(PassInjectionPoint::BeforeMainColor.index(), 1);
        assert_eq!(
            PassInjectionPoint::BeforeShadowDepth.anchor(&config),
            "ShadowDepthPass"
        );
    }
}
