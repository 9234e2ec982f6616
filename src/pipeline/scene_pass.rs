//! Passes that draw scene geometry

use super::{MAIN_COLOR_PASS, OPAQUE_PASS, SHADOW_MAP_OUTPUT, TRANSLUCENT_PASS};
use crate::commands::RenderCommand;
use crate::pass::{render_scene, PassContext, PassDescriptor, PassTarget, RenderPass};
use crate::resources::{FramebufferHandle, MaterialHandle, RenderFlags};

/// Renders the scene's drawables for the pass's blend classes.
pub struct ScenePass {
    desc: PassDescriptor,
    /// Blending state submitted before the scene, left alone when `None`
    blending: Option<bool>,
}

impl ScenePass {
    pub fn new(desc: PassDescriptor) -> Self {
        Self {
            desc,
            blending: None,
        }
    }

    /// Depth-only pass into `framebuffer`, publishing its depth attachment.
    ///
    /// Shadow-casting draws use `material` in place of their own.
    pub fn shadow_depth(
        name: &str,
        framebuffer: FramebufferHandle,
        material: Option<MaterialHandle>,
    ) -> Self {
        let mut desc = PassDescriptor::new(name)
            .with_framebuffer(framebuffer)
            .with_depth_output(SHADOW_MAP_OUTPUT)
            .with_flags(RenderFlags::DRAW_OPAQUE | RenderFlags::DRAW_MASKED);
        desc.override_material = material;
        Self::new(desc).with_blending(false)
    }

    /// Every blend class in one pass
    pub fn main_color(target: PassTarget) -> Self {
        Self::new(PassDescriptor::new(MAIN_COLOR_PASS).with_target(target)).with_blending(true)
    }

    pub fn opaque(target: PassTarget) -> Self {
        let desc = PassDescriptor::new(OPAQUE_PASS)
            .with_target(target)
            .with_flags(RenderFlags::DRAW_OPAQUE | RenderFlags::DRAW_MASKED);
        Self::new(desc).with_blending(false)
    }

    /// Draws on top of the previous pass without clearing it
    pub fn translucent() -> Self {
        let desc = PassDescriptor::new(TRANSLUCENT_PASS)
            .with_target(PassTarget::Previous)
            .with_clear(false)
            .with_flags(RenderFlags::DRAW_TRANSLUCENT);
        Self::new(desc).with_blending(true)
    }

    pub fn with_blending(mut self, enabled: bool) -> Self {
        self.blending = Some(enabled);
        self
    }

    pub fn blending(&self) -> Option<bool> {
        self.blending
    }
}

impl RenderPass for ScenePass {
    fn descriptor(&self) -> &PassDescriptor {
        &self.desc
    }

    fn descriptor_mut(&mut self) -> &mut PassDescriptor {
        &mut self.desc
    }

    fn render(&mut self, ctx: &mut PassContext<'_>) {
        if let Some(enabled) = self.blending {
            ctx.submit(RenderCommand::SetBlending(enabled));
        }
        render_scene(&self.desc, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass::OutputAttachment;

    #[test]
    fn test_shadow_depth_publishes_depth() {
        let pass = ScenePass::shadow_depth("ShadowDepthPass", FramebufferHandle::default(), None);
        let desc = pass.descriptor();
        assert_eq!(desc.outputs[0].name, "ShadowMap");
        assert_eq!(desc.outputs[0].attachment, OutputAttachment::Depth);
        assert!(!desc.flags.contains(RenderFlags::DRAW_TRANSLUCENT));
    }

    #[test]
    fn test_translucent_keeps_previous_contents() {
        let pass = ScenePass::translucent();
        assert!(!pass.descriptor().clear);
        assert_eq!(pass.descriptor().target, PassTarget::Previous);
        assert_eq!(pass.blending(), Some(true));
    }
}
