//! Off-screen render targets

use crate::backend::{
    BackendResult, FramebufferDescriptor, FramebufferId, GraphicsBackend, TextureDescriptor,
    TextureFormat, TextureId, TextureUsage, Viewport,
};
use glam::Vec4;

/// A framebuffer and the textures attached to it.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    id: FramebufferId,
    desc: FramebufferDescriptor,
    color_textures: Vec<TextureId>,
    depth_texture: Option<TextureId>,
}

impl Framebuffer {
    pub(crate) fn create(
        backend: &mut dyn GraphicsBackend,
        desc: FramebufferDescriptor,
    ) -> BackendResult<Self> {
        let (color_textures, depth_texture) = create_attachments(backend, &desc)?;
        let id = backend.create_framebuffer(&desc, &color_textures, depth_texture)?;
        Ok(Self {
            id,
            desc,
            color_textures,
            depth_texture,
        })
    }

    pub(crate) fn resize(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        width: u32,
        height: u32,
    ) -> BackendResult<()> {
        let mut desc = self.desc.clone();
        desc.width = width;
        desc.height = height;
        let resized = Self::create(backend, desc)?;
        self.destroy(backend);
        *self = resized;
        Ok(())
    }

    pub(crate) fn destroy(&self, backend: &mut dyn GraphicsBackend) {
        backend.destroy_framebuffer(self.id);
        for texture in &self.color_textures {
            backend.destroy_texture(*texture);
        }
        if let Some(depth) = self.depth_texture {
            backend.destroy_texture(depth);
        }
    }

    pub fn id(&self) -> FramebufferId {
        self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.desc.label.as_deref()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.desc.width, self.desc.height)
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::from_size(self.desc.width, self.desc.height)
    }

    pub fn clear_color(&self) -> Vec4 {
        self.desc.clear_color
    }

    pub(crate) fn set_clear_color(&mut self, color: Vec4) {
        self.desc.clear_color = color;
    }

    /// Color attachment texture at `index`
    pub fn color_texture(&self, index: usize) -> Option<TextureId> {
        self.color_textures.get(index).copied()
    }

    pub fn color_textures(&self) -> &[TextureId] {
        &self.color_textures
    }

    pub fn depth_texture(&self) -> Option<TextureId> {
        self.depth_texture
    }

    /// The texture a pass publishes from this framebuffer: the first color
    /// attachment, or the depth attachment of a depth-only target.
    pub fn primary_texture(&self) -> Option<TextureId> {
        self.color_texture(0).or(self.depth_texture)
    }
}

fn create_attachments(
    backend: &mut dyn GraphicsBackend,
    desc: &FramebufferDescriptor,
) -> BackendResult<(Vec<TextureId>, Option<TextureId>)> {
    let label = desc.label.as_deref().unwrap_or("framebuffer");
    let attachment = |format: TextureFormat, suffix: String| TextureDescriptor {
        label: Some(format!("{label} {suffix}")),
        width: desc.width,
        height: desc.height,
        format,
        filter: desc.filter,
        usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
    };

    let mut color_textures = Vec::with_capacity(desc.color_formats.len());
    for (i, format) in desc.color_formats.iter().enumerate() {
        color_textures.push(backend.create_texture(&attachment(*format, format!("color{i}")))?);
    }
    let depth_texture = match desc.depth_format {
        Some(format) => Some(backend.create_texture(&attachment(format, "depth".to_string()))?),
        None => None,
    };
    Ok((color_textures, depth_texture))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    #[test]
    fn test_depth_only_publishes_depth() {
        let mut backend = DummyBackend::default();
        let framebuffer =
            Framebuffer::create(&mut backend, FramebufferDescriptor::depth_only("shadow", 1024, 1024))
                .unwrap();
        assert!(framebuffer.color_texture(0).is_none());
        assert_eq!(framebuffer.primary_texture(), framebuffer.depth_texture());
        assert_eq!(framebuffer.viewport(), Viewport::from_size(1024, 1024));
    }

    #[test]
    fn test_multiple_color_attachments() {
        let mut backend = DummyBackend::default();
        let desc = FramebufferDescriptor::color_depth("gbuffer", 32, 32)
            .with_color_format(TextureFormat::Rgba16Float);
        let framebuffer = Framebuffer::create(&mut backend, desc).unwrap();
        assert_eq!(framebuffer.color_textures().len(), 2);
        assert_ne!(framebuffer.color_texture(0), framebuffer.color_texture(1));
    }
}
