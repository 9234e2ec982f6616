//! Material definitions

use super::{ShaderHandle, TextureHandle};
use crate::backend::UniformValue;
use bitflags::bitflags;
use glam::Vec4;

bitflags! {
    /// Which blend classes of geometry a pass asks the scene to emit
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderFlags: u8 {
        const DRAW_OPAQUE = 1 << 0;
        const DRAW_MASKED = 1 << 1;
        const DRAW_TRANSLUCENT = 1 << 2;
        const DRAW_ALL = Self::DRAW_OPAQUE.bits()
            | Self::DRAW_MASKED.bits()
            | Self::DRAW_TRANSLUCENT.bits();
    }
}

impl Default for RenderFlags {
    fn default() -> Self {
        RenderFlags::DRAW_ALL
    }
}

/// How a material's output combines with what is already in the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Opaque,
    Masked,
    Translucent,
}

impl BlendMode {
    /// The render flag that selects geometry of this blend mode
    pub fn render_flag(&self) -> RenderFlags {
        match self {
            BlendMode::Opaque => RenderFlags::DRAW_OPAQUE,
            BlendMode::Masked => RenderFlags::DRAW_MASKED,
            BlendMode::Translucent => RenderFlags::DRAW_TRANSLUCENT,
        }
    }
}

/// A texture bound under a sampler uniform name
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialTexture {
    pub sampler: String,
    pub texture: TextureHandle,
}

/// Shader plus the textures and uniforms it is drawn with.
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    /// `None` is a configuration error, reported when the material is drawn
    pub shader: Option<ShaderHandle>,
    pub cast_shadows: bool,
    pub blend_mode: BlendMode,
    textures: Vec<MaterialTexture>,
    uniforms: Vec<(String, UniformValue)>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            shader: None,
            cast_shadows: true,
            blend_mode: BlendMode::Opaque,
            textures: Vec::new(),
            uniforms: Vec::new(),
        }
    }
}

impl Material {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_shader(mut self, shader: ShaderHandle) -> Self {
        self.shader = Some(shader);
        self
    }

    /// Add a texture, sampled through the uniform named `sampler`
    pub fn with_texture(mut self, sampler: &str, texture: TextureHandle) -> Self {
        self.set_texture(sampler, texture);
        self
    }

    pub fn with_uniform(mut self, name: &str, value: UniformValue) -> Self {
        self.set_uniform(name, value);
        self
    }

    pub fn with_color(self, color: Vec4) -> Self {
        self.with_uniform("color", UniformValue::Vec4(color))
    }

    pub fn with_cast_shadows(mut self, cast_shadows: bool) -> Self {
        self.cast_shadows = cast_shadows;
        self
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    /// Set or replace the texture under `sampler`
    pub fn set_texture(&mut self, sampler: &str, texture: TextureHandle) {
        match self.textures.iter_mut().find(|t| t.sampler == sampler) {
            Some(existing) => existing.texture = texture,
            None => self.textures.push(MaterialTexture {
                sampler: sampler.to_string(),
                texture,
            }),
        }
    }

    /// Set or replace a uniform value
    pub fn set_uniform(&mut self, name: &str, value: UniformValue) {
        match self.uniforms.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = value,
            None => self.uniforms.push((name.to_string(), value)),
        }
    }

    /// Textures in binding order; the i-th one goes to texture unit i
    pub fn textures(&self) -> &[MaterialTexture] {
        &self.textures
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn uniforms(&self) -> &[(String, UniformValue)] {
        &self.uniforms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_texture_replaces_by_sampler() {
        let first = TextureHandle::default();
        let mut material = Material::new("m").with_texture("albedo", first);
        material.set_texture("albedo", first);
        assert_eq!(material.texture_count(), 1);
    }

    #[test]
    fn test_defaults() {
        let material = Material::new("m");
        assert!(material.cast_shadows);
        assert!(material.shader.is_none());
        assert_eq!(material.blend_mode.render_flag(), RenderFlags::DRAW_OPAQUE);
    }

    #[test]
    fn test_uniform_overwrite() {
        let material = Material::new("m")
            .with_color(Vec4::ONE)
            .with_color(Vec4::ZERO);
        assert_eq!(material.uniforms().len(), 1);
        assert_eq!(material.uniforms()[0].1, UniformValue::Vec4(Vec4::ZERO));
    }
}
