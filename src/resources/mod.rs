//! Resource management
//!
//! Every graphics resource lives in a [`RenderAssets`] arena and is referred
//! to by a generation-checked handle. Handles do not keep their resource
//! alive: once the resource is removed, resolving a handle yields `None`,
//! even if the slot was reused for a newer resource.

mod framebuffer;
mod material;
mod mesh;
mod shader;
mod texture;

pub use framebuffer::*;
pub use material::*;
pub use mesh::*;
pub use shader::*;
pub use texture::*;

use crate::backend::{BackendResult, FramebufferDescriptor, GraphicsBackend, ShaderDescriptor, TextureDescriptor};
use crate::scene::Camera;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Weak handle to a [`VertexArray`]
    pub struct VertexArrayHandle;
    /// Weak handle to a [`Shader`]
    pub struct ShaderHandle;
    /// Weak handle to a [`Texture`]
    pub struct TextureHandle;
    /// Weak handle to a [`Material`]
    pub struct MaterialHandle;
    /// Weak handle to a [`Framebuffer`]
    pub struct FramebufferHandle;
    /// Weak handle to a [`Camera`]
    pub struct CameraHandle;
}

/// A handle that can be resolved against [`RenderAssets`].
pub trait AssetHandle: slotmap::Key {
    type Asset;

    /// Resource kind, used in log messages
    const KIND: &'static str;

    fn resolve(self, assets: &RenderAssets) -> Option<&Self::Asset>;
}

macro_rules! impl_asset_handle {
    ($handle:ty, $asset:ty, $field:ident, $kind:literal) => {
        impl AssetHandle for $handle {
            type Asset = $asset;
            const KIND: &'static str = $kind;

            fn resolve(self, assets: &RenderAssets) -> Option<&$asset> {
                assets.$field.get(self)
            }
        }
    };
}

impl_asset_handle!(VertexArrayHandle, VertexArray, vertex_arrays, "vertex array");
impl_asset_handle!(ShaderHandle, Shader, shaders, "shader");
impl_asset_handle!(TextureHandle, Texture, textures, "texture");
impl_asset_handle!(MaterialHandle, Material, materials, "material");
impl_asset_handle!(FramebufferHandle, Framebuffer, framebuffers, "framebuffer");
impl_asset_handle!(CameraHandle, Camera, cameras, "camera");

/// Owner of every graphics resource commands can refer to.
#[derive(Default)]
pub struct RenderAssets {
    vertex_arrays: SlotMap<VertexArrayHandle, VertexArray>,
    shaders: SlotMap<ShaderHandle, Shader>,
    textures: SlotMap<TextureHandle, Texture>,
    materials: SlotMap<MaterialHandle, Material>,
    framebuffers: SlotMap<FramebufferHandle, Framebuffer>,
    cameras: SlotMap<CameraHandle, Camera>,
}

impl RenderAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a handle, `None` if its resource has been removed
    pub fn resolve<H: AssetHandle>(&self, handle: H) -> Option<&H::Asset> {
        handle.resolve(self)
    }

    pub fn contains<H: AssetHandle>(&self, handle: H) -> bool {
        handle.resolve(self).is_some()
    }

    // Vertex arrays

    /// Upload a mesh and register the resulting vertex array
    pub fn create_vertex_array(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        mesh: &Mesh,
    ) -> BackendResult<VertexArrayHandle> {
        let vertex_array = VertexArray::create(backend, mesh)?;
        Ok(self.vertex_arrays.insert(vertex_array))
    }

    pub fn remove_vertex_array(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        handle: VertexArrayHandle,
    ) -> bool {
        match self.vertex_arrays.remove(handle) {
            Some(vertex_array) => {
                backend.destroy_vertex_array(vertex_array.id());
                true
            }
            None => false,
        }
    }

    // Shaders

    pub fn create_shader(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        desc: &ShaderDescriptor,
    ) -> BackendResult<ShaderHandle> {
        let shader = Shader::create(backend, desc)?;
        Ok(self.shaders.insert(shader))
    }

    pub fn remove_shader(&mut self, backend: &mut dyn GraphicsBackend, handle: ShaderHandle) -> bool {
        match self.shaders.remove(handle) {
            Some(shader) => {
                backend.destroy_shader(shader.id());
                true
            }
            None => false,
        }
    }

    // Textures

    pub fn create_texture(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        desc: &TextureDescriptor,
        pixels: Option<&[u8]>,
    ) -> BackendResult<TextureHandle> {
        let texture = Texture::create(backend, desc, pixels)?;
        Ok(self.textures.insert(texture))
    }

    pub fn remove_texture(&mut self, backend: &mut dyn GraphicsBackend, handle: TextureHandle) -> bool {
        match self.textures.remove(handle) {
            Some(texture) => {
                backend.destroy_texture(texture.id());
                true
            }
            None => false,
        }
    }

    // Materials

    pub fn add_material(&mut self, material: Material) -> MaterialHandle {
        self.materials.insert(material)
    }

    pub fn material_mut(&mut self, handle: MaterialHandle) -> Option<&mut Material> {
        self.materials.get_mut(handle)
    }

    pub fn remove_material(&mut self, handle: MaterialHandle) -> Option<Material> {
        self.materials.remove(handle)
    }

    // Framebuffers

    pub fn create_framebuffer(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        desc: FramebufferDescriptor,
    ) -> BackendResult<FramebufferHandle> {
        let framebuffer = Framebuffer::create(backend, desc)?;
        Ok(self.framebuffers.insert(framebuffer))
    }

    /// Recreate a framebuffer's attachments at a new size.
    ///
    /// The handle stays valid; the attachment texture ids change.
    pub fn resize_framebuffer(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        handle: FramebufferHandle,
        width: u32,
        height: u32,
    ) -> BackendResult<bool> {
        match self.framebuffers.get_mut(handle) {
            Some(framebuffer) => {
                framebuffer.resize(backend, width, height)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn set_framebuffer_clear_color(&mut self, handle: FramebufferHandle, color: glam::Vec4) {
        if let Some(framebuffer) = self.framebuffers.get_mut(handle) {
            framebuffer.set_clear_color(color);
        }
    }

    pub fn remove_framebuffer(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        handle: FramebufferHandle,
    ) -> bool {
        match self.framebuffers.remove(handle) {
            Some(framebuffer) => {
                framebuffer.destroy(backend);
                true
            }
            None => false,
        }
    }

    // Cameras

    pub fn add_camera(&mut self, camera: Camera) -> CameraHandle {
        self.cameras.insert(camera)
    }

    pub fn camera_mut(&mut self, handle: CameraHandle) -> Option<&mut Camera> {
        self.cameras.get_mut(handle)
    }

    pub fn remove_camera(&mut self, handle: CameraHandle) -> Option<Camera> {
        self.cameras.remove(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    #[test]
    fn test_removed_handle_is_expired() {
        let mut assets = RenderAssets::new();
        let material = assets.add_material(Material::new("a"));
        assert!(assets.contains(material));

        assets.remove_material(material);
        assert!(assets.resolve(material).is_none());
    }

    #[test]
    fn test_reused_slot_does_not_revive_handle() {
        let mut assets = RenderAssets::new();
        let old = assets.add_camera(Camera::default());
        assets.remove_camera(old);
        let new = assets.add_camera(Camera::default());

        assert!(assets.resolve(old).is_none());
        assert!(assets.resolve(new).is_some());
    }

    #[test]
    fn test_remove_texture_destroys_gpu_object() {
        let mut backend = DummyBackend::default();
        let mut assets = RenderAssets::new();
        let handle = assets
            .create_texture(&mut backend, &TextureDescriptor::default(), None)
            .unwrap();
        let id = assets.resolve(handle).unwrap().id();

        assert!(assets.remove_texture(&mut backend, handle));
        assert!(!backend.is_texture_alive(id));
        assert!(!assets.remove_texture(&mut backend, handle));
    }

    #[test]
    fn test_resize_keeps_handle_and_changes_attachments() {
        let mut backend = DummyBackend::default();
        let mut assets = RenderAssets::new();
        let handle = assets
            .create_framebuffer(&mut backend, FramebufferDescriptor::color_depth("main", 64, 64))
            .unwrap();
        let before = assets.resolve(handle).unwrap().color_texture(0);

        assert!(assets.resize_framebuffer(&mut backend, handle, 128, 32).unwrap());
        let framebuffer = assets.resolve(handle).unwrap();
        assert_eq!(framebuffer.size(), (128, 32));
        assert_ne!(framebuffer.color_texture(0), before);
    }
}
