//! Full-screen post-processing pass

use super::POST_PROCESS_PASS;
use crate::backend::{BackendResult, GraphicsBackend};
use crate::commands::DrawPostProcess;
use crate::pass::{PassContext, PassDescriptor, PassTarget, RenderPass};
use crate::resources::{MaterialHandle, Mesh, RenderAssets, VertexArrayHandle};

/// Draws one full-screen quad through its material.
///
/// The material samples earlier passes' outputs by name; they are bound after
/// the material's own textures.
pub struct PostProcessPass {
    desc: PassDescriptor,
    material: MaterialHandle,
    quad: VertexArrayHandle,
}

impl PostProcessPass {
    /// Create the pass and upload its quad. Renders to the window surface
    /// without clearing it.
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        assets: &mut RenderAssets,
        material: MaterialHandle,
    ) -> BackendResult<Self> {
        let quad = assets.create_vertex_array(backend, &Mesh::fullscreen_quad())?;
        Ok(Self::with_quad(material, quad))
    }

    /// Use an already uploaded quad
    pub fn with_quad(material: MaterialHandle, quad: VertexArrayHandle) -> Self {
        let desc = PassDescriptor::new(POST_PROCESS_PASS)
            .with_target(PassTarget::Surface)
            .with_clear(false);
        Self {
            desc,
            material,
            quad,
        }
    }

    pub fn material(&self) -> MaterialHandle {
        self.material
    }

    pub fn set_material(&mut self, material: MaterialHandle) {
        self.material = material;
    }

    pub fn quad(&self) -> VertexArrayHandle {
        self.quad
    }
}

impl RenderPass for PostProcessPass {
    fn descriptor(&self) -> &PassDescriptor {
        &self.desc
    }

    fn descriptor_mut(&mut self) -> &mut PassDescriptor {
        &mut self.desc
    }

    fn render(&mut self, ctx: &mut PassContext<'_>) {
        ctx.submit(DrawPostProcess::new(self.quad, self.material));
    }
}
