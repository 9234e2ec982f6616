//! Shared fixtures for the frame integration tests.
//!
//! Every test runs against the recording `DummyBackend`, so assertions are
//! made on the exact backend calls a frame produced.

#![allow(dead_code)]

use render_pipeline::backend::{
    DummyBackend, FramebufferDescriptor, FramebufferId, ShaderDescriptor, ShaderSource,
};
use render_pipeline::resources::{
    solid_color_descriptor, FramebufferHandle, Material, MaterialHandle, Mesh, ShaderHandle,
    TextureHandle, VertexArrayHandle,
};
use render_pipeline::{RenderAssets, RenderManager, RendererConfig};

pub const SURFACE_WIDTH: u32 = 800;
pub const SURFACE_HEIGHT: u32 = 600;

/// Backend, assets and manager for one test.
pub struct TestContext {
    pub backend: DummyBackend,
    pub assets: RenderAssets,
    pub manager: RenderManager,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(RendererConfig::default())
    }

    pub fn with_config(config: RendererConfig) -> Self {
        init_logging();
        let mut backend = DummyBackend::new(SURFACE_WIDTH, SURFACE_HEIGHT);
        let manager = RenderManager::new(&mut backend, config).expect("manager creation");
        Self {
            backend,
            assets: RenderAssets::new(),
            manager,
        }
    }

    pub fn shader(&mut self, name: &str) -> ShaderHandle {
        let desc = ShaderDescriptor {
            label: Some(name.to_string()),
            source: ShaderSource::Graphics {
                vertex: String::new(),
                fragment: String::new(),
            },
        };
        self.assets
            .create_shader(&mut self.backend, &desc)
            .expect("shader creation")
    }

    pub fn compute_shader(&mut self, name: &str) -> ShaderHandle {
        let desc = ShaderDescriptor {
            label: Some(name.to_string()),
            source: ShaderSource::Compute(String::new()),
        };
        self.assets
            .create_shader(&mut self.backend, &desc)
            .expect("shader creation")
    }

    pub fn texture(&mut self, name: &str) -> TextureHandle {
        self.assets
            .create_texture(&mut self.backend, &solid_color_descriptor(name), Some(&[255u8; 4][..]))
            .expect("texture creation")
    }

    pub fn quad(&mut self) -> VertexArrayHandle {
        self.assets
            .create_vertex_array(&mut self.backend, &Mesh::quad())
            .expect("vertex array creation")
    }

    /// Material with its own shader and `texture_count` textures
    pub fn material(&mut self, name: &str, texture_count: usize) -> MaterialHandle {
        let shader = self.shader(name);
        let mut material = Material::new(name).with_shader(shader);
        for index in 0..texture_count {
            let texture = self.texture(&format!("{}_{}", name, index));
            material = material.with_texture(&format!("sampler{}", index), texture);
        }
        self.assets.add_material(material)
    }

    pub fn framebuffer(&mut self, name: &str, width: u32, height: u32) -> FramebufferHandle {
        self.assets
            .create_framebuffer(
                &mut self.backend,
                FramebufferDescriptor::color_depth(name, width, height),
            )
            .expect("framebuffer creation")
    }

    pub fn framebuffer_id(&self, handle: FramebufferHandle) -> FramebufferId {
        self.assets
            .resolve(handle)
            .expect("live framebuffer")
            .id()
    }

    pub fn flush(&mut self) -> usize {
        self.manager.flush(&mut self.backend, &self.assets)
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
