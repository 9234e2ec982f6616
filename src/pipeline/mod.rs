//! Default pass set
//!
//! The default pipeline renders, in order:
//! 1. Compute pass (optional) - queued compute work
//! 2. Shadow depth pass - scene depth from the light, published as `ShadowMap`
//! 3. Main color pass - every blend class, published as `SceneColor` when a
//!    post-process pass follows
//! 4. Post-process pass (optional) - full-screen quad to the surface
//! 5. UI pass - the UI layer over the previous target

pub mod compute_pass;
pub mod post_process;
pub mod scene_pass;
pub mod ui_pass;

pub use compute_pass::ComputePass;
pub use post_process::PostProcessPass;
pub use scene_pass::ScenePass;
pub use ui_pass::{UiCanvas, UiElement, UiLayer, UiPass};

use crate::backend::{BackendResult, FramebufferDescriptor, GraphicsBackend};
use crate::manager::RenderManager;
use crate::pass::{PassOutput, PassTarget, RenderPass};
use crate::resources::{FramebufferHandle, MaterialHandle, RenderAssets};

pub const MAIN_COLOR_PASS: &str = "MainColorPass";
pub const OPAQUE_PASS: &str = "OpaquePass";
pub const TRANSLUCENT_PASS: &str = "TranslucentPass";
pub const POST_PROCESS_PASS: &str = "PostProcessPass";
pub const COMPUTE_PASS: &str = "ComputePass";
pub const UI_PASS: &str = "UiPass";

pub const SHADOW_MAP_OUTPUT: &str = "ShadowMap";
pub const SCENE_COLOR_OUTPUT: &str = "SceneColor";

/// Configuration for the default pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub enable_shadows: bool,
    /// Width and height of the square shadow map
    pub shadow_map_size: u32,
    /// Material shadow-casting draws use in the shadow pass
    pub shadow_material: Option<MaterialHandle>,
    /// Adds a post-process pass; the main pass then renders off-screen
    pub post_process_material: Option<MaterialHandle>,
    pub enable_compute: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enable_shadows: true,
            shadow_map_size: 2048,
            shadow_material: None,
            post_process_material: None,
            enable_compute: false,
        }
    }
}

/// Framebuffers the default pipeline created
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPipeline {
    pub shadow_framebuffer: Option<FramebufferHandle>,
    pub main_framebuffer: Option<FramebufferHandle>,
}

impl DefaultPipeline {
    /// Resize the screen-sized framebuffers
    pub fn resize(
        &self,
        backend: &mut dyn GraphicsBackend,
        assets: &mut RenderAssets,
        width: u32,
        height: u32,
    ) -> BackendResult<()> {
        if let Some(framebuffer) = self.main_framebuffer {
            assets.resize_framebuffer(backend, framebuffer, width, height)?;
        }
        Ok(())
    }
}

/// Create the default framebuffers and append the default passes.
pub fn build_default_pipeline(
    manager: &mut RenderManager,
    backend: &mut dyn GraphicsBackend,
    assets: &mut RenderAssets,
    config: &PipelineConfig,
) -> BackendResult<DefaultPipeline> {
    let mut pipeline = DefaultPipeline::default();
    let mut passes: Vec<Box<dyn RenderPass>> = Vec::new();

    if config.enable_compute {
        passes.push(Box::new(ComputePass::new()));
    }

    if config.enable_shadows {
        let size = config.shadow_map_size;
        let shadow_pass_name = manager.config().shadow_pass_name.clone();
        let framebuffer = assets.create_framebuffer(
            backend,
            FramebufferDescriptor::depth_only(&shadow_pass_name, size, size),
        )?;
        pipeline.shadow_framebuffer = Some(framebuffer);
        passes.push(Box::new(ScenePass::shadow_depth(
            &shadow_pass_name,
            framebuffer,
            config.shadow_material,
        )));
    }

    match config.post_process_material {
        Some(material) => {
            let (width, height) = backend.surface_size();
            let framebuffer = assets.create_framebuffer(
                backend,
                FramebufferDescriptor::color_depth(MAIN_COLOR_PASS, width, height)
                    .with_clear_color(manager.config().clear_color),
            )?;
            pipeline.main_framebuffer = Some(framebuffer);

            let mut main = ScenePass::main_color(PassTarget::Framebuffer(framebuffer));
            main.descriptor_mut()
                .outputs
                .push(PassOutput::color(SCENE_COLOR_OUTPUT, 0));
            passes.push(Box::new(main));
            passes.push(Box::new(PostProcessPass::new(backend, assets, material)?));
        }
        None => passes.push(Box::new(ScenePass::main_color(PassTarget::Surface))),
    }

    passes.push(Box::new(UiPass::new()));

    for pass in passes {
        let name = pass.name().to_string();
        if !manager.inject_pass(pass, None) {
            log::warn!("Default pass '{}' was not added", name);
        }
    }

    log::info!("Default pipeline: {:?}", manager.pass_names());
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::resources::Material;
    use crate::RendererConfig;

    #[test]
    fn test_default_pipeline_order() {
        let mut backend = DummyBackend::default();
        let mut assets = RenderAssets::new();
        let mut manager = RenderManager::new(&mut backend, RendererConfig::default()).unwrap();

        let pipeline = build_default_pipeline(
            &mut manager,
            &mut backend,
            &mut assets,
            &PipelineConfig::default(),
        )
        .unwrap();

        assert_eq!(
            manager.pass_names(),
            vec!["ShadowDepthPass", MAIN_COLOR_PASS, UI_PASS]
        );
        assert!(pipeline.shadow_framebuffer.is_some());
        assert!(pipeline.main_framebuffer.is_none());
    }

    #[test]
    fn test_post_process_renders_main_off_screen() {
        let mut backend = DummyBackend::default();
        let mut assets = RenderAssets::new();
        let mut manager = RenderManager::new(&mut backend, RendererConfig::default()).unwrap();
        let material = assets.add_material(Material::new("tonemap"));

        let config = PipelineConfig {
            enable_shadows: false,
            post_process_material: Some(material),
            enable_compute: true,
            ..Default::default()
        };
        let pipeline =
            build_default_pipeline(&mut manager, &mut backend, &mut assets, &config).unwrap();

        assert_eq!(
            manager.pass_names(),
            vec![COMPUTE_PASS, MAIN_COLOR_PASS, POST_PROCESS_PASS, UI_PASS]
        );
        assert!(pipeline.main_framebuffer.is_some());
    }
}
